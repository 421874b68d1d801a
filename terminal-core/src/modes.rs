//! Terminal mode flags
//!
//! ANSI modes set with `CSI h`/`CSI l` and DEC private modes set with
//! `CSI ? h`/`CSI ? l`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// IRM (4) - printing shifts cells right instead of overwriting
    pub insert_mode: bool,
    /// LNM (20) - LF also returns the carriage
    pub linefeed_mode: bool,

    /// DECCKM (1) - cursor keys send SS3 instead of CSI
    pub cursor_keys_application: bool,
    /// DECKPAM / DECKPNM
    pub keypad_application: bool,
    /// DECOM (6) - cursor addressing relative to the scroll region
    pub origin_mode: bool,
    /// DECAWM (7)
    pub auto_wrap: bool,
    /// DECTCEM (25)
    pub cursor_visible: bool,
    /// 12
    pub cursor_blink: bool,
    /// 1004 - report focus changes as `CSI I` / `CSI O`
    pub focus_events: bool,
    /// 2004
    pub bracketed_paste: bool,
    /// 47, 1047, 1049
    pub alternate_screen: bool,
}

impl Modes {
    pub fn new() -> Self {
        Self {
            insert_mode: false,
            linefeed_mode: false,
            cursor_keys_application: false,
            keypad_application: false,
            origin_mode: false,
            auto_wrap: true,
            cursor_visible: true,
            cursor_blink: true,
            focus_events: false,
            bracketed_paste: false,
            alternate_screen: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Set a plain flag DEC private mode. Returns false when the mode is
    /// not one this table handles; screen switching (47/1047/1048/1049)
    /// is done by [`crate::Screen`] itself.
    pub fn set_dec_mode(&mut self, mode: u16, value: bool) -> bool {
        match mode {
            1 => self.cursor_keys_application = value,
            6 => self.origin_mode = value,
            7 => self.auto_wrap = value,
            12 => self.cursor_blink = value,
            25 => self.cursor_visible = value,
            1004 => self.focus_events = value,
            2004 => self.bracketed_paste = value,
            _ => return false,
        }
        true
    }

    pub fn set_mode(&mut self, mode: u16, value: bool) -> bool {
        match mode {
            4 => self.insert_mode = value,
            20 => self.linefeed_mode = value,
            _ => return false,
        }
        true
    }
}

impl Default for Modes {
    fn default() -> Self {
        Self::new()
    }
}

//! Terminal escape sequence parser
//!
//! Implements a state machine parser based on the VT500 series parser model.
//! Reference: https://vt100.net/emu/dec_ansi_parser
//!
//! All state lives in [`Parser`], so input may be delivered in chunks of
//! any size: feeding a stream in one call or split at arbitrary points
//! yields the same actions and leaves the parser in the same state.
//!
//! UTF-8 decoding runs ahead of escape recognition. While a multi-byte
//! code point is in progress its continuation bytes are never mistaken for
//! C1 controls; a byte that cannot continue it emits U+FFFD and is then
//! processed on its own.

use crate::action::{Action, CsiAction, EscAction};
use crate::params::Params;
use crate::utf8::{is_continuation, Utf8Decoder, Utf8Result, REPLACEMENT};

/// Default cap on OSC/DCS payload bytes
pub const MAX_OSC_LEN: usize = 65536;
/// Maximum length for intermediate bytes
const MAX_INTERMEDIATES: usize = 4;
/// Maximum length of the raw CSI parameter string
const MAX_PARAM_BYTES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Normal text processing
    Ground,
    /// After ESC
    Escape,
    /// ESC followed by intermediate bytes
    EscapeIntermediate,
    /// After ESC [ or CSI
    CsiEntry,
    /// Collecting CSI parameters
    CsiParam,
    /// Collecting CSI intermediate bytes
    CsiIntermediate,
    /// Malformed CSI, consumed up to its final byte
    CsiIgnore,
    /// After ESC ] or OSC
    OscString,
    /// After ESC P, collecting parameters up to the final byte
    DcsEntry,
    /// DCS payload
    DcsPassthrough,
    /// SOS, PM and APC strings, consumed and dropped
    IgnoreString,
}

impl ParserState {
    fn is_string(self) -> bool {
        matches!(
            self,
            ParserState::OscString | ParserState::DcsPassthrough | ParserState::IgnoreString
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parser {
    state: ParserState,
    utf8: Utf8Decoder,
    /// CSI / DCS parameter bytes
    params_buf: Vec<u8>,
    intermediates: Vec<u8>,
    marker: u8,
    /// DCS final byte, kept until the string ends
    dcs_final: u8,
    /// OSC / DCS payload
    string: String,
    /// Payload exceeded `max_string`; the sequence is dropped when it ends
    overflow: bool,
    max_string: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self::with_max_string(MAX_OSC_LEN)
    }

    /// A parser whose OSC/DCS payloads may reach `max` bytes
    pub fn with_max_string(max: usize) -> Self {
        Self {
            state: ParserState::Ground,
            utf8: Utf8Decoder::new(),
            params_buf: Vec::with_capacity(64),
            intermediates: Vec::with_capacity(MAX_INTERMEDIATES),
            marker: 0,
            dcs_final: 0,
            string: String::new(),
            overflow: false,
            max_string: max,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Back to ground, dropping any partial sequence
    pub fn reset(&mut self) {
        self.state = ParserState::Ground;
        self.utf8.reset();
        self.clear_sequence();
        self.string.clear();
        self.overflow = false;
    }

    /// Parse a chunk of bytes, calling the callback for each action
    pub fn parse<F>(&mut self, data: &[u8], mut callback: F)
    where
        F: FnMut(Action),
    {
        for &byte in data {
            self.advance(byte, &mut callback);
        }
    }

    /// Parse a chunk and collect actions into a vector
    pub fn parse_collect(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        self.parse(data, |action| actions.push(action));
        actions
    }

    fn advance<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        if self.utf8.is_pending() {
            if is_continuation(byte) {
                let result = self.utf8.feed(byte);
                self.emit_decoded(result, callback);
                return;
            }
            // truncated code point
            self.utf8.reset();
            self.emit_decoded(Utf8Result::Invalid, callback);
        }

        if self.state.is_string() {
            self.advance_string(byte, callback);
            return;
        }

        match byte {
            0x1B => {
                self.clear_sequence();
                self.state = ParserState::Escape;
            }
            0x18 | 0x1A => self.state = ParserState::Ground,
            // NUL is padding
            0x00 => {}
            0x01..=0x1F => callback(Action::Execute(byte)),
            0x7F => {}
            0x80..=0x9F => self.c1(byte, callback),
            _ => match self.state {
                ParserState::Ground => self.ground(byte, callback),
                ParserState::Escape => self.escape(byte, callback),
                ParserState::EscapeIntermediate => self.escape_intermediate(byte, callback),
                ParserState::CsiEntry => self.csi_entry(byte, callback),
                ParserState::CsiParam => self.csi_param(byte, callback),
                ParserState::CsiIntermediate => self.csi_intermediate(byte, callback),
                ParserState::CsiIgnore => {
                    if (0x40..=0x7E).contains(&byte) {
                        self.state = ParserState::Ground;
                    }
                }
                ParserState::DcsEntry => self.dcs_entry(byte),
                ParserState::OscString | ParserState::DcsPassthrough | ParserState::IgnoreString => {}
            },
        }
    }

    /// Decoded characters go to the screen in ground state and into the
    /// payload inside strings; elsewhere they are not part of any sequence
    fn emit_decoded<F>(&mut self, result: Utf8Result, callback: &mut F)
    where
        F: FnMut(Action),
    {
        let c = match result {
            Utf8Result::Pending => return,
            Utf8Result::Char(c) => c,
            Utf8Result::Invalid => REPLACEMENT,
        };
        if self.state.is_string() {
            self.push_string(c);
        } else if self.state == ParserState::Ground {
            callback(Action::Print(c));
        }
    }

    fn clear_sequence(&mut self) {
        self.params_buf.clear();
        self.intermediates.clear();
        self.marker = 0;
    }

    fn c1<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        self.clear_sequence();
        match byte {
            0x84 => self.esc_dispatch(b'D', callback),
            0x85 => self.esc_dispatch(b'E', callback),
            0x88 => self.esc_dispatch(b'H', callback),
            0x8D => self.esc_dispatch(b'M', callback),
            0x90 => self.enter_dcs(),
            0x9B => self.state = ParserState::CsiEntry,
            0x9D => self.enter_string(ParserState::OscString),
            0x98 | 0x9E | 0x9F => self.enter_string(ParserState::IgnoreString),
            _ => self.state = ParserState::Ground,
        }
    }

    fn ground<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        if byte < 0x80 {
            callback(Action::Print(byte as char));
        } else {
            let result = self.utf8.feed(byte);
            self.emit_decoded(result, callback);
        }
    }

    fn escape<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            b'[' => self.state = ParserState::CsiEntry,
            b']' => self.enter_string(ParserState::OscString),
            b'P' => self.enter_dcs(),
            b'X' | b'^' | b'_' => self.enter_string(ParserState::IgnoreString),
            // ST outside a string
            b'\\' => self.state = ParserState::Ground,
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::EscapeIntermediate;
            }
            0x30..=0x7E => self.esc_dispatch(byte, callback),
            _ => self.state = ParserState::Ground,
        }
    }

    fn escape_intermediate<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            0x20..=0x2F => {
                if self.intermediates.len() < MAX_INTERMEDIATES {
                    self.intermediates.push(byte);
                }
            }
            0x30..=0x7E => self.esc_dispatch(byte, callback),
            _ => self.state = ParserState::Ground,
        }
    }

    fn esc_dispatch<F>(&mut self, final_byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        callback(Action::Esc(EscAction::from_final(&self.intermediates, final_byte)));
        self.state = ParserState::Ground;
    }

    fn csi_entry<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            b'?' | b'>' | b'<' | b'=' => {
                self.marker = byte;
                self.state = ParserState::CsiParam;
            }
            _ => {
                self.state = ParserState::CsiParam;
                self.csi_param(byte, callback);
            }
        }
    }

    fn csi_param<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            b'0'..=b'9' | b';' | b':' => {
                if self.params_buf.len() < MAX_PARAM_BYTES {
                    self.params_buf.push(byte);
                } else {
                    self.state = ParserState::CsiIgnore;
                }
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::CsiIntermediate;
            }
            0x40..=0x7E => self.csi_dispatch(byte, callback),
            // a marker past the first position, or anything else
            _ => self.state = ParserState::CsiIgnore,
        }
    }

    fn csi_intermediate<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            0x20..=0x2F if self.intermediates.len() < MAX_INTERMEDIATES => {
                self.intermediates.push(byte);
            }
            0x40..=0x7E => self.csi_dispatch(byte, callback),
            _ => self.state = ParserState::CsiIgnore,
        }
    }

    fn csi_dispatch<F>(&mut self, final_byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        callback(Action::Csi(CsiAction {
            params: Params::parse(&self.params_buf),
            intermediates: self.intermediates.clone(),
            final_byte,
            marker: self.marker,
        }));
        self.state = ParserState::Ground;
    }

    fn enter_dcs(&mut self) {
        self.clear_sequence();
        self.state = ParserState::DcsEntry;
    }

    fn dcs_entry(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' | b';' | b':' if self.params_buf.len() < MAX_PARAM_BYTES => {
                self.params_buf.push(byte);
            }
            b'?' | b'>' | b'<' | b'=' if self.params_buf.is_empty() => self.marker = byte,
            0x20..=0x2F if self.intermediates.len() < MAX_INTERMEDIATES => {
                self.intermediates.push(byte);
            }
            0x40..=0x7E => {
                self.dcs_final = byte;
                self.enter_string(ParserState::DcsPassthrough);
            }
            _ => self.enter_string(ParserState::IgnoreString),
        }
    }

    fn enter_string(&mut self, state: ParserState) {
        self.state = state;
        self.string.clear();
        self.overflow = false;
    }

    fn push_string(&mut self, c: char) {
        if self.state == ParserState::IgnoreString {
            return;
        }
        if self.string.len() + c.len_utf8() > self.max_string {
            self.overflow = true;
        } else {
            self.string.push(c);
        }
    }

    fn advance_string<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            // ESC ends the string; a following `\` completes ST in the
            // escape state, anything else starts a new sequence
            0x1B => {
                self.finish_string(callback);
                self.clear_sequence();
                self.state = ParserState::Escape;
            }
            // BEL terminator (xterm)
            0x07 | 0x9C => {
                self.finish_string(callback);
                self.state = ParserState::Ground;
            }
            0x18 | 0x1A => {
                self.string.clear();
                self.state = ParserState::Ground;
            }
            0x00..=0x1F | 0x7F | 0x80..=0x9F => {}
            0x20..=0x7E => self.push_string(byte as char),
            _ => {
                let result = self.utf8.feed(byte);
                self.emit_decoded(result, callback);
            }
        }
    }

    fn finish_string<F>(&mut self, callback: &mut F)
    where
        F: FnMut(Action),
    {
        let data = std::mem::take(&mut self.string);
        if self.overflow {
            log::debug!("Dropping string sequence longer than {} bytes", self.max_string);
            self.overflow = false;
            return;
        }
        match self.state {
            ParserState::OscString => callback(osc_action(data)),
            ParserState::DcsPassthrough => callback(Action::Dcs {
                params: Params::parse(&self.params_buf),
                intermediates: self.intermediates.clone(),
                final_byte: self.dcs_final,
                data,
            }),
            _ => {}
        }
    }
}

/// Split `command ; argument`; a non-numeric command is invalid
fn osc_action(data: String) -> Action {
    let (command, argument) = match data.split_once(';') {
        Some((command, argument)) => (command, argument),
        None => (data.as_str(), ""),
    };
    match command.parse::<u16>() {
        Ok(command) => Action::Osc {
            command,
            argument: argument.to_string(),
        },
        Err(_) => Action::Invalid(data.into_bytes()),
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

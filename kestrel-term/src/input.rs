//! Keyboard input encoding
//!
//! Turns logical key events into the bytes an xterm-compatible application
//! expects. Named keys are looked up in [`KEY_TABLE`]; text keys are sent
//! as UTF-8 with Ctrl folding and an ESC prefix for Alt.

use terminal_core::Modes;

/// Longest composed text accepted for a single key event
pub const MAX_TEXT_BYTES: usize = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        alt: false,
    };

    /// xterm modifier parameter: 1 + shift + 2*alt + 4*ctrl
    pub fn code(self) -> u8 {
        1 + self.shift as u8 + 2 * self.alt as u8 + 4 * self.ctrl as u8
    }

    pub fn is_empty(self) -> bool {
        self == Self::NONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Return,
    Backspace,
    Tab,
    Escape,
    Insert,
    Delete,
    Home,
    End,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    /// F1..=F20
    F(u8),
    Keypad(KeypadKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeypadKey {
    Digit(u8),
    Enter,
    Plus,
    Minus,
    Star,
    Slash,
    Dot,
    Comma,
    Equal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Text produced by the keyboard layout or input method
    Text(String),
    Named(NamedKey),
    /// Shift, Control, Alt, Super and friends on their own
    Modifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub mods: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, mods: Modifiers) -> Self {
        Self { key, mods }
    }

    pub fn text(text: &str) -> Self {
        Self::new(Key::Text(text.to_string()), Modifiers::NONE)
    }

    pub fn named(key: NamedKey, mods: Modifiers) -> Self {
        Self::new(Key::Named(key), mods)
    }
}

/// How a named key is turned into bytes
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Fixed bytes, ESC-prefixed with Alt
    Literal(&'static [u8]),
    /// `CSI x` normally, `SS3 x` under DECCKM, `CSI 1;m x` when modified
    Cursor(u8),
    /// `CSI n ~`, or `CSI n;m ~` when modified
    Tilde(u8),
    /// `SS3 x`, or `CSI 1;m x` when modified (F1-F4)
    Ss3(u8),
    /// `SS3 x` under DECKPAM, otherwise the literal bytes
    Keypad(u8, &'static [u8]),
}

const KEY_TABLE: &[(NamedKey, Rule)] = &[
    (NamedKey::Return, Rule::Literal(b"\r")),
    (NamedKey::Backspace, Rule::Literal(b"\x7f")),
    (NamedKey::Tab, Rule::Literal(b"\t")),
    (NamedKey::Escape, Rule::Literal(b"\x1b")),
    (NamedKey::Up, Rule::Cursor(b'A')),
    (NamedKey::Down, Rule::Cursor(b'B')),
    (NamedKey::Right, Rule::Cursor(b'C')),
    (NamedKey::Left, Rule::Cursor(b'D')),
    (NamedKey::Home, Rule::Cursor(b'H')),
    (NamedKey::End, Rule::Cursor(b'F')),
    (NamedKey::Insert, Rule::Tilde(2)),
    (NamedKey::Delete, Rule::Tilde(3)),
    (NamedKey::PageUp, Rule::Tilde(5)),
    (NamedKey::PageDown, Rule::Tilde(6)),
    (NamedKey::F(1), Rule::Ss3(b'P')),
    (NamedKey::F(2), Rule::Ss3(b'Q')),
    (NamedKey::F(3), Rule::Ss3(b'R')),
    (NamedKey::F(4), Rule::Ss3(b'S')),
    (NamedKey::F(5), Rule::Tilde(15)),
    (NamedKey::F(6), Rule::Tilde(17)),
    (NamedKey::F(7), Rule::Tilde(18)),
    (NamedKey::F(8), Rule::Tilde(19)),
    (NamedKey::F(9), Rule::Tilde(20)),
    (NamedKey::F(10), Rule::Tilde(21)),
    (NamedKey::F(11), Rule::Tilde(23)),
    (NamedKey::F(12), Rule::Tilde(24)),
    (NamedKey::F(13), Rule::Tilde(25)),
    (NamedKey::F(14), Rule::Tilde(26)),
    (NamedKey::F(15), Rule::Tilde(28)),
    (NamedKey::F(16), Rule::Tilde(29)),
    (NamedKey::F(17), Rule::Tilde(31)),
    (NamedKey::F(18), Rule::Tilde(32)),
    (NamedKey::F(19), Rule::Tilde(33)),
    (NamedKey::F(20), Rule::Tilde(34)),
    (NamedKey::Keypad(KeypadKey::Digit(0)), Rule::Keypad(b'p', b"0")),
    (NamedKey::Keypad(KeypadKey::Digit(1)), Rule::Keypad(b'q', b"1")),
    (NamedKey::Keypad(KeypadKey::Digit(2)), Rule::Keypad(b'r', b"2")),
    (NamedKey::Keypad(KeypadKey::Digit(3)), Rule::Keypad(b's', b"3")),
    (NamedKey::Keypad(KeypadKey::Digit(4)), Rule::Keypad(b't', b"4")),
    (NamedKey::Keypad(KeypadKey::Digit(5)), Rule::Keypad(b'u', b"5")),
    (NamedKey::Keypad(KeypadKey::Digit(6)), Rule::Keypad(b'v', b"6")),
    (NamedKey::Keypad(KeypadKey::Digit(7)), Rule::Keypad(b'w', b"7")),
    (NamedKey::Keypad(KeypadKey::Digit(8)), Rule::Keypad(b'x', b"8")),
    (NamedKey::Keypad(KeypadKey::Digit(9)), Rule::Keypad(b'y', b"9")),
    (NamedKey::Keypad(KeypadKey::Enter), Rule::Keypad(b'M', b"\r")),
    (NamedKey::Keypad(KeypadKey::Plus), Rule::Keypad(b'k', b"+")),
    (NamedKey::Keypad(KeypadKey::Minus), Rule::Keypad(b'm', b"-")),
    (NamedKey::Keypad(KeypadKey::Star), Rule::Keypad(b'j', b"*")),
    (NamedKey::Keypad(KeypadKey::Slash), Rule::Keypad(b'o', b"/")),
    (NamedKey::Keypad(KeypadKey::Dot), Rule::Keypad(b'n', b".")),
    (NamedKey::Keypad(KeypadKey::Comma), Rule::Keypad(b'l', b",")),
    (NamedKey::Keypad(KeypadKey::Equal), Rule::Keypad(b'X', b"=")),
];

fn rule_for(key: NamedKey) -> Option<Rule> {
    KEY_TABLE.iter().find(|(k, _)| *k == key).map(|(_, rule)| *rule)
}

/// Encode a key event for the current modes. `None` means nothing is sent.
pub fn encode_key(event: &KeyEvent, modes: &Modes) -> Option<Vec<u8>> {
    match &event.key {
        Key::Modifier => None,
        Key::Text(text) => encode_text(text, event.mods),
        Key::Named(named) => encode_named(*named, event.mods, modes),
    }
}

fn encode_named(key: NamedKey, mods: Modifiers, modes: &Modes) -> Option<Vec<u8>> {
    // special cases that don't fit the table
    match key {
        NamedKey::Tab if mods.shift => return Some(b"\x1b[Z".to_vec()),
        NamedKey::Return if modes.linefeed_mode => return Some(b"\r\n".to_vec()),
        NamedKey::Backspace if mods.ctrl => return Some(vec![0x08]),
        _ => {}
    }

    let Some(rule) = rule_for(key) else {
        log::debug!("No encoding for {:?}", key);
        return None;
    };
    let code = mods.code();
    let bytes = match rule {
        Rule::Literal(bytes) => with_alt(bytes, mods.alt),
        Rule::Cursor(final_byte) if code > 1 => format!("\x1b[1;{}{}", code, final_byte as char).into_bytes(),
        Rule::Cursor(final_byte) if modes.cursor_keys_application => vec![0x1b, b'O', final_byte],
        Rule::Cursor(final_byte) => vec![0x1b, b'[', final_byte],
        Rule::Tilde(n) if code > 1 => format!("\x1b[{};{}~", n, code).into_bytes(),
        Rule::Tilde(n) => format!("\x1b[{}~", n).into_bytes(),
        Rule::Ss3(final_byte) if code > 1 => format!("\x1b[1;{}{}", code, final_byte as char).into_bytes(),
        Rule::Ss3(final_byte) => vec![0x1b, b'O', final_byte],
        Rule::Keypad(app, _) if modes.keypad_application => vec![0x1b, b'O', app],
        Rule::Keypad(_, normal) => normal.to_vec(),
    };
    Some(bytes)
}

fn with_alt(bytes: &[u8], alt: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 1);
    if alt {
        out.push(0x1b);
    }
    out.extend_from_slice(bytes);
    out
}

/// Ctrl folding for a single character
fn control_byte(c: char) -> Option<u8> {
    match c {
        'a'..='z' | 'A'..='Z' => Some(c.to_ascii_uppercase() as u8 - b'A' + 1),
        '@' | ' ' | '2' => Some(0x00),
        '[' | '3' => Some(0x1b),
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '6' => Some(0x1e),
        '_' | '7' | '/' => Some(0x1f),
        '?' | '8' => Some(0x7f),
        _ => None,
    }
}

fn encode_text(text: &str, mods: Modifiers) -> Option<Vec<u8>> {
    if text.is_empty() {
        return None;
    }
    if text.len() > MAX_TEXT_BYTES {
        log::warn!(
            "Dropping key event: {} bytes of text exceeds the {}-byte input buffer",
            text.len(),
            MAX_TEXT_BYTES
        );
        return None;
    }

    let mut chars = text.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if mods.ctrl {
            if let Some(byte) = control_byte(c) {
                return Some(with_alt(&[byte], mods.alt));
            }
        }
    }
    Some(with_alt(text.as_bytes(), mods.alt))
}

/// Focus in/out report (mode 1004)
pub fn encode_focus(focused: bool) -> &'static [u8] {
    if focused {
        b"\x1b[I"
    } else {
        b"\x1b[O"
    }
}

/// Paste payload, wrapped in markers under bracketed paste (mode 2004)
pub fn encode_paste(text: &str, bracketed: bool) -> Vec<u8> {
    if !bracketed {
        return text.as_bytes().to_vec();
    }
    // an embedded end marker would let pasted text escape the bracket
    let text = text.replace("\x1b[201~", "");
    let mut out = Vec::with_capacity(text.len() + 12);
    out.extend_from_slice(b"\x1b[200~");
    out.extend_from_slice(text.as_bytes());
    out.extend_from_slice(b"\x1b[201~");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(event: KeyEvent) -> Option<Vec<u8>> {
        encode_key(&event, &Modes::new())
    }

    #[test]
    fn test_modifier_code() {
        assert_eq!(Modifiers::NONE.code(), 1);
        assert_eq!(Modifiers::SHIFT.code(), 2);
        let ctrl_alt = Modifiers {
            ctrl: true,
            alt: true,
            ..Modifiers::NONE
        };
        assert_eq!(ctrl_alt.code(), 7);
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(encode(KeyEvent::text("a")), Some(b"a".to_vec()));
        assert_eq!(encode(KeyEvent::text("é")), Some("é".as_bytes().to_vec()));
    }

    #[test]
    fn test_ctrl_and_alt_text() {
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        assert_eq!(encode(KeyEvent::new(Key::Text("c".into()), ctrl)), Some(vec![0x03]));
        assert_eq!(encode(KeyEvent::new(Key::Text("[".into()), ctrl)), Some(vec![0x1b]));
        let alt = Modifiers {
            alt: true,
            ..Modifiers::NONE
        };
        assert_eq!(encode(KeyEvent::new(Key::Text("x".into()), alt)), Some(b"\x1bx".to_vec()));
    }

    #[test]
    fn test_oversized_text_dropped() {
        assert_eq!(encode(KeyEvent::text(&"x".repeat(MAX_TEXT_BYTES))), Some(vec![b'x'; 15]));
        assert_eq!(encode(KeyEvent::text(&"x".repeat(MAX_TEXT_BYTES + 1))), None);
    }

    #[test]
    fn test_pure_modifier_sends_nothing() {
        assert_eq!(encode(KeyEvent::new(Key::Modifier, Modifiers::SHIFT)), None);
    }

    #[test]
    fn test_cursor_keys_follow_decckm() {
        let mut modes = Modes::new();
        let up = KeyEvent::named(NamedKey::Up, Modifiers::NONE);
        assert_eq!(encode_key(&up, &modes), Some(b"\x1b[A".to_vec()));
        modes.cursor_keys_application = true;
        assert_eq!(encode_key(&up, &modes), Some(b"\x1bOA".to_vec()));
        let shift_up = KeyEvent::named(NamedKey::Up, Modifiers::SHIFT);
        assert_eq!(encode_key(&shift_up, &modes), Some(b"\x1b[1;2A".to_vec()));
    }

    #[test]
    fn test_tilde_and_function_keys() {
        assert_eq!(encode(KeyEvent::named(NamedKey::Delete, Modifiers::NONE)), Some(b"\x1b[3~".to_vec()));
        assert_eq!(encode(KeyEvent::named(NamedKey::PageUp, Modifiers::SHIFT)), Some(b"\x1b[5;2~".to_vec()));
        assert_eq!(encode(KeyEvent::named(NamedKey::F(1), Modifiers::NONE)), Some(b"\x1bOP".to_vec()));
        assert_eq!(encode(KeyEvent::named(NamedKey::F(5), Modifiers::NONE)), Some(b"\x1b[15~".to_vec()));
        assert_eq!(encode(KeyEvent::named(NamedKey::F(20), Modifiers::NONE)), Some(b"\x1b[34~".to_vec()));
        assert_eq!(encode(KeyEvent::named(NamedKey::F(21), Modifiers::NONE)), None);
    }

    #[test]
    fn test_keypad_modes() {
        let mut modes = Modes::new();
        let kp5 = KeyEvent::named(NamedKey::Keypad(KeypadKey::Digit(5)), Modifiers::NONE);
        assert_eq!(encode_key(&kp5, &modes), Some(b"5".to_vec()));
        modes.keypad_application = true;
        assert_eq!(encode_key(&kp5, &modes), Some(b"\x1bOu".to_vec()));
    }

    #[test]
    fn test_special_cases() {
        assert_eq!(encode(KeyEvent::named(NamedKey::Tab, Modifiers::SHIFT)), Some(b"\x1b[Z".to_vec()));
        let mut modes = Modes::new();
        modes.linefeed_mode = true;
        let ret = KeyEvent::named(NamedKey::Return, Modifiers::NONE);
        assert_eq!(encode_key(&ret, &modes), Some(b"\r\n".to_vec()));
    }

    #[test]
    fn test_paste_encoding() {
        assert_eq!(encode_paste("hi", false), b"hi".to_vec());
        assert_eq!(encode_paste("hi", true), b"\x1b[200~hi\x1b[201~".to_vec());
        assert_eq!(encode_paste("a\x1b[201~b", true), b"\x1b[200~ab\x1b[201~".to_vec());
    }

    #[test]
    fn test_focus_encoding() {
        assert_eq!(encode_focus(true), b"\x1b[I");
        assert_eq!(encode_focus(false), b"\x1b[O");
    }
}

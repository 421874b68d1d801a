//! Streaming UTF-8 decoding
//!
//! The decoder keeps partial code points between calls so a character
//! split across reads decodes the same as one delivered whole.

pub const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Utf8Decoder {
    /// Code point bits gathered so far
    acc: u32,
    /// Continuation bytes still expected
    remaining: u8,
    /// Total length of the current sequence, for overlong checks
    width: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Result {
    /// Need more bytes
    Pending,
    Char(char),
    /// Malformed or overlong; the caller substitutes U+FFFD
    Invalid,
}

/// True for `10xxxxxx`
pub fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// In the middle of a multi-byte sequence
    pub fn is_pending(&self) -> bool {
        self.remaining > 0
    }

    pub fn feed(&mut self, byte: u8) -> Utf8Result {
        if self.remaining == 0 {
            return self.start(byte);
        }
        if !is_continuation(byte) {
            self.reset();
            return Utf8Result::Invalid;
        }
        self.acc = (self.acc << 6) | (byte & 0x3F) as u32;
        self.remaining -= 1;
        if self.remaining > 0 {
            return Utf8Result::Pending;
        }

        let cp = self.acc;
        let min = match self.width {
            2 => 0x80,
            3 => 0x800,
            _ => 0x10000,
        };
        self.reset();
        if cp < min {
            return Utf8Result::Invalid;
        }
        // rejects surrogates and anything past U+10FFFF
        char::from_u32(cp).map(Utf8Result::Char).unwrap_or(Utf8Result::Invalid)
    }

    fn start(&mut self, byte: u8) -> Utf8Result {
        let (width, bits) = match byte {
            0x00..=0x7F => return Utf8Result::Char(byte as char),
            0xC2..=0xDF => (2, byte & 0x1F),
            0xE0..=0xEF => (3, byte & 0x0F),
            0xF0..=0xF4 => (4, byte & 0x07),
            // stray continuation, C0/C1 overlong leads, F5..FF
            _ => return Utf8Result::Invalid,
        };
        self.acc = bits as u32;
        self.remaining = width - 1;
        self.width = width;
        Utf8Result::Pending
    }
}

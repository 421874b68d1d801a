//! Terminal cell representation
//!
//! A cell is a value type: one Unicode scalar (or the placeholder for the
//! right half of a wide glyph), colors, and an attribute bitset.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::color::Color;

bitflags! {
    /// SGR text attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Attr: u8 {
        const BOLD          = 1 << 0;
        const FAINT         = 1 << 1;
        const ITALIC        = 1 << 2;
        const UNDERLINE     = 1 << 3;
        const BLINK         = 1 << 4;
        const INVERSE       = 1 << 5;
        const HIDDEN        = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
    }
}

/// Pen state applied to newly written cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellAttributes {
    pub fg: Color,
    pub bg: Color,
    pub flags: Attr,
}

impl CellAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// SGR 0
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn has(&self, attr: Attr) -> bool {
        self.flags.contains(attr)
    }

    pub fn set(&mut self, attr: Attr, on: bool) {
        self.flags.set(attr, on);
    }

    /// Attributes a blank (erased) cell inherits: background only
    pub fn blank(&self) -> Self {
        Self {
            fg: Color::Default,
            bg: self.bg,
            flags: Attr::empty(),
        }
    }
}

/// A single grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    ch: char,
    pub attrs: CellAttributes,
    /// 1 for normal, 2 for the left half of a wide glyph, 0 for its right half
    width: u8,
}

impl Cell {
    pub fn new() -> Self {
        Self::blank(CellAttributes::default())
    }

    pub fn blank(attrs: CellAttributes) -> Self {
        Self {
            ch: ' ',
            attrs,
            width: 1,
        }
    }

    pub fn with_char(c: char, attrs: CellAttributes) -> Self {
        Self {
            ch: c,
            attrs,
            width: char_width(c).max(1) as u8,
        }
    }

    pub fn set_char(&mut self, c: char) {
        self.ch = c;
        self.width = char_width(c).max(1) as u8;
    }

    /// The stored character; continuation cells report a space
    pub fn display_char(&self) -> char {
        self.ch
    }

    pub fn is_empty(&self) -> bool {
        self.ch == ' ' && self.width == 1
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Turn this cell into the right half of a wide glyph
    pub fn set_continuation(&mut self, attrs: CellAttributes) {
        self.ch = ' ';
        self.attrs = attrs;
        self.width = 0;
    }

    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    pub fn clear(&mut self, attrs: CellAttributes) {
        *self = Self::blank(attrs);
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

/// Display width of a character: 2 for wide glyphs, 0 for combining marks
pub fn char_width(c: char) -> usize {
    use unicode_width::UnicodeWidthChar;
    c.width().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_new() {
        let cell = Cell::new();
        assert!(cell.is_empty());
        assert_eq!(cell.width(), 1);
    }

    #[test]
    fn test_cell_with_char() {
        let cell = Cell::with_char('A', CellAttributes::default());
        assert_eq!(cell.display_char(), 'A');
        assert!(!cell.is_empty());
    }

    #[test]
    fn test_cell_wide_char() {
        let cell = Cell::with_char('中', CellAttributes::default());
        assert!(cell.is_wide());
        assert_eq!(cell.width(), 2);
    }

    #[test]
    fn test_continuation() {
        let mut cell = Cell::with_char('x', CellAttributes::default());
        cell.set_continuation(CellAttributes::default());
        assert!(cell.is_continuation());
        assert!(!cell.is_empty());
        cell.clear(CellAttributes::default());
        assert!(cell.is_empty());
    }

    #[test]
    fn test_attribute_flags() {
        let mut attrs = CellAttributes::new();
        attrs.set(Attr::INVERSE, true);
        attrs.set(Attr::BOLD, true);
        assert!(attrs.has(Attr::INVERSE) && attrs.has(Attr::BOLD));

        attrs.set(Attr::INVERSE, false);
        assert!(!attrs.has(Attr::INVERSE));
        assert!(attrs.has(Attr::BOLD));
    }

    #[test]
    fn test_blank_keeps_background_only() {
        let mut attrs = CellAttributes::new();
        attrs.fg = Color::Indexed(2);
        attrs.bg = Color::Indexed(4);
        attrs.set(Attr::BOLD | Attr::UNDERLINE, true);

        let blank = attrs.blank();
        assert_eq!(blank.bg, Color::Indexed(4));
        assert_eq!(blank.fg, Color::Default);
        assert!(blank.flags.is_empty());
    }
}

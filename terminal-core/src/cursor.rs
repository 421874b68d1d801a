//! Cursor state management

use serde::{Deserialize, Serialize};

use crate::cell::CellAttributes;

/// Cursor shape, selected with DECSCUSR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Bar,
}

impl CursorShape {
    /// Map a DECSCUSR parameter to a shape and blink flag
    pub fn from_decscusr(param: u16) -> Option<(Self, bool)> {
        match param {
            0 | 1 => Some((CursorShape::Block, true)),
            2 => Some((CursorShape::Block, false)),
            3 => Some((CursorShape::Underline, true)),
            4 => Some((CursorShape::Underline, false)),
            5 => Some((CursorShape::Bar, true)),
            6 => Some((CursorShape::Bar, false)),
            _ => None,
        }
    }
}

/// Cursor position and pen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// 0-indexed column, always `< cols`
    pub col: usize,
    /// 0-indexed row, always `< rows`
    pub row: usize,
    pub shape: CursorShape,
    pub blinking: bool,
    /// Pen used for newly printed characters
    pub attrs: CellAttributes,
    /// Set after printing into the last column with auto-wrap on;
    /// the next printable wraps first
    pub pending_wrap: bool,
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            col: 0,
            row: 0,
            shape: CursorShape::Block,
            blinking: true,
            attrs: CellAttributes::default(),
            pending_wrap: false,
        }
    }

    /// Keep the cursor inside a `cols` x `rows` grid
    pub fn clamp(&mut self, cols: usize, rows: usize) {
        self.col = self.col.min(cols.saturating_sub(1));
        self.row = self.row.min(rows.saturating_sub(1));
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// State saved by DECSC and restored by DECRC
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedCursor {
    pub col: usize,
    pub row: usize,
    pub attrs: CellAttributes,
    pub origin_mode: bool,
    pub pending_wrap: bool,
}

impl SavedCursor {
    pub fn save(cursor: &Cursor, origin_mode: bool) -> Self {
        Self {
            col: cursor.col,
            row: cursor.row,
            attrs: cursor.attrs,
            origin_mode,
            pending_wrap: cursor.pending_wrap,
        }
    }

    /// Restore into `cursor`, returning the saved origin mode
    pub fn restore(&self, cursor: &mut Cursor) -> bool {
        cursor.col = self.col;
        cursor.row = self.row;
        cursor.attrs = self.attrs;
        cursor.pending_wrap = self.pending_wrap;
        self.origin_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Attr;

    #[test]
    fn test_cursor_new() {
        let cursor = Cursor::new();
        assert_eq!((cursor.col, cursor.row), (0, 0));
        assert_eq!(cursor.shape, CursorShape::Block);
    }

    #[test]
    fn test_clamp() {
        let mut cursor = Cursor::new();
        cursor.col = 79;
        cursor.row = 23;
        cursor.clamp(40, 12);
        assert_eq!((cursor.col, cursor.row), (39, 11));
    }

    #[test]
    fn test_save_restore() {
        let mut cursor = Cursor::new();
        cursor.col = 10;
        cursor.row = 5;
        cursor.attrs.set(Attr::BOLD, true);
        let saved = SavedCursor::save(&cursor, true);

        let mut other = Cursor::new();
        assert!(saved.restore(&mut other));
        assert_eq!((other.col, other.row), (10, 5));
        assert!(other.attrs.has(Attr::BOLD));
    }

    #[test]
    fn test_decscusr() {
        assert_eq!(CursorShape::from_decscusr(4), Some((CursorShape::Underline, false)));
        assert_eq!(CursorShape::from_decscusr(5), Some((CursorShape::Bar, true)));
        assert_eq!(CursorShape::from_decscusr(9), None);
    }
}

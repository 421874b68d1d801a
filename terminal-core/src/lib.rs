//! Terminal Core - Platform-independent terminal screen model
//!
//! This crate provides the data structures the terminal engine mutates and
//! the renderer observes:
//! - Screen buffers (primary with scrollback, alternate without)
//! - Cells, lines and grids
//! - Cursor and mode state
//! - Selection with snap granularity and rectangular mode
//! - Immutable [`Frame`] snapshots handed across threads
//!
//! Nothing in here performs I/O. Given the same sequence of operations the
//! screen always ends up in the same state.

mod cell;
mod color;
mod cursor;
mod frame;
mod grid;
mod line;
mod modes;
mod screen;
mod scrollback;
pub mod selection;

pub use cell::{char_width, Attr, Cell, CellAttributes};
pub use color::{palette, Color, Rgb};
pub use cursor::{Cursor, CursorShape, SavedCursor};
pub use frame::{Frame, FrameCursor};
pub use grid::Grid;
pub use line::Line;
pub use modes::Modes;
pub use screen::Screen;
pub use scrollback::{Scrollback, DEFAULT_SCROLLBACK_SIZE};
pub use selection::{Point, Selection, SelectionMode, SnapTo, Span};

/// Terminal dimensions in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub cols: usize,
    pub rows: usize,
}

impl Dimensions {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    /// Clamp degenerate sizes up to 1x1
    pub fn at_least_one(self) -> Self {
        Self {
            cols: self.cols.max(1),
            rows: self.rows.max(1),
        }
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

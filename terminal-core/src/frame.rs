//! Immutable screen snapshots
//!
//! A [`Frame`] is what crosses from the session thread to the presentation
//! thread. It is reference counted and never mutated once captured, so
//! cloning it is cheap and the live screen is never shared.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cursor::CursorShape;
use crate::line::Line;
use crate::selection::Span;
use crate::Dimensions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCursor {
    pub col: usize,
    pub row: usize,
    pub visible: bool,
    pub shape: CursorShape,
    pub blinking: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct FrameInner {
    seq: u64,
    dims: Dimensions,
    lines: Vec<Line>,
    cursor: FrameCursor,
    has_focus: bool,
    selection: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    inner: Arc<FrameInner>,
}

impl Frame {
    pub fn new(
        seq: u64,
        dims: Dimensions,
        lines: Vec<Line>,
        cursor: FrameCursor,
        has_focus: bool,
        selection: Vec<Span>,
    ) -> Self {
        Self {
            inner: Arc::new(FrameInner {
                seq,
                dims,
                lines,
                cursor,
                has_focus,
                selection,
            }),
        }
    }

    /// Monotonic capture number; later frames have larger values
    pub fn seq(&self) -> u64 {
        self.inner.seq
    }

    pub fn dimensions(&self) -> Dimensions {
        self.inner.dims
    }

    pub fn cols(&self) -> usize {
        self.inner.dims.cols
    }

    pub fn rows(&self) -> usize {
        self.inner.dims.rows
    }

    pub fn lines(&self) -> &[Line] {
        &self.inner.lines
    }

    pub fn line(&self, row: usize) -> Option<&Line> {
        self.inner.lines.get(row)
    }

    pub fn cursor(&self) -> FrameCursor {
        self.inner.cursor
    }

    pub fn has_focus(&self) -> bool {
        self.inner.has_focus
    }

    pub fn selection(&self) -> &[Span] {
        &self.inner.selection
    }

    pub fn is_selected(&self, col: usize, row: usize) -> bool {
        self.inner.selection.iter().any(|s| s.contains(col, row))
    }

    /// Plain text of the visible grid, one row per line
    pub fn text(&self) -> String {
        self.inner
            .lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seq: u64) -> Frame {
        let mut line = Line::new(3);
        if let Some(cell) = line.get_mut(0) {
            cell.set_char('x');
        }
        Frame::new(
            seq,
            Dimensions::new(3, 1),
            vec![line],
            FrameCursor {
                col: 1,
                row: 0,
                visible: true,
                shape: CursorShape::Block,
                blinking: false,
            },
            true,
            vec![Span { row: 0, start: 0, end: 2 }],
        )
    }

    #[test]
    fn test_frame_accessors() {
        let frame = sample(7);
        assert_eq!(frame.seq(), 7);
        assert_eq!(frame.text(), "x");
        assert!(frame.is_selected(1, 0));
        assert!(!frame.is_selected(2, 0));
        assert!(frame.has_focus());
    }

    #[test]
    fn test_frame_clone_shares_snapshot() {
        let frame = sample(1);
        let other = frame.clone();
        assert!(Arc::ptr_eq(&frame.inner, &other.inner));
    }
}

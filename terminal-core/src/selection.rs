//! Text selection for copy/paste
//!
//! A selection is an anchor and an extent in grid coordinates plus a snap
//! granularity. Highlighted ranges and the selected text are derived from
//! the grid on demand; nothing is materialised until [`Selection::finish`].

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::line::Line;

/// A cell position on the visible grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    // row first so the derived ordering is reading order
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(col: usize, row: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Runs from anchor to extent in reading order
    #[default]
    Linear,
    /// The rectangle spanned by anchor and extent
    Rectangular,
}

/// Granularity a drag expands to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnapTo {
    #[default]
    Char,
    Word,
    Line,
}

impl SnapTo {
    /// Char -> Word -> Line -> Char
    pub fn next(self) -> Self {
        match self {
            SnapTo::Char => SnapTo::Word,
            SnapTo::Word => SnapTo::Line,
            SnapTo::Line => SnapTo::Char,
        }
    }
}

/// Highlighted cells `start..end` on one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub row: usize,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn contains(&self, col: usize, row: usize) -> bool {
        self.row == row && col >= self.start && col < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub extent: Point,
    pub mode: SelectionMode,
    pub snap: SnapTo,
    /// A button is held and the extent follows the pointer
    pub dragging: bool,
    /// Something is highlighted
    pub active: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new selection at `point`. `cycle` advances the snap
    /// granularity from the previous selection, otherwise it resets to
    /// character granularity.
    pub fn start(&mut self, point: Point, cycle: bool) {
        self.snap = if cycle { self.snap.next() } else { SnapTo::Char };
        self.anchor = point;
        self.extent = point;
        self.mode = SelectionMode::Linear;
        self.dragging = true;
        self.active = true;
    }

    /// Move whichever end of the current selection is nearer to `point`.
    /// Without an active selection this behaves like [`Selection::start`].
    pub fn extend(&mut self, point: Point, cycle: bool) {
        if !self.active {
            self.start(point, cycle);
            return;
        }
        if cycle {
            self.snap = self.snap.next();
        }
        let (lo, hi) = self.ordered();
        let anchor = if point <= lo {
            hi
        } else if point >= hi {
            lo
        } else if distance(point, lo) < distance(point, hi) {
            hi
        } else {
            lo
        };
        self.anchor = anchor;
        self.extent = point;
        self.dragging = true;
    }

    /// Follow the pointer while dragging
    pub fn update(&mut self, point: Point) {
        if self.dragging {
            self.extent = point;
        }
    }

    /// End the drag and return the selected text, if any. The highlight
    /// stays until [`Selection::clear`].
    pub fn finish(&mut self, grid: &Grid) -> Option<String> {
        if !self.active {
            return None;
        }
        self.dragging = false;
        let text = self.text(grid);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.dragging = false;
    }

    pub fn toggle_rectangular(&mut self) {
        self.mode = match self.mode {
            SelectionMode::Linear => SelectionMode::Rectangular,
            SelectionMode::Rectangular => SelectionMode::Linear,
        };
    }

    fn ordered(&self) -> (Point, Point) {
        if self.anchor <= self.extent {
            (self.anchor, self.extent)
        } else {
            (self.extent, self.anchor)
        }
    }

    /// Highlighted ranges, one per row, clamped to the grid
    pub fn spans(&self, grid: &Grid) -> Vec<Span> {
        if !self.active {
            return Vec::new();
        }
        let rows = grid.rows();
        let cols = grid.cols();
        let clamp = |p: Point| Point::new(p.col.min(cols - 1), p.row.min(rows - 1));
        let (lo, hi) = self.ordered();
        let (lo, hi) = (clamp(lo), clamp(hi));

        match self.mode {
            SelectionMode::Rectangular => {
                let left = lo.col.min(hi.col);
                let right = lo.col.max(hi.col);
                (lo.row..=hi.row)
                    .map(|row| {
                        let line = grid.line(row);
                        Span {
                            row,
                            start: glyph_start(line, left),
                            end: glyph_end(line, right),
                        }
                    })
                    .collect()
            }
            SelectionMode::Linear => {
                let (start_col, end_col) = match self.snap {
                    SnapTo::Char => (
                        glyph_start(grid.line(lo.row), lo.col),
                        glyph_end(grid.line(hi.row), hi.col),
                    ),
                    SnapTo::Word => (
                        word_start(grid.line(lo.row), lo.col),
                        word_end(grid.line(hi.row), hi.col),
                    ),
                    SnapTo::Line => (0, cols),
                };
                (lo.row..=hi.row)
                    .map(|row| Span {
                        row,
                        start: if row == lo.row { start_col } else { 0 },
                        end: if row == hi.row { end_col } else { cols },
                    })
                    .collect()
            }
        }
    }

    /// The highlighted text. Rows are joined with `\n` except where a
    /// linear selection crosses a soft wrap.
    pub fn text(&self, grid: &Grid) -> String {
        let spans = self.spans(grid);
        let mut out = String::new();
        for (i, span) in spans.iter().enumerate() {
            let line = grid.line(span.row);
            out.push_str(&line.text_range(span.start, span.end));
            let last = i + 1 == spans.len();
            let joined = self.mode == SelectionMode::Linear && line.wrapped && span.end == line.cols();
            if !last && !joined {
                out.push('\n');
            }
        }
        out
    }
}

fn distance(a: Point, b: Point) -> (usize, usize) {
    (a.row.abs_diff(b.row), a.col.abs_diff(b.col))
}

/// Step left off a continuation cell onto its glyph
fn glyph_start(line: &Line, col: usize) -> usize {
    match line.get(col) {
        Some(cell) if cell.is_continuation() => col.saturating_sub(1),
        _ => col,
    }
}

/// Exclusive end covering the whole glyph at `col`
fn glyph_end(line: &Line, col: usize) -> usize {
    let end = match line.get(col) {
        Some(cell) if cell.is_wide() => col + 2,
        _ => col + 1,
    };
    end.min(line.cols())
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !"()[]{}<>\"'`,.;:|".contains(c)
}

fn word_char_at(line: &Line, col: usize) -> bool {
    line.get(glyph_start(line, col))
        .map(|cell| is_word_char(cell.display_char()))
        .unwrap_or(false)
}

fn word_start(line: &Line, col: usize) -> usize {
    let mut col = glyph_start(line, col);
    if !word_char_at(line, col) {
        return col;
    }
    while col > 0 && word_char_at(line, col - 1) {
        col = glyph_start(line, col - 1);
    }
    col
}

fn word_end(line: &Line, col: usize) -> usize {
    let mut end = glyph_end(line, col);
    if !word_char_at(line, col) {
        return end;
    }
    while end < line.cols() && word_char_at(line, end) {
        end = glyph_end(line, end);
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dimensions;
    use proptest::prelude::*;

    fn grid_with(rows: &[&str]) -> Grid {
        let cols = rows.iter().map(|r| r.chars().count()).max().unwrap_or(1);
        let mut grid = Grid::new(Dimensions::new(cols, rows.len()));
        for (row, text) in rows.iter().enumerate() {
            for (col, c) in text.chars().enumerate() {
                if let Some(cell) = grid.line_mut(row).get_mut(col) {
                    cell.set_char(c);
                }
            }
        }
        grid
    }

    #[test]
    fn test_selection_new() {
        let sel = Selection::new();
        assert!(!sel.active);
        assert!(sel.spans(&grid_with(&["abc"])).is_empty());
    }

    #[test]
    fn test_selection_single_line() {
        let grid = grid_with(&["hello world"]);
        let mut sel = Selection::new();
        sel.start(Point::new(1, 0), false);
        sel.update(Point::new(3, 0));

        assert_eq!(sel.spans(&grid), vec![Span { row: 0, start: 1, end: 4 }]);
        assert_eq!(sel.finish(&grid), Some("ell".to_string()));
        assert!(!sel.dragging);
        assert!(sel.active);
    }

    #[test]
    fn test_selection_backwards_drag() {
        let grid = grid_with(&["abcdef", "ghijkl"]);
        let mut sel = Selection::new();
        sel.start(Point::new(2, 1), false);
        sel.update(Point::new(4, 0));

        assert_eq!(sel.text(&grid), "ef\nghi");
    }

    #[test]
    fn test_selection_multi_line_spans() {
        let grid = grid_with(&["aaaa", "bbbb", "cccc"]);
        let mut sel = Selection::new();
        sel.start(Point::new(2, 0), false);
        sel.update(Point::new(1, 2));

        let spans = sel.spans(&grid);
        assert_eq!(spans[0], Span { row: 0, start: 2, end: 4 });
        assert_eq!(spans[1], Span { row: 1, start: 0, end: 4 });
        assert_eq!(spans[2], Span { row: 2, start: 0, end: 2 });
    }

    #[test]
    fn test_update_ignored_after_finish() {
        let grid = grid_with(&["abcdef"]);
        let mut sel = Selection::new();
        sel.start(Point::new(0, 0), false);
        sel.finish(&grid);
        sel.update(Point::new(5, 0));
        assert_eq!(sel.extent, Point::new(0, 0));
    }

    #[test]
    fn test_word_snap() {
        let grid = grid_with(&["foo bar(baz) qux"]);
        let mut sel = Selection::new();
        sel.start(Point::new(9, 0), false);
        sel.start(Point::new(9, 0), true);
        assert_eq!(sel.snap, SnapTo::Word);
        assert_eq!(sel.text(&grid), "baz");
    }

    #[test]
    fn test_snap_cycles_back_to_char() {
        let mut sel = Selection::new();
        let p = Point::new(0, 0);
        sel.start(p, false);
        sel.start(p, true);
        sel.start(p, true);
        assert_eq!(sel.snap, SnapTo::Line);
        sel.start(p, true);
        assert_eq!(sel.snap, SnapTo::Char);
    }

    #[test]
    fn test_line_snap() {
        let grid = grid_with(&["first", "second", "third"]);
        let mut sel = Selection::new();
        sel.snap = SnapTo::Word;
        sel.start(Point::new(2, 1), true);
        assert_eq!(sel.text(&grid), "second");
    }

    #[test]
    fn test_rectangular() {
        let grid = grid_with(&["abcdef", "ghijkl", "mnopqr"]);
        let mut sel = Selection::new();
        sel.start(Point::new(1, 0), false);
        sel.toggle_rectangular();
        sel.update(Point::new(3, 2));
        assert_eq!(sel.text(&grid), "bcd\nhij\nnop");
    }

    #[test]
    fn test_soft_wrap_joins() {
        let mut grid = grid_with(&["abcd", "ef"]);
        grid.line_mut(0).wrapped = true;
        let mut sel = Selection::new();
        sel.start(Point::new(2, 0), false);
        sel.update(Point::new(1, 1));
        assert_eq!(sel.text(&grid), "cdef");
    }

    #[test]
    fn test_extend_moves_nearer_end() {
        let mut sel = Selection::new();
        sel.start(Point::new(10, 5), false);
        sel.update(Point::new(20, 5));
        sel.finish(&grid_with(&["x"]));

        sel.extend(Point::new(12, 5), false);
        assert_eq!(sel.anchor, Point::new(20, 5));
        assert_eq!(sel.extent, Point::new(12, 5));

        sel.extend(Point::new(30, 5), false);
        assert_eq!(sel.anchor, Point::new(12, 5));
    }

    #[test]
    fn test_wide_glyph_included_whole() {
        let mut grid = Grid::new(Dimensions::new(4, 1));
        if let Some(cell) = grid.line_mut(0).get_mut(1) {
            cell.set_char('中');
        }
        if let Some(cell) = grid.line_mut(0).get_mut(2) {
            cell.set_continuation(Default::default());
        }
        let mut sel = Selection::new();
        sel.start(Point::new(2, 0), false);
        assert_eq!(sel.spans(&grid), vec![Span { row: 0, start: 1, end: 3 }]);
        assert_eq!(sel.text(&grid), "中");
    }

    #[test]
    fn test_clear() {
        let grid = grid_with(&["abc"]);
        let mut sel = Selection::new();
        sel.start(Point::new(0, 0), false);
        sel.clear();
        assert!(sel.spans(&grid).is_empty());
        assert_eq!(sel.finish(&grid), None);
    }

    proptest! {
        #[test]
        fn prop_extend_covers_both_points(
            c0 in 0usize..20, r0 in 0usize..8,
            c1 in 0usize..20, r1 in 0usize..8,
            rect in any::<bool>(),
        ) {
            let grid = Grid::new(Dimensions::new(20, 8));
            let mut sel = Selection::new();
            sel.start(Point::new(c0, r0), false);
            if rect {
                sel.toggle_rectangular();
            }
            sel.extend(Point::new(c1, r1), false);
            let spans = sel.spans(&grid);
            prop_assert!(spans.iter().any(|s| s.contains(c0, r0)));
            prop_assert!(spans.iter().any(|s| s.contains(c1, r1)));
        }
    }
}

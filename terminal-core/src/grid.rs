//! The visible screen area: a fixed rows x cols array of lines

use serde::{Deserialize, Serialize};

use crate::cell::CellAttributes;
use crate::line::Line;
use crate::Dimensions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    lines: Vec<Line>,
    cols: usize,
}

impl Grid {
    /// Create a blank grid; zero dimensions are raised to 1
    pub fn new(dims: Dimensions) -> Self {
        let dims = dims.at_least_one();
        Self {
            lines: (0..dims.rows).map(|_| Line::new(dims.cols)).collect(),
            cols: dims.cols,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.cols, self.lines.len())
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, row: usize) -> &Line {
        &self.lines[row]
    }

    pub fn line_mut(&mut self, row: usize) -> &mut Line {
        &mut self.lines[row]
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn clear(&mut self, attrs: CellAttributes) {
        for line in &mut self.lines {
            line.clear(attrs);
        }
    }

    /// ED 0: from (row, col) to the end of the screen
    pub fn clear_below(&mut self, row: usize, col: usize, attrs: CellAttributes) {
        if let Some(line) = self.lines.get_mut(row) {
            line.clear_from(col, attrs);
        }
        for line in self.lines.iter_mut().skip(row + 1) {
            line.clear(attrs);
        }
    }

    /// ED 1: from the top of the screen to (row, col) inclusive
    pub fn clear_above(&mut self, row: usize, col: usize, attrs: CellAttributes) {
        for line in self.lines.iter_mut().take(row) {
            line.clear(attrs);
        }
        if let Some(line) = self.lines.get_mut(row) {
            line.clear_to(col, attrs);
        }
    }

    fn region_ok(&self, top: usize, bottom: usize) -> bool {
        top <= bottom && bottom < self.lines.len()
    }

    /// Scroll `top..=bottom` up by `n`; the evicted lines are returned
    /// oldest first so the caller can push them into scrollback
    pub fn scroll_up(&mut self, top: usize, bottom: usize, n: usize, attrs: CellAttributes) -> Vec<Line> {
        if !self.region_ok(top, bottom) || n == 0 {
            return Vec::new();
        }
        let n = n.min(bottom - top + 1);
        let blank = Line::with_attrs(self.cols, attrs);
        let evicted: Vec<Line> = self.lines[top..=bottom].iter().take(n).cloned().collect();
        self.lines[top..=bottom].rotate_left(n);
        for line in &mut self.lines[bottom + 1 - n..=bottom] {
            *line = blank.clone();
        }
        evicted
    }

    /// Scroll `top..=bottom` down by `n`, blank lines enter at `top`
    pub fn scroll_down(&mut self, top: usize, bottom: usize, n: usize, attrs: CellAttributes) {
        if !self.region_ok(top, bottom) || n == 0 {
            return;
        }
        let n = n.min(bottom - top + 1);
        let blank = Line::with_attrs(self.cols, attrs);
        self.lines[top..=bottom].rotate_right(n);
        for line in &mut self.lines[top..top + n] {
            *line = blank.clone();
        }
    }

    /// IL: insert at `row`, lines pushed past `bottom` are lost
    pub fn insert_lines(&mut self, row: usize, n: usize, bottom: usize, attrs: CellAttributes) {
        self.scroll_down(row, bottom, n, attrs);
    }

    /// DL: delete at `row`, blanks enter at `bottom`
    pub fn delete_lines(&mut self, row: usize, n: usize, bottom: usize, attrs: CellAttributes) {
        let _ = self.scroll_up(row, bottom, n, attrs);
    }

    /// Truncate or pad both axes. Shrinking drops the bottom rows and
    /// right columns; they cannot be recovered by growing again.
    pub fn resize(&mut self, dims: Dimensions, attrs: CellAttributes) {
        let dims = dims.at_least_one();
        for line in &mut self.lines {
            line.resize(dims.cols, attrs);
        }
        self.lines.resize_with(dims.rows, || Line::with_attrs(dims.cols, attrs));
        self.cols = dims.cols;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lettered(rows: usize) -> Grid {
        let mut grid = Grid::new(Dimensions::new(10, rows));
        for row in 0..rows {
            if let Some(cell) = grid.line_mut(row).get_mut(0) {
                cell.set_char((b'A' + row as u8) as char);
            }
        }
        grid
    }

    fn column(grid: &Grid) -> String {
        grid.iter()
            .map(|l| l.get(0).map(|c| c.display_char()).unwrap_or('?'))
            .collect()
    }

    #[test]
    fn test_grid_new() {
        let grid = Grid::new(Dimensions::new(80, 24));
        assert_eq!(grid.cols(), 80);
        assert_eq!(grid.rows(), 24);
    }

    #[test]
    fn test_grid_zero_size_clamped() {
        let grid = Grid::new(Dimensions::new(0, 0));
        assert_eq!(grid.dimensions(), Dimensions::new(1, 1));
    }

    #[test]
    fn test_grid_scroll_up() {
        let mut grid = lettered(5);
        let evicted = grid.scroll_up(0, 4, 2, CellAttributes::default());
        assert_eq!(column(&grid), "CDE  ");
        assert_eq!(evicted.len(), 2);
        assert_eq!(evicted[0].text(), "A");
    }

    #[test]
    fn test_grid_scroll_region() {
        let mut grid = lettered(5);
        grid.scroll_up(1, 3, 1, CellAttributes::default());
        assert_eq!(column(&grid), "ACD E");
        grid.scroll_down(1, 3, 1, CellAttributes::default());
        assert_eq!(column(&grid), "A CDE");
    }

    #[test]
    fn test_insert_delete_lines() {
        let mut grid = lettered(5);
        grid.insert_lines(1, 2, 4, CellAttributes::default());
        assert_eq!(column(&grid), "A  BC");
        grid.delete_lines(0, 1, 4, CellAttributes::default());
        assert_eq!(column(&grid), "  BC ");
    }

    #[test]
    fn test_invalid_region_is_noop() {
        let mut grid = lettered(3);
        assert!(grid.scroll_up(2, 1, 1, CellAttributes::default()).is_empty());
        grid.scroll_down(0, 9, 1, CellAttributes::default());
        assert_eq!(column(&grid), "ABC");
    }

    #[test]
    fn test_resize() {
        let mut grid = lettered(5);
        grid.resize(Dimensions::new(4, 2), CellAttributes::default());
        assert_eq!(grid.dimensions(), Dimensions::new(4, 2));
        grid.resize(Dimensions::new(12, 6), CellAttributes::default());
        assert_eq!(grid.dimensions(), Dimensions::new(12, 6));
        assert_eq!(column(&grid), "AB    ");
        assert!(grid.iter().all(|l| l.cols() == 12));
    }
}

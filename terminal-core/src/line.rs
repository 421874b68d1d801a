//! A row of cells

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellAttributes};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    cells: Vec<Cell>,
    /// Soft-wrapped into the following line
    pub wrapped: bool,
}

impl Line {
    pub fn new(cols: usize) -> Self {
        Self::with_attrs(cols, CellAttributes::default())
    }

    pub fn with_attrs(cols: usize, attrs: CellAttributes) -> Self {
        Self {
            cells: vec![Cell::blank(attrs); cols],
            wrapped: false,
        }
    }

    pub fn cols(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    pub fn get_mut(&mut self, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(col)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn clear(&mut self, attrs: CellAttributes) {
        self.erase(0, self.cells.len(), attrs);
        self.wrapped = false;
    }

    /// Erase `col..` inclusive of `col`
    pub fn clear_from(&mut self, col: usize, attrs: CellAttributes) {
        self.erase(col, self.cells.len(), attrs);
        self.wrapped = false;
    }

    /// Erase `..=col`
    pub fn clear_to(&mut self, col: usize, attrs: CellAttributes) {
        self.erase(0, col.saturating_add(1), attrs);
    }

    /// Blank `n` cells starting at `col` without shifting (ECH)
    pub fn erase(&mut self, col: usize, n: usize, attrs: CellAttributes) {
        let end = col.saturating_add(n).min(self.cells.len());
        if col >= end {
            return;
        }
        for cell in &mut self.cells[col..end] {
            cell.clear(attrs);
        }
        self.repair_wide_edges(col, end, attrs);
    }

    /// Truncate or pad to `cols`
    pub fn resize(&mut self, cols: usize, attrs: CellAttributes) {
        self.cells.resize(cols, Cell::blank(attrs));
        if let Some(last) = self.cells.last_mut() {
            // a wide glyph cut in half by the new right edge
            if last.is_wide() {
                last.clear(attrs);
            }
        }
    }

    /// Insert `n` blanks at `col`, pushing cells off the right edge (ICH)
    pub fn insert_cells(&mut self, col: usize, n: usize, attrs: CellAttributes) {
        let len = self.cells.len();
        if col >= len {
            return;
        }
        let n = n.min(len - col);
        self.cells[col..].rotate_right(n);
        for cell in &mut self.cells[col..col + n] {
            cell.clear(attrs);
        }
        self.repair_wide_edges(col, len, attrs);
    }

    /// Delete `n` cells at `col`, pulling blanks in from the right (DCH)
    pub fn delete_cells(&mut self, col: usize, n: usize, attrs: CellAttributes) {
        let len = self.cells.len();
        if col >= len {
            return;
        }
        let n = n.min(len - col);
        self.cells[col..].rotate_left(n);
        for cell in &mut self.cells[len - n..] {
            cell.clear(attrs);
        }
        self.repair_wide_edges(col, len, attrs);
    }

    /// Blank half-glyphs left dangling at the boundaries of `start..end`
    fn repair_wide_edges(&mut self, start: usize, end: usize, attrs: CellAttributes) {
        if start > 0 && self.cells[start - 1].is_wide() && !self.cells[start].is_continuation() {
            self.cells[start - 1].clear(attrs);
        }
        if start < self.cells.len() && self.cells[start].is_continuation() {
            self.cells[start].clear(attrs);
        }
        if end < self.cells.len() && self.cells[end].is_continuation() {
            self.cells[end].clear(attrs);
        }
        if end > 0 && end <= self.cells.len() && self.cells[end - 1].is_wide() {
            let next_is_half = end < self.cells.len() && self.cells[end].is_continuation();
            if !next_is_half {
                self.cells[end - 1].clear(attrs);
            }
        }
    }

    /// Text of `start..end`, continuation cells skipped, trailing blanks trimmed
    pub fn text_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.cells.len());
        if start >= end {
            return String::new();
        }
        let text: String = self.cells[start..end]
            .iter()
            .filter(|c| !c.is_continuation())
            .map(Cell::display_char)
            .collect();
        text.trim_end().to_string()
    }

    pub fn text(&self) -> String {
        self.text_range(0, self.cells.len())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }
}

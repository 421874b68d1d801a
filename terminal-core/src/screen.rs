//! Terminal screen - the state the engine mutates
//!
//! The Screen ties together the primary and alternate grids, the cursor,
//! scrollback, modes, tab stops, and selection. Every public mutator leaves
//! the cursor inside the grid.

use crate::cell::{char_width, Cell, CellAttributes};
use crate::cursor::{Cursor, SavedCursor};
use crate::frame::{Frame, FrameCursor};
use crate::grid::Grid;
use crate::line::Line;
use crate::modes::Modes;
use crate::scrollback::{Scrollback, DEFAULT_SCROLLBACK_SIZE};
use crate::selection::{Point, Selection};
use crate::Dimensions;

/// Tab stop interval (default)
const DEFAULT_TAB_WIDTH: usize = 8;

#[derive(Debug, Clone)]
pub struct Screen {
    primary_grid: Grid,
    alternate_grid: Grid,
    using_alternate: bool,
    /// Primary screen only
    scrollback: Scrollback,
    cursor: Cursor,
    saved_cursor_primary: SavedCursor,
    saved_cursor_alternate: SavedCursor,
    modes: Modes,
    /// (top, bottom), 0-indexed inclusive; None is the full screen
    scroll_region: Option<(usize, usize)>,
    tab_stops: Vec<bool>,
    selection: Selection,
}

fn default_tab_stops(cols: usize) -> Vec<bool> {
    (0..cols).map(|c| c % DEFAULT_TAB_WIDTH == 0).collect()
}

impl Screen {
    pub fn new(dims: Dimensions) -> Self {
        Self::with_scrollback(dims, DEFAULT_SCROLLBACK_SIZE)
    }

    pub fn with_scrollback(dims: Dimensions, scrollback_lines: usize) -> Self {
        let dims = dims.at_least_one();
        Self {
            primary_grid: Grid::new(dims),
            alternate_grid: Grid::new(dims),
            using_alternate: false,
            scrollback: Scrollback::new(scrollback_lines),
            cursor: Cursor::new(),
            saved_cursor_primary: SavedCursor::default(),
            saved_cursor_alternate: SavedCursor::default(),
            modes: Modes::new(),
            scroll_region: None,
            tab_stops: default_tab_stops(dims.cols),
            selection: Selection::new(),
        }
    }

    /// The grid currently shown (primary or alternate)
    pub fn grid(&self) -> &Grid {
        if self.using_alternate {
            &self.alternate_grid
        } else {
            &self.primary_grid
        }
    }

    fn grid_mut(&mut self) -> &mut Grid {
        if self.using_alternate {
            &mut self.alternate_grid
        } else {
            &mut self.primary_grid
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.grid().dimensions()
    }

    pub fn cols(&self) -> usize {
        self.grid().cols()
    }

    pub fn rows(&self) -> usize {
        self.grid().rows()
    }

    pub fn line(&self, row: usize) -> &Line {
        self.grid().line(row)
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    pub fn modes_mut(&mut self) -> &mut Modes {
        &mut self.modes
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    pub fn is_alternate(&self) -> bool {
        self.using_alternate
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Finish the current drag against the visible grid
    pub fn finish_selection(&mut self) -> Option<String> {
        let grid = if self.using_alternate {
            &self.alternate_grid
        } else {
            &self.primary_grid
        };
        self.selection.finish(grid)
    }

    /// Clamp a point into the visible grid
    pub fn clamp_point(&self, col: usize, row: usize) -> Point {
        Point::new(col.min(self.cols() - 1), row.min(self.rows() - 1))
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        self.scroll_region.unwrap_or((0, self.rows() - 1))
    }

    /// DECSTBM with 1-indexed bounds; 0 selects the default edge
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let rows = self.rows();
        let top = top.max(1) - 1;
        let bottom = match bottom {
            0 => rows - 1,
            b => b.min(rows) - 1,
        };

        if top < bottom {
            self.scroll_region = if top == 0 && bottom == rows - 1 {
                None
            } else {
                Some((top, bottom))
            };
            self.move_cursor_to(1, 1);
        } else {
            log::debug!("Ignoring degenerate scroll region {}..{}", top, bottom);
        }
    }

    fn pen_blank(&self) -> CellAttributes {
        self.cursor.attrs.blank()
    }

    /// Print a character at the cursor, honoring pending wrap, insert
    /// mode and double-width glyphs
    pub fn print(&mut self, c: char) {
        let width = char_width(c);
        if width == 0 {
            // combining marks are not composed
            return;
        }
        let cols = self.cols();

        if self.cursor.pending_wrap && self.modes.auto_wrap {
            self.wrap_line();
        }
        if width == 2 && self.cursor.col + 1 >= cols {
            if cols < 2 {
                return;
            }
            if self.modes.auto_wrap {
                self.wrap_line();
            } else {
                self.cursor.col = cols - 2;
            }
        }

        let row = self.cursor.row;
        let col = self.cursor.col;
        let attrs = self.cursor.attrs;
        let blank = self.pen_blank();
        let insert = self.modes.insert_mode;
        let line = self.grid_mut().line_mut(row);
        if insert {
            line.insert_cells(col, width, blank);
        }
        line.erase(col, width, blank);
        if let Some(cell) = line.get_mut(col) {
            *cell = Cell::with_char(c, attrs);
        }
        if width == 2 {
            if let Some(cell) = line.get_mut(col + 1) {
                cell.set_continuation(attrs);
            }
        }

        let next = col + width;
        if next >= cols {
            self.cursor.col = cols - 1;
            self.cursor.pending_wrap = self.modes.auto_wrap;
        } else {
            self.cursor.col = next;
            self.cursor.pending_wrap = false;
        }
    }

    fn wrap_line(&mut self) {
        let row = self.cursor.row;
        self.grid_mut().line_mut(row).wrapped = true;
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
        self.index();
    }

    /// BS
    pub fn backspace(&mut self) {
        self.cursor.col = self.cursor.col.saturating_sub(1);
        self.cursor.pending_wrap = false;
    }

    /// HT / CHT: advance to the n-th next tab stop
    pub fn tab(&mut self, n: usize) {
        let last = self.cols() - 1;
        for _ in 0..n.max(1) {
            let mut col = self.cursor.col + 1;
            while col < last && !self.tab_stops.get(col).copied().unwrap_or(false) {
                col += 1;
            }
            self.cursor.col = col.min(last);
        }
        self.cursor.pending_wrap = false;
    }

    /// CBT: back to the n-th previous tab stop
    pub fn back_tab(&mut self, n: usize) {
        for _ in 0..n.max(1) {
            let mut col = self.cursor.col.saturating_sub(1);
            while col > 0 && !self.tab_stops.get(col).copied().unwrap_or(false) {
                col -= 1;
            }
            self.cursor.col = col;
        }
        self.cursor.pending_wrap = false;
    }

    /// CR
    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    /// LF, VT, FF
    pub fn linefeed(&mut self) {
        self.index();
        if self.modes.linefeed_mode {
            self.cursor.col = 0;
        }
    }

    /// IND: down one row, scrolling at the bottom margin
    pub fn index(&mut self) {
        let (_, bottom) = self.scroll_region();
        if self.cursor.row == bottom {
            self.scroll_up(1);
        } else if self.cursor.row + 1 < self.rows() {
            self.cursor.row += 1;
        }
        self.cursor.pending_wrap = false;
    }

    /// RI: up one row, scrolling at the top margin
    pub fn reverse_index(&mut self) {
        let (top, _) = self.scroll_region();
        if self.cursor.row == top {
            self.scroll_down(1);
        } else {
            self.cursor.row = self.cursor.row.saturating_sub(1);
        }
        self.cursor.pending_wrap = false;
    }

    /// NEL
    pub fn next_line(&mut self) {
        self.index();
        self.cursor.col = 0;
    }

    /// SU, and scrolling caused by output; lines leaving the top of the
    /// primary screen go to scrollback
    pub fn scroll_up(&mut self, n: usize) {
        let (top, bottom) = self.scroll_region();
        let blank = self.pen_blank();
        let evicted = self.grid_mut().scroll_up(top, bottom, n, blank);
        if !self.using_alternate && top == 0 {
            self.scrollback.push_lines(evicted);
        }
    }

    /// SD
    pub fn scroll_down(&mut self, n: usize) {
        let (top, bottom) = self.scroll_region();
        let blank = self.pen_blank();
        self.grid_mut().scroll_down(top, bottom, n, blank);
    }

    fn row_bounds(&self) -> (usize, usize) {
        if self.modes.origin_mode {
            self.scroll_region()
        } else {
            (0, self.rows() - 1)
        }
    }

    /// CUP / HVP, 1-indexed; relative to the scroll region in origin mode
    pub fn move_cursor_to(&mut self, row: usize, col: usize) {
        let (top, bottom) = self.row_bounds();
        self.cursor.row = (top + row.max(1) - 1).min(bottom);
        self.cursor.col = (col.max(1) - 1).min(self.cols() - 1);
        self.cursor.pending_wrap = false;
    }

    /// CUU; stops at the top margin when starting inside the region
    pub fn move_cursor_up(&mut self, n: usize) {
        let (top, _) = self.scroll_region();
        let floor = if self.cursor.row >= top { top } else { 0 };
        self.cursor.row = self.cursor.row.saturating_sub(n.max(1)).max(floor);
        self.cursor.pending_wrap = false;
    }

    /// CUD; stops at the bottom margin when starting inside the region
    pub fn move_cursor_down(&mut self, n: usize) {
        let (_, bottom) = self.scroll_region();
        let ceiling = if self.cursor.row <= bottom { bottom } else { self.rows() - 1 };
        self.cursor.row = self.cursor.row.saturating_add(n.max(1)).min(ceiling);
        self.cursor.pending_wrap = false;
    }

    /// CUB
    pub fn move_cursor_left(&mut self, n: usize) {
        self.cursor.col = self.cursor.col.saturating_sub(n.max(1));
        self.cursor.pending_wrap = false;
    }

    /// CUF
    pub fn move_cursor_right(&mut self, n: usize) {
        self.cursor.col = self.cursor.col.saturating_add(n.max(1)).min(self.cols() - 1);
        self.cursor.pending_wrap = false;
    }

    /// CHA / HPA, 1-indexed
    pub fn set_cursor_col(&mut self, col: usize) {
        self.cursor.col = (col.max(1) - 1).min(self.cols() - 1);
        self.cursor.pending_wrap = false;
    }

    /// VPA, 1-indexed
    pub fn set_cursor_row(&mut self, row: usize) {
        let (top, bottom) = self.row_bounds();
        self.cursor.row = (top + row.max(1) - 1).min(bottom);
        self.cursor.pending_wrap = false;
    }

    /// DECSC
    pub fn save_cursor(&mut self) {
        let saved = SavedCursor::save(&self.cursor, self.modes.origin_mode);
        if self.using_alternate {
            self.saved_cursor_alternate = saved;
        } else {
            self.saved_cursor_primary = saved;
        }
    }

    /// DECRC
    pub fn restore_cursor(&mut self) {
        let saved = if self.using_alternate {
            &self.saved_cursor_alternate
        } else {
            &self.saved_cursor_primary
        };
        self.modes.origin_mode = saved.restore(&mut self.cursor);
        let (cols, rows) = (self.cols(), self.rows());
        self.cursor.clamp(cols, rows);
    }

    /// ED
    pub fn erase_display(&mut self, mode: u16) {
        let blank = self.pen_blank();
        let (row, col) = (self.cursor.row, self.cursor.col);
        match mode {
            0 => self.grid_mut().clear_below(row, col, blank),
            1 => self.grid_mut().clear_above(row, col, blank),
            2 => self.grid_mut().clear(blank),
            3 => self.scrollback.clear(),
            _ => log::debug!("Unknown ED mode {}", mode),
        }
    }

    /// EL
    pub fn erase_line(&mut self, mode: u16) {
        let blank = self.pen_blank();
        let (row, col) = (self.cursor.row, self.cursor.col);
        let line = self.grid_mut().line_mut(row);
        match mode {
            0 => line.clear_from(col, blank),
            1 => line.clear_to(col, blank),
            2 => line.clear(blank),
            _ => log::debug!("Unknown EL mode {}", mode),
        }
    }

    /// ECH
    pub fn erase_chars(&mut self, n: usize) {
        let blank = self.pen_blank();
        let (row, col) = (self.cursor.row, self.cursor.col);
        self.grid_mut().line_mut(row).erase(col, n.max(1), blank);
    }

    /// IL; no effect outside the scroll region
    pub fn insert_lines(&mut self, n: usize) {
        let (top, bottom) = self.scroll_region();
        let row = self.cursor.row;
        if row < top || row > bottom {
            return;
        }
        let blank = self.pen_blank();
        self.grid_mut().insert_lines(row, n.max(1), bottom, blank);
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    /// DL; no effect outside the scroll region
    pub fn delete_lines(&mut self, n: usize) {
        let (top, bottom) = self.scroll_region();
        let row = self.cursor.row;
        if row < top || row > bottom {
            return;
        }
        let blank = self.pen_blank();
        self.grid_mut().delete_lines(row, n.max(1), bottom, blank);
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    /// ICH
    pub fn insert_chars(&mut self, n: usize) {
        let blank = self.pen_blank();
        let (row, col) = (self.cursor.row, self.cursor.col);
        self.grid_mut().line_mut(row).insert_cells(col, n.max(1), blank);
        self.cursor.pending_wrap = false;
    }

    /// DCH
    pub fn delete_chars(&mut self, n: usize) {
        let blank = self.pen_blank();
        let (row, col) = (self.cursor.row, self.cursor.col);
        self.grid_mut().line_mut(row).delete_cells(col, n.max(1), blank);
        self.cursor.pending_wrap = false;
    }

    /// HTS
    pub fn set_tab_stop(&mut self) {
        if let Some(stop) = self.tab_stops.get_mut(self.cursor.col) {
            *stop = true;
        }
    }

    /// TBC: 0 clears the stop at the cursor, 3 clears all
    pub fn clear_tab_stop(&mut self, mode: u16) {
        match mode {
            0 => {
                if let Some(stop) = self.tab_stops.get_mut(self.cursor.col) {
                    *stop = false;
                }
            }
            3 => self.tab_stops.iter_mut().for_each(|s| *s = false),
            _ => {}
        }
    }

    /// Switch grids. `clear` blanks the alternate grid on entry.
    pub fn enter_alternate_screen(&mut self, clear: bool) {
        if !self.using_alternate {
            self.using_alternate = true;
            self.modes.alternate_screen = true;
            self.selection.clear();
        }
        if clear {
            self.alternate_grid.clear(CellAttributes::default());
        }
    }

    pub fn exit_alternate_screen(&mut self) {
        if self.using_alternate {
            self.using_alternate = false;
            self.modes.alternate_screen = false;
            self.selection.clear();
            let (cols, rows) = (self.cols(), self.rows());
            self.cursor.clamp(cols, rows);
        }
    }

    /// DECSET / DECRST. Handles screen switching itself and delegates the
    /// plain flags to [`Modes`]. Returns false for unknown modes.
    pub fn set_private_mode(&mut self, mode: u16, value: bool) -> bool {
        match (mode, value) {
            (47, true) => self.enter_alternate_screen(false),
            (1047, true) => self.enter_alternate_screen(true),
            (47, false) | (1047, false) => self.exit_alternate_screen(),
            (1048, true) => self.save_cursor(),
            (1048, false) => self.restore_cursor(),
            (1049, true) => {
                self.save_cursor();
                self.enter_alternate_screen(true);
                self.move_cursor_to(1, 1);
            }
            (1049, false) => {
                self.exit_alternate_screen();
                self.restore_cursor();
            }
            (6, _) => {
                self.modes.origin_mode = value;
                self.move_cursor_to(1, 1);
            }
            _ => return self.modes.set_dec_mode(mode, value),
        }
        true
    }

    /// Resize both grids. New cells are default blanks, the cursor is
    /// clamped, the scroll region reset, and any selection dropped.
    pub fn resize(&mut self, dims: Dimensions) {
        let dims = dims.at_least_one();

        self.primary_grid.resize(dims, CellAttributes::default());
        self.alternate_grid.resize(dims, CellAttributes::default());
        self.tab_stops = default_tab_stops(dims.cols);
        self.cursor.clamp(dims.cols, dims.rows);
        self.cursor.pending_wrap = false;
        self.scroll_region = None;
        self.selection.clear();
    }

    /// RIS: everything except dimensions and scrollback capacity
    pub fn reset(&mut self) {
        let dims = self.dimensions();
        let capacity = self.scrollback.max_lines();
        *self = Self::with_scrollback(dims, capacity);
    }

    /// Capture an immutable snapshot of the visible state
    pub fn frame(&self, seq: u64, has_focus: bool) -> Frame {
        let grid = self.grid();
        Frame::new(
            seq,
            grid.dimensions(),
            grid.lines().to_vec(),
            FrameCursor {
                col: self.cursor.col,
                row: self.cursor.row,
                visible: self.modes.cursor_visible,
                shape: self.cursor.shape,
                blinking: self.cursor.blinking && self.modes.cursor_blink,
            },
            has_focus,
            self.selection.spans(grid),
        )
    }
}

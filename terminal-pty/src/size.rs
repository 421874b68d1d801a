//! Window geometry reported to the child through TIOCSWINSZ

/// Grid size in cells plus the drawable area it covers in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub cols: u16,
    pub rows: u16,
    /// Pixel extent of the text area; 0 when unknown
    pub pixel_width: u16,
    pub pixel_height: u16,
}

impl WindowSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self::with_pixels(cols, rows, 0, 0)
    }

    pub fn with_pixels(cols: u16, rows: u16, pixel_width: u16, pixel_height: u16) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
            pixel_width,
            pixel_height,
        }
    }

    pub(crate) fn to_winsize(self) -> libc::winsize {
        libc::winsize {
            ws_row: self.rows,
            ws_col: self.cols,
            ws_xpixel: self.pixel_width,
            ws_ypixel: self.pixel_height,
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl From<libc::winsize> for WindowSize {
    fn from(ws: libc::winsize) -> Self {
        Self {
            cols: ws.ws_col,
            rows: ws.ws_row,
            pixel_width: ws.ws_xpixel,
            pixel_height: ws.ws_ypixel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size_default() {
        assert_eq!(WindowSize::default(), WindowSize::new(80, 24));
    }

    #[test]
    fn test_window_size_never_zero() {
        let size = WindowSize::with_pixels(0, 0, 10, 10);
        assert_eq!((size.cols, size.rows), (1, 1));
        assert_eq!(size.pixel_width, 10);
    }

    #[test]
    fn test_winsize_conversion() {
        let ws = WindowSize::with_pixels(132, 43, 1056, 688).to_winsize();
        assert_eq!((ws.ws_col, ws.ws_row, ws.ws_xpixel, ws.ws_ypixel), (132, 43, 1056, 688));
        assert_eq!(WindowSize::from(ws), WindowSize::with_pixels(132, 43, 1056, 688));
    }
}

//! Software presentation context
//!
//! Paints frames into a CPU pixel buffer with fontdue glyphs and pushes it
//! to the window through softbuffer. Everything in here lives on the render
//! thread.

use std::num::NonZeroU32;
use std::sync::Arc;

use softbuffer::{Context, Surface};
use terminal_core::{Attr, CellAttributes, CursorShape, Frame, Rgb};
use winit::window::Window;

use crate::font::{CellMetrics, FontSet, Glyph};
use crate::renderer::{Presenter, RenderError};

/// Default colors plus the options that affect color resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub fg: Rgb,
    pub bg: Rgb,
    pub bold_as_bright: bool,
}

impl Palette {
    pub fn new(fg: Rgb, bg: Rgb, reverse_video: bool, bold_as_bright: bool) -> Self {
        let (fg, bg) = if reverse_video { (bg, fg) } else { (fg, bg) };
        Self { fg, bg, bold_as_bright }
    }

    /// Foreground and background for a cell
    pub fn cell_colors(&self, attrs: &CellAttributes, selected: bool) -> (Rgb, Rgb) {
        let mut fg_color = attrs.fg;
        if self.bold_as_bright && attrs.has(Attr::BOLD) {
            fg_color = fg_color.brightened();
        }
        let mut fg = fg_color.resolve(self.fg);
        let mut bg = attrs.bg.resolve(self.bg);
        if attrs.has(Attr::FAINT) {
            fg = fg.blend(bg, 96);
        }
        if attrs.has(Attr::INVERSE) != selected {
            std::mem::swap(&mut fg, &mut bg);
        }
        if attrs.has(Attr::HIDDEN) {
            fg = bg;
        }
        (fg, bg)
    }
}

/// A 0x00RRGGBB pixel buffer
#[derive(Debug, Default)]
pub struct Canvas {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

impl Canvas {
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.resize(width as usize * height as usize, 0);
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color.to_u32());
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        let x0 = x.clamp(0, self.width as i32);
        let y0 = y.clamp(0, self.height as i32);
        let x1 = (x + w).clamp(0, self.width as i32);
        let y1 = (y + h).clamp(0, self.height as i32);
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let pixel = color.to_u32();
        for py in y0..y1 {
            let row = (py as u32 * self.width) as usize;
            self.pixels[row + x0 as usize..row + x1 as usize].fill(pixel);
        }
    }

    /// Hollow rectangle, `thickness` pixels wide
    pub fn outline(&mut self, x: i32, y: i32, w: i32, h: i32, thickness: i32, color: Rgb) {
        self.fill_rect(x, y, w, thickness, color);
        self.fill_rect(x, y + h - thickness, w, thickness, color);
        self.fill_rect(x, y, thickness, h, color);
        self.fill_rect(x + w - thickness, y, thickness, h, color);
    }

    /// Blend a coverage bitmap onto the buffer with its baseline at
    /// `y + baseline`
    pub fn draw_glyph(&mut self, x: i32, y: i32, baseline: i32, glyph: &Glyph, color: Rgb) {
        if glyph.width == 0 || glyph.height == 0 {
            return;
        }
        let gx = x + glyph.xmin;
        let gy = y + baseline - glyph.ymin - glyph.height as i32;

        for dy in 0..glyph.height {
            let py = gy + dy as i32;
            if py < 0 || py >= self.height as i32 {
                continue;
            }
            for dx in 0..glyph.width {
                let px = gx + dx as i32;
                if px < 0 || px >= self.width as i32 {
                    continue;
                }
                let alpha = glyph.bitmap[dy * glyph.width + dx];
                if alpha == 0 {
                    continue;
                }
                let idx = (py as u32 * self.width + px as u32) as usize;
                let existing = self.pixels[idx];
                let under = Rgb((existing >> 16) as u8, (existing >> 8) as u8, existing as u8);
                self.pixels[idx] = under.blend(color, alpha).to_u32();
            }
        }
    }
}

/// Paint `frame` onto `canvas`. `glyph` looks up a rasterized glyph for a
/// character and bold flag.
pub fn paint<G>(canvas: &mut Canvas, frame: &Frame, palette: &Palette, metrics: CellMetrics, border: u32, mut glyph: G)
where
    G: FnMut(&mut Canvas, char, bool, i32, i32, Rgb),
{
    canvas.fill(palette.bg);

    let cw = metrics.width as i32;
    let ch = metrics.height as i32;
    let border = border as i32;
    let cursor = frame.cursor();

    for (row, line) in frame.lines().iter().enumerate() {
        let y = border + row as i32 * ch;
        for (col, cell) in line.iter().enumerate() {
            if cell.is_continuation() {
                continue;
            }
            let x = border + col as i32 * cw;
            let width = if cell.is_wide() { 2 * cw } else { cw };
            let selected = frame.is_selected(col, row);
            let (mut fg, mut bg) = palette.cell_colors(&cell.attrs, selected);

            let at_cursor = cursor.visible && cursor.col == col && cursor.row == row;
            let solid_block = at_cursor && frame.has_focus() && cursor.shape == CursorShape::Block;
            if solid_block {
                std::mem::swap(&mut fg, &mut bg);
            }

            canvas.fill_rect(x, y, width, ch, bg);
            let c = cell.display_char();
            if c != ' ' {
                glyph(canvas, c, cell.attrs.has(Attr::BOLD), x, y, fg);
            }
            if cell.attrs.has(Attr::UNDERLINE) {
                let uy = (y + metrics.baseline as i32 + 1).min(y + ch - 1);
                canvas.fill_rect(x, uy, width, 1, fg);
            }
            if cell.attrs.has(Attr::STRIKETHROUGH) {
                canvas.fill_rect(x, y + ch / 2, width, 1, fg);
            }

            if at_cursor && !solid_block {
                if !frame.has_focus() {
                    canvas.outline(x, y, width, ch, 1, fg);
                } else if cursor.shape == CursorShape::Underline {
                    canvas.fill_rect(x, y + ch - 2, width, 2, fg);
                } else {
                    canvas.fill_rect(x, y, 2, ch, fg);
                }
            }
        }
    }
}

pub struct SoftwarePresenter {
    window: Arc<Window>,
    // dropped before the context
    surface: Surface<Arc<Window>, Arc<Window>>,
    _context: Context<Arc<Window>>,
    fonts: FontSet,
    palette: Palette,
    border: u32,
    canvas: Canvas,
}

impl SoftwarePresenter {
    /// Create the softbuffer context for `window`. Call this on the render
    /// thread.
    pub fn activate(window: Arc<Window>, fonts: FontSet, palette: Palette, border: u32) -> Result<Self, RenderError> {
        let context = Context::new(window.clone()).map_err(|e| RenderError::Activation(e.to_string()))?;
        let surface = Surface::new(&context, window.clone()).map_err(|e| RenderError::Activation(e.to_string()))?;
        log::debug!("Software presentation context ready");
        Ok(Self {
            window,
            surface,
            _context: context,
            fonts,
            palette,
            border,
            canvas: Canvas::default(),
        })
    }
}

impl Presenter for SoftwarePresenter {
    fn draw(&mut self, frame: &Frame) -> Result<(), RenderError> {
        let size = self.window.inner_size();
        self.canvas.resize(size.width, size.height);

        let metrics = self.fonts.metrics();
        let baseline = metrics.baseline as i32;
        let fonts = &mut self.fonts;
        paint(
            &mut self.canvas,
            frame,
            &self.palette,
            metrics,
            self.border,
            |canvas, c, bold, x, y, color| {
                canvas.draw_glyph(x, y, baseline, fonts.glyph(c, bold), color);
            },
        );
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let (Some(width), Some(height)) = (NonZeroU32::new(self.canvas.width), NonZeroU32::new(self.canvas.height))
        else {
            // minimized
            return Ok(());
        };
        self.surface
            .resize(width, height)
            .map_err(|e| RenderError::Present(e.to_string()))?;
        let mut buffer = self.surface.buffer_mut().map_err(|e| RenderError::Present(e.to_string()))?;
        if buffer.len() != self.canvas.pixels().len() {
            return Err(RenderError::Present(format!(
                "buffer holds {} pixels, expected {}",
                buffer.len(),
                self.canvas.pixels().len()
            )));
        }
        buffer.copy_from_slice(self.canvas.pixels());
        buffer.present().map_err(|e| RenderError::Present(e.to_string()))
    }
}

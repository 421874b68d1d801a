//! Font loading and cell metrics

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use fontdue::{Font, FontSettings};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("cannot read font {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse font {path}: {message}")]
    Parse { path: String, message: String },
}

/// Size of one grid cell in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    pub width: u32,
    pub height: u32,
    /// Distance from the top of the cell to the baseline
    pub baseline: u32,
}

impl CellMetrics {
    pub fn new(width: u32, height: u32, baseline: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            baseline,
        }
    }
}

/// A rasterized glyph, coverage only
pub struct Glyph {
    pub bitmap: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub xmin: i32,
    pub ymin: i32,
}

/// Regular and bold faces at one pixel size, with a glyph cache
pub struct FontSet {
    regular: Font,
    bold: Option<Font>,
    px: f32,
    metrics: CellMetrics,
    cache: HashMap<(char, bool), Glyph>,
}

fn load_font(path: &Path) -> Result<Font, FontError> {
    let bytes = fs::read(path).map_err(|source| FontError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Font::from_bytes(bytes, FontSettings::default()).map_err(|message| FontError::Parse {
        path: path.display().to_string(),
        message: message.to_string(),
    })
}

impl FontSet {
    pub fn load(regular: &Path, bold: Option<&Path>, px: u16) -> Result<Self, FontError> {
        let regular = load_font(regular)?;
        let bold = match bold {
            Some(path) => match load_font(path) {
                Ok(font) => Some(font),
                Err(e) => {
                    log::warn!("{}; using the regular face for bold", e);
                    None
                }
            },
            None => None,
        };
        Ok(Self::from_fonts(regular, bold, px))
    }

    fn from_fonts(regular: Font, bold: Option<Font>, px: u16) -> Self {
        let px = f32::from(px.max(1));
        let advance = regular.metrics('M', px).advance_width.ceil() as u32;
        let (ascent, descent, gap) = regular
            .horizontal_line_metrics(px)
            .map(|m| (m.ascent, m.descent, m.line_gap))
            .unwrap_or((px, 0.0, 0.0));
        let height = (ascent - descent + gap).ceil() as u32;
        Self {
            regular,
            bold,
            px,
            metrics: CellMetrics::new(advance, height, ascent.ceil() as u32),
            cache: HashMap::new(),
        }
    }

    pub fn metrics(&self) -> CellMetrics {
        self.metrics
    }

    pub fn glyph(&mut self, c: char, bold: bool) -> &Glyph {
        let (regular, bold_face, px) = (&self.regular, &self.bold, self.px);
        self.cache.entry((c, bold)).or_insert_with(|| {
            let font = match bold_face {
                Some(face) if bold => face,
                _ => regular,
            };
            let (m, bitmap) = font.rasterize(c, px);
            Glyph {
                bitmap,
                width: m.width,
                height: m.height,
                xmin: m.xmin,
                ymin: m.ymin,
            }
        })
    }
}

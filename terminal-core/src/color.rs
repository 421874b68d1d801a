//! Cell colors and the xterm 256-color palette

use serde::{Deserialize, Serialize};

/// A resolved 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `RRGGBB`, with or without a leading `#`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Pack as `0x00RRGGBB`, the pixel layout software surfaces expect
    pub fn to_u32(self) -> u32 {
        (self.0 as u32) << 16 | (self.1 as u32) << 8 | self.2 as u32
    }

    /// Linear blend towards `other`; `alpha` is the weight of `other`
    pub fn blend(self, other: Rgb, alpha: u8) -> Rgb {
        let mix = |a: u8, b: u8| {
            let a = a as u32;
            let b = b as u32;
            let w = alpha as u32;
            ((a * (255 - w) + b * w) / 255) as u8
        };
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

/// Color as stored in a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    /// The configured default foreground or background
    #[default]
    Default,
    /// 0-7 standard, 8-15 bright, 16-231 color cube, 232-255 grayscale
    Indexed(u8),
    /// 24-bit color from SGR 38/48;2
    Rgb(u8, u8, u8),
}

impl Color {
    /// Resolve against the palette; `default` is used for [`Color::Default`]
    pub fn resolve(self, default: Rgb) -> Rgb {
        match self {
            Color::Default => default,
            Color::Indexed(idx) => palette(idx),
            Color::Rgb(r, g, b) => Rgb(r, g, b),
        }
    }

    /// The bright counterpart of a standard color, used for bold text
    pub fn brightened(self) -> Color {
        match self {
            Color::Indexed(idx) if idx < 8 => Color::Indexed(idx + 8),
            other => other,
        }
    }
}

const STANDARD: [Rgb; 16] = [
    Rgb(0, 0, 0),
    Rgb(205, 0, 0),
    Rgb(0, 205, 0),
    Rgb(205, 205, 0),
    Rgb(0, 0, 238),
    Rgb(205, 0, 205),
    Rgb(0, 205, 205),
    Rgb(229, 229, 229),
    Rgb(127, 127, 127),
    Rgb(255, 0, 0),
    Rgb(0, 255, 0),
    Rgb(255, 255, 0),
    Rgb(92, 92, 255),
    Rgb(255, 0, 255),
    Rgb(0, 255, 255),
    Rgb(255, 255, 255),
];

/// Look up a 256-color palette entry
pub fn palette(index: u8) -> Rgb {
    match index {
        0..=15 => STANDARD[index as usize],
        16..=231 => {
            let idx = index - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            Rgb(level(idx / 36), level((idx % 36) / 6), level(idx % 6))
        }
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            Rgb(gray, gray, gray)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Rgb::from_hex("ffffff"), Some(Rgb(255, 255, 255)));
        assert_eq!(Rgb::from_hex("#102030"), Some(Rgb(0x10, 0x20, 0x30)));
        assert_eq!(Rgb::from_hex("fff"), None);
        assert_eq!(Rgb::from_hex("gg0000"), None);
    }

    #[test]
    fn test_resolve_default() {
        let fg = Rgb(1, 2, 3);
        assert_eq!(Color::Default.resolve(fg), fg);
        assert_eq!(Color::Rgb(9, 8, 7).resolve(fg), Rgb(9, 8, 7));
    }

    #[test]
    fn test_palette_ranges() {
        assert_eq!(palette(1), Rgb(205, 0, 0));
        assert_eq!(palette(16), Rgb(0, 0, 0));
        assert_eq!(palette(196), Rgb(255, 0, 0));
        assert_eq!(palette(232), Rgb(8, 8, 8));
        assert_eq!(palette(255), Rgb(238, 238, 238));
    }

    #[test]
    fn test_brightened() {
        assert_eq!(Color::Indexed(3).brightened(), Color::Indexed(11));
        assert_eq!(Color::Indexed(12).brightened(), Color::Indexed(12));
        assert_eq!(Color::Default.brightened(), Color::Default);
    }

    #[test]
    fn test_blend_endpoints() {
        let a = Rgb(0, 0, 0);
        let b = Rgb(200, 100, 50);
        assert_eq!(a.blend(b, 0), a);
        assert_eq!(a.blend(b, 255), b);
        assert_eq!(Rgb(0x12, 0x34, 0x56).to_u32(), 0x123456);
    }
}

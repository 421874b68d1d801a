//! Events delivered by the window-event source to the dispatcher

use std::time::Instant;

use crate::input::KeyEvent;

/// X11-style button numbering: 1 left, 2 middle, 3 right, 4/5 wheel
pub type Button = u8;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// The window became visible or needs repainting
    Expose,
    /// New drawable size in pixels
    Resize { width: u32, height: u32 },
    Key(KeyEvent),
    ButtonPress {
        button: Button,
        x: f64,
        y: f64,
        time: Instant,
    },
    ButtonRelease {
        button: Button,
        x: f64,
        y: f64,
        time: Instant,
    },
    Motion { x: f64, y: f64 },
    Focus(bool),
    /// Another client took ownership of the clipboard
    SelectionClear,
    /// The window system destroyed the window
    Destroy,
}

//! Terminal engine
//!
//! Couples the resumable parser with the screen model, turns key and
//! selection events into screen or pty operations, and publishes immutable
//! frames to whoever registered as the refresh sink.

use std::io;
use std::rc::Rc;

use terminal_core::{Dimensions, Frame, Point, Screen};
use terminal_parser::Parser;
use terminal_pty::{Child, WindowSize};
use thiserror::Error;

use crate::font::CellMetrics;
use crate::input::{encode_focus, encode_key, encode_paste, KeyEvent};
use crate::performer::{Effect, Performer};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("pty accepted {accepted} of {wanted} bytes")]
    WriteShortfall { wanted: usize, accepted: usize },
    #[error("pty I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// The writable side of the pty as seen by the engine
pub trait PtyPort {
    fn write(&self, bytes: &[u8]) -> io::Result<usize>;
    fn resize(&self, size: WindowSize) -> io::Result<()>;
}

impl PtyPort for Child {
    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        Child::write(self, bytes)
    }

    fn resize(&self, size: WindowSize) -> io::Result<()> {
        Child::resize(self, size).map_err(io::Error::other)
    }
}

pub type RefreshSink = Box<dyn FnMut(Frame)>;
pub type OscSink = Box<dyn FnMut(u16, &str)>;

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub dimensions: Dimensions,
    pub scrollback_lines: usize,
    /// Cap on buffered OSC/DCS payload bytes
    pub max_string: usize,
    /// Padding around the grid in pixels
    pub border: u32,
}

pub struct Engine {
    screen: Screen,
    parser: Parser,
    performer: Performer,
    pty: Rc<dyn PtyPort>,
    metrics: CellMetrics,
    border: u32,
    has_focus: bool,
    /// Frames are held back until the window has been exposed once
    exposed: bool,
    seq: u64,
    refresh_sink: Option<RefreshSink>,
    osc_sink: Option<OscSink>,
}

impl Engine {
    pub fn new(pty: Rc<dyn PtyPort>, metrics: CellMetrics, options: EngineOptions) -> Self {
        Self {
            screen: Screen::with_scrollback(options.dimensions.at_least_one(), options.scrollback_lines),
            parser: Parser::with_max_string(options.max_string),
            performer: Performer::new(),
            pty,
            metrics,
            border: options.border,
            has_focus: false,
            exposed: false,
            seq: 0,
            refresh_sink: None,
            osc_sink: None,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn dimensions(&self) -> Dimensions {
        self.screen.dimensions()
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn set_refresh_sink(&mut self, sink: RefreshSink) {
        self.refresh_sink = Some(sink);
    }

    pub fn set_osc_sink(&mut self, sink: OscSink) {
        self.osc_sink = Some(sink);
    }

    /// Decode and apply bytes from the child
    pub fn feed(&mut self, bytes: &[u8]) -> Result<()> {
        let mut changed = false;
        let (parser, performer, screen) = (&mut self.parser, &mut self.performer, &mut self.screen);
        parser.parse(bytes, |action| {
            changed = true;
            performer.perform(screen, action);
        });

        for effect in self.performer.take_effects() {
            match effect {
                Effect::Reply(reply) => {
                    self.write_text(&reply)?;
                }
                Effect::Osc { command, argument } => match self.osc_sink.as_mut() {
                    Some(sink) => sink(command, &argument),
                    None => log::debug!("No OSC sink for OSC {}", command),
                },
            }
        }

        if changed {
            self.refresh();
        }
        Ok(())
    }

    /// Recompute the grid from a drawable size in pixels
    pub fn resize(&mut self, pixel_width: u32, pixel_height: u32) {
        let inner_w = pixel_width.saturating_sub(2 * self.border);
        let inner_h = pixel_height.saturating_sub(2 * self.border);
        let cols = (inner_w / self.metrics.width).max(1);
        let rows = (inner_h / self.metrics.height).max(1);

        self.screen.resize(Dimensions::new(cols as usize, rows as usize));
        let size = WindowSize::with_pixels(
            clamp_u16(cols),
            clamp_u16(rows),
            clamp_u16(pixel_width),
            clamp_u16(pixel_height),
        );
        if let Err(e) = self.pty.resize(size) {
            log::warn!("Failed to resize pty to {}x{}: {}", cols, rows, e);
        }
        self.refresh();
    }

    /// Encode a key for the current modes and send it. Returns the number
    /// of bytes written, 0 when the key produces nothing.
    pub fn write_input(&mut self, key: &KeyEvent) -> Result<usize> {
        match encode_key(key, self.screen.modes()) {
            Some(bytes) => self.write_text(&bytes),
            None => Ok(0),
        }
    }

    /// Write raw bytes to the child. Anything short of a full write is an
    /// error; the caller is expected to end the session.
    pub fn write_text(&mut self, bytes: &[u8]) -> Result<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }
        let accepted = match self.pty.write(bytes) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
            Err(e) => return Err(e.into()),
        };
        if accepted < bytes.len() {
            log::error!("Short write to pty: {} of {} bytes", accepted, bytes.len());
            return Err(EngineError::WriteShortfall {
                wanted: bytes.len(),
                accepted,
            });
        }
        Ok(accepted)
    }

    pub fn paste_selection(&mut self, text: &str) -> Result<usize> {
        let bytes = encode_paste(text, self.screen.modes().bracketed_paste);
        self.write_text(&bytes)
    }

    pub fn set_has_focus(&mut self, focused: bool) -> Result<()> {
        if self.has_focus == focused {
            return Ok(());
        }
        self.has_focus = focused;
        if self.screen.modes().focus_events {
            self.write_text(encode_focus(focused))?;
        }
        self.refresh();
        Ok(())
    }

    pub fn select_start(&mut self, x: f64, y: f64, cycle_snap: bool) {
        let point = self.cell_at(x, y);
        self.screen.selection_mut().start(point, cycle_snap);
        self.refresh();
    }

    pub fn select_extend(&mut self, x: f64, y: f64, cycle_snap: bool) {
        let point = self.cell_at(x, y);
        self.screen.selection_mut().extend(point, cycle_snap);
        self.refresh();
    }

    pub fn select_update(&mut self, x: f64, y: f64) {
        let point = self.cell_at(x, y);
        if self.screen.selection().dragging && self.screen.selection().extent != point {
            self.screen.selection_mut().update(point);
            self.refresh();
        }
    }

    /// End the drag and return the highlighted text
    pub fn select_finish(&mut self) -> Option<String> {
        let text = self.screen.finish_selection();
        self.refresh();
        text
    }

    pub fn select_clear(&mut self) {
        if self.screen.selection().active {
            self.screen.selection_mut().clear();
            self.refresh();
        }
    }

    pub fn select_rectangular_toggle(&mut self) {
        self.screen.selection_mut().toggle_rectangular();
        self.refresh();
    }

    /// The window became visible or was damaged
    pub fn expose(&mut self) {
        self.exposed = true;
        self.refresh();
    }

    /// Publish a frame of the current state
    pub fn refresh(&mut self) {
        if !self.exposed {
            return;
        }
        let Some(sink) = self.refresh_sink.as_mut() else {
            return;
        };
        self.seq += 1;
        sink(self.screen.frame(self.seq, self.has_focus));
    }

    /// Pixel position to grid cell, clamped into the grid
    fn cell_at(&self, x: f64, y: f64) -> Point {
        let border = f64::from(self.border);
        let col = ((x - border) / f64::from(self.metrics.width)).max(0.0) as usize;
        let row = ((y - border) / f64::from(self.metrics.height)).max(0.0) as usize;
        self.screen.clamp_point(col, row)
    }
}

fn clamp_u16(value: u32) -> u16 {
    value.min(u32::from(u16::MAX)) as u16
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    use proptest::prelude::*;
    use terminal_core::SnapTo;

    use crate::input::{Modifiers, NamedKey};

    /// Records writes; `limit` caps how many bytes each write accepts
    #[derive(Default)]
    pub(crate) struct MockPty {
        pub written: RefCell<Vec<u8>>,
        pub sizes: RefCell<Vec<WindowSize>>,
        pub limit: Cell<Option<usize>>,
    }

    impl PtyPort for MockPty {
        fn write(&self, bytes: &[u8]) -> io::Result<usize> {
            let n = self.limit.get().map_or(bytes.len(), |limit| limit.min(bytes.len()));
            self.written.borrow_mut().extend_from_slice(&bytes[..n]);
            Ok(n)
        }

        fn resize(&self, size: WindowSize) -> io::Result<()> {
            self.sizes.borrow_mut().push(size);
            Ok(())
        }
    }

    pub(crate) const METRICS: CellMetrics = CellMetrics {
        width: 10,
        height: 20,
        baseline: 15,
    };

    pub(crate) fn engine_with(pty: &Rc<MockPty>, cols: usize, rows: usize) -> Engine {
        let port: Rc<dyn PtyPort> = pty.clone();
        Engine::new(
            port,
            METRICS,
            EngineOptions {
                dimensions: Dimensions::new(cols, rows),
                scrollback_lines: 100,
                max_string: 4096,
                border: 2,
            },
        )
    }

    fn frames(engine: &mut Engine) -> Rc<RefCell<Vec<Frame>>> {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let sink = frames.clone();
        engine.set_refresh_sink(Box::new(move |frame| sink.borrow_mut().push(frame)));
        frames
    }

    #[test]
    fn test_feed_and_refresh_after_expose() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        let frames = frames(&mut engine);

        engine.feed(b"hidden").unwrap();
        assert!(frames.borrow().is_empty());

        engine.expose();
        engine.feed(b" shown").unwrap();
        let frames = frames.borrow();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].seq() < frames[1].seq());
        assert_eq!(frames[1].line(0).unwrap().text().trim_end(), "hidden shown");
    }

    #[test]
    fn test_device_reply_is_written() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        engine.feed(b"\x1b[2;3H\x1b[6n").unwrap();
        assert_eq!(pty.written.borrow().as_slice(), b"\x1b[2;3R");
    }

    #[test]
    fn test_write_shortfall_is_an_error() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        pty.limit.set(Some(1));

        let key = KeyEvent::named(NamedKey::Up, Modifiers::NONE);
        let err = engine.write_input(&key).unwrap_err();
        assert!(matches!(err, EngineError::WriteShortfall { wanted: 3, accepted: 1 }));

        assert!(engine.write_text(b"x").is_ok());
        assert!(engine.feed(b"\x1b[c").is_err());
    }

    #[test]
    fn test_cursor_keys_follow_mode() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        let up = KeyEvent::named(NamedKey::Up, Modifiers::NONE);
        engine.write_input(&up).unwrap();
        engine.feed(b"\x1b[?1h").unwrap();
        engine.write_input(&up).unwrap();
        assert_eq!(pty.written.borrow().as_slice(), b"\x1b[A\x1bOA");
    }

    #[test]
    fn test_resize_from_pixels() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        engine.resize(2 * 2 + 40 * 10, 2 * 2 + 12 * 20);
        assert_eq!(engine.dimensions(), Dimensions::new(40, 12));
        let size = *pty.sizes.borrow().last().unwrap();
        assert_eq!((size.cols, size.rows), (40, 12));

        engine.resize(0, 0);
        assert_eq!(engine.dimensions(), Dimensions::new(1, 1));
    }

    #[test]
    fn test_resize_round_trip() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        engine.feed(b"\x1b[24;80Hx").unwrap();
        engine.resize(4 + 400, 4 + 240);
        engine.resize(4 + 800, 4 + 480);
        assert_eq!(engine.dimensions(), Dimensions::new(80, 24));
        let cursor = engine.screen().cursor();
        assert!(cursor.col < 80 && cursor.row < 24);
    }

    #[test]
    fn test_bracketed_paste() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        engine.paste_selection("ls").unwrap();
        engine.feed(b"\x1b[?2004h").unwrap();
        engine.paste_selection("pwd").unwrap();
        assert_eq!(pty.written.borrow().as_slice(), b"ls\x1b[200~pwd\x1b[201~");
    }

    #[test]
    fn test_focus_reporting() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        engine.set_has_focus(true).unwrap();
        assert!(pty.written.borrow().is_empty());

        engine.feed(b"\x1b[?1004h").unwrap();
        engine.set_has_focus(false).unwrap();
        engine.set_has_focus(true).unwrap();
        assert_eq!(pty.written.borrow().as_slice(), b"\x1b[O\x1b[I");
        assert!(engine.has_focus());
    }

    #[test]
    fn test_selection_from_pixels() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        engine.feed(b"hello world").unwrap();

        engine.select_start(2.0, 2.0, false);
        engine.select_update(2.0 + 4.5 * 10.0, 10.0);
        assert_eq!(engine.select_finish().as_deref(), Some("hello"));
        assert!(engine.screen().selection().active);

        engine.select_clear();
        assert!(!engine.screen().selection().active);
    }

    #[test]
    fn test_selection_snap_cycling() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        engine.feed(b"hello world").unwrap();

        engine.select_start(30.0, 5.0, false);
        assert_eq!(engine.screen().selection().snap, SnapTo::Char);
        engine.select_start(30.0, 5.0, true);
        assert_eq!(engine.select_finish().as_deref(), Some("hello"));
        engine.select_start(30.0, 5.0, true);
        assert_eq!(engine.screen().selection().snap, SnapTo::Line);
        engine.select_start(30.0, 5.0, true);
        assert_eq!(engine.screen().selection().snap, SnapTo::Char);
    }

    #[test]
    fn test_osc_sink_receives_commands() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        engine.set_osc_sink(Box::new(move |command, argument| {
            sink.borrow_mut().push((command, argument.to_string()))
        }));
        engine.feed(b"\x1b]0;title\x1b\\\x1b]52;c;?\x07").unwrap();
        assert_eq!(
            seen.borrow().as_slice(),
            &[(0, "title".to_string()), (52, "c;?".to_string())]
        );
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        let pty = Rc::new(MockPty::default());
        let mut engine = engine_with(&pty, 80, 24);
        engine.feed(b"\x1b[99999999;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;x\x1b]\xff\xfe\x18ok").unwrap();
        engine.feed(&[0xc3]).unwrap();
        engine.feed(&[0xa9]).unwrap();
    }

    #[derive(Debug, Clone)]
    enum Step {
        Feed(Vec<u8>),
        Resize(u32, u32),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            prop::collection::vec(any::<u8>(), 0..64).prop_map(Step::Feed),
            (0u32..1200, 0u32..800).prop_map(|(w, h)| Step::Resize(w, h)),
        ]
    }

    proptest! {
        #[test]
        fn test_cursor_stays_in_bounds(steps in prop::collection::vec(step(), 1..24)) {
            let pty = Rc::new(MockPty::default());
            let mut engine = engine_with(&pty, 80, 24);
            for step in steps {
                match step {
                    Step::Feed(bytes) => engine.feed(&bytes).unwrap(),
                    Step::Resize(w, h) => engine.resize(w, h),
                }
                let dims = engine.dimensions();
                let cursor = engine.screen().cursor();
                prop_assert!(cursor.col < dims.cols);
                prop_assert!(cursor.row < dims.rows);
            }
        }

        #[test]
        fn test_split_feed_matches_single_feed(
            bytes in prop::collection::vec(any::<u8>(), 0..128),
            split in any::<prop::sample::Index>(),
        ) {
            let at = split.index(bytes.len() + 1);

            let whole_pty = Rc::new(MockPty::default());
            let mut whole = engine_with(&whole_pty, 20, 6);
            whole.feed(&bytes).unwrap();

            let split_pty = Rc::new(MockPty::default());
            let mut parts = engine_with(&split_pty, 20, 6);
            parts.feed(&bytes[..at]).unwrap();
            parts.feed(&bytes[at..]).unwrap();

            prop_assert_eq!(whole.screen().frame(0, false), parts.screen().frame(0, false));
            prop_assert_eq!(whole.parser().state(), parts.parser().state());
            prop_assert_eq!(&*whole_pty.written.borrow(), &*split_pty.written.borrow());
        }

        #[test]
        fn test_selection_contains_both_ends(
            x0 in 0.0f64..804.0, y0 in 0.0f64..484.0,
            x1 in 0.0f64..804.0, y1 in 0.0f64..484.0,
        ) {
            let pty = Rc::new(MockPty::default());
            let mut engine = engine_with(&pty, 80, 24);
            engine.expose();
            let frames = frames(&mut engine);
            engine.select_start(x0, y0, false);
            engine.select_extend(x1, y1, false);

            let frame = frames.borrow().last().cloned().unwrap();
            let a = engine.cell_at(x0, y0);
            let b = engine.cell_at(x1, y1);
            prop_assert!(frame.is_selected(a.col, a.row));
            prop_assert!(frame.is_selected(b.col, b.row));
        }
    }
}

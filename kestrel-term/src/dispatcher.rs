//! Event dispatcher
//!
//! Blocks in `poll(2)` on the pty and the window-event descriptor and turns
//! whatever becomes ready into engine calls. While a selection drag holds
//! button 1 or 3 the pty is left out of the poll set, so child output waits
//! in the kernel until the button is released.

use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use terminal_pty::Child;

use crate::clipboard::{ClipboardBroker, Purpose};
use crate::event::{Button, InputEvent};
use crate::input::{Key, NamedKey};
use crate::osc::{clipboard_reply, OscCommand, OscHandler};
use crate::terminal::{Engine, Result};

pub const DEFAULT_MULTI_CLICK: Duration = Duration::from_millis(250);

const READ_BUF_SIZE: usize = 8192;

/// The readable side of the pty
pub trait PtyReader {
    fn fd(&self) -> BorrowedFd<'_>;
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;
}

impl PtyReader for Child {
    fn fd(&self) -> BorrowedFd<'_> {
        self.as_fd()
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        Child::read(self, buf)
    }
}

/// The window system, as seen by the dispatcher
pub trait EventSource {
    /// Readable whenever events may be pending
    fn fd(&self) -> BorrowedFd<'_>;
    /// Append every event that is queued right now
    fn drain(&mut self, events: &mut Vec<InputEvent>);
    fn set_title(&mut self, title: &str);
}

/// Why the dispatcher stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The window system destroyed the window
    Destroyed,
    /// The child side of the pty went away
    HangUp,
    PollFailed,
}

impl Outcome {
    /// Whether the window is already gone
    pub fn window_destroyed(self) -> bool {
        self == Outcome::Destroyed
    }
}

/// Flags presses that follow a release of the same button within the
/// threshold
#[derive(Debug)]
pub struct ClickTracker {
    threshold: Duration,
    last_release: Option<(Button, Instant)>,
}

impl ClickTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_release: None,
        }
    }

    /// True when this press continues a multi-click
    pub fn press(&mut self, button: Button, time: Instant) -> bool {
        matches!(self.last_release, Some((last, at))
            if last == button && time.saturating_duration_since(at) <= self.threshold)
    }

    pub fn release(&mut self, button: Button, time: Instant) {
        self.last_release = Some((button, time));
    }
}

pub struct Dispatcher<'a> {
    pty: &'a dyn PtyReader,
    source: &'a mut dyn EventSource,
    engine: &'a mut Engine,
    osc: &'a OscHandler,
    clipboard: &'a mut ClipboardBroker,
    clicks: ClickTracker,
    /// Selection button currently held; the pty is not polled meanwhile
    held: Option<Button>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        pty: &'a dyn PtyReader,
        source: &'a mut dyn EventSource,
        engine: &'a mut Engine,
        osc: &'a OscHandler,
        clipboard: &'a mut ClipboardBroker,
        multi_click: Duration,
    ) -> Self {
        Self {
            pty,
            source,
            engine,
            osc,
            clipboard,
            clicks: ClickTracker::new(multi_click),
            held: None,
        }
    }

    /// Run until the window is destroyed or the pty hangs up. A failed
    /// write to the child ends the loop with an error.
    pub fn run(&mut self) -> Result<Outcome> {
        let mut buf = [0u8; READ_BUF_SIZE];
        let mut events = Vec::new();

        loop {
            let (window_ready, pty_ready) = {
                let mut fds = vec![PollFd::new(self.source.fd(), PollFlags::POLLIN)];
                if self.held.is_none() {
                    fds.push(PollFd::new(self.pty.fd(), PollFlags::POLLIN));
                }
                match poll(&mut fds, PollTimeout::NONE) {
                    Ok(_) => {}
                    Err(Errno::EINTR) => continue,
                    Err(e) => {
                        log::error!("poll failed: {}", e);
                        return Ok(Outcome::PollFailed);
                    }
                }
                let revents = |i: usize| fds.get(i).and_then(|fd| fd.revents()).unwrap_or(PollFlags::empty());
                (revents(0), revents(1))
            };

            if pty_ready.intersects(PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL) {
                log::info!("pty hung up");
                return Ok(Outcome::HangUp);
            }
            if pty_ready.contains(PollFlags::POLLIN) {
                match self.pty.read(&mut buf) {
                    Ok(0) => {
                        log::info!("pty reached end of file");
                        return Ok(Outcome::HangUp);
                    }
                    Ok(n) => self.engine.feed(&buf[..n])?,
                    Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {}
                    Err(e) => {
                        // EIO once the child side is closed
                        log::info!("pty read failed: {}", e);
                        return Ok(Outcome::HangUp);
                    }
                }
                self.handle_osc();
                self.answer_clipboard()?;
            }

            if window_ready.intersects(PollFlags::POLLERR | PollFlags::POLLNVAL) {
                log::error!("window event source failed: {:?}", window_ready);
                return Ok(Outcome::PollFailed);
            }
            if window_ready.contains(PollFlags::POLLHUP) {
                log::info!("display connection closed");
                return Ok(Outcome::Destroyed);
            }
            if window_ready.contains(PollFlags::POLLIN) {
                self.source.drain(&mut events);
                for event in events.drain(..) {
                    if let Some(outcome) = self.handle_event(event)? {
                        return Ok(outcome);
                    }
                }
                self.answer_clipboard()?;
            }
        }
    }

    fn handle_osc(&mut self) {
        for command in self.osc.drain() {
            match command {
                OscCommand::SetTitle(title) => self.source.set_title(&title),
                OscCommand::ClipboardSet(text) => self.clipboard.publish(&text),
                OscCommand::ClipboardQuery => {
                    self.clipboard.request(Instant::now(), Purpose::Osc52Reply);
                }
            }
        }
    }

    fn answer_clipboard(&mut self) -> Result<()> {
        for (purpose, text) in self.clipboard.resolve(Instant::now()) {
            match purpose {
                Purpose::Paste => {
                    self.engine.paste_selection(&text)?;
                }
                Purpose::Osc52Reply => {
                    self.engine.write_text(&clipboard_reply(&text))?;
                }
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, event: InputEvent) -> Result<Option<Outcome>> {
        match event {
            InputEvent::Expose => self.engine.expose(),
            InputEvent::Resize { width, height } => self.engine.resize(width, height),
            InputEvent::Key(key) => {
                let shift_only = key.mods.shift && !key.mods.ctrl && !key.mods.alt;
                match &key.key {
                    Key::Named(NamedKey::Insert) if shift_only => {
                        self.clipboard.request(Instant::now(), Purpose::Paste);
                    }
                    Key::Text(text) if text == " " && self.held.is_some() => {
                        self.engine.select_rectangular_toggle();
                    }
                    _ => {
                        self.engine.write_input(&key)?;
                    }
                }
            }
            InputEvent::ButtonPress { button, x, y, time } => {
                let cycle = self.clicks.press(button, time);
                match button {
                    1 => {
                        self.engine.select_start(x, y, cycle);
                        self.held = Some(button);
                    }
                    3 => {
                        self.engine.select_extend(x, y, cycle);
                        self.held = Some(button);
                    }
                    4 | 5 => log::debug!("Wheel button {} at {},{}", button, x, y),
                    _ => {}
                }
            }
            InputEvent::ButtonRelease { button, time, .. } => {
                self.clicks.release(button, time);
                match button {
                    1 | 3 if self.held == Some(button) => {
                        self.held = None;
                        if let Some(text) = self.engine.select_finish() {
                            self.clipboard.publish(&text);
                        }
                    }
                    2 => {
                        self.clipboard.request(time, Purpose::Paste);
                    }
                    _ => {}
                }
            }
            InputEvent::Motion { x, y } => {
                if self.held.is_some() {
                    self.engine.select_update(x, y);
                }
            }
            InputEvent::Focus(focused) => {
                self.engine.set_has_focus(focused)?;
                if focused && self.clipboard.ownership_lost() {
                    self.engine.select_clear();
                }
            }
            InputEvent::SelectionClear => {
                self.clipboard.disown();
                self.engine.select_clear();
            }
            InputEvent::Destroy => return Ok(Some(Outcome::Destroyed)),
        }
        Ok(None)
    }
}

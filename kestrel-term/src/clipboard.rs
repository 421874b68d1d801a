//! Clipboard exchange
//!
//! Requests for clipboard contents are recorded in a pending table and
//! answered later by [`ClipboardBroker::resolve`]. A request the backend
//! never satisfies simply ages out; nothing waits on it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// How long an unanswered request is kept
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5);

/// The system clipboard
pub trait ClipboardBackend {
    fn set_text(&mut self, text: &str) -> Result<(), String>;
    /// `None` when nobody owns the clipboard or it holds no text
    fn get_text(&mut self) -> Option<String>;
}

/// The X11 selection used for mouse copy and paste
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionTarget {
    #[default]
    Primary,
    Clipboard,
}

impl FromStr for SelectionTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "clipboard" => Ok(Self::Clipboard),
            _ => Err(format!("unknown selection '{}'", s)),
        }
    }
}

impl fmt::Display for SelectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Clipboard => "clipboard",
        })
    }
}

#[cfg(all(unix, not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))))]
mod system {
    use arboard::{Clipboard, GetExtLinux, LinuxClipboardKind, SetExtLinux};

    use super::SelectionTarget;

    fn kind(target: SelectionTarget) -> LinuxClipboardKind {
        match target {
            SelectionTarget::Primary => LinuxClipboardKind::Primary,
            SelectionTarget::Clipboard => LinuxClipboardKind::Clipboard,
        }
    }

    pub(super) fn set(clipboard: &mut Clipboard, target: SelectionTarget, text: &str) -> Result<(), arboard::Error> {
        clipboard.set().clipboard(kind(target)).text(text.to_owned())
    }

    pub(super) fn get(clipboard: &mut Clipboard, target: SelectionTarget) -> Result<String, arboard::Error> {
        clipboard.get().clipboard(kind(target)).text()
    }
}

// no PRIMARY selection elsewhere
#[cfg(not(all(unix, not(any(target_os = "macos", target_os = "android", target_os = "emscripten")))))]
mod system {
    use arboard::Clipboard;

    use super::SelectionTarget;

    pub(super) fn set(clipboard: &mut Clipboard, _target: SelectionTarget, text: &str) -> Result<(), arboard::Error> {
        clipboard.set_text(text.to_owned())
    }

    pub(super) fn get(clipboard: &mut Clipboard, _target: SelectionTarget) -> Result<String, arboard::Error> {
        clipboard.get_text()
    }
}

pub struct SystemClipboard {
    inner: arboard::Clipboard,
    target: SelectionTarget,
}

impl SystemClipboard {
    pub fn new(target: SelectionTarget) -> Result<Self, arboard::Error> {
        Ok(Self {
            inner: arboard::Clipboard::new()?,
            target,
        })
    }
}

impl ClipboardBackend for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), String> {
        system::set(&mut self.inner, self.target, text).map_err(|e| e.to_string())
    }

    fn get_text(&mut self) -> Option<String> {
        match system::get(&mut self.inner, self.target) {
            Ok(text) => Some(text),
            Err(e) => {
                log::debug!("Clipboard read failed: {}", e);
                None
            }
        }
    }
}

/// Stands in when no clipboard service is reachable
#[derive(Debug, Default)]
pub struct NoClipboard;

impl ClipboardBackend for NoClipboard {
    fn set_text(&mut self, _text: &str) -> Result<(), String> {
        Err("no clipboard available".into())
    }

    fn get_text(&mut self) -> Option<String> {
        None
    }
}

/// What an answered request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Paste into the child as typed input
    Paste,
    /// Reply to an OSC 52 query
    Osc52Reply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestId(u64);

#[derive(Debug)]
struct Pending {
    purpose: Purpose,
    issued: Instant,
}

pub struct ClipboardBroker {
    backend: Box<dyn ClipboardBackend>,
    pending: BTreeMap<RequestId, Pending>,
    next_id: u64,
    max_age: Duration,
    /// A request arrived since the backend was last read
    unqueried: bool,
    /// Text we published and still believe we own
    owned: Option<String>,
}

impl ClipboardBroker {
    pub fn new(backend: Box<dyn ClipboardBackend>) -> Self {
        Self::with_max_age(backend, DEFAULT_MAX_AGE)
    }

    pub fn with_max_age(backend: Box<dyn ClipboardBackend>, max_age: Duration) -> Self {
        Self {
            backend,
            pending: BTreeMap::new(),
            next_id: 0,
            max_age,
            unqueried: false,
            owned: None,
        }
    }

    /// Ask for the clipboard contents; the answer arrives via `resolve`
    pub fn request(&mut self, now: Instant, purpose: Purpose) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id, Pending { purpose, issued: now });
        self.unqueried = true;
        id
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Take ownership of the clipboard with `text`. Failures are logged.
    pub fn publish(&mut self, text: &str) {
        match self.backend.set_text(text) {
            Ok(()) => self.owned = Some(text.to_owned()),
            Err(e) => log::warn!("Failed to set clipboard: {}", e),
        }
    }

    /// Answer pending requests in request order and drop the ones older
    /// than the maximum age. The backend is read once per batch of new
    /// requests; until another request arrives this only expires.
    pub fn resolve(&mut self, now: Instant) -> Vec<(Purpose, String)> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        let expired: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.issued) > self.max_age)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(p) = self.pending.remove(&id) {
                log::debug!("Clipboard request {:?} for {:?} expired unanswered", id, p.purpose);
            }
        }

        if !self.unqueried || self.pending.is_empty() {
            return Vec::new();
        }
        self.unqueried = false;

        let Some(text) = self.backend.get_text() else {
            return Vec::new();
        };
        std::mem::take(&mut self.pending)
            .into_values()
            .map(|p| (p.purpose, text.clone()))
            .collect()
    }

    /// True when something else has taken the clipboard since we last
    /// published to it
    pub fn ownership_lost(&mut self) -> bool {
        let Some(owned) = self.owned.as_ref() else {
            return false;
        };
        if self.backend.get_text().as_ref() == Some(owned) {
            return false;
        }
        self.owned = None;
        true
    }

    pub fn disown(&mut self) {
        self.owned = None;
    }
}

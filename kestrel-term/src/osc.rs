//! Operating system commands
//!
//! The engine hands every OSC it sees to the sink returned by
//! [`OscHandler::sink`]; the dispatcher drains the decoded commands after
//! each chunk and acts on them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::terminal::OscSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OscCommand {
    SetTitle(String),
    /// OSC 52 with a payload: put this text on the clipboard
    ClipboardSet(String),
    /// OSC 52 with `?`: report the clipboard back to the child
    ClipboardQuery,
}

pub struct OscHandler {
    queue: Rc<RefCell<VecDeque<OscCommand>>>,
    allow_clipboard: bool,
    max_clipboard_bytes: usize,
}

impl OscHandler {
    pub fn new(allow_clipboard: bool, max_clipboard_bytes: usize) -> Self {
        Self {
            queue: Rc::new(RefCell::new(VecDeque::new())),
            allow_clipboard,
            max_clipboard_bytes,
        }
    }

    /// A sink for [`crate::terminal::Engine::set_osc_sink`]
    pub fn sink(&self) -> OscSink {
        let queue = self.queue.clone();
        let allow_clipboard = self.allow_clipboard;
        let max = self.max_clipboard_bytes;
        Box::new(move |command, argument| {
            if let Some(cmd) = decode(command, argument, allow_clipboard, max) {
                queue.borrow_mut().push_back(cmd);
            }
        })
    }

    pub fn drain(&self) -> Vec<OscCommand> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

fn decode(command: u16, argument: &str, allow_clipboard: bool, max: usize) -> Option<OscCommand> {
    match command {
        0 | 2 => Some(OscCommand::SetTitle(argument.to_string())),
        52 => {
            if !allow_clipboard {
                log::debug!("OSC 52 disabled, ignoring");
                return None;
            }
            let Some((_selector, payload)) = argument.split_once(';') else {
                log::warn!("Malformed OSC 52 argument: {:?}", argument);
                return None;
            };
            if payload == "?" {
                return Some(OscCommand::ClipboardQuery);
            }
            if payload.len() > max {
                log::warn!("OSC 52 payload of {} bytes exceeds the {}-byte limit", payload.len(), max);
                return None;
            }
            match BASE64.decode(payload) {
                Ok(bytes) => Some(OscCommand::ClipboardSet(String::from_utf8_lossy(&bytes).into_owned())),
                Err(e) => {
                    log::warn!("Invalid base64 in OSC 52: {}", e);
                    None
                }
            }
        }
        _ => {
            log::debug!("Unhandled OSC {}: {:?}", command, argument);
            None
        }
    }
}

/// The bytes that answer an OSC 52 query
pub fn clipboard_reply(text: &str) -> Vec<u8> {
    format!("\x1b]52;;{}\x1b\\", BASE64.encode(text)).into_bytes()
}

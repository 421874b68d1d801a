//! Terminal Parser - VT/xterm escape sequence parser
//!
//! This crate implements a streaming parser for terminal escape sequences.
//! It converts a byte stream into syntactic terminal actions and knows
//! nothing about screens.
//!
//! The parser is designed to:
//! - Handle arbitrary chunk boundaries (streaming)
//! - Be deterministic
//! - Decode UTF-8 independently of escape recognition
//! - Parse CSI, OSC, ESC, and DCS sequences
//!
//! Reference: https://www.x.org/docs/xterm/ctlseqs.pdf

mod action;
mod params;
mod parser;
mod utf8;

pub use action::{Action, CsiAction, EscAction};
pub use params::Params;
pub use parser::{Parser, ParserState, MAX_OSC_LEN};
pub use utf8::{Utf8Decoder, Utf8Result, REPLACEMENT};

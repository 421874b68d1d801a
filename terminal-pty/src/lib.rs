//! Pseudoterminal management for the kestrel terminal
//!
//! Opens the master/slave pair, forks the shell onto the slave with a
//! controlling terminal, and forwards geometry changes with TIOCSWINSZ.
//!
//! Reference: https://www.man7.org/linux/man-pages/man3/posix_openpt.3.html

mod child;
mod error;
mod pty;
pub mod shell;
mod size;

pub use child::{child_environment, Child, TERM};
pub use error::{Error, Result};
pub use pty::Pty;
pub use size::WindowSize;

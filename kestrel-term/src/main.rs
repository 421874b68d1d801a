//! Kestrel Terminal Emulator
//!
//! A VT/xterm-compatible terminal emulator for X11 and Wayland.

mod clipboard;
mod config;
mod dispatcher;
mod event;
mod font;
mod input;
mod osc;
mod performer;
mod renderer;
mod session;
mod surface;
mod terminal;
mod window;

use std::error::Error;

use clap::Parser;
use config::{CliArgs, Config};
use session::Session;

fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();

    // RUST_LOG still wins over -q/-v
    let level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    log::debug!("Starting Kestrel Terminal");

    // Load configuration with precedence: CLI > env > file > defaults
    let config = match Config::load_with_args(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    log::debug!(
        "Geometry {}, font {:?} @ {}px",
        config.geometry,
        config.font,
        config.font_size
    );

    let outcome = Session::new(config).run()?;

    log::debug!("Kestrel Terminal exited ({:?})", outcome);
    Ok(())
}

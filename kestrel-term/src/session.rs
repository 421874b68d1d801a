//! One terminal session: a child on a pty, its window and the loop
//! connecting them
//!
//! Components are built in dependency order and torn down explicitly in
//! reverse, so the render thread is gone before the window it draws to,
//! and the child gets its SIGHUP last.

use std::ffi::OsString;
use std::rc::Rc;
use std::time::Duration;

use terminal_core::Dimensions;
use terminal_pty::{child_environment, shell, Child, WindowSize};
use thiserror::Error;
use winit::dpi::PhysicalSize;

use crate::clipboard::{ClipboardBackend, ClipboardBroker, NoClipboard, SystemClipboard};
use crate::config::Config;
use crate::dispatcher::{Dispatcher, Outcome};
use crate::font::{CellMetrics, FontError, FontSet};
use crate::osc::OscHandler;
use crate::renderer::{RenderError, Renderer};
use crate::surface::{Palette, SoftwarePresenter};
use crate::terminal::{Engine, EngineError, EngineOptions, PtyPort};
use crate::window::{WindowError, WinitSource};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Pty(#[from] terminal_pty::Error),
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error(transparent)]
    Font(#[from] FontError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// The argv to exec and whether `SHELL` may be passed through
fn program(config: &Config) -> (Vec<OsString>, bool) {
    if !config.command.is_empty() {
        return (config.command.iter().map(OsString::from).collect(), true);
    }
    let shell = shell::resolve(&config.shell);
    let keep_shell = !config.shell_explicit || shell::is_listed(&shell);
    if !keep_shell {
        log::info!("{:?} is not listed in /etc/shells, clearing SHELL", shell);
    }
    (vec![shell.into_os_string()], keep_shell)
}

/// Window size in pixels for `cols` x `rows` cells
fn window_size(metrics: CellMetrics, border: u32, cols: u16, rows: u16) -> (u32, u32) {
    (
        2 * border + cols as u32 * metrics.width,
        2 * border + rows as u32 * metrics.height,
    )
}

pub struct Session {
    config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until the window closes or the child goes away.
    pub fn run(self) -> Result<Outcome, SessionError> {
        let config = self.config;
        let geometry = config.geometry;

        let (argv, keep_shell) = program(&config);
        let env = child_environment(std::env::vars_os(), keep_shell);
        log::info!("Starting {:?}", argv[0]);
        let child = Rc::new(Child::spawn(&argv, &env, WindowSize::new(geometry.cols, geometry.rows))?);

        // cell metrics size the window, so fonts are loaded before it exists
        let fonts = FontSet::load(&config.font, config.bold_font.as_deref(), config.font_size)?;
        let metrics = fonts.metrics();
        let (width, height) = window_size(metrics, config.border, geometry.cols, geometry.rows);

        let mut source = WinitSource::new(&config.title, PhysicalSize::new(width, height))?;

        let palette = Palette::new(config.fg_rgb(), config.bg_rgb(), config.reverse_video, config.bold_as_bright);
        let window = source.window();
        let border = config.border;
        let mut renderer = Renderer::spawn(move || SoftwarePresenter::activate(window, fonts, palette, border))?;

        let pty: Rc<dyn PtyPort> = child.clone();
        let mut engine = Engine::new(
            pty,
            metrics,
            EngineOptions {
                dimensions: Dimensions::new(geometry.cols as usize, geometry.rows as usize),
                scrollback_lines: config.scrollback_lines,
                max_string: terminal_parser::MAX_OSC_LEN.max(config.osc52_max_size + 16),
                border,
            },
        );
        let frames = renderer.frames();
        engine.set_refresh_sink(Box::new(move |frame| frames.update(frame)));
        let osc = OscHandler::new(config.osc52, config.osc52_max_size);
        engine.set_osc_sink(osc.sink());
        engine.resize(width, height);

        let backend: Box<dyn ClipboardBackend> = match SystemClipboard::new(config.selection) {
            Ok(clipboard) => Box::new(clipboard),
            Err(e) => {
                log::warn!("Clipboard unavailable: {}", e);
                Box::new(NoClipboard)
            }
        };
        let mut clipboard = ClipboardBroker::new(backend);

        let result = Dispatcher::new(
            &*child,
            &mut source,
            &mut engine,
            &osc,
            &mut clipboard,
            Duration::from_millis(config.multi_click_ms),
        )
        .run();

        match &result {
            Ok(Outcome::Destroyed) => log::debug!("Window destroyed"),
            Ok(outcome) => log::debug!("Session ended: {:?}", outcome),
            Err(e) => log::error!("Session failed: {}", e),
        }
        match child.try_wait() {
            Ok(Some(status)) => log::info!("Child exited: {:?}", status),
            Ok(None) => log::debug!("Child still running, hanging up"),
            Err(e) => log::debug!("Could not reap child: {}", e),
        }

        renderer.stop();
        drop(engine);
        drop(clipboard);
        if matches!(result, Ok(outcome) if outcome.window_destroyed()) {
            log::debug!("Releasing window already destroyed by the window system");
        }
        drop(source);
        drop(child);

        result.map_err(SessionError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size_includes_border() {
        let metrics = CellMetrics::new(10, 20, 15);
        assert_eq!(window_size(metrics, 2, 80, 24), (804, 484));
        assert_eq!(window_size(metrics, 0, 1, 1), (10, 20));
    }

    #[test]
    fn test_command_overrides_shell() {
        let config = Config {
            command: vec!["top".into(), "-d".into(), "1".into()],
            ..Config::default()
        };
        let (argv, keep_shell) = program(&config);
        assert_eq!(argv, vec![OsString::from("top"), "-d".into(), "1".into()]);
        assert!(keep_shell);
    }

    #[test]
    fn test_unlisted_shell_drops_shell_var() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("not-a-login-shell");
        std::fs::write(&fake, b"").unwrap();

        let config = Config {
            shell: fake.to_string_lossy().into_owned(),
            shell_explicit: true,
            ..Config::default()
        };
        let (argv, keep_shell) = program(&config);
        assert_eq!(argv, vec![fake.into_os_string()]);
        assert!(!keep_shell);
    }

    #[test]
    fn test_default_shell_keeps_shell_var() {
        let (_, keep_shell) = program(&Config::default());
        assert!(keep_shell);
    }
}

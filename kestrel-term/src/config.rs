//! Configuration for the kestrel terminal
//!
//! Settings come from, in increasing order of priority: built-in defaults,
//! the TOML config file, `KESTREL_*` environment variables, and the command
//! line.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use serde::{Deserialize, Serialize};
use terminal_core::Rgb;
use thiserror::Error;

use crate::clipboard::SelectionTarget;
use crate::dispatcher::DEFAULT_MULTI_CLICK;

pub const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf";
const MAX_BORDER: u32 = 32767;
const MAX_SCROLLBACK: usize = 10_000_000;
const ENV_PREFIX: &str = "KESTREL_";

/// Command line arguments
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "kestrel")]
#[command(version)]
#[command(about = "A VT/xterm-compatible terminal emulator", long_about = None)]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Window size in character cells
    #[arg(short, long, value_name = "COLSxROWS")]
    pub geometry: Option<Geometry>,

    /// Inner border in pixels
    #[arg(short, long, value_name = "PX")]
    pub border: Option<u32>,

    /// Regular font file (TTF/OTF)
    #[arg(short = 'f', long, value_name = "FILE")]
    pub font: Option<PathBuf>,

    /// Bold font file; defaults to the regular font
    #[arg(long, value_name = "FILE")]
    pub bold_font: Option<PathBuf>,

    /// Font size in pixels
    #[arg(long, value_name = "PX")]
    pub font_size: Option<u16>,

    /// Default foreground colour (RRGGBB)
    #[arg(long, value_name = "COLOR")]
    pub fg: Option<String>,

    /// Default background colour (RRGGBB)
    #[arg(long, value_name = "COLOR")]
    pub bg: Option<String>,

    /// Swap the default foreground and background
    #[arg(long = "rv", alias = "reverse-video")]
    pub reverse_video: bool,

    /// Draw bold text in the bright palette colours
    #[arg(long, value_name = "BOOL")]
    pub bold_as_bright: Option<bool>,

    /// Window title
    #[arg(short = 'T', long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Number of scrollback lines
    #[arg(long, value_name = "LINES")]
    pub scrollback: Option<usize>,

    /// Multi-click interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub multi_click_ms: Option<u64>,

    /// Allow programs to use the clipboard through OSC 52
    #[arg(long, value_name = "BOOL")]
    pub osc52: Option<bool>,

    /// Largest accepted OSC 52 payload in bytes
    #[arg(long, value_name = "BYTES")]
    pub osc52_max_size: Option<usize>,

    /// Which X11 selection mouse copy and paste use
    #[arg(long, value_enum, value_name = "SELECTION")]
    pub selection: Option<SelectionTarget>,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run a command instead of the shell
    #[arg(short = 'e', value_name = "CMD", num_args = 1.., allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Shell to run
    #[arg(value_name = "SHELL")]
    pub shell: Option<String>,
}

/// Window size in cells, written `COLSxROWS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

impl Default for Geometry {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

impl FromStr for Geometry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cols, rows) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected COLSxROWS, got '{}'", s))?;
        let cols: u16 = cols.trim().parse().map_err(|_| format!("bad column count '{}'", cols))?;
        let rows: u16 = rows.trim().parse().map_err(|_| format!("bad row count '{}'", rows))?;
        if cols == 0 || rows == 0 {
            return Err(format!("geometry must be at least 1x1, got '{}'", s));
        }
        Ok(Self { cols, rows })
    }
}

impl TryFrom<String> for Geometry {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Geometry> for String {
    fn from(g: Geometry) -> Self {
        g.to_string()
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

/// Terminal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub geometry: Geometry,
    /// Inner border in pixels
    pub border: u32,
    pub font: PathBuf,
    pub bold_font: Option<PathBuf>,
    pub font_size: u16,
    pub fg: String,
    pub bg: String,
    pub reverse_video: bool,
    pub bold_as_bright: bool,
    pub shell: String,
    pub title: String,
    pub scrollback_lines: usize,
    pub multi_click_ms: u64,
    pub osc52: bool,
    pub osc52_max_size: usize,
    pub selection: SelectionTarget,

    /// Set when the shell was chosen rather than defaulted
    #[serde(skip)]
    pub shell_explicit: bool,
    /// `-e` command line, empty to run the shell
    #[serde(skip)]
    pub command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            border: 2,
            font: PathBuf::from(DEFAULT_FONT),
            bold_font: None,
            font_size: 16,
            fg: "ffffff".to_string(),
            bg: "000000".to_string(),
            reverse_video: false,
            bold_as_bright: true,
            shell: "/bin/bash".to_string(),
            title: "Kestrel".to_string(),
            scrollback_lines: 10000,
            multi_click_ms: DEFAULT_MULTI_CLICK.as_millis() as u64,
            osc52: true,
            osc52_max_size: 1_000_000,
            selection: SelectionTarget::Primary,
            shell_explicit: false,
            command: Vec::new(),
        }
    }
}

/// Parse `RRGGBB`, with or without a leading `#`
pub fn parse_hex(hex: &str) -> Option<Rgb> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration with full precedence:
    /// CLI args > environment variables > config file > defaults
    pub fn load_with_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => match Self::load_from_file(&path) {
                    Ok(config) => config,
                    Err(e) => {
                        log::warn!("Ignoring config file: {}", e);
                        Config::default()
                    }
                },
                _ => Config::default(),
            },
        };

        config.apply_env_vars(|name| std::env::var(name).ok());
        config.apply_cli_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("kestrel").join("config.toml"))
    }

    /// Apply `KESTREL_*` variables looked up through `var`. Values that do
    /// not parse are logged and skipped.
    fn apply_env_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| var(&format!("{}{}", ENV_PREFIX, name));

        fn parsed<T: FromStr>(name: &str, value: Option<String>) -> Option<T> {
            let value = value?;
            match value.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    log::warn!("Ignoring {}{}={:?}", ENV_PREFIX, name, value);
                    None
                }
            }
        }
        fn flag(name: &str, value: Option<String>) -> Option<bool> {
            let value = value?;
            let parsed = parse_bool(&value);
            if parsed.is_none() {
                log::warn!("Ignoring {}{}={:?}", ENV_PREFIX, name, value);
            }
            parsed
        }

        if let Some(v) = parsed("GEOMETRY", get("GEOMETRY")) {
            self.geometry = v;
        }
        if let Some(v) = parsed("BORDER", get("BORDER")) {
            self.border = v;
        }
        if let Some(v) = get("FONT") {
            self.font = PathBuf::from(v);
        }
        if let Some(v) = get("BOLD_FONT") {
            self.bold_font = Some(PathBuf::from(v));
        }
        if let Some(v) = parsed("FONT_SIZE", get("FONT_SIZE")) {
            self.font_size = v;
        }
        if let Some(v) = get("FG") {
            self.fg = v;
        }
        if let Some(v) = get("BG") {
            self.bg = v;
        }
        if let Some(v) = flag("REVERSE_VIDEO", get("REVERSE_VIDEO")) {
            self.reverse_video = v;
        }
        if let Some(v) = flag("BOLD_AS_BRIGHT", get("BOLD_AS_BRIGHT")) {
            self.bold_as_bright = v;
        }
        if let Some(v) = get("SHELL") {
            self.shell = v;
            self.shell_explicit = true;
        }
        if let Some(v) = get("TITLE") {
            self.title = v;
        }
        if let Some(v) = parsed("SCROLLBACK", get("SCROLLBACK")) {
            self.scrollback_lines = v;
        }
        if let Some(v) = parsed("MULTI_CLICK_MS", get("MULTI_CLICK_MS")) {
            self.multi_click_ms = v;
        }
        if let Some(v) = flag("OSC52", get("OSC52")) {
            self.osc52 = v;
        }
        if let Some(v) = parsed("OSC52_MAX_SIZE", get("OSC52_MAX_SIZE")) {
            self.osc52_max_size = v;
        }
        if let Some(v) = parsed("SELECTION", get("SELECTION")) {
            self.selection = v;
        }
    }

    fn apply_cli_args(&mut self, args: &CliArgs) {
        if let Some(geometry) = args.geometry {
            self.geometry = geometry;
        }
        if let Some(border) = args.border {
            self.border = border;
        }
        if let Some(font) = &args.font {
            self.font = font.clone();
        }
        if let Some(bold) = &args.bold_font {
            self.bold_font = Some(bold.clone());
        }
        if let Some(size) = args.font_size {
            self.font_size = size;
        }
        if let Some(fg) = &args.fg {
            self.fg = fg.clone();
        }
        if let Some(bg) = &args.bg {
            self.bg = bg.clone();
        }
        if args.reverse_video {
            self.reverse_video = true;
        }
        if let Some(bold_as_bright) = args.bold_as_bright {
            self.bold_as_bright = bold_as_bright;
        }
        if let Some(scrollback) = args.scrollback {
            self.scrollback_lines = scrollback;
        }
        if let Some(ms) = args.multi_click_ms {
            self.multi_click_ms = ms;
        }
        if let Some(osc52) = args.osc52 {
            self.osc52 = osc52;
        }
        if let Some(max) = args.osc52_max_size {
            self.osc52_max_size = max;
        }
        if let Some(selection) = args.selection {
            self.selection = selection;
        }
        if let Some(shell) = &args.shell {
            self.shell = shell.clone();
            self.shell_explicit = true;
        }
        if !args.command.is_empty() {
            self.command = args.command.clone();
            if args.title.is_none() {
                let program = Path::new(&args.command[0]);
                self.title = program
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| args.command[0].clone());
            }
        }
        if let Some(title) = &args.title {
            self.title = title.clone();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.geometry.cols == 0 || self.geometry.rows == 0 {
            return Err(invalid("geometry", "must be at least 1x1"));
        }
        if self.border > MAX_BORDER {
            return Err(invalid("border", format!("must be at most {}", MAX_BORDER)));
        }
        if self.font_size == 0 || self.font_size > 255 {
            return Err(invalid("font_size", "must be between 1 and 255"));
        }
        if parse_hex(&self.fg).is_none() {
            return Err(invalid("fg", format!("invalid colour '{}', expected RRGGBB", self.fg)));
        }
        if parse_hex(&self.bg).is_none() {
            return Err(invalid("bg", format!("invalid colour '{}', expected RRGGBB", self.bg)));
        }
        if self.scrollback_lines > MAX_SCROLLBACK {
            return Err(invalid("scrollback_lines", "must be at most 10,000,000"));
        }
        if !(1..=5000).contains(&self.multi_click_ms) {
            return Err(invalid("multi_click_ms", "must be between 1 and 5000"));
        }
        if self.shell.is_empty() {
            return Err(invalid("shell", "must not be empty"));
        }
        Ok(())
    }

    pub fn fg_rgb(&self) -> Rgb {
        parse_hex(&self.fg).unwrap_or(Rgb(255, 255, 255))
    }

    pub fn bg_rgb(&self) -> Rgb {
        parse_hex(&self.bg).unwrap_or(Rgb(0, 0, 0))
    }
}

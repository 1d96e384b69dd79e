//! User configuration, read once per process from `screwtape.toml`.
//!
//! The file lives in the XDG config home (`~/.config/screwtape.toml` on every
//! platform) unless `SCREWTAPE_CONFIG` points elsewhere:
//!
//! ```toml
//! [limits]
//! timeout_ms = 5000
//! max_steps = 1000000
//!
//! [repl]
//! history_size = 500
//!
//! [colors]
//! increment = "#a6e3a1"
//! loop = "magenta"
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use cross_xdg::BaseDirs;
use nu_ansi_term::Color;
use serde::Deserialize;
use tracing::{debug, warn};

pub const CONFIG_ENV: &str = "SCREWTAPE_CONFIG";
const CONFIG_FILE: &str = "screwtape.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, #[source] source: io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub limits: LimitsConfig,
    pub repl: ReplConfig,
    colors: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub timeout_ms: Option<u64>,
    pub max_steps: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    pub history_size: usize,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self { history_size: 1_000 }
    }
}

/// Highlight colors for each Screwtape command in the REPL editor.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub move_right: Color, // '>'
    pub move_left: Color,  // '<'
    pub increment: Color,  // '+'
    pub decrement: Color,  // '-'
    pub output: Color,     // '.'
    pub loop_bracket: Color, // '[' and ']'
    pub comment: Color,
}

// Catppuccin Mocha accents
impl Default for Palette {
    fn default() -> Self {
        Self {
            move_right: Color::Rgb(137, 220, 235),   // sky
            move_left: Color::Rgb(148, 226, 213),    // teal
            increment: Color::Rgb(166, 227, 161),    // green
            decrement: Color::Rgb(243, 139, 168),    // red
            output: Color::Rgb(249, 226, 175),       // yellow
            loop_bracket: Color::Rgb(203, 166, 247), // mauve
            comment: Color::Rgb(108, 112, 134),      // surface2
        }
    }
}

impl Config {
    /// Parse a config document.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config file at `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Highlight palette with `[colors]` entries applied over the defaults.
    /// Unknown keys and unparseable colors are ignored.
    pub fn palette(&self) -> Palette {
        let mut palette = Palette::default();

        macro_rules! set {
            ($field:ident, $key:literal) => {
                if let Some(v) = self.colors.get($key).and_then(|s| parse_color(s)) { palette.$field = v; }
            };
        }

        set!(move_right, "move_right");
        set!(move_left, "move_left");
        set!(increment, "increment");
        set!(decrement, "decrement");
        set!(output, "output");
        set!(loop_bracket, "loop");
        set!(comment, "comment");

        palette
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// The process-wide configuration. Problems loading it are logged and the
/// defaults are used instead.
pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        let Some(path) = config_path() else {
            return Config::default();
        };
        debug!(path = %path.display(), "loading config");
        Config::load_from(&path).unwrap_or_else(|e| {
            warn!("{e}; using default settings");
            Config::default()
        })
    })
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let Ok(base_dirs) = BaseDirs::new() else {
        debug!("no config home; using default settings");
        return None;
    };

    let mut path = PathBuf::from(base_dirs.config_home());
    path.push(CONFIG_FILE);
    Some(path)
}

fn parse_color(value: &str) -> Option<Color> {
    let s = value.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() == 6 && hex.is_ascii() {
            if let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            ) {
                return Some(Color::Rgb(r, g, b));
            }
        }
        return None;
    }

    let name = s.to_ascii_lowercase();
    Some(match name.as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "purple" => Color::Purple,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" => Color::LightGray,
        "darkgray" | "dark_gray" | "darkgrey" | "dark_grey" => Color::DarkGray,
        "lightred" | "light_red" => Color::LightRed,
        "lightgreen" | "light_green" => Color::LightGreen,
        "lightblue" | "light_blue" => Color::LightBlue,
        "lightmagenta" | "light_magenta" => Color::LightMagenta,
        "lightcyan" | "light_cyan" => Color::LightCyan,
        _ => return None,
    })
}

use crate::error::ConfigError;
use chrono::Duration;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const APP_DIR: &str = "fancy-welcome";
pub const CONFIG_FILE: &str = "fancy_welcome.toml";

const DEFAULT_GLOBAL_UPDATE_SECS: f64 = 60.0;
const DEFAULT_STREAM_RETRY_SECS: f64 = 5.0;
const DEFAULT_HEARTBEAT_MILLIS: u64 = 1000;
const DEFAULT_STREAM_FLUSH_MILLIS: u64 = 10;
const MIN_INTERVAL_SECS: f64 = 1.0;
const MAX_INTERVAL_SECS: f64 = 365.0 * 24.0 * 3600.0;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub blocks: BTreeMap<String, BlockConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub enabled_blocks_order: Vec<String>,
    #[serde(default = "default_global_update_seconds")]
    pub global_update_seconds: f64,
    #[serde(default = "default_stream_retry_seconds")]
    pub stream_retry_seconds: f64,
    #[serde(default = "default_heartbeat_millis")]
    pub heartbeat_millis: u64,
    #[serde(default = "default_stream_flush_millis")]
    pub stream_flush_millis: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled_blocks_order: Vec::new(),
            global_update_seconds: DEFAULT_GLOBAL_UPDATE_SECS,
            stream_retry_seconds: DEFAULT_STREAM_RETRY_SECS,
            heartbeat_millis: DEFAULT_HEARTBEAT_MILLIS,
            stream_flush_millis: DEFAULT_STREAM_FLUSH_MILLIS,
        }
    }
}

fn default_global_update_seconds() -> f64 {
    DEFAULT_GLOBAL_UPDATE_SECS
}

fn default_stream_retry_seconds() -> f64 {
    DEFAULT_STREAM_RETRY_SECS
}

fn default_heartbeat_millis() -> u64 {
    DEFAULT_HEARTBEAT_MILLIS
}

fn default_stream_flush_millis() -> u64 {
    DEFAULT_STREAM_FLUSH_MILLIS
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_theme_name")]
    pub selected_theme: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            selected_theme: default_theme_name(),
        }
    }
}

fn default_theme_name() -> String {
    "default".to_string()
}

/// Raw `[blocks.<id>]` table. Which fields are required depends on `type`
/// and is checked when the block is built.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub command: Option<String>,
    pub parser: Option<String>,
    pub renderer: Option<String>,
    pub position: Option<String>,
    pub cache: Option<f64>,
    pub update_seconds: Option<f64>,
    #[serde(default)]
    pub streaming: bool,
    pub run_mode: Option<String>,
    pub listens_to: Option<String>,
    pub count_string: Option<String>,
    pub filter: Option<String>,
    pub facts: Option<String>,
    pub max_lines: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    All,
    Tui,
    Tty,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::All => "all",
            RunMode::Tui => "tui",
            RunMode::Tty => "tty",
        }
    }

    /// Whether a block restricted to `self` runs when the program is in `active` mode.
    pub fn allows(self, active: RunMode) -> bool {
        self == RunMode::All || active == RunMode::All || self == active
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "" | "all" => Ok(RunMode::All),
            "tui" => Ok(RunMode::Tui),
            "tty" => Ok(RunMode::Tty),
            other => Err(format!("unknown run mode: {other}")),
        }
    }
}

impl BlockConfig {
    pub fn run_mode(&self) -> RunMode {
        self.run_mode
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    /// `cache` seconds when positive; otherwise caching is off.
    pub fn cache_duration(&self) -> Option<Duration> {
        match self.cache {
            Some(secs) if secs > 0.0 => Some(seconds(secs)),
            _ => None,
        }
    }
}

impl GeneralConfig {
    /// The block's own `update_seconds` when positive, else the global
    /// default, clamped between one second and one year.
    pub fn effective_interval(&self, block_seconds: Option<f64>) -> Duration {
        let secs = match block_seconds {
            Some(secs) if secs > 0.0 => secs,
            _ => self.global_update_seconds,
        };
        seconds(secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS))
    }

    pub fn stream_retry(&self) -> Duration {
        seconds(
            self.stream_retry_seconds
                .clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS),
        )
    }

    pub fn heartbeat(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.heartbeat_millis.max(50))
    }

    pub fn stream_flush(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.stream_flush_millis.max(1))
    }
}

fn seconds(secs: f64) -> Duration {
    let secs = secs.min(MAX_INTERVAL_SECS);
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

impl Config {
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Enabled block ids in render order, first occurrence wins.
    pub fn enabled_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.general
            .enabled_blocks_order
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

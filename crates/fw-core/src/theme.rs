use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThemeColors {
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub text: String,
    pub error: String,
}

/// Colors are kept as written (`#rrggbb` or an ANSI 256 index); the
/// dashboard converts them for the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
}

fn colors(primary: &str, secondary: &str, background: &str, text: &str, error: &str) -> ThemeColors {
    ThemeColors {
        primary: primary.to_string(),
        secondary: secondary.to_string(),
        background: background.to_string(),
        text: text.to_string(),
        error: error.to_string(),
    }
}

impl Theme {
    pub fn builtin(name: &str) -> Option<Self> {
        let colors = match name {
            "default" => colors("#38bdf8", "#475569", "#0b1220", "#e2e8f0", "#ef4444"),
            "gruvbox" => colors("#8ec07c", "#504945", "#1d2021", "#ebdbb2", "#fb4934"),
            "nord" => colors("#88c0d0", "#4c566a", "#2e3440", "#eceff4", "#bf616a"),
            _ => return None,
        };
        Some(Self {
            name: name.to_string(),
            colors,
        })
    }

    /// `<config_dir>/themes/<name>.toml` first, then the built-ins.
    pub fn load(name: &str, config_dir: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(dir) = config_dir {
            let path = dir.join("themes").join(format!("{name}.toml"));
            if path.exists() {
                let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                debug!(theme = %name, path = %path.display(), "theme_loaded");
                return toml::from_str(&contents)
                    .map_err(|source| ConfigError::Parse { path, source });
            }
        }
        Self::builtin(name).ok_or_else(|| ConfigError::UnknownTheme(name.to_string()))
    }
}

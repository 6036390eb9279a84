use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("block '{block}' is enabled but has no [blocks.{block}] table")]
    MissingBlock { block: String },
    #[error("block '{block}': missing required field '{field}'")]
    MissingField { block: String, field: &'static str },
    #[error("block '{block}': unknown block type '{kind}'")]
    UnknownKind { block: String, kind: String },
    #[error("block '{block}': parser '{name}' is not registered")]
    UnknownParser { block: String, name: String },
    #[error("block '{block}': renderer '{name}' is not registered")]
    UnknownRenderer { block: String, name: String },
    #[error("block '{block}': unknown fact set '{name}'")]
    UnknownFacts { block: String, name: String },
    #[error("theme '{0}' not found")]
    UnknownTheme(String),
    #[error("no config directory available on this platform")]
    NoConfigDir,
}

/// Failure of a single refresh. Travels inside bus messages, so it only
/// carries rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("command failed: {0}")]
    Execution(String),
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("stream failed: {0}")]
    Stream(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

impl From<ParseError> for BlockError {
    fn from(err: ParseError) -> Self {
        BlockError::Parse(err.0)
    }
}

/// Cache failures never leave the cache module as errors; callers see a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

//! Dashboard blocks.
//!
//! Every variant sits behind [`Block`]; the bus and the executor never see a
//! concrete type. Periodic variants (`ShellCommand`, `SystemInfo`) share the
//! scheduling state in `schedule`; observer variants (`WordCounter`,
//! `Filter`) only react to `Observed` broadcasts.

mod filter;
mod schedule;
mod shell_command;
mod system_info;
mod word_counter;

pub use filter::FilterBlock;
pub use schedule::{RefreshState, TransitionError};
pub use shell_command::ShellCommandBlock;
pub use system_info::SystemInfoBlock;
pub use word_counter::WordCounterBlock;

use crate::cache::CacheStore;
use crate::command::Cmd;
use crate::config::{BlockConfig, GeneralConfig};
use crate::error::{BlockError, ConfigError};
use crate::message::Message;
use crate::registry::{Registry, Renderer};
use crate::value::ParsedValue;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const LOADING_MARK: &str = "⟳";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    ShellCommand,
    SystemInfo,
    WordCounter,
    Filter,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::ShellCommand => "ShellCommand",
            BlockKind::SystemInfo => "SystemInfo",
            BlockKind::WordCounter => "WordCounter",
            BlockKind::Filter => "Filter",
        }
    }

    pub fn is_observer(self) -> bool {
        matches!(self, BlockKind::WordCounter | BlockKind::Filter)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().replace('_', "").as_str() {
            "shellcommand" => Ok(BlockKind::ShellCommand),
            "systeminfo" => Ok(BlockKind::SystemInfo),
            "wordcounter" => Ok(BlockKind::WordCounter),
            "filter" => Ok(BlockKind::Filter),
            other => Err(format!("unknown block type: {other}")),
        }
    }
}

/// Layout hint. Consecutive `Left`/`Right` blocks share a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    Left,
    Right,
    #[default]
    Full,
}

impl Position {
    pub fn parse_hint(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_lowercase()).as_deref() {
            Some("left") => Position::Left,
            Some("right") => Position::Right,
            _ => Position::Full,
        }
    }
}

/// Read-only view of a block's runtime state.
#[derive(Debug, Clone)]
pub struct BlockSnapshot {
    pub id: String,
    pub state: RefreshState,
    pub last_result: Option<Arc<ParsedValue>>,
    pub last_error: Option<BlockError>,
    /// `None` for observers, which never schedule themselves.
    pub next_eligible: Option<DateTime<Utc>>,
}

pub trait Block: Send {
    fn id(&self) -> &str;

    fn kind(&self) -> BlockKind;

    fn position(&self) -> Position;

    /// Starts a refresh when the block is idle and due; otherwise a no-op.
    fn check_and_maybe_refresh(&mut self, now: DateTime<Utc>) -> Cmd;

    /// Applies a bus message. Directed messages for other ids are ignored.
    fn receive(&mut self, message: &Message, now: DateTime<Utc>) -> Cmd;

    fn render(&self, width: usize) -> String;

    fn snapshot(&self) -> BlockSnapshot;

    fn preformatted(&self) -> bool {
        false
    }

    fn is_streaming(&self) -> bool {
        false
    }
}

/// Everything a block needs at construction. The registry is injected, not
/// global, so tests can hand in their own.
#[derive(Clone, Copy)]
pub struct BlockContext<'a> {
    pub registry: &'a Registry,
    pub general: &'a GeneralConfig,
    pub cache: &'a CacheStore,
}

pub fn build_block(
    id: &str,
    config: &BlockConfig,
    ctx: BlockContext<'_>,
) -> Result<Box<dyn Block>, ConfigError> {
    let raw_kind = config.kind.as_deref().ok_or_else(|| ConfigError::MissingField {
        block: id.to_string(),
        field: "type",
    })?;
    let kind: BlockKind = raw_kind.parse().map_err(|_| ConfigError::UnknownKind {
        block: id.to_string(),
        kind: raw_kind.to_string(),
    })?;
    let block: Box<dyn Block> = match kind {
        BlockKind::ShellCommand => Box::new(ShellCommandBlock::new(id, config, ctx)?),
        BlockKind::SystemInfo => Box::new(SystemInfoBlock::new(id, config, ctx)?),
        BlockKind::WordCounter => Box::new(WordCounterBlock::new(id, config)?),
        BlockKind::Filter => Box::new(FilterBlock::new(id, config, ctx)?),
    };
    Ok(block)
}

pub(crate) fn required<'c>(
    id: &str,
    value: &'c Option<String>,
    field: &'static str,
) -> Result<&'c str, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField {
            block: id.to_string(),
            field,
        }),
    }
}

pub(crate) fn resolve_renderer(
    id: &str,
    name: &str,
    registry: &Registry,
) -> Result<Arc<dyn Renderer>, ConfigError> {
    registry
        .renderer(name)
        .ok_or_else(|| ConfigError::UnknownRenderer {
            block: id.to_string(),
            name: name.to_string(),
        })
}

use super::shell_command::DEFAULT_MAX_LINES;
use super::{
    required, resolve_renderer, Block, BlockContext, BlockKind, BlockSnapshot, Position,
    RefreshState,
};
use crate::command::Cmd;
use crate::config::BlockConfig;
use crate::error::ConfigError;
use crate::message::{Message, ObservedMode};
use crate::registry::Renderer;
use crate::value::ParsedValue;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;

const DEFAULT_RENDERER: &str = "list";

/// Keeps the lines of another block's data that contain a substring.
pub struct FilterBlock {
    id: String,
    position: Position,
    source: String,
    needle: String,
    max_lines: usize,
    renderer: Arc<dyn Renderer>,
    kept: VecDeque<String>,
}

impl FilterBlock {
    pub fn new(id: &str, config: &BlockConfig, ctx: BlockContext<'_>) -> Result<Self, ConfigError> {
        let renderer = resolve_renderer(
            id,
            config.renderer.as_deref().unwrap_or(DEFAULT_RENDERER),
            ctx.registry,
        )?;
        Ok(Self {
            id: id.to_string(),
            position: Position::parse_hint(config.position.as_deref()),
            source: required(id, &config.listens_to, "listens_to")?.to_string(),
            needle: required(id, &config.filter, "filter")?.to_string(),
            max_lines: config.max_lines.unwrap_or(DEFAULT_MAX_LINES).max(1),
            renderer,
            kept: VecDeque::new(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    fn value(&self) -> ParsedValue {
        ParsedValue::Lines(self.kept.iter().cloned().collect())
    }
}

impl Block for FilterBlock {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Filter
    }

    fn position(&self) -> Position {
        self.position
    }

    fn check_and_maybe_refresh(&mut self, _now: DateTime<Utc>) -> Cmd {
        Cmd::None
    }

    fn receive(&mut self, message: &Message, _now: DateTime<Utc>) -> Cmd {
        let Message::Observed {
            source_id,
            value,
            mode,
        } = message
        else {
            return Cmd::None;
        };
        if *source_id != self.source {
            return Cmd::None;
        }
        if *mode == ObservedMode::Snapshot {
            self.kept.clear();
        }
        for line in value.observable_lines() {
            if !line.contains(&self.needle) {
                continue;
            }
            if self.kept.len() == self.max_lines {
                self.kept.pop_front();
            }
            self.kept.push_back(line);
        }
        Cmd::None
    }

    fn render(&self, width: usize) -> String {
        if self.kept.is_empty() {
            return format!(
                "No lines matching '{}' from '{}'",
                self.needle, self.source
            );
        }
        self.renderer.render(&self.value(), width)
    }

    fn snapshot(&self) -> BlockSnapshot {
        BlockSnapshot {
            id: self.id.clone(),
            state: RefreshState::Idle,
            last_result: Some(Arc::new(self.value())),
            last_error: None,
            next_eligible: None,
        }
    }

    fn preformatted(&self) -> bool {
        self.renderer.preformatted()
    }
}

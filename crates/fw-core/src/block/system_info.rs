use super::schedule::Schedule;
use super::{resolve_renderer, Block, BlockContext, BlockKind, BlockSnapshot, Position};
use crate::command::Cmd;
use crate::config::BlockConfig;
use crate::error::ConfigError;
use crate::facts::FactSet;
use crate::message::Message;
use crate::refresh::{CacheLookup, RefreshJob, Source};
use crate::registry::Renderer;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Periodic block fed by a built-in fact gatherer instead of a user command.
pub struct SystemInfoBlock {
    schedule: Schedule,
    facts: FactSet,
    position: Position,
    renderer: Arc<dyn Renderer>,
}

impl SystemInfoBlock {
    pub fn new(id: &str, config: &BlockConfig, ctx: BlockContext<'_>) -> Result<Self, ConfigError> {
        let facts = match config.facts.as_deref() {
            None => FactSet::Host,
            Some(name) => name.parse().map_err(|_| ConfigError::UnknownFacts {
                block: id.to_string(),
                name: name.to_string(),
            })?,
        };
        let renderer_name = config
            .renderer
            .as_deref()
            .unwrap_or_else(|| facts.default_renderer());
        let renderer = resolve_renderer(id, renderer_name, ctx.registry)?;
        let cache = config.cache_duration().map(|max_age| CacheLookup {
            store: ctx.cache.clone(),
            max_age,
        });

        Ok(Self {
            schedule: Schedule::new(id, ctx.general.effective_interval(config.update_seconds), cache),
            facts,
            position: Position::parse_hint(config.position.as_deref()),
            renderer,
        })
    }

    pub fn facts(&self) -> FactSet {
        self.facts
    }
}

impl Block for SystemInfoBlock {
    fn id(&self) -> &str {
        &self.schedule.id
    }

    fn kind(&self) -> BlockKind {
        BlockKind::SystemInfo
    }

    fn position(&self) -> Position {
        self.position
    }

    fn check_and_maybe_refresh(&mut self, now: DateTime<Utc>) -> Cmd {
        if !self.schedule.try_begin(now) {
            return Cmd::None;
        }
        Cmd::Refresh(RefreshJob {
            block_id: self.schedule.id.clone(),
            source: Source::Facts(self.facts),
            parser: None,
            cache: self.schedule.cache.clone(),
        })
    }

    fn receive(&mut self, message: &Message, now: DateTime<Utc>) -> Cmd {
        match message {
            Message::Heartbeat => self.check_and_maybe_refresh(now),
            Message::TriggerAll => {
                self.schedule.make_eligible(now);
                self.check_and_maybe_refresh(now)
            }
            Message::Tick { block_id } if *block_id == self.schedule.id => self.check_and_maybe_refresh(now),
            Message::FreshData { block_id, result } if *block_id == self.schedule.id => {
                self.schedule.on_fresh(result, now)
            }
            Message::CachedData { block_id, value } if *block_id == self.schedule.id => {
                self.schedule.on_cached(value, now)
            }
            _ => Cmd::None,
        }
    }

    fn render(&self, width: usize) -> String {
        self.schedule.view(self.renderer.as_ref(), width, true)
    }

    fn snapshot(&self) -> BlockSnapshot {
        self.schedule.snapshot()
    }

    fn preformatted(&self) -> bool {
        self.renderer.preformatted()
    }
}

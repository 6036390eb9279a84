use super::schedule::Schedule;
use super::{required, resolve_renderer, Block, BlockContext, BlockKind, BlockSnapshot, Position};
use crate::command::Cmd;
use crate::config::BlockConfig;
use crate::error::{BlockError, ConfigError};
use crate::message::{Message, ObservedMode};
use crate::refresh::{CacheLookup, RefreshJob, Source};
use crate::registry::{Parser, Renderer};
use crate::stream::StreamJob;
use crate::value::ParsedValue;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_MAX_LINES: usize = 200;

#[derive(Debug)]
struct Streaming {
    flush_every: std::time::Duration,
    retry: Duration,
    max_lines: usize,
    lines: VecDeque<String>,
}

/// Runs a shell command, either periodically (parsed into a value) or as a
/// long-lived stream whose lines are kept in a bounded buffer.
pub struct ShellCommandBlock {
    schedule: Schedule,
    command: String,
    position: Position,
    parser: Option<Arc<dyn Parser>>,
    renderer: Arc<dyn Renderer>,
    streaming: Option<Streaming>,
}

impl ShellCommandBlock {
    pub fn new(id: &str, config: &BlockConfig, ctx: BlockContext<'_>) -> Result<Self, ConfigError> {
        let command = required(id, &config.command, "command")?.to_string();
        let renderer = resolve_renderer(id, required(id, &config.renderer, "renderer")?, ctx.registry)?;

        // Stream lines bypass the parser, so it is only required for periodic runs.
        let parser = match (config.parser.as_deref(), config.streaming) {
            (None, true) => None,
            _ => {
                let name = required(id, &config.parser, "parser")?;
                Some(ctx.registry.parser(name).ok_or_else(|| ConfigError::UnknownParser {
                    block: id.to_string(),
                    name: name.to_string(),
                })?)
            }
        };

        let streaming = config.streaming.then(|| Streaming {
            flush_every: ctx.general.stream_flush(),
            retry: ctx.general.stream_retry(),
            max_lines: config.max_lines.unwrap_or(DEFAULT_MAX_LINES).max(1),
            lines: VecDeque::new(),
        });
        let cache = match (&streaming, config.cache_duration()) {
            (None, Some(max_age)) => Some(CacheLookup {
                store: ctx.cache.clone(),
                max_age,
            }),
            _ => None,
        };

        Ok(Self {
            schedule: Schedule::new(id, ctx.general.effective_interval(config.update_seconds), cache),
            command,
            position: Position::parse_hint(config.position.as_deref()),
            parser,
            renderer,
            streaming,
        })
    }

    fn on_stream_batch(&mut self, lines: &Arc<Vec<String>>) -> Cmd {
        let Some(stream) = self.streaming.as_mut() else {
            return Cmd::None;
        };
        for line in lines.iter() {
            if stream.lines.len() == stream.max_lines {
                stream.lines.pop_front();
            }
            stream.lines.push_back(line.clone());
        }
        self.schedule.last_result = Some(Arc::new(ParsedValue::Lines(
            stream.lines.iter().cloned().collect(),
        )));
        self.schedule.last_error = None;
        Cmd::Deliver(Message::Observed {
            source_id: self.schedule.id.clone(),
            value: Arc::new(ParsedValue::Lines(lines.to_vec())),
            mode: ObservedMode::Append,
        })
    }

    fn on_stream_closed(&mut self, error: &Option<BlockError>, now: DateTime<Utc>) -> Cmd {
        let Some(stream) = self.streaming.as_ref() else {
            return Cmd::None;
        };
        let delay = match error {
            Some(err) => {
                warn!(block = %self.schedule.id, "stream_failed: {err}");
                self.schedule.last_error = Some(err.clone());
                stream.retry
            }
            None => {
                info!(block = %self.schedule.id, "stream_ended");
                self.schedule.interval
            }
        };
        self.schedule.rearm(now, delay)
    }
}

impl Block for ShellCommandBlock {
    fn id(&self) -> &str {
        &self.schedule.id
    }

    fn kind(&self) -> BlockKind {
        BlockKind::ShellCommand
    }

    fn position(&self) -> Position {
        self.position
    }

    fn check_and_maybe_refresh(&mut self, now: DateTime<Utc>) -> Cmd {
        if !self.schedule.try_begin(now) {
            return Cmd::None;
        }
        match &self.streaming {
            Some(stream) => Cmd::Stream(StreamJob {
                block_id: self.schedule.id.clone(),
                command: self.command.clone(),
                flush_every: stream.flush_every,
            }),
            None => Cmd::Refresh(RefreshJob {
                block_id: self.schedule.id.clone(),
                source: Source::Shell(self.command.clone()),
                parser: self.parser.clone(),
                cache: self.schedule.cache.clone(),
            }),
        }
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
            Message::StreamBatch { block_id, lines } if *block_id == self.schedule.id => {
                self.on_stream_batch(lines)
            }
            Message::StreamClosed { block_id, error } if *block_id == self.schedule.id => {
                self.on_stream_closed(error, now)
            }
            _ => Cmd::None,
        }
    }

    fn render(&self, width: usize) -> String {
        self.schedule
            .view(self.renderer.as_ref(), width, self.streaming.is_none())
    }

    fn snapshot(&self) -> BlockSnapshot {
        self.schedule.snapshot()
    }

    fn preformatted(&self) -> bool {
        self.renderer.preformatted()
    }

    fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::config::GeneralConfig;
    use crate::registry::Registry;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn build(config: BlockConfig) -> ShellCommandBlock {
        let registry = Registry::with_builtins();
        let general = GeneralConfig::default();
        let cache = CacheStore::new("/tmp/fw-unused");
        ShellCommandBlock::new(
            "log_tail",
            &config,
            BlockContext {
                registry: &registry,
                general: &general,
                cache: &cache,
            },
        )
        .expect("build")
    }

    fn streaming_config(max_lines: usize) -> BlockConfig {
        BlockConfig {
            kind: Some("ShellCommand".into()),
            command: Some("tail -f /var/log/syslog".into()),
            renderer: Some("list".into()),
            streaming: true,
            max_lines: Some(max_lines),
            ..BlockConfig::default()
        }
    }

    #[test]
    fn periodic_block_requires_parser() {
        let registry = Registry::with_builtins();
        let general = GeneralConfig::default();
        let cache = CacheStore::new("/tmp/fw-unused");
        let config = BlockConfig {
            command: Some("uptime".into()),
            renderer: Some("raw_text".into()),
            ..BlockConfig::default()
        };
        let err = ShellCommandBlock::new(
            "uptime",
            &config,
            BlockContext {
                registry: &registry,
                general: &general,
                cache: &cache,
            },
        )
        .err()
        .expect("missing parser");
        assert!(matches!(err, ConfigError::MissingField { field: "parser", .. }));
    }

    #[test]
    fn stream_buffer_keeps_the_newest_lines() {
        let mut block = build(streaming_config(2));
        assert!(matches!(block.check_and_maybe_refresh(t(0)), Cmd::Stream(_)));

        let batch = Arc::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        let cmd = block.receive(
            &Message::StreamBatch {
                block_id: "log_tail".into(),
                lines: batch,
            },
            t(1),
        );
        match cmd {
            Cmd::Deliver(Message::Observed { value, mode, .. }) => {
                assert_eq!(mode, ObservedMode::Append);
                assert_eq!(value.observable_lines().len(), 3);
            }
            other => panic!("unexpected {}", other.label()),
        }
        assert_eq!(block.render(80), "- b\n- c");
    }

    #[test]
    fn failed_stream_retries_after_backoff() {
        let mut block = build(streaming_config(10));
        block.check_and_maybe_refresh(t(0));
        let cmd = block.receive(
            &Message::StreamClosed {
                block_id: "log_tail".into(),
                error: Some(BlockError::Stream("process exited with exit status: 1".into())),
            },
            t(3),
        );
        assert!(matches!(cmd, Cmd::TickAt { at, .. } if at == t(8)));
        assert!(block.render(80).starts_with("Error in 'log_tail': stream failed"));
        assert!(matches!(block.check_and_maybe_refresh(t(5)), Cmd::None));
        assert!(matches!(block.check_and_maybe_refresh(t(8)), Cmd::Stream(_)));
    }

    #[test]
    fn absurd_update_interval_still_rearms() {
        let mut block = build(BlockConfig {
            command: Some("uptime".into()),
            parser: Some("single_line".into()),
            renderer: Some("raw_text".into()),
            update_seconds: Some(1e13),
            ..BlockConfig::default()
        });
        assert!(matches!(block.check_and_maybe_refresh(t(0)), Cmd::Refresh(_)));
        let cmd = block.receive(
            &Message::FreshData {
                block_id: "log_tail".into(),
                result: Ok(Arc::new(ParsedValue::from("up 3 days"))),
            },
            t(1),
        );
        let year_out = t(1) + Duration::days(365);
        assert!(cmd
            .flatten()
            .iter()
            .any(|cmd| matches!(cmd, Cmd::TickAt { at, .. } if *at == year_out)));
        assert_eq!(block.render(80), "up 3 days");
    }

    #[test]
    fn messages_for_other_blocks_are_ignored() {
        let mut block = build(streaming_config(10));
        block.check_and_maybe_refresh(t(0));
        let cmd = block.receive(&Message::stream_batch("other", vec!["x".into()]), t(1));
        assert!(cmd.is_none());
        assert!(block.snapshot().last_result.is_none());
    }
}

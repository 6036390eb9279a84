use super::{required, Block, BlockKind, BlockSnapshot, Position, RefreshState};
use crate::command::Cmd;
use crate::config::BlockConfig;
use crate::error::ConfigError;
use crate::message::{Message, ObservedMode};
use crate::value::ParsedValue;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Counts lines of another block's data that contain a substring.
pub struct WordCounterBlock {
    id: String,
    position: Position,
    source: String,
    pattern: String,
    count: usize,
    seen_data: bool,
}

impl WordCounterBlock {
    pub fn new(id: &str, config: &BlockConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            id: id.to_string(),
            position: Position::parse_hint(config.position.as_deref()),
            source: required(id, &config.listens_to, "listens_to")?.to_string(),
            pattern: required(id, &config.count_string, "count_string")?.to_string(),
            count: 0,
            seen_data: false,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn matches_in(&self, value: &ParsedValue) -> usize {
        value
            .observable_lines()
            .iter()
            .filter(|line| line.contains(&self.pattern))
            .count()
    }
}

impl Block for WordCounterBlock {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BlockKind {
        BlockKind::WordCounter
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
        let found = self.matches_in(value);
        self.count = match mode {
            ObservedMode::Snapshot => found,
            ObservedMode::Append => self.count + found,
        };
        self.seen_data = true;
        debug!(block = %self.id, source = %self.source, count = self.count, "counted");
        Cmd::None
    }

    fn render(&self, _width: usize) -> String {
        if !self.seen_data {
            return format!("Waiting for data from '{}'...", self.source);
        }
        format!(
            "'{}' seen in '{}': {} times",
            self.pattern, self.source, self.count
        )
    }

    fn snapshot(&self) -> BlockSnapshot {
        BlockSnapshot {
            id: self.id.clone(),
            state: RefreshState::Idle,
            last_result: self
                .seen_data
                .then(|| Arc::new(ParsedValue::Text(self.count.to_string()))),
            last_error: None,
            next_eligible: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> WordCounterBlock {
        WordCounterBlock::new(
            "err_counter",
            &BlockConfig {
                listens_to: Some("log_tail".into()),
                count_string: Some("ERROR".into()),
                ..BlockConfig::default()
            },
        )
        .expect("build")
    }

    fn observed(source: &str, value: ParsedValue, mode: ObservedMode) -> Message {
        Message::Observed {
            source_id: source.into(),
            value: Arc::new(value),
            mode,
        }
    }

    #[test]
    fn text_counts_once_and_lines_count_each() {
        let mut block = counter();
        let now = Utc::now();
        block.receive(
            &observed("log_tail", ParsedValue::from("ERROR ERROR"), ObservedMode::Snapshot),
            now,
        );
        assert_eq!(block.count(), 1);

        let lines = ParsedValue::Lines(vec!["ERROR a".into(), "ok".into(), "x ERROR".into()]);
        block.receive(&observed("log_tail", lines, ObservedMode::Snapshot), now);
        assert_eq!(block.count(), 2);
        assert_eq!(block.render(80), "'ERROR' seen in 'log_tail': 2 times");
    }

    #[test]
    fn append_accumulates_and_other_sources_are_ignored() {
        let mut block = counter();
        let now = Utc::now();
        let batch = |lines: &[&str]| {
            ParsedValue::Lines(lines.iter().map(|line| line.to_string()).collect())
        };
        block.receive(
            &observed("log_tail", batch(&["INFO x", "ERROR y"]), ObservedMode::Append),
            now,
        );
        block.receive(
            &observed("other", batch(&["ERROR nope"]), ObservedMode::Append),
            now,
        );
        block.receive(
            &observed("log_tail", batch(&["ERROR z"]), ObservedMode::Append),
            now,
        );
        assert_eq!(block.count(), 2);
    }

    #[test]
    fn missing_fields_are_config_errors() {
        let err = WordCounterBlock::new("c", &BlockConfig::default())
            .err()
            .expect("missing listens_to");
        assert!(matches!(err, ConfigError::MissingField { field: "listens_to", .. }));
    }
}

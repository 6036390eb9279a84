use crate::error::BlockError;
use crate::value::ParsedValue;
use std::sync::Arc;

/// How an observer should fold an [`Message::Observed`] value into its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedMode {
    /// A complete refresh result; replaces whatever was derived before.
    Snapshot,
    /// An increment of a stream; accumulates.
    Append,
}

/// Delivery class of a message, decided by its variant alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Broadcast,
    Directed(&'a str),
}

#[derive(Debug, Clone)]
pub enum Message {
    /// Global safety-net eligibility check.
    Heartbeat,
    /// Manual "refresh everything now".
    TriggerAll,
    Tick {
        block_id: String,
    },
    FreshData {
        block_id: String,
        result: Result<Arc<ParsedValue>, BlockError>,
    },
    CachedData {
        block_id: String,
        value: Arc<ParsedValue>,
    },
    StreamBatch {
        block_id: String,
        lines: Arc<Vec<String>>,
    },
    StreamClosed {
        block_id: String,
        error: Option<BlockError>,
    },
    Observed {
        source_id: String,
        value: Arc<ParsedValue>,
        mode: ObservedMode,
    },
}

impl Message {
    pub fn target(&self) -> Target<'_> {
        match self {
            Message::Heartbeat | Message::TriggerAll | Message::Observed { .. } => Target::Broadcast,
            Message::Tick { block_id }
            | Message::FreshData { block_id, .. }
            | Message::CachedData { block_id, .. }
            | Message::StreamBatch { block_id, .. }
            | Message::StreamClosed { block_id, .. } => Target::Directed(block_id),
        }
    }

    /// True for the messages that end a non-streaming refresh.
    pub fn ends_refresh(&self) -> bool {
        matches!(
            self,
            Message::FreshData { .. } | Message::CachedData { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Message::Heartbeat => "heartbeat",
            Message::TriggerAll => "trigger_all",
            Message::Tick { .. } => "tick",
            Message::FreshData { .. } => "fresh_data",
            Message::CachedData { .. } => "cached_data",
            Message::StreamBatch { .. } => "stream_batch",
            Message::StreamClosed { .. } => "stream_closed",
            Message::Observed { .. } => "observed",
        }
    }

    pub fn fresh(block_id: &str, result: Result<ParsedValue, BlockError>) -> Self {
        Message::FreshData {
            block_id: block_id.to_string(),
            result: result.map(Arc::new),
        }
    }

    pub fn tick(block_id: &str) -> Self {
        Message::Tick {
            block_id: block_id.to_string(),
        }
    }

    pub fn stream_batch(block_id: &str, lines: Vec<String>) -> Self {
        Message::StreamBatch {
            block_id: block_id.to_string(),
            lines: Arc::new(lines),
        }
    }
}

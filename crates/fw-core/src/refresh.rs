use crate::cache::CacheStore;
use crate::error::BlockError;
use crate::facts::FactSet;
use crate::message::Message;
use crate::registry::Parser;
use crate::value::ParsedValue;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

const ERROR_SNIPPET_CHARS: usize = 160;

#[derive(Debug, Clone)]
pub enum Source {
    Shell(String),
    Facts(FactSet),
}

#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub store: CacheStore,
    pub max_age: Duration,
}

/// One non-streaming refresh: consult the cache, otherwise run the source
/// and parse its output. Always resolves to exactly one terminal message.
pub struct RefreshJob {
    pub block_id: String,
    pub source: Source,
    pub parser: Option<Arc<dyn Parser>>,
    pub cache: Option<CacheLookup>,
}

impl fmt::Debug for RefreshJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshJob")
            .field("block_id", &self.block_id)
            .field("source", &self.source)
            .field("parser", &self.parser.as_ref().map(|_| "..."))
            .field("cache", &self.cache)
            .finish()
    }
}

impl RefreshJob {
    pub async fn run(self, now: DateTime<Utc>) -> Message {
        if let Some(lookup) = &self.cache {
            let store = lookup.store.clone();
            let id = self.block_id.clone();
            let entry = tokio::task::spawn_blocking(move || store.load(&id))
                .await
                .ok()
                .flatten();
            if let Some(entry) = entry {
                if entry.is_fresh(now, lookup.max_age) {
                    info!(block = %self.block_id, "cache_hit");
                    return Message::CachedData {
                        block_id: self.block_id,
                        value: Arc::new(entry.parsed_data),
                    };
                }
                debug!(block = %self.block_id, "cache_expired");
            }
        }

        let result = self.execute().await;
        if let Err(err) = &result {
            warn!(block = %self.block_id, "refresh_failed: {err}");
        }
        Message::fresh(&self.block_id, result)
    }

    async fn execute(&self) -> Result<ParsedValue, BlockError> {
        match &self.source {
            Source::Facts(set) => Ok(set.gather().await),
            Source::Shell(command) => {
                info!(block = %self.block_id, command = %command, "executing");
                let raw = run_shell(command).await?;
                match &self.parser {
                    Some(parser) => Ok(parser.parse(&raw)?),
                    None => Ok(ParsedValue::Text(raw)),
                }
            }
        }
    }
}

/// Runs `sh -c <command>` to completion, returning stdout followed by stderr.
/// A non-zero exit status is the only failure signal.
pub async fn run_shell(command: &str) -> Result<String, BlockError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|err| BlockError::Execution(format!("failed to start: {err}")))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        return Ok(combined);
    }
    let snippet: String = combined.trim().chars().take(ERROR_SNIPPET_CHARS).collect();
    if snippet.is_empty() {
        Err(BlockError::Execution(output.status.to_string()))
    } else {
        Err(BlockError::Execution(format!("{}: {snippet}", output.status)))
    }
}

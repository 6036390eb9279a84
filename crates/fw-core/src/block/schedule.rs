use super::{BlockSnapshot, LOADING_MARK};
use crate::cache::CacheEntry;
use crate::command::Cmd;
use crate::error::BlockError;
use crate::message::{Message, ObservedMode};
use crate::refresh::CacheLookup;
use crate::registry::Renderer;
use crate::value::ParsedValue;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    Refreshing,
}

impl RefreshState {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshState::Idle => "idle",
            RefreshState::Refreshing => "refreshing",
        }
    }

    pub fn is_refreshing(self) -> bool {
        self == RefreshState::Refreshing
    }

    /// `Idle -> Refreshing`. Anything else means a refresh is already in flight.
    pub fn begin(&mut self) -> Result<(), TransitionError> {
        match self {
            RefreshState::Idle => {
                *self = RefreshState::Refreshing;
                Ok(())
            }
            RefreshState::Refreshing => Err(TransitionError {
                from: *self,
                to: RefreshState::Refreshing,
            }),
        }
    }

    /// `Refreshing -> Idle`, on a terminal message.
    pub fn finish(&mut self) -> Result<(), TransitionError> {
        match self {
            RefreshState::Refreshing => {
                *self = RefreshState::Idle;
                Ok(())
            }
            RefreshState::Idle => Err(TransitionError {
                from: *self,
                to: RefreshState::Idle,
            }),
        }
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal refresh transition {from} -> {to}")]
pub struct TransitionError {
    pub from: RefreshState,
    pub to: RefreshState,
}

/// Scheduling and result state shared by the periodic blocks.
#[derive(Debug, Clone)]
pub(crate) struct Schedule {
    pub id: String,
    pub interval: Duration,
    pub cache: Option<CacheLookup>,
    pub state: RefreshState,
    pub next_eligible: DateTime<Utc>,
    pub last_result: Option<Arc<ParsedValue>>,
    pub last_error: Option<BlockError>,
}

impl Schedule {
    pub fn new(id: &str, interval: Duration, cache: Option<CacheLookup>) -> Self {
        Self {
            id: id.to_string(),
            interval,
            cache,
            state: RefreshState::Idle,
            next_eligible: DateTime::<Utc>::MIN_UTC,
            last_result: None,
            last_error: None,
        }
    }

    /// Enters `Refreshing` when idle and due. The caller builds the job.
    pub fn try_begin(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.next_eligible {
            return false;
        }
        self.state.begin().is_ok()
    }

    pub fn make_eligible(&mut self, now: DateTime<Utc>) {
        if self.next_eligible > now {
            self.next_eligible = now;
        }
    }

    /// Leaves `Refreshing` and arms the next check `delay` from `now`.
    pub fn rearm(&mut self, now: DateTime<Utc>, delay: Duration) -> Cmd {
        if let Err(err) = self.state.finish() {
            warn!(block = %self.id, "stray_terminal: {err}");
            return Cmd::None;
        }
        self.next_eligible = now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC);
        debug!(block = %self.id, next = %self.next_eligible, "rearmed");
        Cmd::TickAt {
            block_id: self.id.clone(),
            at: self.next_eligible,
        }
    }

    pub fn on_fresh(
        &mut self,
        result: &Result<Arc<ParsedValue>, BlockError>,
        now: DateTime<Utc>,
    ) -> Cmd {
        let mut cmds = Vec::new();
        match result {
            Ok(value) => {
                self.last_result = Some(Arc::clone(value));
                self.last_error = None;
                if self.cache.is_some() {
                    cmds.push(Cmd::WriteCache {
                        block_id: self.id.clone(),
                        entry: CacheEntry::new(now, (**value).clone()),
                    });
                }
                cmds.push(self.observed(value));
            }
            Err(err) => self.last_error = Some(err.clone()),
        }
        cmds.push(self.rearm(now, self.interval));
        Cmd::batch(cmds)
    }

    pub fn on_cached(&mut self, value: &Arc<ParsedValue>, now: DateTime<Utc>) -> Cmd {
        self.last_result = Some(Arc::clone(value));
        self.last_error = None;
        let observed = self.observed(value);
        Cmd::batch([observed, self.rearm(now, self.interval)])
    }

    fn observed(&self, value: &Arc<ParsedValue>) -> Cmd {
        Cmd::Deliver(Message::Observed {
            source_id: self.id.clone(),
            value: Arc::clone(value),
            mode: ObservedMode::Snapshot,
        })
    }

    pub fn snapshot(&self) -> BlockSnapshot {
        BlockSnapshot {
            id: self.id.clone(),
            state: self.state,
            last_result: self.last_result.clone(),
            last_error: self.last_error.clone(),
            next_eligible: Some(self.next_eligible),
        }
    }

    /// Error first, then data, then a loading placeholder.
    pub fn view(&self, renderer: &dyn Renderer, width: usize, mark_refresh: bool) -> String {
        let body = if let Some(err) = &self.last_error {
            format!("Error in '{}': {err}", self.id)
        } else if let Some(value) = &self.last_result {
            renderer.render(value, width)
        } else if self.state.is_refreshing() {
            return format!("{LOADING_MARK} loading {}...", self.id);
        } else {
            return "...".to_string();
        };
        if mark_refresh && self.state.is_refreshing() {
            format!("{body}\n{LOADING_MARK} refreshing")
        } else {
            body
        }
    }
}

use crate::bus::Bus;
use crate::cache::CacheStore;
use crate::command::Cmd;
use crate::message::Message;
use crate::stream;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const MESSAGE_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Interactive dashboard: timers fire, streams run, cache writes go to
    /// the blocking pool.
    Live,
    /// Single pass for plain output: no timers, no streams, cache writes
    /// land before the pass finishes.
    OneShot,
}

/// Turns `Cmd` effects into tasks whose results come back as messages.
#[derive(Clone)]
pub struct Executor {
    tx: mpsc::Sender<Message>,
    mode: ExecMode,
}

impl Executor {
    pub fn new(tx: mpsc::Sender<Message>, mode: ExecMode) -> Self {
        Self { tx, mode }
    }

    pub fn channel(mode: ExecMode) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(MESSAGE_QUEUE_CAPACITY);
        (Self::new(tx, mode), rx)
    }

    pub fn sender(&self) -> mpsc::Sender<Message> {
        self.tx.clone()
    }

    /// Returns how many refresh jobs were launched, so callers can wait for
    /// their terminal messages.
    pub fn execute(&self, cmd: Cmd, cache: &CacheStore) -> usize {
        let mut launched = 0;
        for cmd in cmd.flatten() {
            debug!(cmd = cmd.label(), "execute");
            match cmd {
                Cmd::None | Cmd::Batch(_) => {}
                Cmd::Refresh(job) => {
                    launched += 1;
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let message = job.run(Utc::now()).await;
                        let _ = tx.send(message).await;
                    });
                }
                Cmd::Stream(job) => {
                    if self.mode == ExecMode::OneShot {
                        warn!(block = %job.block_id, "stream_skipped_in_one_shot");
                        continue;
                    }
                    tokio::spawn(stream::pump(job, self.tx.clone()));
                }
                Cmd::TickAt { block_id, at } => {
                    if self.mode == ExecMode::OneShot {
                        continue;
                    }
                    let delay = (at - Utc::now()).to_std().unwrap_or_default();
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(Message::Tick { block_id }).await;
                    });
                }
                Cmd::WriteCache { block_id, entry } => match self.mode {
                    ExecMode::OneShot => {
                        if let Err(err) = cache.store(&block_id, &entry) {
                            warn!(block = %block_id, "cache_write_failed: {err}");
                        }
                    }
                    ExecMode::Live => {
                        let cache = cache.clone();
                        tokio::task::spawn_blocking(move || {
                            if let Err(err) = cache.store(&block_id, &entry) {
                                warn!(block = %block_id, "cache_write_failed: {err}");
                            }
                        });
                    }
                },
                Cmd::Deliver(message) => {
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(message).await;
                    });
                }
            }
        }
        launched
    }
}

/// One heartbeat, then pump the bus until every refresh it started has
/// reported back. Used for plain output.
pub async fn run_once(
    bus: &mut Bus,
    executor: &Executor,
    cache: &CacheStore,
    rx: &mut mpsc::Receiver<Message>,
) {
    let mut pending = 0usize;
    for cmd in bus.dispatch(Message::Heartbeat, Utc::now()) {
        pending += executor.execute(cmd, cache);
    }
    while pending > 0 {
        let Some(message) = rx.recv().await else {
            break;
        };
        if message.ends_refresh() {
            pending -= 1;
        }
        for cmd in bus.dispatch(message, Utc::now()) {
            pending += executor.execute(cmd, cache);
        }
    }
}

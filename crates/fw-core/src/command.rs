use crate::cache::CacheEntry;
use crate::message::Message;
use crate::refresh::RefreshJob;
use crate::stream::StreamJob;
use chrono::{DateTime, Utc};

/// Side effects requested by a block. Blocks never perform I/O themselves;
/// the bus hands these to the executor.
#[derive(Debug, Default)]
pub enum Cmd {
    #[default]
    None,
    Batch(Vec<Cmd>),
    /// Feed a message back into the same dispatch step.
    Deliver(Message),
    /// Run a data source to completion off the loop.
    Refresh(RefreshJob),
    /// Start a long-lived source pumped by the stream reader.
    Stream(StreamJob),
    /// Post `Tick` for `block_id` once `at` is reached.
    TickAt {
        block_id: String,
        at: DateTime<Utc>,
    },
    WriteCache {
        block_id: String,
        entry: CacheEntry,
    },
}

impl Cmd {
    pub fn none() -> Self {
        Cmd::None
    }

    pub fn batch(cmds: impl IntoIterator<Item = Cmd>) -> Self {
        let mut cmds: Vec<Cmd> = cmds.into_iter().filter(|cmd| !cmd.is_none()).collect();
        match cmds.len() {
            0 => Cmd::None,
            1 => cmds.remove(0),
            _ => Cmd::Batch(cmds),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Cmd::None)
    }

    /// Expands nested batches and drops no-ops.
    pub fn flatten(self) -> Vec<Cmd> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<Cmd>) {
        match self {
            Cmd::None => {}
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    cmd.flatten_into(out);
                }
            }
            other => out.push(other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Cmd::None => "none",
            Cmd::Batch(_) => "batch",
            Cmd::Deliver(_) => "deliver",
            Cmd::Refresh(_) => "refresh",
            Cmd::Stream(_) => "stream",
            Cmd::TickAt { .. } => "tick_at",
            Cmd::WriteCache { .. } => "write_cache",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_collapses_noops() {
        assert!(Cmd::batch([Cmd::None, Cmd::None]).is_none());
        let single = Cmd::batch([Cmd::None, Cmd::Deliver(Message::Heartbeat)]);
        assert!(matches!(single, Cmd::Deliver(Message::Heartbeat)));
    }

    #[test]
    fn flatten_expands_nested_batches_in_order() {
        let cmd = Cmd::Batch(vec![
            Cmd::Deliver(Message::tick("a")),
            Cmd::Batch(vec![Cmd::None, Cmd::Deliver(Message::tick("b"))]),
            Cmd::Deliver(Message::tick("c")),
        ]);
        let ids: Vec<String> = cmd
            .flatten()
            .into_iter()
            .map(|cmd| match cmd {
                Cmd::Deliver(Message::Tick { block_id }) => block_id,
                other => panic!("unexpected {}", other.label()),
            })
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}

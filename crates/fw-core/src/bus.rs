use crate::block::Block;
use crate::command::Cmd;
use crate::message::{Message, Target};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Routes messages to blocks in display order. Directed messages reach only
/// their block; broadcasts reach every block. `Deliver` commands produced
/// along the way are dispatched in the same call, everything else is handed
/// back for the executor.
pub struct Bus {
    blocks: Vec<Box<dyn Block>>,
    index: HashMap<String, usize>,
}

impl Bus {
    pub fn new(blocks: Vec<Box<dyn Block>>) -> Self {
        let index = blocks
            .iter()
            .enumerate()
            .map(|(pos, block)| (block.id().to_string(), pos))
            .collect();
        Self { blocks, index }
    }

    pub fn blocks(&self) -> &[Box<dyn Block>] {
        &self.blocks
    }

    pub fn block(&self, id: &str) -> Option<&dyn Block> {
        self.index.get(id).map(|&pos| self.blocks[pos].as_ref())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn dispatch(&mut self, message: Message, now: DateTime<Utc>) -> Vec<Cmd> {
        let mut queue = VecDeque::from([message]);
        let mut effects = Vec::new();
        while let Some(message) = queue.pop_front() {
            let produced = match message.target() {
                Target::Directed(id) => match self.index.get(id) {
                    Some(&pos) => self.blocks[pos].receive(&message, now),
                    None => {
                        debug!(block = %id, kind = message.label(), "message_for_unknown_block");
                        Cmd::None
                    }
                },
                Target::Broadcast => Cmd::batch(
                    self.blocks
                        .iter_mut()
                        .map(|block| block.receive(&message, now))
                        .collect::<Vec<_>>(),
                ),
            };
            for cmd in produced.flatten() {
                match cmd {
                    Cmd::Deliver(next) => queue.push_back(next),
                    other => effects.push(other),
                }
            }
        }
        effects
    }
}

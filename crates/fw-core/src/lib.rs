//! Core of the fancy-welcome dashboard: blocks, the message bus that drives
//! them, and the effects (commands, streams, cache) they request.

pub mod block;
pub mod bus;
pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod facts;
pub mod message;
pub mod parsers;
pub mod refresh;
pub mod registry;
pub mod renderers;
pub mod runtime;
pub mod setup;
pub mod stream;
pub mod theme;
pub mod value;

pub use block::{Block, BlockKind, BlockSnapshot, Position, RefreshState};
pub use bus::Bus;
pub use cache::{CacheEntry, CacheStore};
pub use command::Cmd;
pub use config::{BlockConfig, Config, GeneralConfig, RunMode};
pub use error::{BlockError, CacheError, ConfigError, ParseError};
pub use message::{Message, ObservedMode};
pub use registry::{Parser, Registry, Renderer};
pub use runtime::{ExecMode, Executor};
pub use theme::Theme;
pub use value::ParsedValue;

use fw_core::block::BlockKind;
use fw_core::runtime::run_once;
use fw_core::setup::build_blocks;
use fw_core::{Block as _, Bus, CacheStore, Config, ExecMode, Executor, Registry, RunMode};
use std::fmt::Write as _;
use tracing::info;

const PLAIN_WIDTH: usize = 80;
const SEPARATOR: &str = "---";

/// Runs every non-streaming block once and returns their views, each
/// followed by a separator line.
pub async fn dump(config: &Config, registry: &Registry, cache: &CacheStore) -> String {
    let active = build_blocks(config, registry, cache, RunMode::Tty);
    let mut bus = Bus::new(active.blocks);
    let (executor, mut rx) = Executor::channel(ExecMode::OneShot);
    run_once(&mut bus, &executor, cache, &mut rx).await;
    info!(blocks = bus.len(), skipped = active.rejected.len(), "plain_dump_ready");

    let mut out = String::new();
    for err in &active.rejected {
        let _ = writeln!(out, "Error: {err}\n{SEPARATOR}");
    }
    for block in bus.blocks() {
        let _ = writeln!(out, "{}\n{SEPARATOR}", block.render(PLAIN_WIDTH));
    }
    out
}

/// One line per enabled observer block: what it listens to and for what.
pub fn list_observers(config: &Config) -> String {
    let mut out = String::new();
    for id in config.enabled_ids() {
        let Some(block) = config.blocks.get(id) else {
            continue;
        };
        let kind = block.kind.as_deref().and_then(|raw| raw.parse::<BlockKind>().ok());
        let pattern = match kind {
            Some(BlockKind::WordCounter) => block.count_string.as_deref(),
            Some(BlockKind::Filter) => block.filter.as_deref(),
            _ => continue,
        };
        let _ = writeln!(
            out,
            "{id} ({}): '{}' from '{}'",
            kind.map(BlockKind::as_str).unwrap_or_default(),
            pattern.unwrap_or_default(),
            block.listens_to.as_deref().unwrap_or_default(),
        );
    }
    if out.is_empty() {
        out.push_str("No observer blocks enabled.\n");
    }
    out
}

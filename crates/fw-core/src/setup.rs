use crate::block::{build_block, Block, BlockContext};
use crate::cache::CacheStore;
use crate::config::{Config, RunMode};
use crate::error::ConfigError;
use crate::registry::Registry;
use tracing::{info, warn};

/// Blocks that made it through validation, in display order, plus the
/// per-block configuration errors that kept the others out.
pub struct ActiveBlocks {
    pub blocks: Vec<Box<dyn Block>>,
    pub rejected: Vec<ConfigError>,
}

/// Builds every enabled block allowed in `mode`. A bad block is logged and
/// skipped; it never stops the others.
pub fn build_blocks(
    config: &Config,
    registry: &Registry,
    cache: &CacheStore,
    mode: RunMode,
) -> ActiveBlocks {
    let ctx = BlockContext {
        registry,
        general: &config.general,
        cache,
    };
    let mut blocks = Vec::new();
    let mut rejected = Vec::new();

    for id in config.enabled_ids() {
        let Some(block_config) = config.blocks.get(id) else {
            warn!(block = %id, "block_missing_table");
            rejected.push(ConfigError::MissingBlock {
                block: id.to_string(),
            });
            continue;
        };
        if !block_config.run_mode().allows(mode) {
            info!(block = %id, run_mode = %block_config.run_mode(), active = %mode, "block_skipped");
            continue;
        }
        if mode == RunMode::Tty && block_config.streaming {
            info!(block = %id, "stream_skipped_in_plain_mode");
            continue;
        }
        match build_block(id, block_config, ctx) {
            Ok(block) => blocks.push(block),
            Err(err) => {
                warn!(block = %id, "block_rejected: {err}");
                rejected.push(err);
            }
        }
    }
    ActiveBlocks { blocks, rejected }
}

/// Handles `--refresh <id|all>`: drops cache files so the next check runs
/// the command.
pub fn invalidate_requested(config: &Config, cache: &CacheStore, target: &str) {
    if target == "all" {
        info!("cache_invalidate_all");
        cache.invalidate_all(config.enabled_ids());
    } else {
        info!(block = %target, "cache_invalidate");
        cache.invalidate(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const CONFIG: &str = r#"
[general]
enabled_blocks_order = ["uptime", "ghost", "log_tail", "broken", "plain_only"]

[blocks.uptime]
type = "ShellCommand"
command = "uptime -p"
parser = "single_line"
renderer = "raw_text"

[blocks.log_tail]
type = "ShellCommand"
command = "tail -f /var/log/syslog"
renderer = "list"
streaming = true

[blocks.broken]
type = "ShellCommand"
command = "true"
parser = "does_not_exist"
renderer = "raw_text"

[blocks.plain_only]
type = "SystemInfo"
run_mode = "tty"
"#;

    fn ids(active: &ActiveBlocks) -> Vec<&str> {
        active.blocks.iter().map(|block| block.id()).collect()
    }

    #[test]
    fn bad_blocks_are_isolated() {
        let config = Config::parse(CONFIG, Path::new("test.toml")).expect("parse");
        let registry = Registry::with_builtins();
        let cache = CacheStore::new("/tmp/fw-unused");

        let tui = build_blocks(&config, &registry, &cache, RunMode::Tui);
        assert_eq!(ids(&tui), vec!["uptime", "log_tail"]);
        assert_eq!(tui.rejected.len(), 2);
        assert!(tui
            .rejected
            .iter()
            .any(|err| matches!(err, ConfigError::MissingBlock { block } if block == "ghost")));

        let tty = build_blocks(&config, &registry, &cache, RunMode::Tty);
        assert_eq!(ids(&tty), vec!["uptime", "plain_only"]);
    }

    #[test]
    fn refresh_all_clears_every_enabled_cache_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = CacheStore::new(dir.path());
        let config = Config::parse(CONFIG, Path::new("test.toml")).expect("parse");
        let entry = crate::cache::CacheEntry::new(chrono::Utc::now(), "x".into());
        cache.store("uptime", &entry).expect("store");
        cache.store("log_tail", &entry).expect("store");

        invalidate_requested(&config, &cache, "uptime");
        assert!(cache.load("uptime").is_none());
        assert!(cache.load("log_tail").is_some());

        invalidate_requested(&config, &cache, "all");
        assert!(cache.load("log_tail").is_none());
    }
}

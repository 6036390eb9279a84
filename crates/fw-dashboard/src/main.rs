mod app;
mod layout;
mod logging;
mod palette;
mod plain;
mod tui;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fw_core::setup::invalidate_requested;
use fw_core::{CacheStore, Config, Registry, Theme};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "fancy-welcome")]
#[command(about = "Terminal welcome dashboard of independently refreshing blocks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Print every block once as plain text and exit
    #[arg(long)]
    simple: bool,
    /// Drop the cache of one block, or `all`, before running
    #[arg(long, value_name = "ID|all")]
    refresh: Option<String>,
    /// Config file instead of <config_dir>/fancy-welcome/fancy_welcome.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log file instead of <cache_dir>/fancy-welcome/fancy-welcome.log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List observer blocks with their source and pattern
    Filter,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_file.as_deref());

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    info!(path = %config_path.display(), blocks = config.blocks.len(), "config_loaded");

    if let Some(Commands::Filter) = cli.command {
        print!("{}", plain::list_observers(&config));
        return Ok(());
    }

    let theme = Theme::load(&config.theme.selected_theme, config_path.parent())
        .context("Failed to load theme")?;
    let cache = CacheStore::new(CacheStore::default_dir());
    if let Some(target) = cli.refresh.as_deref() {
        invalidate_requested(&config, &cache, target);
    }
    let registry = Registry::with_builtins();

    if cli.simple || !io::stdout().is_terminal() {
        print!("{}", plain::dump(&config, &registry, &cache).await);
        return Ok(());
    }
    tui::run(&config, &registry, cache, &theme).await
}

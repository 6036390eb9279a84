use crate::app::App;
use crate::palette::Palette;
use crate::ui;
use crossterm::{
    event::EventStream,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use fw_core::setup::build_blocks;
use fw_core::{Bus, CacheStore, Config, ExecMode, Executor, Message, Registry, RunMode, Theme};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

const SPINNER_FRAME_MS: u64 = 100;

pub async fn run(
    config: &Config,
    registry: &Registry,
    cache: CacheStore,
    theme: &Theme,
) -> anyhow::Result<()> {
    let active = build_blocks(config, registry, &cache, RunMode::Tui);
    let (executor, mut rx) = Executor::channel(ExecMode::Live);
    let mut app = App::new(
        Bus::new(active.blocks),
        executor,
        cache,
        Palette::from_theme(theme),
        active.rejected.len(),
    );
    info!(blocks = app.bus.len(), theme = %theme.name, "dashboard_started");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, &mut rx, config.general.heartbeat()).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    rx: &mut mpsc::Receiver<Message>,
    heartbeat_every: Duration,
) -> anyhow::Result<()> {
    let mut events = EventStream::new();
    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + heartbeat_every,
        heartbeat_every,
    );
    let mut spinner = tokio::time::interval(Duration::from_millis(SPINNER_FRAME_MS));

    app.on_message(Message::Heartbeat);
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        tokio::select! {
            Some(message) = rx.recv() => {
                app.on_message(message);
            }
            _ = heartbeat.tick() => {
                app.on_message(Message::Heartbeat);
            }
            _ = spinner.tick() => {
                app.advance_spinner();
            }
            maybe_event = events.next() => {
                if let Some(Ok(event)) = maybe_event {
                    if app.handle_event(event) {
                        break;
                    }
                }
            }
        }
    }
    info!("dashboard_stopped");
    Ok(())
}

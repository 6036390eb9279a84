use crate::layout::{section_of, sections, Section};
use crate::palette::Palette;
use chrono::Utc;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use fw_core::{Block as _, Bus, CacheStore, Executor, Message, Position};
use tracing::debug;

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const PAGE_STEP: u16 = 10;

pub struct App {
    pub bus: Bus,
    pub palette: Palette,
    pub sections: Vec<Section>,
    pub focus: usize,
    /// First visible section of the overview.
    pub scroll: usize,
    /// Index of the block shown full screen, with its line offset.
    pub expanded: Option<(usize, u16)>,
    pub spinner: usize,
    pub skipped: usize,
    executor: Executor,
    cache: CacheStore,
}

impl App {
    pub fn new(
        bus: Bus,
        executor: Executor,
        cache: CacheStore,
        palette: Palette,
        skipped: usize,
    ) -> Self {
        let positions: Vec<Position> = bus.blocks().iter().map(|block| block.position()).collect();
        Self {
            sections: sections(&positions),
            bus,
            palette,
            focus: 0,
            scroll: 0,
            expanded: None,
            spinner: 0,
            skipped,
            executor,
            cache,
        }
    }

    pub fn on_message(&mut self, message: Message) {
        debug!(message = message.label(), "dispatch");
        for cmd in self.bus.dispatch(message, Utc::now()) {
            self.executor.execute(cmd, &self.cache);
        }
    }

    pub fn advance_spinner(&mut self) {
        self.spinner = (self.spinner + 1) % SPINNER_FRAMES.len();
    }

    pub fn spinner_frame(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner]
    }

    /// Returns true when the program should exit.
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            _ => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        if let Some((index, offset)) = self.expanded {
            let offset = match key.code {
                KeyCode::Esc | KeyCode::Char('q') => {
                    self.expanded = None;
                    return false;
                }
                KeyCode::Down | KeyCode::Char('j') => offset.saturating_add(1),
                KeyCode::Up | KeyCode::Char('k') => offset.saturating_sub(1),
                KeyCode::PageDown => offset.saturating_add(PAGE_STEP),
                KeyCode::PageUp => offset.saturating_sub(PAGE_STEP),
                _ => offset,
            };
            self.expanded = Some((index, offset));
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.move_focus(1),
            KeyCode::BackTab => self.move_focus(-1),
            KeyCode::Enter if !self.bus.is_empty() => self.expanded = Some((self.focus, 0)),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
            KeyCode::PageDown => self.scroll_by(PAGE_STEP as isize),
            KeyCode::PageUp => self.scroll_by(-(PAGE_STEP as isize)),
            KeyCode::Char('r') => self.on_message(Message::TriggerAll),
            _ => {}
        }
        false
    }

    fn move_focus(&mut self, step: isize) {
        let count = self.bus.len();
        if count == 0 {
            return;
        }
        self.focus = (self.focus as isize + step).rem_euclid(count as isize) as usize;
        if let Some(section) = section_of(&self.sections, self.focus) {
            if section < self.scroll {
                self.scroll = section;
            }
        }
    }

    fn scroll_by(&mut self, step: isize) {
        let max = self.sections.len().saturating_sub(1) as isize;
        self.scroll = (self.scroll as isize + step).clamp(0, max) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw_core::block::{build_block, BlockContext};
    use fw_core::{BlockConfig, ExecMode, GeneralConfig, Registry, Theme};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(positions: &[&str]) -> App {
        let registry = Registry::with_builtins();
        let general = GeneralConfig::default();
        let cache = CacheStore::new("/tmp/fw-unused");
        let ctx = BlockContext {
            registry: &registry,
            general: &general,
            cache: &cache,
        };
        let blocks = positions
            .iter()
            .enumerate()
            .map(|(i, position)| {
                let config = BlockConfig {
                    kind: Some("WordCounter".into()),
                    listens_to: Some("source".into()),
                    count_string: Some("x".into()),
                    position: Some(position.to_string()),
                    ..BlockConfig::default()
                };
                build_block(&format!("b{i}"), &config, ctx).expect("block")
            })
            .collect();
        let (executor, _rx) = Executor::channel(ExecMode::Live);
        let palette = Palette::from_theme(&Theme::builtin("default").expect("theme"));
        App::new(Bus::new(blocks), executor, cache, palette, 0)
    }

    #[test]
    fn tab_cycles_focus() {
        let mut app = app(&["full", "left", "right"]);
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, 2);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, 0);
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.focus, 2);
    }

    #[test]
    fn enter_expands_and_escape_returns() {
        let mut app = app(&["full", "full"]);
        app.handle_key(key(KeyCode::Tab));
        assert!(!app.handle_key(key(KeyCode::Enter)));
        assert_eq!(app.expanded, Some((1, 0)));
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.expanded, Some((1, 1)));
        assert!(!app.handle_key(key(KeyCode::Char('q'))), "q leaves the expanded view first");
        assert_eq!(app.expanded, None);
        assert!(app.handle_key(key(KeyCode::Char('q'))));
    }

    #[test]
    fn scroll_is_clamped_to_sections() {
        let mut app = app(&["full", "left", "right", "full"]);
        assert_eq!(app.sections.len(), 3);
        app.handle_key(key(KeyCode::PageDown));
        assert_eq!(app.scroll, 2);
        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.scroll, 1);
        app.handle_key(key(KeyCode::PageUp));
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn ctrl_c_quits_from_anywhere() {
        let mut app = app(&["full"]);
        app.handle_key(key(KeyCode::Enter));
        assert!(app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }
}

use crate::app::App;
use crate::layout::Section;
use fw_core::{Block as _, RefreshState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

const HINTS: &str = "Tab focus · Enter expand · j/k scroll · r refresh · q quit";

pub fn render(frame: &mut Frame, app: &App) {
    let size = frame.size();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(size);
    frame.render_widget(header(app), layout[0]);

    let body = layout[1];
    frame.render_widget(
        Block::default().style(Style::default().bg(app.palette.background)),
        body,
    );
    match app.expanded {
        Some((index, offset)) => render_block(frame, app, index, body, offset),
        None => render_overview(frame, app, body),
    }
}

fn header(app: &App) -> Paragraph<'static> {
    let mut spans = vec![
        Span::styled(
            " fancy-welcome ",
            Style::default()
                .fg(app.palette.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(HINTS, Style::default().fg(app.palette.secondary)),
    ];
    if app.skipped > 0 {
        spans.push(Span::styled(
            format!("  {} block(s) skipped, see log", app.skipped),
            Style::default().fg(app.palette.error),
        ));
    }
    Paragraph::new(Line::from(spans)).style(Style::default().bg(app.palette.background))
}

fn render_overview(frame: &mut Frame, app: &App, area: Rect) {
    if app.bus.is_empty() {
        frame.render_widget(
            Paragraph::new("No blocks enabled. Check enabled_blocks_order in fancy_welcome.toml.")
                .style(Style::default().fg(app.palette.text)),
            area,
        );
        return;
    }

    let mut y = area.y;
    let bottom = area.y + area.height;
    for section in app.sections.iter().skip(app.scroll) {
        if y >= bottom {
            break;
        }
        let wanted = section_height(app, section, area.width);
        let height = wanted.min(bottom - y);
        let slot = Rect::new(area.x, y, area.width, height);
        match section {
            Section::Full(index) => render_block(frame, app, *index, slot, 0),
            Section::Columns { left, right } => {
                let halves = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                    .split(slot);
                render_column(frame, app, left, halves[0]);
                render_column(frame, app, right, halves[1]);
            }
        }
        y += height;
    }
}

fn render_column(frame: &mut Frame, app: &App, indices: &[usize], area: Rect) {
    let mut y = area.y;
    let bottom = area.y + area.height;
    for &index in indices {
        if y >= bottom {
            break;
        }
        let height = block_height(app, index, area.width).min(bottom - y);
        render_block(frame, app, index, Rect::new(area.x, y, area.width, height), 0);
        y += height;
    }
}

fn section_height(app: &App, section: &Section, width: u16) -> u16 {
    match section {
        Section::Full(index) => block_height(app, *index, width),
        Section::Columns { left, right } => {
            let half = width / 2;
            let column = |indices: &[usize]| -> u16 {
                indices
                    .iter()
                    .map(|&index| block_height(app, index, half))
                    .fold(0u16, u16::saturating_add)
            };
            column(left.as_slice()).max(column(right.as_slice()))
        }
    }
}

fn block_height(app: &App, index: usize, width: u16) -> u16 {
    let block = &app.bus.blocks()[index];
    let frame_rows = if block.preformatted() { 0 } else { 2 };
    let inner = usize::from(width.saturating_sub(frame_rows));
    let lines = block.render(inner).lines().count().max(1);
    u16::try_from(lines).unwrap_or(u16::MAX).saturating_add(frame_rows)
}

fn render_block(frame: &mut Frame, app: &App, index: usize, area: Rect, offset: u16) {
    let block = &app.bus.blocks()[index];
    let palette = app.palette;
    let focused = index == app.focus;
    let framed = !block.preformatted();
    let inner_width = if framed {
        area.width.saturating_sub(2)
    } else {
        area.width
    };
    let body = block.render(usize::from(inner_width));
    let text_style = if body.starts_with("Error") {
        Style::default().fg(palette.error)
    } else {
        Style::default().fg(palette.text)
    };

    let mut paragraph = Paragraph::new(body)
        .style(text_style)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    if framed {
        let loading = block.snapshot().state == RefreshState::Refreshing;
        let title = if loading {
            format!(" {} {} ", app.spinner_frame(), block.id())
        } else {
            format!(" {} ", block.id())
        };
        let border = if focused {
            palette.primary
        } else {
            palette.secondary
        };
        paragraph = paragraph.block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(Span::styled(
                    title,
                    Style::default().fg(border).add_modifier(Modifier::BOLD),
                )),
        );
    }
    frame.render_widget(paragraph, area);
}

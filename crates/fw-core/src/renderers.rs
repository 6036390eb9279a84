use crate::registry::Renderer;
use crate::value::ParsedValue;
use std::collections::BTreeMap;

const GAUGE_BAR_LEN: usize = 25;
const COWSAY_MAX_WIDTH: usize = 40;

fn incompatible(renderer: &str, value: &ParsedValue) -> String {
    format!("Error: {renderer} renderer received incompatible {} value", value.kind())
}

pub struct RawText;

impl Renderer for RawText {
    fn render(&self, value: &ParsedValue, _width: usize) -> String {
        match value {
            ParsedValue::Text(text) => text.clone(),
            other => incompatible("raw_text", other),
        }
    }
}

pub struct Preformatted;

impl Renderer for Preformatted {
    fn render(&self, value: &ParsedValue, _width: usize) -> String {
        match value {
            ParsedValue::Text(text) => text.clone(),
            ParsedValue::Lines(lines) => lines.join("\n"),
            other => incompatible("preformatted_text", other),
        }
    }

    fn preformatted(&self) -> bool {
        true
    }
}

pub struct List;

impl Renderer for List {
    fn render(&self, value: &ParsedValue, _width: usize) -> String {
        match value {
            ParsedValue::Lines(lines) => lines
                .iter()
                .map(|line| format!("- {line}"))
                .collect::<Vec<_>>()
                .join("\n"),
            other => incompatible("list", other),
        }
    }
}

pub struct Table;

impl Renderer for Table {
    fn render(&self, value: &ParsedValue, _width: usize) -> String {
        match value {
            ParsedValue::Grid(rows) => render_table(rows),
            ParsedValue::Map(map) => {
                let rows: Vec<Vec<String>> = map
                    .iter()
                    .map(|(k, v)| vec![k.clone(), v.clone()])
                    .collect();
                render_table(&rows)
            }
            // An empty grid read back from the cache.
            ParsedValue::Lines(lines) if lines.is_empty() => String::new(),
            other => incompatible("table", other),
        }
    }
}

fn render_table(rows: &[Vec<String>]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let columns = first.len();
    let mut widths = vec![0usize; columns];
    for row in rows.iter().filter(|row| row.len() == columns) {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut line = String::new();
        for (idx, cell) in row.iter().enumerate() {
            let width = widths.get(idx).copied().unwrap_or(0);
            line.push_str(&format!("{cell:<width$}  "));
        }
        out.push(line.trim_end().to_string());
    }
    out.join("\n")
}

/// Percentage bars, one per numeric map entry. Non-numeric values are skipped.
pub struct Gauge;

impl Renderer for Gauge {
    fn render(&self, value: &ParsedValue, width: usize) -> String {
        match value {
            ParsedValue::Map(metrics) => render_gauges(metrics, width),
            ParsedValue::Lines(lines) if lines.is_empty() => String::new(),
            other => incompatible("gauge", other),
        }
    }
}

fn render_gauges(metrics: &BTreeMap<String, String>, width: usize) -> String {
    // label (5) + " [" + bar + "] " + percent (6)
    let bar_len = GAUGE_BAR_LEN.min(width.saturating_sub(16)).max(1);
    let mut out = Vec::new();
    for (key, raw) in metrics {
        let Ok(value) = raw.trim().trim_end_matches('%').parse::<f64>() else {
            continue;
        };
        let value = value.clamp(0.0, 100.0);
        let filled = ((value / 100.0) * bar_len as f64) as usize;
        out.push(format!(
            "{:<5} [{}{}] {:>5.1}%",
            key.to_uppercase(),
            "█".repeat(filled),
            "░".repeat(bar_len - filled),
            value
        ));
    }
    out.join("\n")
}

pub struct Cowsay;

impl Renderer for Cowsay {
    fn render(&self, value: &ParsedValue, width: usize) -> String {
        match value {
            ParsedValue::Text(text) => cowsay(text, width),
            other => incompatible("cowsay", other),
        }
    }
}

fn cowsay(message: &str, width: usize) -> String {
    let max = width.saturating_sub(4).clamp(8, COWSAY_MAX_WIDTH);
    let lines = wrap_words(message, max);
    let inner = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);

    let mut out = Vec::new();
    out.push(format!(" {}", "_".repeat(inner + 2)));
    if lines.len() <= 1 {
        let line = lines.first().map(String::as_str).unwrap_or("");
        out.push(format!("< {line:<inner$} >"));
    } else {
        let last = lines.len() - 1;
        for (idx, line) in lines.iter().enumerate() {
            let (open, close) = match idx {
                0 => ('/', '\\'),
                i if i == last => ('\\', '/'),
                _ => ('|', '|'),
            };
            out.push(format!("{open} {line:<inner$} {close}"));
        }
    }
    out.push(format!(" {}", "-".repeat(inner + 2)));
    out.push("        \\   ^__^".to_string());
    out.push("         \\  (oo)\\_______".to_string());
    out.push("            (__)\\       )\\/\\".to_string());
    out.push("                ||----w |".to_string());
    out.push("                ||     ||".to_string());
    out.join("\n")
}

fn wrap_words(text: &str, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_shapes_render_visible_errors() {
        let text = ParsedValue::from("hello");
        assert!(Table.render(&text, 80).starts_with("Error:"));
        assert!(List.render(&text, 80).starts_with("Error:"));
        assert!(Gauge.render(&text, 80).starts_with("Error:"));
        assert!(Cowsay
            .render(&ParsedValue::Lines(vec!["x".into()]), 80)
            .starts_with("Error:"));
    }

    #[test]
    fn table_pads_columns() {
        let grid = ParsedValue::Grid(vec![
            vec!["Tool".into(), "Version".into()],
            vec!["Python".into(), "3.12".into()],
        ]);
        assert_eq!(Table.render(&grid, 80), "Tool    Version\nPython  3.12");
    }

    #[test]
    fn gauge_clamps_and_skips_non_numeric() {
        let mut metrics = BTreeMap::new();
        metrics.insert("cpu".to_string(), "150".to_string());
        metrics.insert("note".to_string(), "n/a".to_string());
        let out = Gauge.render(&ParsedValue::Map(metrics), 80);
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("CPU   ["));
        assert!(out.ends_with("100.0%"));
    }

    #[test]
    fn gauge_bar_shrinks_with_the_panel() {
        let mut metrics = BTreeMap::new();
        metrics.insert("mem".to_string(), "50".to_string());
        let value = ParsedValue::Map(metrics);
        let cells = |width| {
            Gauge
                .render(&value, width)
                .chars()
                .filter(|ch| *ch == '█' || *ch == '░')
                .count()
        };
        assert_eq!(cells(80), 25);
        assert_eq!(cells(20), 4);
        assert_eq!(cells(17), 1);
        assert_eq!(cells(10), 1);
        assert_eq!(cells(0), 1);
    }

    #[test]
    fn cowsay_wraps_long_messages() {
        let out = Cowsay.render(
            &ParsedValue::from("the quick brown fox jumps over the lazy dog"),
            20,
        );
        let bubble: Vec<&str> = out.lines().take_while(|l| !l.contains("^__^")).collect();
        assert!(bubble.len() > 3);
        assert!(bubble.iter().all(|line| line.chars().count() <= 20));
    }

    #[test]
    fn list_prefixes_each_line() {
        let lines = ParsedValue::Lines(vec!["a".into(), "b".into()]);
        assert_eq!(List.render(&lines, 80), "- a\n- b");
    }
}

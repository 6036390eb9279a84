use fw_core::Theme;
use ratatui::style::Color;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: Color,
    pub secondary: Color,
    pub background: Color,
    pub text: Color,
    pub error: Color,
}

impl Palette {
    pub fn from_theme(theme: &Theme) -> Self {
        let pick = |slot: &str, raw: &str| {
            parse_color(raw).unwrap_or_else(|| {
                warn!(theme = %theme.name, slot, value = raw, "theme_color_invalid");
                Color::Reset
            })
        };
        Self {
            primary: pick("primary", &theme.colors.primary),
            secondary: pick("secondary", &theme.colors.secondary),
            background: pick("background", &theme.colors.background),
            text: pick("text", &theme.colors.text),
            error: pick("error", &theme.colors.error),
        }
    }
}

/// `#rrggbb` or an ANSI 256 index.
pub fn parse_color(raw: &str) -> Option<Color> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
        return Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?));
    }
    raw.parse::<u8>().ok().map(Color::Indexed)
}

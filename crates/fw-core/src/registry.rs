use crate::error::ParseError;
use crate::parsers;
use crate::renderers;
use crate::value::ParsedValue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Turns raw command output into a [`ParsedValue`]. Must accept any input,
/// including the empty string, and keep no state between calls.
pub trait Parser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<ParsedValue, ParseError>;
}

/// Turns a [`ParsedValue`] into display text. A shape the renderer does not
/// understand yields a visible `Error: ...` string, never a panic.
pub trait Renderer: Send + Sync {
    fn render(&self, value: &ParsedValue, width: usize) -> String;

    /// Preformatted output is drawn as-is, without the block frame.
    fn preformatted(&self) -> bool {
        false
    }
}

/// Name-keyed parsers and renderers, built once at startup and handed to
/// block constructors.
#[derive(Clone, Default)]
pub struct Registry {
    parsers: BTreeMap<String, Arc<dyn Parser>>,
    renderers: BTreeMap<String, Arc<dyn Renderer>>,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_parser("single_line", parsers::SingleLine);
        registry.register_parser("multi_line", parsers::MultiLine);
        registry.register_parser("raw_multi_line", parsers::RawMultiLine);
        registry.register_parser("key_value", parsers::KeyValue);
        registry.register_parser("journald_errors", parsers::JournaldErrors::new());
        registry.register_parser("columns", parsers::Columns);
        registry.register_parser("raw", parsers::Raw);

        registry.register_renderer("raw_text", renderers::RawText);
        registry.register_renderer("preformatted_text", renderers::Preformatted);
        registry.register_renderer("list", renderers::List);
        registry.register_renderer("table", renderers::Table);
        registry.register_renderer("gauge", renderers::Gauge);
        registry.register_renderer("cowsay", renderers::Cowsay);
        registry
    }

    pub fn register_parser(&mut self, name: &str, parser: impl Parser + 'static) {
        self.parsers.insert(name.to_string(), Arc::new(parser));
    }

    pub fn register_renderer(&mut self, name: &str, renderer: impl Renderer + 'static) {
        self.renderers.insert(name.to_string(), Arc::new(renderer));
    }

    pub fn parser(&self, name: &str) -> Option<Arc<dyn Parser>> {
        self.parsers.get(name).cloned()
    }

    pub fn renderer(&self, name: &str) -> Option<Arc<dyn Renderer>> {
        self.renderers.get(name).cloned()
    }

    pub fn parser_names(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }

    pub fn renderer_names(&self) -> impl Iterator<Item = &str> {
        self.renderers.keys().map(String::as_str)
    }
}

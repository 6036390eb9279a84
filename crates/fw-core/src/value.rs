use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured result of interpreting a data source's raw output.
///
/// Serialized untagged so the cache file holds plain JSON (`"text"`,
/// `["a", "b"]`, `{"k": "v"}`, `[["a", "b"]]`). Reading it back is lossy in
/// one case: an empty grid comes back as an empty `Lines`, which renderers
/// must tolerate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParsedValue {
    Text(String),
    Lines(Vec<String>),
    Grid(Vec<Vec<String>>),
    Map(BTreeMap<String, String>),
}

impl ParsedValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedValue::Text(_) => "text",
            ParsedValue::Lines(_) => "lines",
            ParsedValue::Grid(_) => "grid",
            ParsedValue::Map(_) => "map",
        }
    }

    /// Flattens any shape into lines for observers that match substrings.
    pub fn observable_lines(&self) -> Vec<String> {
        match self {
            ParsedValue::Text(text) => text.lines().map(str::to_string).collect(),
            ParsedValue::Lines(lines) => lines.clone(),
            ParsedValue::Grid(rows) => rows.iter().map(|row| row.join(" ")).collect(),
            ParsedValue::Map(map) => map.iter().map(|(k, v)| format!("{k}={v}")).collect(),
        }
    }
}

impl From<&str> for ParsedValue {
    fn from(value: &str) -> Self {
        ParsedValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for ParsedValue {
    fn from(value: Vec<String>) -> Self {
        ParsedValue::Lines(value)
    }
}

use crate::error::ParseError;
use crate::registry::Parser;
use crate::value::ParsedValue;
use regex::Regex;
use std::collections::BTreeMap;

pub struct SingleLine;

impl Parser for SingleLine {
    fn parse(&self, raw: &str) -> Result<ParsedValue, ParseError> {
        Ok(ParsedValue::Text(raw.trim().to_string()))
    }
}

/// Untouched output, for renderers that draw escape sequences themselves.
pub struct Raw;

impl Parser for Raw {
    fn parse(&self, raw: &str) -> Result<ParsedValue, ParseError> {
        Ok(ParsedValue::Text(raw.trim_end_matches('\n').to_string()))
    }
}

pub struct MultiLine;

impl Parser for MultiLine {
    fn parse(&self, raw: &str) -> Result<ParsedValue, ParseError> {
        Ok(ParsedValue::Lines(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }
}

/// Like [`MultiLine`] but keeps indentation.
pub struct RawMultiLine;

impl Parser for RawMultiLine {
    fn parse(&self, raw: &str) -> Result<ParsedValue, ParseError> {
        Ok(ParsedValue::Lines(
            raw.lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }
}

/// `key=value` per line; lines without `=` are skipped.
pub struct KeyValue;

impl Parser for KeyValue {
    fn parse(&self, raw: &str) -> Result<ParsedValue, ParseError> {
        let mut map = BTreeMap::new();
        for line in raw.lines() {
            let trimmed = line.trim();
            if let Some((key, value)) = trimmed.split_once('=') {
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Ok(ParsedValue::Map(map))
    }
}

/// Whitespace separated columns, one row per non-empty line.
pub struct Columns;

impl Parser for Columns {
    fn parse(&self, raw: &str) -> Result<ParsedValue, ParseError> {
        Ok(ParsedValue::Grid(
            raw.lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| line.split_whitespace().map(str::to_string).collect())
                .collect(),
        ))
    }
}

/// Reduces syslog style journal lines to `process: message`.
pub struct JournaldErrors {
    pattern: Regex,
}

impl JournaldErrors {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"^\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2}\s+[\w.-]+\s+([^:]+):\s+(.*)")
                .expect("journald pattern is valid"),
        }
    }
}

impl Default for JournaldErrors {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for JournaldErrors {
    fn parse(&self, raw: &str) -> Result<ParsedValue, ParseError> {
        let mut lines = Vec::new();
        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match self.pattern.captures(trimmed) {
                Some(caps) => lines.push(format!("{}: {}", &caps[1], &caps[2])),
                None => lines.push(trimmed.to_string()),
            }
        }
        Ok(ParsedValue::Lines(lines))
    }
}

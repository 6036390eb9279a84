use crate::error::CacheError;
use crate::value::ParsedValue;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    pub parsed_data: ParsedValue,
}

impl CacheEntry {
    pub fn new(timestamp: DateTime<Utc>, parsed_data: ParsedValue) -> Self {
        Self {
            timestamp,
            parsed_data,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.timestamp < max_age
    }
}

/// One JSON file per block under a shared directory. Every block owns its
/// own file, so no locking beyond write-then-rename is needed.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<cache_dir>/fancy-welcome`, falling back to the temp dir.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("fancy-welcome")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, block_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_component(block_id)))
    }

    /// Missing, unreadable and corrupt files are all a miss.
    pub fn load(&self, block_id: &str) -> Option<CacheEntry> {
        match self.try_load(block_id) {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(block = %block_id, "cache_miss: {err}");
                None
            }
        }
    }

    fn try_load(&self, block_id: &str) -> Result<CacheEntry, CacheError> {
        let bytes = fs::read(self.path_for(block_id))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn store(&self, block_id: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(block_id);
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&tmp, serde_json::to_vec(entry)?)?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }

    pub fn invalidate(&self, block_id: &str) {
        let path = self.path_for(block_id);
        match fs::remove_file(&path) {
            Ok(()) => debug!(block = %block_id, "cache_invalidated"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => debug!(block = %block_id, "cache_invalidate_failed: {err}"),
        }
    }

    pub fn invalidate_all<'a>(&self, block_ids: impl IntoIterator<Item = &'a str>) {
        for id in block_ids {
            self.invalidate(id);
        }
    }
}

/// Alphanumerics and `-` pass through; every other byte, `_` included, becomes
/// `_XX`. Distinct ids therefore never share a file.
fn sanitize_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("_{byte:02X}"));
        }
    }
    out
}

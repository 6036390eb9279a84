use fw_core::CacheStore;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "fancy-welcome.log";
const STDERR_ENV: &str = "FANCY_WELCOME_LOG_STDOUT";

pub fn default_log_path() -> PathBuf {
    CacheStore::default_dir().join(LOG_FILE)
}

/// Stdout belongs to the dashboard, so logs go to a file unless
/// `FANCY_WELCOME_LOG_STDOUT` asks for stderr. An unopenable file means no
/// logs rather than a failed start.
pub fn init_logging(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if flag_enabled(std::env::var(STDERR_ENV).ok().as_deref()) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
        return;
    }

    let path = log_file.map(Path::to_path_buf).unwrap_or_else(default_log_path);
    match open_log(&path) {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(_) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}

fn open_log(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn flag_enabled(value: Option<&str>) -> bool {
    matches!(
        value,
        Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_flag_values() {
        assert!(flag_enabled(Some("1")));
        assert!(flag_enabled(Some("yes")));
        assert!(!flag_enabled(Some("0")));
        assert!(!flag_enabled(None));
    }

    #[test]
    fn log_file_parent_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/fancy-welcome.log");
        open_log(&path).expect("open");
        assert!(path.exists());
    }
}

//! Tracing setup: human-readable output on stderr plus a plain-text session
//! log under `<data dir>/logs/latest.log`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Result, StudioError};

const LATEST_LOG: &str = "latest.log";
const MAX_SESSION_LOGS: usize = 10;

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// When `log_dir` is given the previous `latest.log` is rotated first. A log
/// file that cannot be opened only disables the file layer.
pub fn init(level: &str, log_dir: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| StudioError::Custom(format!("Invalid log level {level:?}: {e}")))?;

    let file_layer = log_dir
        .and_then(|dir| open_session_log(dir).ok())
        .map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| StudioError::Custom(format!("Failed to initialise logging: {e}")))
}

/// Rotate `latest.log` to `session-<unix ts>.log`, prune old sessions, and
/// open a fresh `latest.log` for appending.
pub fn open_session_log(log_dir: &Path) -> Result<File> {
    std::fs::create_dir_all(log_dir)?;

    let latest = log_dir.join(LATEST_LOG);
    if latest.exists() {
        let ts = chrono::Utc::now().timestamp();
        std::fs::rename(&latest, log_dir.join(format!("session-{ts}.log")))?;
    }
    cleanup_old_sessions(log_dir)?;

    let file = OpenOptions::new().create(true).append(true).open(&latest)?;
    Ok(file)
}

/// Keep only the most recent `session-*.log` files.
fn cleanup_old_sessions(log_dir: &Path) -> Result<()> {
    let mut session_files: Vec<PathBuf> = std::fs::read_dir(log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("session-") && n.ends_with(".log"))
        })
        .collect();

    // The timestamp is embedded in the name, so lexicographic order is chronological.
    session_files.sort();

    let excess = session_files.len().saturating_sub(MAX_SESSION_LOGS);
    for oldest in &session_files[..excess] {
        std::fs::remove_file(oldest)?;
    }
    Ok(())
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ConsoleEntry {
    /// `[HH:MM:SS] message`, the way the console panel shows it.
    pub fn display_line(&self) -> String {
        format!("[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// User-facing session log. Every entry is also emitted as a tracing event.
#[derive(Clone, Debug, Default)]
pub struct ConsoleLog {
    entries: Vec<ConsoleEntry>,
}

impl ConsoleLog {
    pub fn push(&mut self, level: ConsoleLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            ConsoleLevel::Info | ConsoleLevel::Success => info!(target: "console", "{message}"),
            ConsoleLevel::Warning => warn!(target: "console", "{message}"),
            ConsoleLevel::Error => error!(target: "console", "{message}"),
        }
        self.entries.push(ConsoleEntry {
            level,
            message,
            timestamp: Utc::now(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ConsoleLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(ConsoleLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(ConsoleLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ConsoleLevel::Error, message);
    }

    pub fn entries(&self) -> &[ConsoleEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

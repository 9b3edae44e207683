//! Progress reporting for pipeline runs.
//!
//! Every [`crate::Processor`] owns a [`LogBroadcaster`]. Entries go to the
//! `log` facade and to any subscriber of the broadcast channel, so a CLI or
//! a test can follow a run stage by stage. Nothing is printed unless the
//! application installs a logger.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Channel capacity; a run emits one entry per stage plus a few details.
const CHANNEL_CAPACITY: usize = 64;

/// Log level of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Pipeline stage an entry reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PathValidated,
    MappingResolved,
    Loaded,
    SchemaValidated,
    PreProcessed,
    FormattedAndProjected,
    PostProcessed,
    Done,
    Failed,
}

/// A single log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub stage: Stage,
    pub message: String,
}

impl LogEntry {
    pub fn info(stage: Stage, message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, stage, message: message.into() }
    }

    pub fn success(stage: Stage, message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, stage, message: message.into() }
    }

    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, stage, message: message.into() }
    }

    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, stage, message: message.into() }
    }
}

/// Broadcasts log entries to the subscribers of one processor.
#[derive(Debug)]
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Forward an entry to the `log` facade and to all subscribers.
    pub fn log(&self, entry: LogEntry) {
        match entry.level {
            LogLevel::Info => log::debug!("[{:?}] {}", entry.stage, entry.message),
            LogLevel::Success => log::info!("[{:?}] {}", entry.stage, entry.message),
            LogLevel::Warning => log::warn!("[{:?}] {}", entry.stage, entry.message),
            LogLevel::Error => log::error!("[{:?}] {}", entry.stage, entry.message),
        }

        // no receivers is fine
        let _ = self.sender.send(entry);
    }

    pub fn info(&self, stage: Stage, message: impl Into<String>) {
        self.log(LogEntry::info(stage, message));
    }

    pub fn success(&self, stage: Stage, message: impl Into<String>) {
        self.log(LogEntry::success(stage, message));
    }

    pub fn warning(&self, stage: Stage, message: impl Into<String>) {
        self.log(LogEntry::warning(stage, message));
    }

    pub fn error(&self, stage: Stage, message: impl Into<String>) {
        self.log(LogEntry::error(stage, message));
    }

    /// Receive every entry logged from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

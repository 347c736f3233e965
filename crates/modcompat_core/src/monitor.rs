//! Monitor contract used by handlers and the loader to report per-mod events.
//!
//! # Responsibility
//! - Define the sink handlers write user-facing notices to.
//! - Provide a `log`-backed sink and an in-memory recorder.
//!
//! # Invariants
//! - `Monitor::log` never panics and never fails.
//! - Implementations are shared across parallel scans, so they must be
//!   `Send + Sync`.

use crate::logging::sanitize_message;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const MAX_MONITOR_MESSAGE_CHARS: usize = 512;

/// Monitor severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Important message the user should see even with quiet console output.
    Alert,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Alert => "alert",
        }
    }

    fn as_log_level(self) -> log::Level {
        match self {
            Self::Trace => log::Level::Trace,
            Self::Debug => log::Level::Debug,
            Self::Info | Self::Alert => log::Level::Info,
            Self::Warn => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-mod event sink.
pub trait Monitor: Send + Sync {
    fn log(&self, message: &str, level: LogLevel);
}

/// Monitor routing onto the `log` facade.
#[derive(Debug, Clone)]
pub struct LogMonitor {
    source: String,
}

impl LogMonitor {
    /// Creates a monitor whose lines are tagged with `source` (usually a mod id).
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Monitor for LogMonitor {
    fn log(&self, message: &str, level: LogLevel) {
        let message = sanitize_message(message, MAX_MONITOR_MESSAGE_CHARS);
        log::log!(
            level.as_log_level(),
            "event=mod_message module=monitor status={} source={} message={}",
            level,
            self.source,
            message
        );
    }
}

/// One recorded monitor line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEntry {
    pub level: LogLevel,
    pub message: String,
}

/// In-memory monitor, mostly for tests and for surfacing notices to callers.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    entries: Mutex<Vec<MonitorEntry>>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<MonitorEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Entries at `level` or above.
    pub fn at_least(&self, level: LogLevel) -> Vec<MonitorEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.level >= level)
            .cloned()
            .collect()
    }
}

impl Monitor for RecordingMonitor {
    fn log(&self, message: &str, level: LogLevel) {
        self.entries.lock().push(MonitorEntry {
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{LogLevel, LogMonitor, Monitor, RecordingMonitor};
    use std::sync::Arc;

    #[test]
    fn recording_monitor_keeps_order_and_filters_by_level() {
        let monitor = RecordingMonitor::new();
        monitor.log("scan started", LogLevel::Trace);
        monitor.log("rewrote field", LogLevel::Warn);
        monitor.log("mod rejected", LogLevel::Error);

        assert_eq!(monitor.len(), 3);
        let important = monitor.at_least(LogLevel::Warn);
        assert_eq!(important.len(), 2);
        assert_eq!(important[0].message, "rewrote field");
    }

    #[test]
    fn recording_monitor_is_shareable_across_threads() {
        let monitor = Arc::new(RecordingMonitor::new());
        let handles: Vec<_> = (0..4)
            .map(|index| {
                let monitor = Arc::clone(&monitor);
                std::thread::spawn(move || monitor.log(&format!("thread {index}"), LogLevel::Info))
            })
            .collect();
        for handle in handles {
            handle.join().expect("logging thread should finish");
        }
        assert_eq!(monitor.len(), 4);
    }

    #[test]
    fn log_monitor_accepts_multiline_messages() {
        let monitor = LogMonitor::new("Example.Mod");
        monitor.log("first\nsecond", LogLevel::Alert);
        assert_eq!(monitor.source(), "Example.Mod");
    }
}

//! Logging types and configuration.

use serde::{Deserialize, Serialize};

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Configuration for per-job logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level to output.
    pub level: LogLevel,
    /// Progress step percentage; progress lines between steps are
    /// filtered.
    pub progress_step: u32,
    /// Number of recent lines kept for error diagnosis.
    pub error_tail: usize,
    /// Prefix messages with a local timestamp.
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            progress_step: 10,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

/// Callback receiving each formatted log line (e.g. for a UI log view).
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_correctly() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }
}

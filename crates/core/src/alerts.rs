//! User-facing notifications

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How much output a run produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent,
    Error,
    Info,
    #[default]
    Verbose,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid log level '{0}'. Expected one of: verbose, error, info, silent")]
pub struct ParseLogLevelError(pub String);

impl LogLevel {
    /// Default logger filter for this level. Alerts filter themselves, so
    /// `verbose` and `info` differ only in which alerts are sent.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Silent => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Info | LogLevel::Verbose => LevelFilter::Info,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verbose" => Ok(LogLevel::Verbose),
            "error" => Ok(LogLevel::Error),
            "info" => Ok(LogLevel::Info),
            "silent" => Ok(LogLevel::Silent),
            other => Err(ParseLogLevelError(other.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Silent => "silent",
            LogLevel::Error => "error",
            LogLevel::Info => "info",
            LogLevel::Verbose => "verbose",
        })
    }
}

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warn,
    Notice,
    Info,
    Success,
}

impl Severity {
    /// Lowest log level at which this severity is shown
    fn minimum_level(self) -> LogLevel {
        match self {
            Severity::Error => LogLevel::Error,
            Severity::Info | Severity::Success => LogLevel::Info,
            Severity::Warn | Severity::Notice => LogLevel::Verbose,
        }
    }
}

/// Notification sink
pub trait Alerts: Send + Sync {
    fn alert(&self, severity: Severity, message: &str);

    fn error(&self, message: &str) {
        self.alert(Severity::Error, message);
    }

    fn warn(&self, message: &str) {
        self.alert(Severity::Warn, message);
    }

    fn notice(&self, message: &str) {
        self.alert(Severity::Notice, message);
    }

    fn info(&self, message: &str) {
        self.alert(Severity::Info, message);
    }

    fn success(&self, message: &str) {
        self.alert(Severity::Success, message);
    }
}

/// Forwards notifications allowed by the log level to the `log` facade
#[derive(Debug, Clone, Copy)]
pub struct LogAlerts {
    level: LogLevel,
}

impl LogAlerts {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }
}

impl Alerts for LogAlerts {
    fn alert(&self, severity: Severity, message: &str) {
        if self.level < severity.minimum_level() {
            return;
        }
        match severity {
            Severity::Error => log::error!("{}", message),
            Severity::Warn => log::warn!("{}", message),
            Severity::Notice | Severity::Info | Severity::Success => log::info!("{}", message),
        }
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct MemoryAlerts {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl MemoryAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Messages of one severity, in order
    pub fn of(&self, severity: Severity) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Alerts for MemoryAlerts {
    fn alert(&self, severity: Severity, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((severity, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(LogLevel::Silent < LogLevel::Error);
        assert!(LogLevel::Info < LogLevel::Verbose);
        assert_eq!(LogLevel::default(), LogLevel::Verbose);
    }

    #[test]
    fn test_minimum_levels() {
        assert_eq!(Severity::Error.minimum_level(), LogLevel::Error);
        assert_eq!(Severity::Success.minimum_level(), LogLevel::Info);
        assert_eq!(Severity::Warn.minimum_level(), LogLevel::Verbose);
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(LogLevel::Silent.level_filter(), LevelFilter::Off);
        assert_eq!(LogLevel::Verbose.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_memory_alerts() {
        let alerts = MemoryAlerts::new();
        alerts.error("bad");
        alerts.success("good");
        alerts.error("worse");
        assert_eq!(alerts.of(Severity::Error), vec!["bad", "worse"]);
        assert_eq!(alerts.messages().len(), 3);
    }
}

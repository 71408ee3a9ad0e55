//! Settings sections of the recorder configuration
//!
//! - [`LoggerSettings`] - How the logger backend launches and stops loggers
//! - [`ControlSettings`] - Limits applied to controller calls made through a worker

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default logger program
pub const DEFAULT_LOGGER_PROGRAM: &str = "pmlogger";

/// Default grace period between asking a logger to stop and killing it
pub const DEFAULT_STOP_GRACE_MS: u64 = 2000;

/// Default time a worker client waits for a controller reply
pub const DEFAULT_CONTROL_TIMEOUT_MS: u64 = 30_000;

/// Logger process settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    /// Program launched once per recorded host
    pub program: PathBuf,

    /// Arguments placed before everything the backend adds
    pub leading_args: Vec<String>,

    /// Arguments given to every logger, ahead of per-session arguments
    pub default_args: Vec<String>,

    /// Milliseconds to wait for a logger to exit before killing it
    pub stop_grace_ms: u64,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_LOGGER_PROGRAM),
            leading_args: Vec::new(),
            default_args: Vec::new(),
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
        }
    }
}

impl LoggerSettings {
    /// Settings for a specific logger program
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Set leading arguments
    pub fn leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the stop grace period
    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace_ms = grace.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Grace period as a duration
    pub fn stop_grace_duration(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

/// Controller call limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Milliseconds a worker client waits for each reply
    pub timeout_ms: u64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_CONTROL_TIMEOUT_MS,
        }
    }
}

impl ControlSettings {
    /// Reply timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_defaults() {
        let settings = LoggerSettings::default();
        assert_eq!(settings.program, PathBuf::from("pmlogger"));
        assert!(settings.leading_args.is_empty());
        assert_eq!(settings.stop_grace_duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_logger_builder() {
        let settings = LoggerSettings::with_program("/bin/sh")
            .leading_args(["-c", "exec sleep 30"])
            .stop_grace(Duration::from_millis(250));
        assert_eq!(settings.leading_args, vec!["-c", "exec sleep 30"]);
        assert_eq!(settings.stop_grace_ms, 250);
    }

    #[test]
    fn test_control_timeout() {
        let settings = ControlSettings { timeout_ms: 1500 };
        assert_eq!(settings.timeout(), Duration::from_millis(1500));
    }
}

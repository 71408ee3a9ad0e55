//! Test data builders for creating test objects

use pmrecord_rs::config::LoggerSettings;
use std::time::Duration;

/// Builder for logger settings that run a shell snippet instead of a real logger
///
/// The snippet receives the logger arguments as `$0 $1 ...`, so a test can
/// inspect what a real logger would have been given.
pub struct ShellLoggerBuilder {
    script: String,
    default_args: Vec<String>,
    grace: Duration,
}

impl ShellLoggerBuilder {
    /// A logger that keeps running until stopped
    pub fn long_running() -> Self {
        Self::script("exec sleep 30")
    }

    /// A logger that exits straight away
    pub fn exits_immediately() -> Self {
        Self::script("exit 0")
    }

    pub fn script(script: &str) -> Self {
        Self {
            script: script.to_string(),
            default_args: Vec::new(),
            grace: Duration::from_millis(500),
        }
    }

    pub fn default_args(mut self, args: &[&str]) -> Self {
        self.default_args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn build(self) -> LoggerSettings {
        let mut settings = LoggerSettings::with_program("/bin/sh")
            .leading_args(["-c", self.script.as_str()])
            .stop_grace(self.grace);
        settings.default_args = self.default_args;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_logger_builder() {
        let settings = ShellLoggerBuilder::exits_immediately()
            .default_args(&["-r"])
            .build();

        assert_eq!(settings.program.to_str(), Some("/bin/sh"));
        assert_eq!(settings.leading_args, vec!["-c", "exit 0"]);
        assert_eq!(settings.default_args, vec!["-r"]);
        assert_eq!(settings.stop_grace_ms, 500);
    }
}

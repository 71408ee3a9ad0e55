//! Error handling for pmrecord-rs
//!
//! This module defines the recording error taxonomy and a Result alias for
//! use throughout the crate. The four backend failures keep the exact
//! [`Status`] the backend reported so callers can tell them apart.

use thiserror::Error;

use crate::types::{HostHandle, RequestKind, Status};

/// Main error type for recording operations
#[derive(Error, Debug)]
pub enum RecordError {
    /// The backend refused to create the session
    #[error("Session setup failed for folio {folio:?}: {code}")]
    SessionSetup { folio: String, code: Status },

    /// The backend refused to register a host; the session is still usable
    #[error("Host registration failed for {host:?}: {code}")]
    HostRegistration { host: String, code: Status },

    /// The host was registered but its configuration could not be written
    ///
    /// The registration is left in place, so the host is half-registered.
    #[error("Configuration write failed for {host:?} ({handle}), host left registered: {code}")]
    ConfigWrite {
        host: String,
        handle: HostHandle,
        code: Status,
    },

    /// A control request failed with a non-transient status
    #[error("Control request {request} failed: {code}")]
    Control { request: RequestKind, code: Status },

    /// The caller passed something the backend must never see
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to folio files
    #[error("Folio error: {0}")]
    Folio(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Timeout errors
    #[error("Timeout: {0}")]
    Timeout(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RecordError>,
    },
}

impl RecordError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        RecordError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The backend status carried by this error, if any
    pub fn code(&self) -> Option<Status> {
        match self {
            RecordError::SessionSetup { code, .. }
            | RecordError::HostRegistration { code, .. }
            | RecordError::ConfigWrite { code, .. }
            | RecordError::Control { code, .. } => Some(*code),
            RecordError::WithContext { source, .. } => source.code(),
            _ => None,
        }
    }

    /// Check if the error left a half-registered host behind
    pub fn leaves_partial_host(&self) -> bool {
        match self {
            RecordError::ConfigWrite { .. } => true,
            RecordError::WithContext { source, .. } => source.leaves_partial_host(),
            _ => false,
        }
    }
}

impl From<toml::de::Error> for RecordError {
    fn from(err: toml::de::Error) -> Self {
        RecordError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RecordError {
    fn from(err: toml::ser::Error) -> Self {
        RecordError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        RecordError::Serialization(err.to_string())
    }
}

/// Result type alias for recording operations
pub type Result<T> = std::result::Result<T, RecordError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| RecordError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| RecordError::Io(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecordError::InvalidRequest("set-arg needs an argument".to_string());
        assert_eq!(err.to_string(), "Invalid request: set-arg needs an argument");
    }

    #[test]
    fn test_control_error_carries_code() {
        let err = RecordError::Control {
            request: RequestKind::RecordOn,
            code: Status(-5),
        };
        assert_eq!(err.code(), Some(Status(-5)));
        assert!(err.to_string().contains("record-on"));
        assert!(err.to_string().contains("(-5)"));
    }

    #[test]
    fn test_error_with_context() {
        let err = RecordError::HostRegistration {
            host: "hostA".to_string(),
            code: Status::GENERIC,
        };
        let with_ctx = err.with_context("Failed to attach hosts");
        assert!(with_ctx.to_string().contains("Failed to attach hosts"));
        assert_eq!(with_ctx.code(), Some(Status::GENERIC));
    }

    #[test]
    fn test_partial_host_flag() {
        let handle = HostHandle::new(3).unwrap();
        let err = RecordError::ConfigWrite {
            host: "hostA".to_string(),
            handle,
            code: Status(-28),
        };
        assert!(err.leaves_partial_host());
        assert!(err.with_context("attach").leaves_partial_host());

        let err = RecordError::HostRegistration {
            host: "hostA".to_string(),
            code: Status(-28),
        };
        assert!(!err.leaves_partial_host());
    }

    #[test]
    fn test_io_context() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = res.context("Opening folio").unwrap_err();
        assert!(err.to_string().starts_with("Opening folio"));
    }
}

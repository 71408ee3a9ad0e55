//! Core data types for pmrecord-rs
//!
//! This module contains the small value types that cross the boundary
//! between the session controller and a recording backend.
//!
//! # Main Types
//!
//! - [`Status`] - Signed status code returned by every backend operation
//! - [`RequestKind`] - Control requests understood by a recording session
//! - [`SessionHandle`] / [`HostHandle`] - Opaque backend tokens
//! - [`ControlStatus`] - Result of a control request that did not fail
//! - [`SessionState`] - Session-level recording state
//!
//! # Status Codes
//!
//! Non-negative codes mean success. Negative codes are either one of the
//! named archive-logging codes (around `-12345`) or a negated OS `errno`.
//! [`Status::IPC`] is special: it reports a transient hiccup on the control
//! channel to a logger and is never turned into an error by the controller.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

/// Base of the archive-logging error code range
const ERR_BASE: i32 = 12345;

/// Largest negated errno value still treated as an OS error
const MAX_ERRNO: i32 = 4095;

/// Signed status code returned by a recording backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(pub i32);

impl Status {
    /// Success
    pub const OK: Status = Status(0);
    /// Generic failure, already reported by the backend
    pub const GENERIC: Status = Status(-ERR_BASE);
    /// Timeout waiting for a logger to respond
    pub const TIMEOUT: Status = Status(-ERR_BASE - 8);
    /// Transient failure on a logger's control channel
    pub const IPC: Status = Status(-ERR_BASE - 21);
    /// Logger control channel closed
    pub const EOF: Status = Status(-ERR_BASE - 23);

    /// Negated `EBADF`
    pub const BAD_HANDLE: Status = Status(-9);
    /// Negated `EEXIST`
    pub const EXISTS: Status = Status(-17);
    /// Negated `EINVAL`
    pub const INVALID: Status = Status(-22);

    /// Raw numeric value
    pub fn code(self) -> i32 {
        self.0
    }

    /// Check if this status reports success
    pub fn is_ok(self) -> bool {
        self.0 >= 0
    }

    /// Check if this status reports a failure of any kind
    pub fn is_error(self) -> bool {
        self.0 < 0
    }

    /// Check if this is the transient IPC sentinel
    pub fn is_transient(self) -> bool {
        self == Status::IPC
    }

    /// Build a status from an I/O error, preferring the OS errno
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.raw_os_error() {
            Some(errno) if errno > 0 => Status(-errno),
            _ => Status::GENERIC,
        }
    }

    /// Build a success status from a byte or item count
    pub fn from_count(count: usize) -> Self {
        Status(i32::try_from(count).unwrap_or(i32::MAX))
    }

    /// Human readable description of the status
    pub fn describe(self) -> String {
        match self {
            s if s.is_ok() => "Success".to_string(),
            Status::GENERIC => "Generic error, already reported above".to_string(),
            Status::TIMEOUT => "Timeout waiting for a response from the logger".to_string(),
            Status::IPC => "IPC protocol failure".to_string(),
            Status::EOF => "IPC channel closed".to_string(),
            Status(code) if code >= -MAX_ERRNO => {
                let err = std::io::Error::from_raw_os_error(-code);
                // Strip the " (os error N)" suffix, the code is printed separately
                let text = err.to_string();
                match text.find(" (os error") {
                    Some(idx) => text[..idx].to_string(),
                    None => text,
                }
            }
            Status(_) => "Unknown or illegal error code".to_string(),
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::OK
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Status(code)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.describe(), self.0)
    }
}

/// Control requests for a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Append an argument to the logger command line
    SetArg,
    /// Start recording
    RecordOn,
    /// Stop recording
    RecordOff,
    /// Stop controlling the loggers but leave them running
    Detach,
    /// Query how many loggers are alive
    Status,
}

impl RequestKind {
    /// All request kinds, in wire code order
    pub const ALL: [RequestKind; 5] = [
        RequestKind::RecordOn,
        RequestKind::RecordOff,
        RequestKind::Detach,
        RequestKind::Status,
        RequestKind::SetArg,
    ];

    /// Stable numeric code used on the control channel
    pub fn wire_code(self) -> i32 {
        match self {
            RequestKind::RecordOn => 40,
            RequestKind::RecordOff => 41,
            RequestKind::Detach => 43,
            RequestKind::Status => 44,
            RequestKind::SetArg => 45,
        }
    }

    /// Look up a request by its wire code
    pub fn from_wire_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_code() == code)
    }

    /// Whether the request needs an argument string
    pub fn requires_argument(self) -> bool {
        matches!(self, RequestKind::SetArg)
    }

    /// Display name for the request
    pub fn display_name(&self) -> &'static str {
        match self {
            RequestKind::SetArg => "set-arg",
            RequestKind::RecordOn => "record-on",
            RequestKind::RecordOff => "record-off",
            RequestKind::Detach => "detach",
            RequestKind::Status => "status",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Opaque token for a session created by a backend
///
/// A zero handle cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(NonZeroU64);

impl SessionHandle {
    /// Wrap a raw backend reply, rejecting zero
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Raw token value, for handing back to the backend
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Opaque token for a host registered with a backend session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostHandle(NonZeroU64);

impl HostHandle {
    /// Wrap a raw backend token, rejecting zero
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Raw token value
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for HostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

/// Outcome of a control request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlStatus {
    /// The backend accepted the request
    Completed(Status),
    /// The backend hit a transient IPC condition; session state is unknown
    Transient(Status),
}

impl ControlStatus {
    /// The backend status, unmodified
    pub fn status(&self) -> Status {
        match self {
            ControlStatus::Completed(s) | ControlStatus::Transient(s) => *s,
        }
    }

    /// Raw numeric code
    pub fn code(&self) -> i32 {
        self.status().code()
    }

    /// Check if the request completed
    pub fn is_completed(&self) -> bool {
        matches!(self, ControlStatus::Completed(_))
    }

    /// Check if the request hit the transient condition
    pub fn is_transient(&self) -> bool {
        matches!(self, ControlStatus::Transient(_))
    }
}

/// Session-level recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No session has been set up
    #[default]
    Uninitialized,
    /// Session exists, no logger is recording
    Active,
    /// At least one logger is recording
    Recording,
}

impl SessionState {
    /// Check if recording
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording)
    }

    /// Check if hosts may be added
    pub fn accepts_hosts(&self) -> bool {
        !matches!(self, SessionState::Uninitialized)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "Uninitialized",
            SessionState::Active => "Active",
            SessionState::Recording => "Recording",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

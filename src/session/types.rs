//! Session data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{HostHandle, SessionHandle, SessionState, Status};

/// An archive recording session
///
/// Only a [`RecordingSessionController`](super::RecordingSessionController)
/// creates sessions, so the handle inside is always one a backend issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub(crate) handle: SessionHandle,
    pub(crate) folio_name: String,
    pub(crate) creator_tag: String,
    pub(crate) replay: bool,
    pub(crate) created_at: DateTime<Utc>,
}

impl Session {
    /// Backend token for this session
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// Folio path prefix for the archives
    pub fn folio_name(&self) -> &str {
        &self.folio_name
    }

    /// Free-form provenance label
    pub fn creator_tag(&self) -> &str {
        &self.creator_tag
    }

    /// Whether the session replays an existing archive
    pub fn is_replay(&self) -> bool {
        self.replay
    }

    /// When the controller created the session
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A monitored host attached to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBinding {
    pub(crate) handle: HostHandle,
    pub(crate) session: SessionHandle,
    pub(crate) host_spec: String,
    pub(crate) is_default: bool,
}

impl HostBinding {
    /// Backend token for this host
    pub fn handle(&self) -> HostHandle {
        self.handle
    }

    /// Session the host belongs to
    pub fn session(&self) -> SessionHandle {
        self.session
    }

    /// Hostname or connection spec
    pub fn host_spec(&self) -> &str {
        &self.host_spec
    }

    /// Whether this host is the session's default target
    pub fn is_default(&self) -> bool {
        self.is_default
    }
}

/// Condition of a registered host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostCondition {
    /// Registered and configured
    Ready,
    /// Registered, but the configuration write failed
    ConfigFailed(Status),
}

impl HostCondition {
    /// Check if the host can be controlled
    pub fn is_usable(&self) -> bool {
        matches!(self, HostCondition::Ready)
    }
}

/// Snapshot of one host in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSummary {
    /// Backend token
    pub handle: HostHandle,
    /// Hostname or connection spec
    pub host: String,
    /// Default target flag
    pub is_default: bool,
    /// Configuration state
    pub condition: HostCondition,
    /// Whether a record-on for this host completed and was not yet undone
    pub recording: bool,
}

/// Snapshot of a session, suitable for printing or saving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Backend token
    pub handle: SessionHandle,
    /// Folio path prefix
    pub folio: String,
    /// Provenance label
    pub creator: String,
    /// Replay flag
    pub replay: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Recording state
    pub state: SessionState,
    /// Hosts, in registration order
    pub hosts: Vec<HostSummary>,
}

impl SessionSummary {
    /// Hosts whose configuration write failed
    pub fn faulted_hosts(&self) -> impl Iterator<Item = &HostSummary> {
        self.hosts.iter().filter(|h| !h.condition.is_usable())
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_json() {
        let summary = SessionSummary {
            handle: SessionHandle::new(1).unwrap(),
            folio: "folio1".to_string(),
            creator: "tester".to_string(),
            replay: false,
            created_at: Utc::now(),
            state: SessionState::Recording,
            hosts: vec![
                HostSummary {
                    handle: HostHandle::new(2).unwrap(),
                    host: "hostA".to_string(),
                    is_default: true,
                    condition: HostCondition::Ready,
                    recording: true,
                },
                HostSummary {
                    handle: HostHandle::new(3).unwrap(),
                    host: "hostB".to_string(),
                    is_default: false,
                    condition: HostCondition::ConfigFailed(Status(-28)),
                    recording: false,
                },
            ],
        };

        let json = summary.to_json().unwrap();
        assert!(json.contains("\"folio\": \"folio1\""));
        assert!(json.contains("\"state\": \"Recording\""));

        let parsed: SessionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, summary);
        assert_eq!(parsed.faulted_hosts().count(), 1);
    }
}

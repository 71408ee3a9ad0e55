//! Scripted Backend Implementation for Testing
//!
//! This module provides a recording backend that never touches the
//! filesystem or spawns a process. Replies come from per-operation queues of
//! status codes, and every call is kept in a journal so tests can assert on
//! exactly what reached the boundary.
//!
//! # Defaults
//!
//! When a queue is empty the backend behaves like a healthy logger:
//!
//! - `setup` hands out fresh non-zero session tokens
//! - `register_host` succeeds with a fresh host token
//! - `write_config` reports the number of bytes written
//! - `control` returns [`Status::OK`]
//!
//! # Example
//!
//! ```ignore
//! use pmrecord_rs::backend::ScriptedBackend;
//! use pmrecord_rs::types::Status;
//!
//! let backend = ScriptedBackend::new()
//!     .with_register_status(Status(-111))
//!     .with_control_status(Status::IPC);
//! ```

use std::collections::VecDeque;

use crate::types::{HostHandle, RequestKind, SessionHandle, Status};

use super::backend_trait::{BackendOp, BackendStats, RecordBackend};

/// A call that reached the scripted backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Setup {
        folio: String,
        creator: String,
        replay: bool,
    },
    RegisterHost {
        session: SessionHandle,
        host_spec: String,
        is_default: bool,
    },
    WriteConfig {
        host: HostHandle,
        config: String,
    },
    Control {
        session: SessionHandle,
        host: Option<HostHandle>,
        request: RequestKind,
        argument: Option<String>,
    },
    Diagnostic {
        context: String,
        status: Status,
    },
}

/// Recording backend driven by queued replies
#[derive(Debug)]
pub struct ScriptedBackend {
    /// Queued setup failures (a queued status makes setup return 0)
    setup_failures: VecDeque<Status>,
    /// Queued registration statuses
    register_statuses: VecDeque<Status>,
    /// Queued configuration write statuses
    write_statuses: VecDeque<Status>,
    /// Queued control statuses
    control_statuses: VecDeque<Status>,
    /// Next token to hand out
    next_token: u64,
    /// Diagnostic code for the last failed setup
    last_error: Status,
    /// Every call, in order
    journal: Vec<BackendCall>,
    /// Backend statistics
    stats: BackendStats,
}

impl ScriptedBackend {
    /// Create a backend that accepts everything
    pub fn new() -> Self {
        Self {
            setup_failures: VecDeque::new(),
            register_statuses: VecDeque::new(),
            write_statuses: VecDeque::new(),
            control_statuses: VecDeque::new(),
            next_token: 1,
            last_error: Status::OK,
            journal: Vec::new(),
            stats: BackendStats::default(),
        }
    }

    /// Make the next setup fail with the given diagnostic code
    pub fn with_setup_failure(mut self, code: Status) -> Self {
        self.setup_failures.push_back(code);
        self
    }

    /// Queue a reply for the next host registration
    pub fn with_register_status(mut self, status: Status) -> Self {
        self.register_statuses.push_back(status);
        self
    }

    /// Queue a reply for the next configuration write
    pub fn with_write_status(mut self, status: Status) -> Self {
        self.write_statuses.push_back(status);
        self
    }

    /// Queue a reply for the next control request
    pub fn with_control_status(mut self, status: Status) -> Self {
        self.control_statuses.push_back(status);
        self
    }

    /// Queue a control reply on an existing backend
    pub fn push_control_status(&mut self, status: Status) {
        self.control_statuses.push_back(status);
    }

    /// All calls received so far
    pub fn calls(&self) -> &[BackendCall] {
        &self.journal
    }

    /// Number of calls of one kind
    pub fn count_calls(&self, matches: impl Fn(&BackendCall) -> bool) -> usize {
        self.journal.iter().filter(|call| matches(call)).count()
    }

    /// Number of configuration writes received
    pub fn config_writes(&self) -> usize {
        self.count_calls(|call| matches!(call, BackendCall::WriteConfig { .. }))
    }

    /// Number of diagnostics reported
    pub fn diagnostics(&self) -> usize {
        self.count_calls(|call| matches!(call, BackendCall::Diagnostic { .. }))
    }

    fn next_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordBackend for ScriptedBackend {
    fn setup(&mut self, folio: &str, creator: &str, replay: bool) -> u64 {
        self.journal.push(BackendCall::Setup {
            folio: folio.to_string(),
            creator: creator.to_string(),
            replay,
        });

        if let Some(code) = self.setup_failures.pop_front() {
            self.last_error = code;
            self.stats.record(BackendOp::Setup, code);
            return 0;
        }

        self.stats.record(BackendOp::Setup, Status::OK);
        self.next_token()
    }

    fn last_error(&self) -> Status {
        self.last_error
    }

    fn register_host(
        &mut self,
        session: SessionHandle,
        host_spec: &str,
        is_default: bool,
    ) -> (Status, Option<HostHandle>) {
        self.journal.push(BackendCall::RegisterHost {
            session,
            host_spec: host_spec.to_string(),
            is_default,
        });

        let status = self.register_statuses.pop_front().unwrap_or(Status::OK);
        self.stats.record(BackendOp::RegisterHost, status);

        if status.is_error() {
            return (status, None);
        }
        let token = self.next_token();
        (status, HostHandle::new(token))
    }

    fn write_config(&mut self, host: HostHandle, config: &str) -> Status {
        self.journal.push(BackendCall::WriteConfig {
            host,
            config: config.to_string(),
        });

        let status = self
            .write_statuses
            .pop_front()
            .unwrap_or_else(|| Status::from_count(config.len()));
        self.stats.record(BackendOp::WriteConfig, status);
        status
    }

    fn control(
        &mut self,
        session: SessionHandle,
        host: Option<HostHandle>,
        request: RequestKind,
        argument: Option<&str>,
    ) -> Status {
        self.journal.push(BackendCall::Control {
            session,
            host,
            request,
            argument: argument.map(str::to_string),
        });

        let status = self.control_statuses.pop_front().unwrap_or(Status::OK);
        self.stats.record(BackendOp::Control, status);
        status
    }

    fn report_diagnostic(&mut self, context: &str, status: Status) {
        tracing::error!(%status, "{}", context);
        self.journal.push(BackendCall::Diagnostic {
            context: context.to_string(),
            status,
        });
    }

    fn stats(&self) -> &BackendStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut BackendStats {
        &mut self.stats
    }
}

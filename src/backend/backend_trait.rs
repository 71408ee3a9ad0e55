//! RecordBackend trait for the recording boundary
//!
//! This module provides the common trait for every recording backend,
//! enabling both the process-spawning logger backend and the scripted
//! backend used in tests. The controller talks to a backend only through
//! this trait, and only in status codes.

use crate::types::{HostHandle, RequestKind, SessionHandle, Status};

/// Statistics for backend operations
///
/// Counts calls per boundary operation along with failure and transient
/// replies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Number of session setups attempted
    pub setups: u64,
    /// Number of host registrations attempted
    pub host_registrations: u64,
    /// Number of configuration writes attempted
    pub config_writes: u64,
    /// Number of control requests issued
    pub control_requests: u64,
    /// Replies that reported a hard failure
    pub failures: u64,
    /// Replies that carried the transient IPC sentinel
    pub transient_replies: u64,
}

/// Boundary operation a statistic is recorded for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOp {
    Setup,
    RegisterHost,
    WriteConfig,
    Control,
}

impl BackendStats {
    /// Record one call and the status it produced
    pub fn record(&mut self, op: BackendOp, status: Status) {
        match op {
            BackendOp::Setup => self.setups += 1,
            BackendOp::RegisterHost => self.host_registrations += 1,
            BackendOp::WriteConfig => self.config_writes += 1,
            BackendOp::Control => self.control_requests += 1,
        }

        if status.is_transient() {
            self.transient_replies += 1;
        } else if status.is_error() {
            self.failures += 1;
        }
    }

    /// Total number of boundary calls
    pub fn total_calls(&self) -> u64 {
        self.setups + self.host_registrations + self.config_writes + self.control_requests
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Unified interface for recording backends
///
/// Implementations must be `Send` so a controller owning one can move to a
/// worker thread. Every operation blocks until the backend has answered.
///
/// # Example
///
/// ```ignore
/// fn start_everything(backend: &mut dyn RecordBackend, session: SessionHandle) -> Status {
///     backend.control(session, None, RequestKind::RecordOn, None)
/// }
/// ```
pub trait RecordBackend: Send {
    /// Create or open the folio for a new session
    ///
    /// Returns a non-zero session token, or 0 on failure with the reason
    /// available from [`RecordBackend::last_error`].
    fn setup(&mut self, folio: &str, creator: &str, replay: bool) -> u64;

    /// Diagnostic code for the last failed [`RecordBackend::setup`]
    fn last_error(&self) -> Status;

    /// Register a host with a session
    ///
    /// On success the host handle embeds an open configuration channel.
    fn register_host(
        &mut self,
        session: SessionHandle,
        host_spec: &str,
        is_default: bool,
    ) -> (Status, Option<HostHandle>);

    /// Write logger configuration directives to a host's configuration channel
    ///
    /// The text must be flushed before this returns.
    fn write_config(&mut self, host: HostHandle, config: &str) -> Status;

    /// Issue a control request
    ///
    /// # Arguments
    /// * `host` - Target host, or `None` for the backend's default target
    /// * `argument` - Only meaningful for [`RequestKind::SetArg`]
    fn control(
        &mut self,
        session: SessionHandle,
        host: Option<HostHandle>,
        request: RequestKind,
        argument: Option<&str>,
    ) -> Status;

    /// Surface a failure to the operator
    fn report_diagnostic(&mut self, context: &str, status: Status) {
        tracing::error!(%status, "{}", context);
    }

    /// Get backend operation statistics
    fn stats(&self) -> &BackendStats;

    /// Get mutable reference to backend statistics
    fn stats_mut(&mut self) -> &mut BackendStats;

    /// Reset backend statistics
    fn reset_stats(&mut self) {
        self.stats_mut().reset();
    }
}

impl<B: RecordBackend + ?Sized> RecordBackend for Box<B> {
    fn setup(&mut self, folio: &str, creator: &str, replay: bool) -> u64 {
        (**self).setup(folio, creator, replay)
    }

    fn last_error(&self) -> Status {
        (**self).last_error()
    }

    fn register_host(
        &mut self,
        session: SessionHandle,
        host_spec: &str,
        is_default: bool,
    ) -> (Status, Option<HostHandle>) {
        (**self).register_host(session, host_spec, is_default)
    }

    fn write_config(&mut self, host: HostHandle, config: &str) -> Status {
        (**self).write_config(host, config)
    }

    fn control(
        &mut self,
        session: SessionHandle,
        host: Option<HostHandle>,
        request: RequestKind,
        argument: Option<&str>,
    ) -> Status {
        (**self).control(session, host, request, argument)
    }

    fn report_diagnostic(&mut self, context: &str, status: Status) {
        (**self).report_diagnostic(context, status)
    }

    fn stats(&self) -> &BackendStats {
        (**self).stats()
    }

    fn stats_mut(&mut self) -> &mut BackendStats {
        (**self).stats_mut()
    }
}

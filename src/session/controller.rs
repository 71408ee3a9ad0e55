//! Recording session controller
//!
//! The controller is a thin layer over a [`RecordBackend`]: it validates text
//! before it crosses the boundary, turns backend status codes into
//! [`RecordError`]s, and tracks the recording state of each session it
//! created.
//!
//! # Status translation
//!
//! | Operation | Backend reply | Result |
//! |---|---|---|
//! | `setup_session` | 0 | [`RecordError::SessionSetup`] with `last_error()` |
//! | `add_host` | registration < 0 | [`RecordError::HostRegistration`], nothing written |
//! | `add_host` | write < 0 | [`RecordError::ConfigWrite`], host stays registered |
//! | `control` | [`Status::IPC`] | [`ControlStatus::Transient`] |
//! | `control` | other < 0 | [`RecordError::Control`] |
//!
//! # State machine
//!
//! ```text
//! Uninitialized --setup--> Active --record-on--> Recording --record-off--> Active
//! ```
//!
//! A transient reply leaves the state where it was.

use chrono::Utc;
use std::collections::{HashMap, HashSet};

use crate::backend::RecordBackend;
use crate::error::{RecordError, Result};
use crate::types::{ControlStatus, HostHandle, RequestKind, SessionHandle, SessionState, Status};

use super::types::{HostBinding, HostCondition, HostSummary, Session, SessionSummary};

/// Controller-side bookkeeping for one session
#[derive(Debug)]
struct SessionEntry {
    session: Session,
    hosts: Vec<HostEntry>,
    /// Hosts with a completed record-on, either their own or session-wide
    recording_hosts: HashSet<HostHandle>,
    /// A session-wide record-on completed while no host was usable
    default_recording: bool,
}

impl SessionEntry {
    fn state(&self) -> SessionState {
        if self.default_recording || !self.recording_hosts.is_empty() {
            SessionState::Recording
        } else {
            SessionState::Active
        }
    }

    fn is_host_recording(&self, host: HostHandle) -> bool {
        self.recording_hosts.contains(&host)
    }

    fn condition(&self, host: HostHandle) -> Option<HostCondition> {
        self.hosts
            .iter()
            .find(|h| h.binding.handle == host)
            .map(|h| h.condition)
    }

    fn apply(&mut self, target: Option<HostHandle>, request: RequestKind) {
        match (request, target) {
            (RequestKind::RecordOn, None) => {
                // Hosts added later were never started
                let usable: Vec<HostHandle> = self
                    .hosts
                    .iter()
                    .filter(|h| h.condition.is_usable())
                    .map(|h| h.binding.handle)
                    .collect();
                if usable.is_empty() {
                    self.default_recording = true;
                }
                self.recording_hosts.extend(usable);
            }
            (RequestKind::RecordOn, Some(host)) => {
                self.recording_hosts.insert(host);
            }
            (RequestKind::RecordOff | RequestKind::Detach, None) => {
                self.default_recording = false;
                self.recording_hosts.clear();
            }
            (RequestKind::RecordOff | RequestKind::Detach, Some(host)) => {
                self.recording_hosts.remove(&host);
            }
            (RequestKind::SetArg | RequestKind::Status, _) => {}
        }
    }
}

#[derive(Debug)]
struct HostEntry {
    binding: HostBinding,
    condition: HostCondition,
}

/// Coordinates recording sessions on top of a backend
///
/// # Example
///
/// ```ignore
/// use pmrecord_rs::backend::ScriptedBackend;
/// use pmrecord_rs::session::RecordingSessionController;
/// use pmrecord_rs::types::RequestKind;
///
/// let mut controller = RecordingSessionController::new(ScriptedBackend::new());
/// let session = controller.setup_session("folio1", "tester", false)?;
/// let (host, _) = controller.add_host(&session, "hostA", true, "log mem,disk")?;
/// controller.control(&session, Some(&host), RequestKind::RecordOn, None)?;
/// ```
#[derive(Debug)]
pub struct RecordingSessionController<B: RecordBackend> {
    backend: B,
    sessions: HashMap<SessionHandle, SessionEntry>,
}

impl<B: RecordBackend> RecordingSessionController<B> {
    /// Create a controller around an already constructed backend
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sessions: HashMap::new(),
        }
    }

    /// Access the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Consume the controller and return the backend
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Set up a new recording session
    ///
    /// # Arguments
    /// * `folio` - Folio path prefix for the archives
    /// * `creator` - Free-form provenance label
    /// * `replay` - `false` to record, `true` to replay an existing archive
    pub fn setup_session(&mut self, folio: &str, creator: &str, replay: bool) -> Result<Session> {
        check_text("folio name", folio, false)?;
        check_text("creator tag", creator, true)?;

        tracing::debug!(folio, creator, replay, "Setting up session");
        let raw = self.backend.setup(folio, creator, replay);
        let Some(handle) = SessionHandle::new(raw) else {
            let code = self.backend.last_error();
            tracing::warn!("Session setup for {:?} failed: {}", folio, code);
            return Err(RecordError::SessionSetup {
                folio: folio.to_string(),
                code,
            });
        };

        let session = Session {
            handle,
            folio_name: folio.to_string(),
            creator_tag: creator.to_string(),
            replay,
            created_at: Utc::now(),
        };
        self.sessions.insert(
            handle,
            SessionEntry {
                session: session.clone(),
                hosts: Vec::new(),
                recording_hosts: HashSet::new(),
                default_recording: false,
            },
        );

        tracing::info!(%handle, folio, "Session active");
        Ok(session)
    }

    /// Attach a monitored host to a session and write its logger configuration
    ///
    /// Returns the binding and the status of the configuration write. When
    /// the write fails the registration is kept and the error carries the
    /// host handle; the host is then reported as
    /// [`HostCondition::ConfigFailed`] in [`Self::summary`].
    pub fn add_host(
        &mut self,
        session: &Session,
        host_spec: &str,
        is_default: bool,
        config: &str,
    ) -> Result<(HostBinding, Status)> {
        check_text("host spec", host_spec, false)?;
        check_text("configuration", config, true)?;
        let entry = self.sessions.get_mut(&session.handle).ok_or_else(|| {
            RecordError::InvalidRequest(format!("{} was not set up here", session.handle))
        })?;

        let (status, handle) = self
            .backend
            .register_host(session.handle, host_spec, is_default);
        let handle = match (status.is_error(), handle) {
            (false, Some(handle)) => handle,
            (_, handle) => {
                // A success reply without a handle is as unusable as a failure
                let code = if status.is_error() {
                    status
                } else {
                    Status::GENERIC
                };
                tracing::warn!(
                    "Registering {:?} with {} failed: {} (handle {:?})",
                    host_spec,
                    session.handle,
                    code,
                    handle
                );
                return Err(RecordError::HostRegistration {
                    host: host_spec.to_string(),
                    code,
                });
            }
        };

        let binding = HostBinding {
            handle,
            session: session.handle,
            host_spec: host_spec.to_string(),
            is_default,
        };

        let written = self.backend.write_config(handle, config);
        if written.is_error() {
            self.backend.report_diagnostic(
                &format!("writing logger configuration for {:?}", host_spec),
                written,
            );
            entry.hosts.push(HostEntry {
                binding,
                condition: HostCondition::ConfigFailed(written),
            });
            return Err(RecordError::ConfigWrite {
                host: host_spec.to_string(),
                handle,
                code: written,
            });
        }

        tracing::info!(%handle, host = host_spec, is_default, "Host attached");
        entry.hosts.push(HostEntry {
            binding: binding.clone(),
            condition: HostCondition::Ready,
        });
        Ok((binding, written))
    }

    /// Issue a control request to a session
    ///
    /// # Arguments
    /// * `target` - Host to control, or `None` for the backend's default target
    /// * `request` - What to do
    /// * `argument` - Required for [`RequestKind::SetArg`], ignored otherwise
    pub fn control(
        &mut self,
        session: &Session,
        target: Option<&HostBinding>,
        request: RequestKind,
        argument: Option<&str>,
    ) -> Result<ControlStatus> {
        let argument = if request.requires_argument() {
            match argument {
                Some(arg) => {
                    check_text("argument", arg, false)?;
                    Some(arg)
                }
                None => {
                    return Err(RecordError::InvalidRequest(format!(
                        "{} needs an argument",
                        request
                    )))
                }
            }
        } else {
            None
        };

        let entry = self.sessions.get_mut(&session.handle).ok_or_else(|| {
            RecordError::InvalidRequest(format!("{} was not set up here", session.handle))
        })?;
        if let Some(binding) = target {
            if binding.session != session.handle {
                return Err(RecordError::InvalidRequest(format!(
                    "{} belongs to {}, not {}",
                    binding.handle, binding.session, session.handle
                )));
            }
            if request == RequestKind::RecordOn {
                if let Some(HostCondition::ConfigFailed(code)) = entry.condition(binding.handle) {
                    return Err(RecordError::InvalidRequest(format!(
                        "{} has no usable configuration ({})",
                        binding.handle, code
                    )));
                }
            }
        }

        let host = target.map(HostBinding::handle);
        tracing::debug!(session = %session.handle, ?host, %request, ?argument, "Control");
        let status = self
            .backend
            .control(session.handle, host, request, argument);

        if status.is_transient() {
            tracing::warn!(
                "{} on {} hit a transient IPC condition, state unknown",
                request,
                session.handle
            );
            return Ok(ControlStatus::Transient(status));
        }
        if status.is_error() {
            return Err(RecordError::Control { request, code: status });
        }

        let before = entry.state();
        entry.apply(host, request);
        let after = entry.state();
        if before != after {
            tracing::info!(session = %session.handle, "{} -> {}", before, after);
        }
        Ok(ControlStatus::Completed(status))
    }

    /// Current state of a session
    pub fn state(&self, session: &Session) -> SessionState {
        self.sessions
            .get(&session.handle)
            .map(SessionEntry::state)
            .unwrap_or_default()
    }

    /// Hosts attached to a session, including half-registered ones
    pub fn hosts(&self, session: &Session) -> Vec<HostBinding> {
        self.sessions
            .get(&session.handle)
            .map(|e| e.hosts.iter().map(|h| h.binding.clone()).collect())
            .unwrap_or_default()
    }

    /// The session's default host, if one was attached
    pub fn default_host(&self, session: &Session) -> Option<HostBinding> {
        self.sessions.get(&session.handle).and_then(|e| {
            e.hosts
                .iter()
                .find(|h| h.binding.is_default && h.condition.is_usable())
                .map(|h| h.binding.clone())
        })
    }

    /// Snapshot of a session
    pub fn summary(&self, session: &Session) -> Option<SessionSummary> {
        let entry = self.sessions.get(&session.handle)?;
        Some(SessionSummary {
            handle: entry.session.handle,
            folio: entry.session.folio_name.clone(),
            creator: entry.session.creator_tag.clone(),
            replay: entry.session.replay,
            created_at: entry.session.created_at,
            state: entry.state(),
            hosts: entry
                .hosts
                .iter()
                .map(|h| HostSummary {
                    handle: h.binding.handle,
                    host: h.binding.host_spec.clone(),
                    is_default: h.binding.is_default,
                    condition: h.condition,
                    recording: entry.is_host_recording(h.binding.handle),
                })
                .collect(),
        })
    }

    /// Number of sessions set up through this controller
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Reject text the backend's NUL-terminated form cannot carry
fn check_text(what: &str, text: &str, allow_empty: bool) -> Result<()> {
    if !allow_empty && text.trim().is_empty() {
        return Err(RecordError::InvalidRequest(format!("{} is empty", what)));
    }
    if text.contains('\0') {
        return Err(RecordError::InvalidRequest(format!(
            "{} contains a NUL byte",
            what
        )));
    }
    Ok(())
}

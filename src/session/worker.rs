//! Controller worker thread
//!
//! A [`RecordingSessionController`] is not shared between threads. Instead one
//! worker thread owns it and processes commands in arrival order, which
//! serializes every call made on a session. Callers hold a
//! [`ControllerClient`] and get each reply over a one-shot channel, waiting
//! no longer than the configured control timeout.
//!
//! # Example
//!
//! ```ignore
//! use pmrecord_rs::backend::ScriptedBackend;
//! use pmrecord_rs::config::ControlSettings;
//! use pmrecord_rs::session::{ControllerWorker, RecordingSessionController};
//!
//! let controller = RecordingSessionController::new(ScriptedBackend::new());
//! let (worker, client) = ControllerWorker::new(controller, &ControlSettings::default());
//! let handle = worker.spawn()?;
//!
//! let session = client.setup_session("folio1", "tester", false)?;
//! client.shutdown();
//! let controller = handle.join().expect("worker panicked");
//! ```

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::backend::RecordBackend;
use crate::config::ControlSettings;
use crate::error::{RecordError, Result};
use crate::types::{ControlStatus, RequestKind, SessionState, Status};

use super::controller::RecordingSessionController;
use super::types::{HostBinding, Session, SessionSummary};

/// Queue depth between clients and the worker
const COMMAND_QUEUE_DEPTH: usize = 64;

/// Command sent from a client to the worker
#[derive(Debug)]
pub enum ControllerCommand {
    /// Set up a session
    SetupSession {
        folio: String,
        creator: String,
        replay: bool,
        reply: Sender<Result<Session>>,
    },
    /// Attach a host and write its configuration
    AddHost {
        session: Session,
        host_spec: String,
        is_default: bool,
        config: String,
        reply: Sender<Result<(HostBinding, Status)>>,
    },
    /// Issue a control request
    Control {
        session: Session,
        target: Option<HostBinding>,
        request: RequestKind,
        argument: Option<String>,
        reply: Sender<Result<ControlStatus>>,
    },
    /// Query the state of a session
    State {
        session: Session,
        reply: Sender<SessionState>,
    },
    /// Snapshot a session
    Summary {
        session: Session,
        reply: Sender<Option<SessionSummary>>,
    },
    /// Stop the worker
    Shutdown,
}

impl ControllerCommand {
    fn name(&self) -> &'static str {
        match self {
            ControllerCommand::SetupSession { .. } => "setup-session",
            ControllerCommand::AddHost { .. } => "add-host",
            ControllerCommand::Control { .. } => "control",
            ControllerCommand::State { .. } => "state",
            ControllerCommand::Summary { .. } => "summary",
            ControllerCommand::Shutdown => "shutdown",
        }
    }
}

/// Worker owning a controller
pub struct ControllerWorker<B: RecordBackend> {
    controller: RecordingSessionController<B>,
    command_rx: Receiver<ControllerCommand>,
}

impl<B: RecordBackend + 'static> ControllerWorker<B> {
    /// Create a worker and the client that talks to it
    pub fn new(
        controller: RecordingSessionController<B>,
        settings: &ControlSettings,
    ) -> (Self, ControllerClient) {
        let (command_tx, command_rx) = bounded(COMMAND_QUEUE_DEPTH);

        let worker = Self {
            controller,
            command_rx,
        };
        let client = ControllerClient {
            command_tx,
            timeout: settings.timeout(),
        };

        (worker, client)
    }

    /// Run the worker on a named thread
    ///
    /// The thread hands the controller back when it stops, so the caller
    /// decides when the backend is dropped.
    pub fn spawn(self) -> Result<JoinHandle<RecordingSessionController<B>>> {
        let handle = std::thread::Builder::new()
            .name("pmrecord-controller".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Process commands until shutdown or until every client is gone
    pub fn run(mut self) -> RecordingSessionController<B> {
        tracing::info!("Controller worker started");

        while let Ok(cmd) = self.command_rx.recv() {
            tracing::trace!("Worker command: {}", cmd.name());
            if !self.handle_command(cmd) {
                break;
            }
        }

        tracing::info!("Controller worker stopped");
        self.controller
    }

    /// Handle one command, returning false on shutdown
    fn handle_command(&mut self, cmd: ControllerCommand) -> bool {
        // A client that timed out has dropped its receiver, so sends may fail
        match cmd {
            ControllerCommand::SetupSession {
                folio,
                creator,
                replay,
                reply,
            } => {
                let _ = reply.send(self.controller.setup_session(&folio, &creator, replay));
            }
            ControllerCommand::AddHost {
                session,
                host_spec,
                is_default,
                config,
                reply,
            } => {
                let _ = reply.send(
                    self.controller
                        .add_host(&session, &host_spec, is_default, &config),
                );
            }
            ControllerCommand::Control {
                session,
                target,
                request,
                argument,
                reply,
            } => {
                let _ = reply.send(self.controller.control(
                    &session,
                    target.as_ref(),
                    request,
                    argument.as_deref(),
                ));
            }
            ControllerCommand::State { session, reply } => {
                let _ = reply.send(self.controller.state(&session));
            }
            ControllerCommand::Summary { session, reply } => {
                let _ = reply.send(self.controller.summary(&session));
            }
            ControllerCommand::Shutdown => return false,
        }
        true
    }
}

/// Client side of a controller worker
#[derive(Debug, Clone)]
pub struct ControllerClient {
    command_tx: Sender<ControllerCommand>,
    timeout: Duration,
}

impl ControllerClient {
    /// Reply timeout applied to every call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set up a session
    pub fn setup_session(&self, folio: &str, creator: &str, replay: bool) -> Result<Session> {
        self.call(|reply| ControllerCommand::SetupSession {
            folio: folio.to_string(),
            creator: creator.to_string(),
            replay,
            reply,
        })?
    }

    /// Attach a host and write its configuration
    pub fn add_host(
        &self,
        session: &Session,
        host_spec: &str,
        is_default: bool,
        config: &str,
    ) -> Result<(HostBinding, Status)> {
        self.call(|reply| ControllerCommand::AddHost {
            session: session.clone(),
            host_spec: host_spec.to_string(),
            is_default,
            config: config.to_string(),
            reply,
        })?
    }

    /// Issue a control request
    pub fn control(
        &self,
        session: &Session,
        target: Option<&HostBinding>,
        request: RequestKind,
        argument: Option<&str>,
    ) -> Result<ControlStatus> {
        self.call(|reply| ControllerCommand::Control {
            session: session.clone(),
            target: target.cloned(),
            request,
            argument: argument.map(str::to_string),
            reply,
        })?
    }

    /// Current state of a session
    pub fn state(&self, session: &Session) -> Result<SessionState> {
        self.call(|reply| ControllerCommand::State {
            session: session.clone(),
            reply,
        })
    }

    /// Snapshot a session
    pub fn summary(&self, session: &Session) -> Result<Option<SessionSummary>> {
        self.call(|reply| ControllerCommand::Summary {
            session: session.clone(),
            reply,
        })
    }

    /// Ask the worker to stop
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ControllerCommand::Shutdown);
    }

    fn call<T>(&self, build: impl FnOnce(Sender<T>) -> ControllerCommand) -> Result<T> {
        let (reply_tx, reply_rx) = bounded(1);
        let cmd = build(reply_tx);
        let name = cmd.name();

        self.command_tx
            .send_timeout(cmd, self.timeout)
            .map_err(|_| RecordError::Channel(format!("controller worker gone ({})", name)))?;

        reply_rx.recv_timeout(self.timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => {
                tracing::warn!("{} got no reply within {:?}", name, self.timeout);
                RecordError::Timeout(format!("{} got no reply within {:?}", name, self.timeout))
            }
            RecvTimeoutError::Disconnected => {
                RecordError::Channel(format!("controller worker dropped {}", name))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;

    fn start(
        backend: ScriptedBackend,
        timeout_ms: u64,
    ) -> (
        ControllerClient,
        JoinHandle<RecordingSessionController<ScriptedBackend>>,
    ) {
        let controller = RecordingSessionController::new(backend);
        let (worker, client) = ControllerWorker::new(controller, &ControlSettings { timeout_ms });
        (client, worker.spawn().unwrap())
    }

    #[test]
    fn test_calls_round_trip_through_worker() {
        let (client, handle) = start(ScriptedBackend::new(), 5_000);

        let session = client.setup_session("folio1", "tester", false).unwrap();
        let (host, _) = client.add_host(&session, "hostA", true, "log mem").unwrap();
        let outcome = client
            .control(&session, Some(&host), RequestKind::RecordOn, None)
            .unwrap();

        assert!(outcome.is_completed());
        assert_eq!(client.state(&session).unwrap(), SessionState::Recording);

        client.shutdown();
        let controller = handle.join().unwrap();
        assert_eq!(controller.backend().calls().len(), 4);
    }

    #[test]
    fn test_errors_cross_the_channel() {
        let (client, handle) = start(ScriptedBackend::new().with_setup_failure(Status(-2)), 5_000);

        let err = client.setup_session("folio1", "tester", false).unwrap_err();
        assert_eq!(err.code(), Some(Status(-2)));

        client.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn test_calls_after_shutdown_fail_with_channel_error() {
        let (client, handle) = start(ScriptedBackend::new(), 5_000);
        client.shutdown();
        handle.join().unwrap();

        let err = client.setup_session("folio1", "tester", false).unwrap_err();
        assert!(matches!(err, RecordError::Channel(_)));
    }

    #[test]
    fn test_worker_stops_when_clients_drop() {
        let (client, handle) = start(ScriptedBackend::new(), 5_000);
        client.setup_session("folio1", "tester", false).unwrap();
        drop(client);

        let controller = handle.join().unwrap();
        assert_eq!(controller.session_count(), 1);
    }
}

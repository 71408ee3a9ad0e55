//! # pmrecord-rs: Archive Recording Session Control
//!
//! A library and command line tool for coordinating performance-archive
//! recording sessions. A session ties together a folio (the file listing
//! every archive recorded together), a set of monitored hosts each with its
//! own logger configuration, and the control requests that start, stop and
//! detach the loggers.
//!
//! ## Architecture
//!
//! - **Backend**: The recording boundary, spoken in opaque tokens and integer
//!   status codes. [`backend::LoggerBackend`] drives real logger processes;
//!   [`backend::ScriptedBackend`] replays queued replies for tests
//! - **Session**: [`session::RecordingSessionController`] validates requests,
//!   turns status codes into [`RecordError`]s and tracks session state
//! - **Worker**: [`session::ControllerWorker`] serializes calls on one thread;
//!   clients wait with a bounded timeout over crossbeam channels
//! - **Config**: [`config::RecorderConfig`] loaded from TOML
//!
//! ## Configuration
//!
//! Settings are stored in the platform config directory under `pmrecord-rs`:
//!
//! - **Linux**: `~/.config/pmrecord-rs/recorder.toml`
//! - **macOS**: `~/Library/Application Support/pmrecord-rs/recorder.toml`
//! - **Windows**: `%APPDATA%\pmrecord-rs\recorder.toml`
//!
//! `PMRECORD_CONFIG` names a different file.
//!
//! ## Example
//!
//! ```ignore
//! use pmrecord_rs::{
//!     backend::LoggerBackend,
//!     config::RecorderConfig,
//!     session::RecordingSessionController,
//!     types::RequestKind,
//! };
//!
//! fn main() -> pmrecord_rs::Result<()> {
//!     let config = RecorderConfig::load_or_default();
//!     let mut controller = RecordingSessionController::new(LoggerBackend::new(config.logger));
//!
//!     let session = controller.setup_session("/tmp/run1", "example", false)?;
//!     let (host, _) = controller.add_host(&session, "localhost", true, "log mandatory on 10 sec {\n  kernel.all.load\n}\n")?;
//!     controller.control(&session, Some(&host), RequestKind::RecordOn, None)?;
//!     controller.control(&session, Some(&host), RequestKind::RecordOff, None)?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use backend::{LoggerBackend, RecordBackend, ScriptedBackend};
pub use config::RecorderConfig;
pub use error::{RecordError, Result, ResultExt};
pub use session::{
    ControllerClient, ControllerWorker, HostBinding, RecordingSessionController, Session,
    SessionSummary,
};
pub use types::{ControlStatus, HostHandle, RequestKind, SessionHandle, SessionState, Status};

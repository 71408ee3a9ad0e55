//! Backend module for the recording boundary
//!
//! Everything below the session controller lives here. A backend accepts
//! opaque tokens and text, and answers in integer status codes; it never
//! raises errors of its own.
//!
//! # Components
//!
//! - [`RecordBackend`] - The boundary trait the controller is written against
//! - [`LoggerBackend`] - Writes folios and configuration files and runs one
//!   logger process per recorded host
//! - [`ScriptedBackend`] - Replies from queued status codes and journals every
//!   call, for tests and benchmarks
//! - [`BackendStats`] - Per-operation call counters shared by all backends
//!
//! # Example
//!
//! ```ignore
//! use pmrecord_rs::backend::{LoggerBackend, RecordBackend};
//! use pmrecord_rs::config::RecorderConfig;
//! use pmrecord_rs::session::RecordingSessionController;
//!
//! let config = RecorderConfig::load_or_default();
//! let backend = LoggerBackend::new(config.logger);
//! let mut controller = RecordingSessionController::new(backend);
//! let session = controller.setup_session("/var/log/pcp/run1", "pmrecord", false)?;
//! ```

pub mod backend_trait;
pub mod logger;
pub mod scripted;

pub use backend_trait::{BackendOp, BackendStats, RecordBackend};
pub use logger::LoggerBackend;
pub use scripted::{BackendCall, ScriptedBackend};

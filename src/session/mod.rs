//! Recording session module
//!
//! This module owns the session layer that sits on top of a
//! [`RecordBackend`](crate::backend::RecordBackend):
//!
//! - [`RecordingSessionController`] - Validates requests, translates status
//!   codes into errors and tracks each session's recording state
//! - [`ControllerWorker`] / [`ControllerClient`] - Run a controller on its own
//!   thread and call it with a bounded reply timeout
//! - [`Folio`] - Reader and writer for the folio file tying archives together
//! - [`Session`], [`HostBinding`], [`SessionSummary`] - Session data types

pub mod controller;
pub mod folio;
pub mod types;
pub mod worker;

pub use controller::RecordingSessionController;
pub use folio::{replay_config_path, Folio, FolioArchive, FOLIO_MAGIC, FOLIO_VERSION};
pub use types::{HostBinding, HostCondition, HostSummary, Session, SessionSummary};
pub use worker::{ControllerClient, ControllerCommand, ControllerWorker};

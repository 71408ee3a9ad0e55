//! Scripted backend construction helpers

use pmrecord_rs::backend::ScriptedBackend;
use pmrecord_rs::config::ControlSettings;
use pmrecord_rs::session::{ControllerClient, ControllerWorker, Session};
use pmrecord_rs::RecordingSessionController;
use std::thread::JoinHandle;

/// Controller over a backend that accepts everything
pub fn healthy_controller() -> RecordingSessionController<ScriptedBackend> {
    RecordingSessionController::new(ScriptedBackend::new())
}

/// Controller with a session already set up
pub fn controller_with_session(
    backend: ScriptedBackend,
) -> (RecordingSessionController<ScriptedBackend>, Session) {
    let mut controller = RecordingSessionController::new(backend);
    let session = controller
        .setup_session("folio1", "tester", false)
        .expect("scripted setup succeeds");
    (controller, session)
}

/// Start a worker around a scripted controller
pub fn spawn_worker(
    backend: ScriptedBackend,
    timeout_ms: u64,
) -> (
    ControllerClient,
    JoinHandle<RecordingSessionController<ScriptedBackend>>,
) {
    let controller = RecordingSessionController::new(backend);
    let (worker, client) = ControllerWorker::new(controller, &ControlSettings { timeout_ms });
    let handle = worker.spawn().expect("worker thread starts");
    (client, handle)
}

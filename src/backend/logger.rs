//! Logger process backend
//!
//! This backend records archives by running one logger process per host.
//! It owns everything on disk that belongs to a session:
//!
//! - the folio file, created by `setup` and extended with one `Archive:`
//!   line per registered host
//! - a `<stem>-<host>.config` file per host, kept open as that host's
//!   configuration channel until its logger is launched
//! - a `<stem>-<host>.log` file capturing the logger's stderr
//!
//! A logger is launched as
//!
//! ```text
//! <program> <leading args> -c <config> -h <host> <default args> <session args> <host args> <archive base>
//! ```
//!
//! and stopped with SIGTERM, followed by a kill once the grace period runs
//! out. A logger that has already gone away by the time it is asked to stop
//! yields [`Status::IPC`]: the session lost contact with it, which is not the
//! caller's fault.

use chrono::Utc;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

use crate::config::LoggerSettings;
use crate::session::folio::{replay_config_path, Folio};
use crate::types::{HostHandle, RequestKind, SessionHandle, Status};

use super::backend_trait::{BackendOp, BackendStats, RecordBackend};

/// Per-session state: the folio and session-wide logger arguments
#[derive(Debug)]
struct FolioState {
    path: PathBuf,
    file: File,
    dir: PathBuf,
    stem: String,
    args: Vec<String>,
    hosts: Vec<HostHandle>,
    default_host: Option<HostHandle>,
}

/// Per-host state: configuration channel and logger process
#[derive(Debug)]
struct LoggerHost {
    session: SessionHandle,
    host_spec: String,
    config_path: PathBuf,
    config: Option<File>,
    archive_base: PathBuf,
    args: Vec<String>,
    /// A configuration write succeeded
    configured: bool,
    logger: Option<Child>,
}

/// Recording backend that launches logger processes
#[derive(Debug)]
pub struct LoggerBackend {
    settings: LoggerSettings,
    sessions: HashMap<SessionHandle, FolioState>,
    hosts: HashMap<HostHandle, LoggerHost>,
    next_token: u64,
    last_error: Status,
    stats: BackendStats,
}

impl LoggerBackend {
    /// Create a backend with the given logger settings
    pub fn new(settings: LoggerSettings) -> Self {
        Self {
            settings,
            sessions: HashMap::new(),
            hosts: HashMap::new(),
            next_token: 1,
            last_error: Status::OK,
            stats: BackendStats::default(),
        }
    }

    /// Logger settings in use
    pub fn settings(&self) -> &LoggerSettings {
        &self.settings
    }

    /// Path of the folio written for a session
    pub fn folio_path(&self, session: SessionHandle) -> Option<&Path> {
        self.sessions.get(&session).map(|s| s.path.as_path())
    }

    /// Configuration file of a host
    pub fn config_path(&self, host: HostHandle) -> Option<&Path> {
        self.hosts.get(&host).map(|h| h.config_path.as_path())
    }

    /// Archive base name of a host
    pub fn archive_base(&self, host: HostHandle) -> Option<&Path> {
        self.hosts.get(&host).map(|h| h.archive_base.as_path())
    }

    /// Process id of a host's logger, if one is attached
    pub fn logger_pid(&self, host: HostHandle) -> Option<u32> {
        self.hosts
            .get(&host)
            .and_then(|h| h.logger.as_ref())
            .map(Child::id)
    }

    fn next_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    fn create_folio(&mut self, folio: &str, creator: &str, replay: bool) -> Result<u64, Status> {
        // Folio lines are newline separated and tab delimited
        if has_control(folio) || has_control(creator) {
            tracing::warn!("Folio name or creator contains control characters");
            return Err(Status::INVALID);
        }

        let path = PathBuf::from(folio);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "folio".to_string());
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let replay_config = replay.then(|| replay_config_path(&path));
        let header = Folio::header(creator, replay_config.as_deref(), Utc::now());

        let mut file = File::create(&path).map_err(|e| io_status(folio, &e))?;
        file.write_all(header.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| io_status(folio, &e))?;

        let token = self.next_token();
        let handle = SessionHandle::new(token).ok_or(Status::GENERIC)?;

        tracing::info!(%handle, folio = %path.display(), creator, replay, "Created folio");
        self.sessions.insert(
            handle,
            FolioState {
                path,
                file,
                dir,
                stem,
                args: Vec::new(),
                hosts: Vec::new(),
                default_host: None,
            },
        );
        Ok(token)
    }

    fn register(
        &mut self,
        session: SessionHandle,
        host_spec: &str,
        is_default: bool,
    ) -> Result<HostHandle, Status> {
        let token = self.next_token();
        let hosts = &self.hosts;
        let Some(folio) = self.sessions.get_mut(&session) else {
            return Err(Status::BAD_HANDLE);
        };

        if host_spec.is_empty() || host_spec.chars().any(|c| c.is_whitespace() || c.is_control()) {
            tracing::warn!("Host spec {:?} cannot be written to a folio", host_spec);
            return Err(Status::INVALID);
        }
        // Distinct specs may sanitize to the same archive and config name
        let file_name = sanitize_host(host_spec);
        if let Some(existing) = folio
            .hosts
            .iter()
            .filter_map(|h| hosts.get(h))
            .find(|h| sanitize_host(&h.host_spec) == file_name)
        {
            tracing::warn!(
                "Host {:?} clashes with {:?} already part of {}",
                host_spec,
                existing.host_spec,
                session
            );
            return Err(Status::EXISTS);
        }
        if is_default && folio.default_host.is_some() {
            tracing::warn!("{} already has a default host", session);
            return Err(Status::INVALID);
        }

        let archive_base = folio
            .dir
            .join(format!("{}-{}", folio.stem, file_name));
        let config_path = with_suffix(&archive_base, ".config");

        let config = File::create(&config_path).map_err(|e| Status::from_io(&e))?;

        folio
            .file
            .write_all(Folio::archive_line(host_spec, &archive_base).as_bytes())
            .and_then(|_| folio.file.flush())
            .map_err(|e| Status::from_io(&e))?;

        let handle = HostHandle::new(token).ok_or(Status::GENERIC)?;
        folio.hosts.push(handle);
        if is_default {
            folio.default_host = Some(handle);
        }

        tracing::info!(%handle, host = host_spec, is_default, config = %config_path.display(), "Registered host");
        self.hosts.insert(
            handle,
            LoggerHost {
                session,
                host_spec: host_spec.to_string(),
                config_path,
                config: Some(config),
                archive_base,
                args: Vec::new(),
                configured: false,
                logger: None,
            },
        );
        Ok(handle)
    }

    fn targets(
        &self,
        session: SessionHandle,
        host: Option<HostHandle>,
    ) -> Result<Vec<HostHandle>, Status> {
        let folio = self.sessions.get(&session).ok_or(Status::BAD_HANDLE)?;
        match host {
            Some(handle) => match self.hosts.get(&handle) {
                Some(h) if h.session == session => Ok(vec![handle]),
                _ => Err(Status::BAD_HANDLE),
            },
            None => Ok(folio.hosts.clone()),
        }
    }

    fn with_targets(
        &mut self,
        session: SessionHandle,
        host: Option<HostHandle>,
        apply: impl FnOnce(&mut Self, &[HostHandle]) -> Status,
    ) -> Status {
        match self.targets(session, host) {
            Ok(targets) => apply(self, &targets),
            Err(status) => status,
        }
    }

    fn set_arg(
        &mut self,
        session: SessionHandle,
        host: Option<HostHandle>,
        argument: Option<&str>,
    ) -> Status {
        let tokens: Vec<String> = match argument {
            Some(arg) if !arg.trim().is_empty() => {
                arg.split_whitespace().map(str::to_string).collect()
            }
            _ => return Status::INVALID,
        };

        let args = match host {
            Some(handle) => self.hosts.get_mut(&handle).map(|h| &mut h.args),
            None => self.sessions.get_mut(&session).map(|f| &mut f.args),
        };
        match args {
            Some(args) => {
                tracing::debug!(?tokens, "Adding logger arguments");
                args.extend(tokens);
                Status::OK
            }
            None => Status::BAD_HANDLE,
        }
    }

    fn record_on(&mut self, session: SessionHandle, targets: &[HostHandle], explicit: bool) -> Status {
        let Some(folio) = self.sessions.get(&session) else {
            return Status::BAD_HANDLE;
        };
        let session_args = folio.args.clone();

        let statuses: Vec<Status> = targets
            .iter()
            .filter_map(|handle| match self.hosts.get_mut(handle) {
                Some(host) if host.configured => Some(launch(&self.settings, &session_args, host)),
                Some(host) if explicit => {
                    tracing::warn!("Host {:?} has no configuration", host.host_spec);
                    Some(Status::INVALID)
                }
                Some(host) => {
                    tracing::debug!(host = %host.host_spec, "Skipping unconfigured host");
                    None
                }
                None => Some(Status::BAD_HANDLE),
            })
            .collect();
        aggregate(statuses)
    }

    fn record_off(&mut self, targets: &[HostHandle], explicit: bool) -> Status {
        let grace = self.settings.stop_grace_duration();
        let mut statuses = Vec::new();

        for handle in targets {
            let Some(host) = self.hosts.get_mut(handle) else {
                statuses.push(Status::BAD_HANDLE);
                continue;
            };
            match host.logger.take() {
                Some(child) => statuses.push(stop(&host.host_spec, child, grace)),
                None if explicit => {
                    tracing::warn!("Host {:?} is not recording", host.host_spec);
                    statuses.push(Status::INVALID);
                }
                None => {}
            }
        }

        if statuses.is_empty() {
            tracing::warn!("No logger is recording");
            return Status::INVALID;
        }
        aggregate(statuses)
    }

    fn detach(&mut self, targets: &[HostHandle]) -> Status {
        for handle in targets {
            if let Some(host) = self.hosts.get_mut(handle) {
                if let Some(child) = host.logger.take() {
                    tracing::info!(pid = child.id(), host = %host.host_spec, "Detached from logger");
                }
            }
        }
        Status::OK
    }

    fn alive(&mut self, targets: &[HostHandle]) -> Status {
        let mut count = 0usize;
        for handle in targets {
            let Some(child) = self.hosts.get_mut(handle).and_then(|h| h.logger.as_mut()) else {
                continue;
            };
            if let Ok(None) = child.try_wait() {
                count += 1;
            }
        }
        Status::from_count(count)
    }
}

impl RecordBackend for LoggerBackend {
    fn setup(&mut self, folio: &str, creator: &str, replay: bool) -> u64 {
        let raw = match self.create_folio(folio, creator, replay) {
            Ok(token) => token,
            Err(status) => {
                self.last_error = status;
                0
            }
        };
        let status = if raw == 0 { self.last_error } else { Status::OK };
        self.stats.record(BackendOp::Setup, status);
        raw
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
        let reply = match self.register(session, host_spec, is_default) {
            Ok(handle) => (Status::OK, Some(handle)),
            Err(status) => (status, None),
        };
        self.stats.record(BackendOp::RegisterHost, reply.0);
        reply
    }

    fn write_config(&mut self, host: HostHandle, config: &str) -> Status {
        let status = match self.hosts.get_mut(&host) {
            Some(LoggerHost {
                config: Some(file),
                configured,
                ..
            }) => match file.write_all(config.as_bytes()).and_then(|_| file.flush()) {
                Ok(()) => {
                    *configured = true;
                    Status::from_count(config.len())
                }
                Err(e) => Status::from_io(&e),
            },
            _ => Status::BAD_HANDLE,
        };
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
        let status = match request {
            RequestKind::SetArg => self.set_arg(session, host, argument),
            RequestKind::RecordOn => self.with_targets(session, host, |b, targets| {
                b.record_on(session, targets, host.is_some())
            }),
            RequestKind::RecordOff => self.with_targets(session, host, |b, targets| {
                b.record_off(targets, host.is_some())
            }),
            RequestKind::Detach => self.with_targets(session, host, Self::detach),
            RequestKind::Status => self.with_targets(session, host, Self::alive),
        };
        self.stats.record(BackendOp::Control, status);
        status
    }

    fn stats(&self) -> &BackendStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut BackendStats {
        &mut self.stats
    }
}

impl Drop for LoggerBackend {
    fn drop(&mut self) {
        let grace = self.settings.stop_grace_duration();
        for host in self.hosts.values_mut() {
            if let Some(child) = host.logger.take() {
                tracing::info!(host = %host.host_spec, "Stopping logger left attached");
                stop(&host.host_spec, child, grace);
            }
        }
    }
}

/// Launch the logger for one host; a logger that is still running is left alone
fn launch(settings: &LoggerSettings, session_args: &[String], host: &mut LoggerHost) -> Status {
    if let Some(child) = host.logger.as_mut() {
        if let Ok(None) = child.try_wait() {
            tracing::debug!(host = %host.host_spec, "Logger already recording");
            return Status::OK;
        }
        host.logger = None;
    }

    // The logger reads the configuration file, so the channel is closed first
    if let Some(mut config) = host.config.take() {
        if let Err(e) = config.flush() {
            return Status::from_io(&e);
        }
    }

    let log_path = with_suffix(&host.archive_base, ".log");
    let stderr = match File::create(&log_path) {
        Ok(file) => Stdio::from(file),
        Err(e) => {
            tracing::warn!("Cannot create logger log {}: {}", log_path.display(), e);
            Stdio::null()
        }
    };

    let mut command = Command::new(&settings.program);
    command
        .args(&settings.leading_args)
        .arg("-c")
        .arg(&host.config_path)
        .arg("-h")
        .arg(&host.host_spec)
        .args(&settings.default_args)
        .args(session_args)
        .args(&host.args)
        .arg(&host.archive_base)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(stderr);

    match command.spawn() {
        Ok(child) => {
            tracing::info!(pid = child.id(), host = %host.host_spec, "Logger started");
            host.logger = Some(child);
            Status::OK
        }
        Err(e) => {
            tracing::warn!(
                "Failed to launch {} for {:?}: {}",
                settings.program.display(),
                host.host_spec,
                e
            );
            Status::from_io(&e)
        }
    }
}

/// Stop one logger: SIGTERM, then kill after the grace period
fn stop(host_spec: &str, mut child: Child, grace: Duration) -> Status {
    match child.try_wait() {
        Ok(Some(exit)) => {
            tracing::warn!("Logger for {:?} already exited ({})", host_spec, exit);
            return Status::IPC;
        }
        Ok(None) => {}
        Err(e) => return Status::from_io(&e),
    }

    if let Err(e) = request_stop(&mut child) {
        tracing::warn!("Failed to signal logger for {:?}: {}", host_spec, e);
    }

    match child.wait_timeout(grace) {
        Ok(Some(exit)) => {
            tracing::info!("Logger for {:?} stopped ({})", host_spec, exit);
            Status::OK
        }
        Ok(None) => {
            tracing::warn!(
                "Logger for {:?} ignored the stop request for {:?}, killing it",
                host_spec,
                grace
            );
            let _ = child.kill();
            let _ = child.wait();
            Status::OK
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            Status::from_io(&e)
        }
    }
}

#[cfg(unix)]
fn request_stop(child: &mut Child) -> std::io::Result<()> {
    let pid = libc::pid_t::try_from(child.id())
        .map_err(|_| std::io::Error::other("logger pid out of range"))?;
    // SAFETY: the child has not been reaped yet, so the pid still names it
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

/// Combine per-host statuses: a hard error wins, then the transient sentinel
fn aggregate(statuses: impl IntoIterator<Item = Status>) -> Status {
    let mut hard = None;
    let mut transient = false;
    for status in statuses {
        if status.is_transient() {
            transient = true;
        } else if status.is_error() && hard.is_none() {
            hard = Some(status);
        }
    }
    match (hard, transient) {
        (Some(status), _) => status,
        (None, true) => Status::IPC,
        (None, false) => Status::OK,
    }
}

/// Check for characters that would break a folio line
fn has_control(text: &str) -> bool {
    text.chars().any(char::is_control)
}

fn io_status(folio: &str, err: &std::io::Error) -> Status {
    tracing::warn!("Failed to create folio {:?}: {}", folio, err);
    Status::from_io(err)
}

/// Make a host spec safe to use in a file name
fn sanitize_host(host_spec: &str) -> String {
    host_spec
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Append a suffix to a path without touching its extension
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn folio_in(dir: &TempDir) -> String {
        dir.path().join("run.folio").to_string_lossy().into_owned()
    }

    #[test]
    fn test_aggregate() {
        assert_eq!(aggregate([Status::OK, Status::OK]), Status::OK);
        assert_eq!(aggregate([Status::OK, Status::IPC]), Status::IPC);
        assert_eq!(aggregate([Status::IPC, Status(-3), Status(-4)]), Status(-3));
        assert_eq!(aggregate(std::iter::empty()), Status::OK);
    }

    #[test]
    fn test_sanitize_host() {
        assert_eq!(sanitize_host("db1.example.com"), "db1.example.com");
        assert_eq!(sanitize_host("local:/run/pmcd.socket"), "local__run_pmcd.socket");
    }

    #[test]
    fn test_with_suffix_keeps_dots() {
        assert_eq!(
            with_suffix(Path::new("/tmp/run-db1.example.com"), ".config"),
            PathBuf::from("/tmp/run-db1.example.com.config")
        );
    }

    #[test]
    fn test_setup_writes_folio_header() {
        let dir = TempDir::new().unwrap();
        let mut backend = LoggerBackend::new(LoggerSettings::default());
        let raw = backend.setup(&folio_in(&dir), "tester", true);
        let session = SessionHandle::new(raw).unwrap();

        let folio = Folio::load(backend.folio_path(session).unwrap()).unwrap();
        assert_eq!(folio.creator, "tester");
        assert_eq!(
            folio.replay_config,
            Some(dir.path().join("run.config"))
        );
        assert!(folio.archives.is_empty());
    }

    #[test]
    fn test_setup_failure_reports_errno() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no").join("such").join("run.folio");
        let mut backend = LoggerBackend::new(LoggerSettings::default());

        assert_eq!(backend.setup(&missing.to_string_lossy(), "tester", false), 0);
        assert!(backend.last_error().is_error());
        assert_eq!(backend.stats().failures, 1);
    }

    #[test]
    fn test_register_and_write_config() {
        let dir = TempDir::new().unwrap();
        let mut backend = LoggerBackend::new(LoggerSettings::default());
        let session = SessionHandle::new(backend.setup(&folio_in(&dir), "tester", false)).unwrap();

        let (status, host) = backend.register_host(session, "hostA", true);
        assert_eq!(status, Status::OK);
        let host = host.unwrap();

        assert_eq!(backend.write_config(host, "log mem,disk\n"), Status(13));
        let written = std::fs::read_to_string(backend.config_path(host).unwrap()).unwrap();
        assert_eq!(written, "log mem,disk\n");

        let folio = Folio::load(backend.folio_path(session).unwrap()).unwrap();
        assert_eq!(folio.archives.len(), 1);
        assert_eq!(folio.archives[0].host, "hostA");
        assert_eq!(folio.archives[0].base, dir.path().join("run-hostA"));
    }

    #[test]
    fn test_register_rejects_second_default_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let mut backend = LoggerBackend::new(LoggerSettings::default());
        let session = SessionHandle::new(backend.setup(&folio_in(&dir), "tester", false)).unwrap();

        assert!(backend.register_host(session, "hostA", true).1.is_some());
        assert_eq!(
            backend.register_host(session, "hostB", true),
            (Status::INVALID, None)
        );
        assert_eq!(
            backend.register_host(session, "hostA", false),
            (Status::EXISTS, None)
        );
        assert!(backend.register_host(session, "hostB", false).1.is_some());
    }

    #[test]
    fn test_unknown_handles() {
        let mut backend = LoggerBackend::new(LoggerSettings::default());
        let session = SessionHandle::new(99).unwrap();
        let host = HostHandle::new(98).unwrap();

        assert_eq!(
            backend.register_host(session, "hostA", false),
            (Status::BAD_HANDLE, None)
        );
        assert_eq!(backend.write_config(host, "x"), Status::BAD_HANDLE);
        assert_eq!(
            backend.control(session, None, RequestKind::RecordOn, None),
            Status::BAD_HANDLE
        );
    }

    #[test]
    fn test_set_arg_requires_text() {
        let dir = TempDir::new().unwrap();
        let mut backend = LoggerBackend::new(LoggerSettings::default());
        let session = SessionHandle::new(backend.setup(&folio_in(&dir), "tester", false)).unwrap();

        assert_eq!(
            backend.control(session, None, RequestKind::SetArg, None),
            Status::INVALID
        );
        assert_eq!(
            backend.control(session, None, RequestKind::SetArg, Some("  ")),
            Status::INVALID
        );
        assert_eq!(
            backend.control(session, None, RequestKind::SetArg, Some("-t 5")),
            Status::OK
        );
    }

    #[test]
    fn test_record_off_without_logger_is_invalid() {
        let dir = TempDir::new().unwrap();
        let mut backend = LoggerBackend::new(LoggerSettings::default());
        let session = SessionHandle::new(backend.setup(&folio_in(&dir), "tester", false)).unwrap();
        let host = backend.register_host(session, "hostA", true).1.unwrap();

        assert_eq!(
            backend.control(session, Some(host), RequestKind::RecordOff, None),
            Status::INVALID
        );
        assert_eq!(
            backend.control(session, None, RequestKind::Status, None),
            Status::OK
        );
    }

    #[test]
    fn test_missing_program_reports_errno() {
        let dir = TempDir::new().unwrap();
        let settings = LoggerSettings::with_program(dir.path().join("no-such-logger"));
        let mut backend = LoggerBackend::new(settings);
        let session = SessionHandle::new(backend.setup(&folio_in(&dir), "tester", false)).unwrap();
        let host = backend.register_host(session, "hostA", true).1.unwrap();
        assert!(backend.write_config(host, "log mem\n").is_ok());

        let status = backend.control(session, Some(host), RequestKind::RecordOn, None);
        assert!(status.is_error());
        assert!(!status.is_transient());
        assert!(backend.logger_pid(host).is_none());
    }

    #[test]
    fn test_register_rejects_sanitized_name_clash() {
        let dir = TempDir::new().unwrap();
        let mut backend = LoggerBackend::new(LoggerSettings::default());
        let session = SessionHandle::new(backend.setup(&folio_in(&dir), "tester", false)).unwrap();

        let first = backend.register_host(session, "db:1", true).1.unwrap();
        assert_eq!(backend.write_config(first, "CONFIG-A\n"), Status(9));

        assert_eq!(
            backend.register_host(session, "db_1", false),
            (Status::EXISTS, None)
        );
        let written = std::fs::read_to_string(backend.config_path(first).unwrap()).unwrap();
        assert_eq!(written, "CONFIG-A\n");

        let folio = Folio::load(backend.folio_path(session).unwrap()).unwrap();
        assert_eq!(folio.hosts().collect::<Vec<_>>(), vec!["db:1"]);
    }

    #[test]
    fn test_register_rejects_whitespace_in_host() {
        let dir = TempDir::new().unwrap();
        let mut backend = LoggerBackend::new(LoggerSettings::default());
        let session = SessionHandle::new(backend.setup(&folio_in(&dir), "tester", false)).unwrap();

        for spec in ["host A", "host\tA", "hostA\n", "hostA\r"] {
            assert_eq!(
                backend.register_host(session, spec, false),
                (Status::INVALID, None),
                "{spec:?}"
            );
        }
        let folio = Folio::load(backend.folio_path(session).unwrap()).unwrap();
        assert!(folio.archives.is_empty());
    }

    #[test]
    fn test_setup_rejects_line_breaks() {
        let dir = TempDir::new().unwrap();
        let mut backend = LoggerBackend::new(LoggerSettings::default());

        let creator = "night\nArchive:\tghost\t/etc/passwd";
        assert_eq!(backend.setup(&folio_in(&dir), creator, false), 0);
        assert_eq!(backend.last_error(), Status::INVALID);
        assert!(!dir.path().join("run.folio").exists());

        let folio = dir.path().join("run\n.folio");
        assert_eq!(backend.setup(&folio.to_string_lossy(), "tester", false), 0);
        assert_eq!(backend.last_error(), Status::INVALID);
    }

    #[test]
    fn test_session_wide_record_on_skips_unconfigured_hosts() {
        let dir = TempDir::new().unwrap();
        let mut backend = LoggerBackend::new(LoggerSettings::default());
        let session = SessionHandle::new(backend.setup(&folio_in(&dir), "tester", false)).unwrap();
        let host = backend.register_host(session, "hostA", true).1.unwrap();

        assert_eq!(
            backend.control(session, None, RequestKind::RecordOn, None),
            Status::OK
        );
        assert!(backend.logger_pid(host).is_none());
        assert_eq!(
            backend.control(session, Some(host), RequestKind::RecordOn, None),
            Status::INVALID
        );
        assert!(backend.logger_pid(host).is_none());
    }
}

//! pmrecord - Archive recording session coordinator
//!
//! Subcommands:
//! - `pmrecord record` - Set up a session, attach hosts and run their loggers
//! - `pmrecord show <folio>` - Print a folio as JSON

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use pmrecord_rs::{
    config::RecorderConfig,
    session::{ControllerClient, ControllerWorker, Folio, HostBinding, Session},
    LoggerBackend, RecordError, RecordingSessionController, RequestKind,
};

#[derive(Parser)]
#[command(name = "pmrecord")]
#[command(about = "Coordinate performance archive recording sessions")]
#[command(version)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record archives from one or more hosts
    Record(RecordArgs),

    /// Print a folio as JSON
    Show {
        /// Folio file
        folio: PathBuf,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("logger_config").required(true)))]
struct RecordArgs {
    /// Folio path prefix for the archives
    #[arg(long)]
    folio: String,

    /// Provenance label written to the folio
    #[arg(long, default_value = "pmrecord")]
    creator: String,

    /// Replay an existing archive instead of recording
    #[arg(long)]
    replay: bool,

    /// Host to record from (repeatable)
    #[arg(long = "host")]
    hosts: Vec<String>,

    /// Host that receives session-wide requests
    #[arg(long)]
    default_host: Option<String>,

    /// Logger configuration file given to every host
    #[arg(long, group = "logger_config")]
    config_file: Option<PathBuf>,

    /// Logger configuration text given to every host
    #[arg(long, group = "logger_config")]
    config: Option<String>,

    /// Extra logger arguments for the whole session (repeatable)
    #[arg(long = "arg")]
    args: Vec<String>,

    /// Stop after this many seconds instead of waiting for Enter
    #[arg(long)]
    duration: Option<u64>,

    /// Detach from the loggers instead of stopping them
    #[arg(long)]
    detach: bool,

    /// Recorder settings file
    #[arg(long, env = "PMRECORD_CONFIG")]
    settings: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Record(args) => record(args),
        Commands::Show { folio } => show(&folio),
    }
}

/// Install the console layer and, when asked, a non-blocking file layer
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pmrecord_rs=debug"));

    // stdout carries the JSON output
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .boxed();

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("log file {:?} has no file name", path))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {:?}", dir))?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_names(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn record(args: RecordArgs) -> Result<()> {
    let config = match &args.settings {
        Some(path) => RecorderConfig::load(path)?,
        None => RecorderConfig::load_default_location()?,
    };

    let logger_config = match (&args.config_file, &args.config) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read logger configuration {:?}", path))?,
        (None, Some(text)) => text.clone(),
        (None, None) => bail!("no logger configuration given"),
    };

    if args.hosts.is_empty() && args.default_host.is_none() {
        bail!("at least one --host or --default-host is required");
    }

    tracing::info!("Starting recording session for {}", args.folio);

    let controller = RecordingSessionController::new(LoggerBackend::new(config.logger.clone()));
    let (worker, client) = ControllerWorker::new(controller, &config.control);
    let handle = worker.spawn()?;

    let outcome = run_session(&client, &args, &logger_config);

    client.shutdown();
    // Dropping the controller stops any logger still attached
    if handle.join().is_err() {
        tracing::error!("Controller worker panicked");
    }

    outcome
}

fn run_session(client: &ControllerClient, args: &RecordArgs, logger_config: &str) -> Result<()> {
    let session = client
        .setup_session(&args.folio, &args.creator, args.replay)
        .with_context(|| format!("failed to set up session for {}", args.folio))?;

    let hosts = args
        .default_host
        .iter()
        .map(|h| (h, true))
        .chain(args.hosts.iter().map(|h| (h, false)));
    let mut attached: Vec<HostBinding> = Vec::new();
    for (host, is_default) in hosts {
        match client.add_host(&session, host, is_default, logger_config) {
            Ok((binding, _)) => attached.push(binding),
            Err(e @ RecordError::ConfigWrite { .. }) => {
                tracing::warn!("Skipping {}: {}", host, e);
            }
            Err(e) => return Err(e).with_context(|| format!("failed to add host {}", host)),
        }
    }
    if attached.is_empty() {
        bail!("no host could be configured");
    }

    for arg in &args.args {
        let outcome = client.control(&session, None, RequestKind::SetArg, Some(arg))?;
        tracing::debug!("set-arg {:?}: {:?}", arg, outcome);
    }

    let started = start_all(client, &session, &attached);
    if started.is_empty() {
        tracing::error!("No logger could be started");
    } else {
        wait_for_stop(args.duration)?;
    }

    let stop = if args.detach {
        RequestKind::Detach
    } else {
        RequestKind::RecordOff
    };
    stop_all(client, &session, &started, stop);

    if let Some(summary) = client.summary(&session)? {
        println!("{}", summary.to_json()?);
    }
    Ok(())
}

/// Start every host, logging failures so the remaining hosts still start
///
/// Returns the hosts whose start was accepted.
fn start_all(
    client: &ControllerClient,
    session: &Session,
    hosts: &[HostBinding],
) -> Vec<HostBinding> {
    let mut started = Vec::new();
    for binding in hosts {
        match client.control(session, Some(binding), RequestKind::RecordOn, None) {
            Ok(outcome) => {
                if outcome.is_transient() {
                    tracing::warn!("Logger for {} did not confirm start", binding.host_spec());
                }
                started.push(binding.clone());
            }
            Err(e) => tracing::error!("record-on for {} failed: {}", binding.host_spec(), e),
        }
    }
    started
}

/// Stop every host, logging failures so the remaining hosts still stop
fn stop_all(client: &ControllerClient, session: &Session, hosts: &[HostBinding], stop: RequestKind) {
    for binding in hosts {
        match client.control(session, Some(binding), stop, None) {
            Ok(outcome) if outcome.is_transient() => {
                tracing::warn!("Logger for {} had already gone away", binding.host_spec());
            }
            Ok(_) => {}
            Err(e) => tracing::error!("{} for {} failed: {}", stop, binding.host_spec(), e),
        }
    }
}

fn wait_for_stop(duration: Option<u64>) -> Result<()> {
    match duration {
        Some(secs) => {
            tracing::info!("Recording for {} seconds", secs);
            std::thread::sleep(Duration::from_secs(secs));
        }
        None => {
            eprintln!("Recording, press Enter to stop");
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .context("failed to read from stdin")?;
        }
    }
    Ok(())
}

fn show(path: &Path) -> Result<()> {
    let folio = Folio::load(path)?;
    println!("{}", serde_json::to_string_pretty(&folio)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmrecord_rs::backend::ScriptedBackend;
    use pmrecord_rs::config::ControlSettings;
    use pmrecord_rs::Status;

    #[test]
    fn test_start_all_continues_past_failed_host() {
        let backend = ScriptedBackend::new().with_control_status(Status(-111));
        let controller = RecordingSessionController::new(backend);
        let (worker, client) =
            ControllerWorker::new(controller, &ControlSettings { timeout_ms: 5_000 });
        let handle = worker.spawn().unwrap();

        let session = client.setup_session("folio1", "tester", false).unwrap();
        let hosts: Vec<HostBinding> = ["hostA", "hostB"]
            .iter()
            .map(|h| client.add_host(&session, h, false, "log mem").unwrap().0)
            .collect();

        let started = start_all(&client, &session, &hosts);
        assert_eq!(started, vec![hosts[1].clone()]);

        let summary = client.summary(&session).unwrap().unwrap();
        assert!(!summary.hosts[0].recording);
        assert!(summary.hosts[1].recording);

        stop_all(&client, &session, &started, RequestKind::RecordOff);
        assert_eq!(client.state(&session).unwrap(), pmrecord_rs::SessionState::Active);

        client.shutdown();
        handle.join().unwrap();
    }
}

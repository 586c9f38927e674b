mod config;
mod diagnostics;
mod error;
mod event;
mod monitor;
mod notice;
mod notification;
mod paths;
mod status;
mod store;
mod watcher;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::diagnostics::{DiagnosticSink, OutputChannel, TracingSink};
use crate::event::DaemonEvent;
use crate::monitor::StatusMonitor;
use crate::notice::{Notice, NoticeGate, NoticeOutcome};
use crate::notification::{ConsoleNotifier, Notifier, SystemOpener};
use crate::store::{FlagStore, JsonFlagStore};
use crate::watcher::DebouncedWatch;

/// Watches the post-startup status file and surfaces status changes and
/// one-time notices to the user.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file to use instead of the one in the app data directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Status file to watch, overriding the configured path.
    #[arg(long)]
    status_file: Option<PathBuf>,
    /// Run even when the activation environment variable does not match.
    #[arg(long)]
    skip_activation_check: bool,
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = load_config(cli.config.clone());

    // ── Activation gate ───────────────────────────────────────────────────────
    if !cli.skip_activation_check && !config.activation.is_active() {
        debug!(
            env_key = %config.activation.env_key,
            "Activation environment not matched; nothing to do"
        );
        return;
    }

    // ── Output channel ────────────────────────────────────────────────────────
    let sink = open_output_sink(paths::output_log_path());
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    // ── One-time notices ──────────────────────────────────────────────────────
    let shutdown_token = CancellationToken::new();
    let pending_notices = match paths::seen_flags_file_path() {
        Ok(path) => {
            let store: Arc<dyn FlagStore> = Arc::new(JsonFlagStore::load_or_empty(&path));
            let gate = NoticeGate::new(
                store,
                Arc::clone(&notifier),
                Arc::new(SystemOpener),
                Arc::clone(&sink),
            );
            spawn_notices(&gate, config.notices, &shutdown_token)
        }
        Err(e) => {
            error!(error = ?e, "Failed to resolve seen flags path; skipping notices");
            Vec::new()
        }
    };

    // ── Status file monitor ───────────────────────────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<DaemonEvent>(32);

    let status_file = cli.status_file.unwrap_or(config.monitor.status_file.clone());
    let watch = DebouncedWatch {
        stability_threshold: config.monitor.stability_threshold(),
        poll_interval: config.monitor.poll_interval(),
    };
    let mut monitor = StatusMonitor::new(status_file, notifier, Arc::clone(&sink));
    monitor.start(&watch, event_tx.clone());
    if !monitor.is_watching() {
        warn!(status_file = %monitor.path().display(), "Running without file monitoring");
    }

    tokio::spawn(wait_for_shutdown_signal(event_tx));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        status_file = %monitor.path().display(),
        "post-startup-notifier started"
    );

    // ── Event loop ────────────────────────────────────────────────────────────
    run_event_loop(event_rx, &mut monitor).await;
    shutdown(&mut monitor, pending_notices, &shutdown_token, sink.as_ref()).await;
}

/// Opens the output log, falling back to a `tracing`-only sink so a missing
/// log never stops the daemon.
fn open_output_sink(path: anyhow::Result<PathBuf>) -> Arc<dyn DiagnosticSink> {
    match path.and_then(|p| OutputChannel::create(&p)) {
        Ok(channel) => {
            info!(path = %channel.path().display(), "Output channel opened");
            Arc::new(channel)
        }
        Err(e) => {
            warn!(error = ?e, "Failed to open output channel; diagnostics go to the log only");
            Arc::new(TracingSink)
        }
    }
}

/// Spawns one task per notice. Each task finishes once the user responds or
/// `shutdown` is cancelled.
fn spawn_notices(
    gate: &NoticeGate,
    notices: Vec<Notice>,
    shutdown: &CancellationToken,
) -> Vec<JoinHandle<NoticeOutcome>> {
    notices
        .into_iter()
        .map(|notice| {
            let gate = gate.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { gate.maybe_notify(&notice, &shutdown).await })
        })
        .collect()
}

/// Feeds status file events to `monitor` until shutdown is requested or
/// every sender is gone.
async fn run_event_loop(mut event_rx: mpsc::Receiver<DaemonEvent>, monitor: &mut StatusMonitor) {
    while let Some(evt) = event_rx.recv().await {
        match evt {
            DaemonEvent::StatusFile(file_event) => monitor.handle_event(file_event),
            DaemonEvent::Shutdown => {
                info!(last_status = ?monitor.last_seen_status(), "Shutting down");
                break;
            }
        }
    }
}

/// Stops the watch, settles pending notices (marking them seen), then writes
/// the final line and releases the sink.
async fn shutdown(
    monitor: &mut StatusMonitor,
    pending_notices: Vec<JoinHandle<NoticeOutcome>>,
    token: &CancellationToken,
    sink: &dyn DiagnosticSink,
) {
    monitor.stop();

    token.cancel();
    for handle in pending_notices {
        if let Err(e) = handle.await {
            warn!(error = %e, "Notice task failed");
        }
    }

    sink.append_line("Status monitor deactivated");
    sink.dispose();
}

fn init_logging() {
    let debug_enabled = std::env::var("POST_STARTUP_NOTIFIER_DEBUG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // stdout carries the notifications themselves.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config from `explicit` or the default location, falling back to
/// defaults on any error.
fn load_config(explicit: Option<PathBuf>) -> config::Config {
    let path = match explicit.map(Ok).unwrap_or_else(paths::config_file_path) {
        Ok(path) => path,
        Err(e) => {
            error!(error = ?e, "Failed to resolve config path (using defaults)");
            return config::Config::default();
        }
    };
    config::load_or_default(&path).unwrap_or_else(|e| {
        error!(error = ?e, "Config error (using defaults)");
        config::Config::default()
    })
}

/// Sends [`DaemonEvent::Shutdown`] on Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown_signal(tx: mpsc::Sender<DaemonEvent>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!(signal = "SIGINT", "Signal received"),
                    _ = sigterm.recv() => info!(signal = "SIGTERM", "Signal received"),
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                if ctrl_c.await.is_err() {
                    return;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if ctrl_c.await.is_err() {
            return;
        }
    }

    let _ = tx.send(DaemonEvent::Shutdown).await;
}

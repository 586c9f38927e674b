//! Diagnostic sink: an append-only, line-oriented log the operator can read.
//!
//! Every line is also emitted as a `tracing` event under the `diagnostics`
//! target so it shows up in the daemon's own log stream.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the output channel, used as the header of each session in the log.
pub const CHANNEL_NAME: &str = "SageMaker Unified Studio Post Startup Notifications";

pub trait DiagnosticSink: Send + Sync {
    /// Appends a single human-readable line.
    fn append_line(&self, line: &str);

    /// Releases the sink. Sinks holding a resource drop later lines.
    fn dispose(&self) {}
}

/// Sink that only emits `tracing` events, used when the output log cannot be opened.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn append_line(&self, line: &str) {
        tracing::info!(target: "diagnostics", "{line}");
    }
}

/// File-backed output channel. Lines are appended to the file at `path`.
pub struct OutputChannel {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl OutputChannel {
    /// Opens (or creates) the log file at `path` and writes a session header.
    /// Creates the parent directory if it does not exist.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open output log {}", path.display()))?;
        writeln!(
            file,
            "── {CHANNEL_NAME} ({}) ──",
            chrono::Local::now().to_rfc3339()
        )
        .with_context(|| format!("Failed to write output log {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSink for OutputChannel {
    fn append_line(&self, line: &str) {
        tracing::info!(target: "diagnostics", "{line}");

        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        let Some(file) = guard.as_mut() else {
            tracing::debug!(line, "Output channel disposed; dropping line");
            return;
        };
        if let Err(e) = writeln!(file, "{line}") {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to append to output log");
        }
    }

    /// Flushes and closes the file.
    fn dispose(&self) {
        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(mut file) = guard.take() {
            if let Err(e) = file.flush() {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to flush output log");
            }
        }
    }
}

/// In-memory sink, used by tests to assert on what was logged.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
    /// Number of lines recorded when `dispose` was first called.
    disposed_at: Mutex<Option<usize>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn disposed_at(&self) -> Option<usize> {
        *self.disposed_at.lock().unwrap()
    }
}

#[cfg(test)]
impl DiagnosticSink for MemorySink {
    fn append_line(&self, line: &str) {
        if self.disposed_at().is_some() {
            return;
        }
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn dispose(&self) {
        let count = self.lines.lock().unwrap().len();
        self.disposed_at.lock().unwrap().get_or_insert(count);
    }
}

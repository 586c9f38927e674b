use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::diagnostics::DiagnosticSink;
use crate::error::StatusError;
use crate::event::{DaemonEvent, FileEvent};
use crate::notification::Notifier;
use crate::status::{self, NotificationKind};
use crate::watcher::{Subscription, WatchSource};

/// Watches the post-startup status file and notifies the user whenever its
/// status changes.
///
/// Statuses are compared case-insensitively against the last one seen, so
/// rewriting the file with the same status never notifies twice. Every
/// failure is logged to the diagnostic sink and leaves the last-seen status
/// untouched.
pub struct StatusMonitor {
    path: PathBuf,
    last_seen_status: Option<String>,
    subscription: Option<Box<dyn Subscription>>,
    notifier: Arc<dyn Notifier>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl StatusMonitor {
    pub fn new(
        path: PathBuf,
        notifier: Arc<dyn Notifier>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            path,
            last_seen_status: None,
            subscription: None,
            notifier,
            diagnostics,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_seen_status(&self) -> Option<&str> {
        self.last_seen_status.as_deref()
    }

    pub fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    /// Subscribes to debounced events for the status file, then evaluates the
    /// file once if it already exists.
    ///
    /// A watch that cannot be set up is logged and the monitor carries on
    /// without it.
    pub fn start(&mut self, watch: &dyn WatchSource, tx: mpsc::Sender<DaemonEvent>) {
        if self.subscription.is_some() {
            tracing::debug!(path = %self.path.display(), "Status monitor already started");
            return;
        }

        match watch.subscribe(&self.path, tx) {
            Ok(sub) => {
                tracing::info!(path = %self.path.display(), "Status monitor started");
                self.subscription = Some(sub);
            }
            Err(e) => {
                self.diagnostics
                    .append_line(&format!("Error setting up file watcher: {e}"));
            }
        }

        if self.path.exists() {
            self.process_status_file();
        }
    }

    pub fn handle_event(&mut self, event: FileEvent) {
        match event {
            FileEvent::Added(_) | FileEvent::Changed(_) => self.process_status_file(),
            FileEvent::Removed(path) => {
                self.diagnostics
                    .append_line(&format!("File {} has been removed", path.display()));
            }
        }
    }

    /// Runs one read-parse-compare-emit cycle.
    pub fn process_status_file(&mut self) {
        match self.evaluate() {
            Ok(Some((kind, message))) => {
                // Status notifications carry no actions; the response is not needed.
                let _ = self.notifier.show(kind, &message, &[]);
            }
            Ok(None) | Err(StatusError::NotFound) => {}
            Err(e) => {
                self.diagnostics
                    .append_line(&format!("Error processing status file: {e}"));
            }
        }
    }

    /// Reads the file and records a status change. Returns the notification
    /// to show, if the status changed and the record carries a message.
    fn evaluate(&mut self) -> Result<Option<(NotificationKind, String)>, StatusError> {
        let record = status::read_status(&self.path)?;

        let Some(new_status) = record.status else {
            return Ok(None);
        };
        if self
            .last_seen_status
            .as_deref()
            .is_some_and(|prev| status::same_status(prev, &new_status))
        {
            return Ok(None);
        }

        tracing::debug!(
            previous = ?self.last_seen_status,
            current = %new_status,
            "Status changed"
        );
        let kind = NotificationKind::from_status(&new_status);
        self.last_seen_status = Some(new_status);

        Ok(record.message.map(|message| (kind, message)))
    }

    /// Releases the watch. Calling it again, or before `start`, does nothing.
    pub fn stop(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.close();
            tracing::info!(path = %self.path.display(), "Status monitor stopped");
        }
    }
}

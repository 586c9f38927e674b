//! One-time informational notices.
//!
//! A notice is shown until the user has responded to it once (or dismissed
//! it); after that its seen flag is set and it never appears again, across
//! restarts.
//!
//! The flag is written even when the display ends without any response, for
//! example when the daemon shuts down while the notice is still pending. A
//! user can therefore miss a notice that was never actually read.
//!
//! Shutdown is signalled through a [`CancellationToken`]: a pending notice
//! resolves as "no response" and writes its flag before the task finishes.

use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::DiagnosticSink;
use crate::notification::{LinkOpener, Notifier};
use crate::status::NotificationKind;
use crate::store::{self, FlagStore};

pub const Q_CLI_NOTICE_ID: &str = "smus_q_cli_notification";
pub const Q_CLI_NOTICE_MESSAGE: &str = "The Amazon Q Command Line Interface (CLI) is installed. You can now access AI-powered assistance in your terminal.";
pub const Q_CLI_NOTICE_LINK: &str =
    "https://docs.aws.amazon.com/sagemaker-unified-studio/latest/userguide/q-actions.html";
pub const LEARN_MORE_LABEL: &str = "Learn More";

/// A one-time notice definition.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Notice {
    /// Stable identifier; the seen flag is keyed on it.
    pub id: String,
    pub message: String,
    /// Optional follow-up link offered as a response button.
    #[serde(default)]
    pub action: Option<NoticeAction>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NoticeAction {
    pub label: String,
    pub url: String,
}

impl Notice {
    /// The notice announcing the preinstalled Amazon Q CLI.
    pub fn q_cli() -> Self {
        Self {
            id: Q_CLI_NOTICE_ID.to_string(),
            message: Q_CLI_NOTICE_MESSAGE.to_string(),
            action: Some(NoticeAction {
                label: LEARN_MORE_LABEL.to_string(),
                url: Q_CLI_NOTICE_LINK.to_string(),
            }),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum NoticeOutcome {
    /// The seen flag was already set; nothing was displayed.
    AlreadySeen,
    /// The notice was displayed and is now marked seen.
    Shown { selected: Option<String> },
}

#[derive(Clone)]
pub struct NoticeGate {
    store: Arc<dyn FlagStore>,
    notifier: Arc<dyn Notifier>,
    opener: Arc<dyn LinkOpener>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl NoticeGate {
    pub fn new(
        store: Arc<dyn FlagStore>,
        notifier: Arc<dyn Notifier>,
        opener: Arc<dyn LinkOpener>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            store,
            notifier,
            opener,
            diagnostics,
        }
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.store.get(&store::seen_key(id)) == Some(true)
    }

    /// Shows `notice` unless its seen flag is set, and marks it seen once the
    /// user has responded or `shutdown` is cancelled, whichever comes first.
    ///
    /// The returned future stays pending until then; callers that must not
    /// wait should spawn it and await the handle during shutdown.
    pub async fn maybe_notify(
        &self,
        notice: &Notice,
        shutdown: &CancellationToken,
    ) -> NoticeOutcome {
        let Some(response) = self.request(notice) else {
            return NoticeOutcome::AlreadySeen;
        };
        let selected = tokio::select! {
            // A dropped sender means the display ended without a response.
            res = response => res.unwrap_or(None),
            _ = shutdown.cancelled() => {
                tracing::debug!(id = %notice.id, "Shutdown with notice still pending");
                None
            }
        };
        self.complete(notice, selected.as_deref());
        NoticeOutcome::Shown { selected }
    }

    /// Issues the display request, or returns `None` if already seen.
    fn request(&self, notice: &Notice) -> Option<oneshot::Receiver<Option<String>>> {
        if self.has_seen(&notice.id) {
            tracing::debug!(id = %notice.id, "Notice already seen");
            return None;
        }

        self.diagnostics
            .append_line("User has not seen the notification");
        let actions: Vec<String> = notice.action.iter().map(|a| a.label.clone()).collect();
        Some(
            self.notifier
                .show(NotificationKind::Info, &notice.message, &actions),
        )
    }

    /// Opens the action link if it was chosen, then sets the seen flag
    /// whatever the choice was.
    fn complete(&self, notice: &Notice, selected: Option<&str>) {
        if let (Some(action), Some(choice)) = (&notice.action, selected) {
            if choice == action.label {
                if let Err(e) = self.opener.open(&action.url) {
                    tracing::warn!(url = %action.url, error = %e, "Failed to open notice link");
                }
            }
        }

        self.store.set(&store::seen_key(&notice.id), true);
        tracing::info!(id = %notice.id, "Notice marked as seen");
    }
}

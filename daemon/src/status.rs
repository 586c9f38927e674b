use serde::Deserialize;
use std::path::Path;

use crate::error::StatusError;

/// Status value that is surfaced as an error rather than an info message.
pub const ERROR_STATUS: &str = "error";

/// Contents of the post-startup status file, written by the startup scripts
/// and read (never written) by the daemon.
///
/// Both fields are optional; any other fields in the JSON object are ignored.
#[derive(Debug, Deserialize, Default, PartialEq, Clone)]
pub struct StatusRecord {
    /// Operational status, e.g. "in-progress" or "error". Compared case-insensitively.
    #[serde(default)]
    pub status: Option<String>,
    /// Text to show the user when the status changes.
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusRecord {
    pub fn parse(content: &str) -> Result<Self, StatusError> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Severity a status notification is displayed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

impl NotificationKind {
    /// `error` (any case) maps to [`NotificationKind::Error`]; every other
    /// status, including "in-progress", is informational.
    pub fn from_status(status: &str) -> Self {
        if status.eq_ignore_ascii_case(ERROR_STATUS) {
            NotificationKind::Error
        } else {
            NotificationKind::Info
        }
    }
}

/// Reads and parses the status file at `path`.
///
/// A missing file surfaces as [`StatusError::NotFound`] so the caller can
/// ignore the race between a debounced event and a deletion.
pub fn read_status(path: &Path) -> Result<StatusRecord, StatusError> {
    let content = std::fs::read_to_string(path)?;
    StatusRecord::parse(&content)
}

/// Case-insensitive status comparison, folding ASCII case only, the same
/// rule [`NotificationKind::from_status`] uses.
pub fn same_status(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

use std::path::PathBuf;

/// Stabilized change to the watched status file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// The file appeared (or was atomically replaced).
    Added(PathBuf),
    /// The file's contents changed in place.
    Changed(PathBuf),
    /// The file was deleted or renamed away.
    Removed(PathBuf),
}

pub enum DaemonEvent {
    /// The debounced watch delivered an event for the status file.
    StatusFile(FileEvent),
    /// Ctrl+C received; the daemon should stop the watch and exit.
    Shutdown,
}

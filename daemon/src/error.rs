use std::io;

/// Why a read-parse cycle on the status file did not produce a record.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// The file vanished between the watch event and the read.
    #[error("status file not found")]
    NotFound,

    #[error("{0}")]
    Read(io::Error),

    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

impl From<io::Error> for StatusError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            StatusError::NotFound
        } else {
            StatusError::Read(err)
        }
    }
}

/// Failure to set up the debounced watch on the status file.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("status file path has no parent directory: {0}")]
    NoParent(String),

    #[error("{0}")]
    Notify(#[from] notify::Error),
}

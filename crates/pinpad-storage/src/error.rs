use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Storage-specific error types for the credential store.
///
/// Every variant is a reason for a sync to fail. Only [`StorageError::Read`]
/// and [`StorageError::Parse`] can happen at startup, where they are fatal.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The credential file exists but could not be read
    #[error("Failed to read credential file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The credential file is not a JSON array of records
    #[error("Invalid credential file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// HTTP request failed (connection, timeout, body)
    #[error("Fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Remote answered with a non-success status
    #[error("Remote returned HTTP {0}")]
    HttpStatus(u16),

    /// Remote payload is larger than allowed
    #[error("Payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Writing, syncing or renaming the staged file failed
    #[error("Failed to persist credentials: {0}")]
    Persist(#[source] io::Error),

    /// Blocking staging task panicked
    #[error("Staging task failed: {0}")]
    Task(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

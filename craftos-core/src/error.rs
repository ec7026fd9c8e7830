//! Error types for the CraftOS emulator core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during mount registration and path resolution.
#[derive(Error, Debug)]
pub enum CraftError {
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error("already mounted: {0}")]
    DuplicateMount(String),

    #[error("not mounted: {0}")]
    NotMounted(String),

    #[error("backing unavailable: {}", .path.display())]
    BackingUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no mount found for: {0}")]
    NoMountFound(String),

    #[error("read-only mount: {0}")]
    ReadOnlyViolation(String),

    #[error("failed to remove {} entries under {}", .failures.len(), .path.display())]
    RemoveDirectory {
        path: PathBuf,
        failures: Vec<(PathBuf, std::io::Error)>,
    },

    #[error("lock poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for emulator core operations.
pub type CraftResult<T> = Result<T, CraftError>;

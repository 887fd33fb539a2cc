//! Error types for the watch backend.

use std::path::PathBuf;

use thiserror::Error;
use typed_directory_plugin::WatchSetupError;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur while starting a watch.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Source directory not found.
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Not called from inside a tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

impl From<WatcherError> for WatchSetupError {
    fn from(err: WatcherError) -> Self {
        match err {
            WatcherError::DirectoryNotFound(path) => Self::MissingDirectory(path),
            WatcherError::NoRuntime => Self::NoRuntime,
            WatcherError::Notify(e) => Self::Notify(e.to_string()),
        }
    }
}

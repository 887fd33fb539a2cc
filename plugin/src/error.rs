//! Error types for the typed-directory plugin.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;

/// Errors surfaced to the host by the plugin.
///
/// The plugin performs no recovery: each variant wraps the failure of one
/// collaborator and is forwarded to the host unchanged.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The generator failed during a build phase.
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// The watch backend could not be started.
    #[error("watch setup error: {0}")]
    WatchSetup(#[from] WatchSetupError),
}

/// Errors raised while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error while reading a config file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML configuration.
    #[error("invalid toml: {0}")]
    Toml(#[from] toml::de::Error),

    /// An entry failed validation.
    #[error("invalid entry: {0}")]
    Invalid(String),

    /// Two entries declare the same output file.
    #[error("duplicate output path: {}", .0.display())]
    DuplicateOutput(PathBuf),

    /// Config file extension is neither `.json` nor `.toml`.
    #[error("unsupported config format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Rejection reported by an external loader.
    #[error("loader rejected configuration: {0}")]
    Loader(String),
}

/// Errors raised by a generator.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The generator reported a failure.
    #[error("generation failed: {0}")]
    Failed(String),

    /// IO error while generating.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other generator failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GenerationError {
    /// Create a failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors raised while starting a watch.
#[derive(Error, Debug)]
pub enum WatchSetupError {
    /// A configured source directory does not exist.
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// Watching requires a running tokio runtime.
    #[error("no tokio runtime available to drive the watcher")]
    NoRuntime,

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(String),

    /// Any other watch failure.
    #[error("{0}")]
    Other(String),
}

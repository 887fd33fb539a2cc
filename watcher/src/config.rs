//! Options for the regenerating watcher.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the watcher batches changes and when it first generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Quiet period after the last change before regenerating.
    pub debounce_ms: u64,

    /// Whether to generate once as soon as the watch starts.
    pub initial_generate: bool,
}

impl WatchOptions {
    /// Default quiet period in milliseconds.
    pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

    /// Set the debounce delay.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Skip the generation normally run when the watch starts.
    pub fn without_initial_generate(mut self) -> Self {
        self.initial_generate = false;
        self
    }

    /// The debounce delay.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce_ms: Self::DEFAULT_DEBOUNCE_MS,
            initial_generate: true,
        }
    }
}

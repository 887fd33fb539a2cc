//! Seams to the code generator and its watch backend.
//!
//! The plugin never scans directories or emits code itself. It drives a
//! [`Generator`] during builds and hands watch mode to a [`WatchStarter`].

use async_trait::async_trait;

use crate::config::Configuration;
use crate::error::{GenerationError, WatchSetupError};

/// Produces the aggregated module for every configured entry.
///
/// A watch backend ignores each output and any file beside it whose name
/// starts with the output's file name. Temp files used for atomic writes must
/// follow that naming or live outside the watched source directories, or
/// every write will trigger another regeneration.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Regenerate all outputs from the configuration.
    async fn generate(&self, config: &Configuration) -> Result<(), GenerationError>;
}

/// Starts a long-lived watch that regenerates outputs on its own schedule.
///
/// Once started, the plugin never notifies the watch again until teardown.
/// Implementations must therefore keep regenerating without further input
/// from the host.
pub trait WatchStarter: Send + Sync {
    /// Begin watching the configured directories.
    fn start_watch(&self, config: &Configuration) -> Result<Box<dyn Unwatch>, WatchSetupError>;
}

/// Teardown capability returned by [`WatchStarter::start_watch`].
pub trait Unwatch: Send {
    /// Stop watching and release resources.
    fn unwatch(self: Box<Self>);
}

impl<F> Unwatch for F
where
    F: FnOnce() + Send,
{
    fn unwatch(self: Box<Self>) {
        (*self)()
    }
}

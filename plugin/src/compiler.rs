//! Host build-tool surface: lifecycle hooks and the watch ignore mechanism.
//!
//! Hooks run their taps in registration order. An async hook stops at the
//! first failing tap and hands that error back to the caller, which acts as
//! the completion signal for the phase.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::error::Result;

type AsyncHandler = Box<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;
type SyncHandler = Box<dyn Fn() + Send + Sync>;

/// A plugin that registers itself on a compiler's hooks.
pub trait Plugin: Send + Sync {
    /// Tap the hooks this plugin needs.
    fn apply(self: Arc<Self>, compiler: &mut Compiler);
}

/// Host mechanism that keeps paths from triggering watch rebuilds.
pub trait IgnoreRegistry: Send + Sync {
    /// Exclude `paths` from watch notifications.
    fn ignore(&self, paths: &[PathBuf]);
}

/// Hook whose taps are awaited one after another.
#[derive(Default)]
pub struct AsyncSeriesHook {
    taps: Vec<(String, AsyncHandler)>,
}

impl AsyncSeriesHook {
    /// Create an empty hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`.
    pub fn tap<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: AsyncHandler = Box::new(move || handler().boxed());
        self.taps.push((name.into(), handler));
    }

    /// Run every tap in order, stopping at the first error.
    pub async fn call(&self) -> Result<()> {
        for (name, handler) in &self.taps {
            debug!("Calling async tap: {name}");
            handler().await?;
        }
        Ok(())
    }

    /// Whether nothing is tapped.
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

/// Hook whose taps run synchronously.
#[derive(Default)]
pub struct SyncHook {
    taps: Vec<(String, SyncHandler)>,
}

impl SyncHook {
    /// Create an empty hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`.
    pub fn tap<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handler: SyncHandler = Box::new(handler);
        self.taps.push((name.into(), handler));
    }

    /// Run every tap in order.
    pub fn call(&self) {
        for (name, handler) in &self.taps {
            debug!("Calling sync tap: {name}");
            handler();
        }
    }

    /// Whether nothing is tapped.
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

/// Lifecycle phases exposed by the compiler.
#[derive(Default)]
pub struct CompilerHooks {
    /// Before a one-shot build.
    pub before_run: AsyncSeriesHook,

    /// Before each watch-mode compilation.
    pub watch_run: AsyncSeriesHook,

    /// When watch mode ends.
    pub watch_close: SyncHook,
}

/// Ignore registry backed by a list of exact paths.
#[derive(Debug, Default)]
pub struct WatchIgnoreRegistry {
    paths: RwLock<Vec<PathBuf>>,
    registrations: AtomicUsize,
}

impl WatchIgnoreRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether changes to `path` are ignored.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|p| p == path)
    }

    /// All ignored paths, in registration order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times [`IgnoreRegistry::ignore`] was called.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

impl IgnoreRegistry for WatchIgnoreRegistry {
    fn ignore(&self, paths: &[PathBuf]) {
        let mut ignored = self.paths.write().unwrap_or_else(PoisonError::into_inner);
        for path in paths {
            if !ignored.contains(path) {
                ignored.push(path.clone());
            }
        }
        self.registrations.fetch_add(1, Ordering::SeqCst);
        debug!("Ignoring {} paths in watch mode", paths.len());
    }
}

/// Minimal compiler that owns the lifecycle hooks and drives plugins.
#[derive(Default)]
pub struct Compiler {
    hooks: CompilerHooks,
    watch_ignore: Arc<WatchIgnoreRegistry>,
}

impl Compiler {
    /// Create a compiler with no plugins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin.
    pub fn apply(&mut self, plugin: Arc<dyn Plugin>) {
        plugin.apply(self);
    }

    /// The lifecycle hooks.
    pub fn hooks(&self) -> &CompilerHooks {
        &self.hooks
    }

    /// The lifecycle hooks, for tapping.
    pub fn hooks_mut(&mut self) -> &mut CompilerHooks {
        &mut self.hooks
    }

    /// Shared handle to the watch ignore registry.
    pub fn ignore_registry(&self) -> Arc<WatchIgnoreRegistry> {
        self.watch_ignore.clone()
    }

    /// Whether a change to `path` would be ignored in watch mode.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.watch_ignore.is_ignored(path)
    }

    /// Run the one-shot build phase.
    pub async fn run(&self) -> Result<()> {
        self.hooks.before_run.call().await
    }

    /// Notify a watch-mode compilation.
    pub async fn watch_run(&self) -> Result<()> {
        self.hooks.watch_run.call().await
    }

    /// End watch mode.
    pub fn close_watch(&self) {
        self.hooks.watch_close.call();
    }
}

//! The lifecycle adapter binding a generator to the host's build phases.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::compiler::{Compiler, IgnoreRegistry, Plugin};
use crate::config::{ConfigLoader, ConfigSource, Configuration, DefaultConfigLoader};
use crate::error::Result;
use crate::external::{Generator, Unwatch, WatchStarter};

/// Name used when tapping compiler hooks.
pub const PLUGIN_NAME: &str = "TypedDirectoryPlugin";

/// Output paths the host must not react to while watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchIgnore {
    paths: Vec<PathBuf>,
}

impl WatchIgnore {
    /// Collect the output path of every entry, in entry order.
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            paths: config.output_paths(),
        }
    }

    /// The ignored paths.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

enum WatchState {
    Idle,
    Watching(Box<dyn Unwatch>),
}

/// Runs typed-directory generation from a compiler's lifecycle.
///
/// The plugin is either idle or watching. The first `watch-run` registers
/// the output paths with the host's ignore registry and starts exactly one
/// watch. Later `watch-run` notifications leave that watch alone until
/// `watch-close` tears it down. The ignore set is registered at most once per
/// plugin, even when a watch setup fails and is retried.
pub struct TypedDirectoryPlugin {
    config: Configuration,
    watch_ignore: WatchIgnore,
    generator: Arc<dyn Generator>,
    watcher: Arc<dyn WatchStarter>,
    state: Mutex<WatchState>,
    ignore_registered: AtomicBool,
}

impl TypedDirectoryPlugin {
    /// Create a plugin, loading the configuration relative to the working
    /// directory.
    pub fn new(
        source: impl Into<ConfigSource>,
        generator: Arc<dyn Generator>,
        watcher: Arc<dyn WatchStarter>,
    ) -> Result<Self> {
        Self::builder(generator, watcher).build(source)
    }

    /// Create a builder.
    pub fn builder(
        generator: Arc<dyn Generator>,
        watcher: Arc<dyn WatchStarter>,
    ) -> TypedDirectoryPluginBuilder {
        TypedDirectoryPluginBuilder::new(generator, watcher)
    }

    /// Create a plugin from an already loaded configuration.
    pub fn from_config(
        config: Configuration,
        generator: Arc<dyn Generator>,
        watcher: Arc<dyn WatchStarter>,
    ) -> Self {
        Self {
            watch_ignore: WatchIgnore::from_config(&config),
            config,
            generator,
            watcher,
            state: Mutex::new(WatchState::Idle),
            ignore_registered: AtomicBool::new(false),
        }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Output paths excluded from watch rebuilds.
    pub fn watch_ignore(&self) -> &WatchIgnore {
        &self.watch_ignore
    }

    /// Whether a watch is currently live.
    pub fn is_watching(&self) -> bool {
        matches!(*self.lock_state(), WatchState::Watching(_))
    }

    /// Generate every output once before a build.
    pub async fn on_before_run(&self) -> Result<()> {
        debug!("Generating {} directory modules", self.config.len());
        self.generator.generate(&self.config).await?;
        Ok(())
    }

    /// Start watching on the first call; later calls are no-ops.
    pub fn on_watch_run(&self, ignore: &dyn IgnoreRegistry) -> Result<()> {
        let mut state = self.lock_state();
        if let WatchState::Watching(_) = *state {
            debug!("Watch already running");
            return Ok(());
        }

        // Only ever flipped while the state lock is held.
        if !self.ignore_registered.swap(true, Ordering::SeqCst) {
            ignore.ignore(self.watch_ignore.paths());
        }

        info!("Starting watch for {} directories", self.config.len());
        let handle = self.watcher.start_watch(&self.config)?;
        *state = WatchState::Watching(handle);
        Ok(())
    }

    /// Tear down the live watch, if any.
    pub fn on_watch_close(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), WatchState::Idle);
        match previous {
            WatchState::Watching(handle) => {
                handle.unwatch();
                info!("Watch closed");
            }
            WatchState::Idle => debug!("No watch to close"),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Plugin for TypedDirectoryPlugin {
    fn apply(self: Arc<Self>, compiler: &mut Compiler) {
        let registry = compiler.ignore_registry();
        let hooks = compiler.hooks_mut();

        let plugin = self.clone();
        hooks.before_run.tap(PLUGIN_NAME, move || {
            let plugin = plugin.clone();
            async move { plugin.on_before_run().await }
        });

        let plugin = self.clone();
        hooks.watch_run.tap(PLUGIN_NAME, move || {
            let result = plugin.on_watch_run(registry.as_ref());
            async move { result }
        });

        hooks
            .watch_close
            .tap(PLUGIN_NAME, move || self.on_watch_close());
    }
}

impl Drop for TypedDirectoryPlugin {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let WatchState::Watching(handle) = std::mem::replace(state, WatchState::Idle) {
            handle.unwatch();
            debug!("Watch released on drop");
        }
    }
}

/// Builder for [`TypedDirectoryPlugin`].
pub struct TypedDirectoryPluginBuilder {
    generator: Arc<dyn Generator>,
    watcher: Arc<dyn WatchStarter>,
    loader: Option<Box<dyn ConfigLoader>>,
}

impl TypedDirectoryPluginBuilder {
    /// Create a new builder.
    pub fn new(generator: Arc<dyn Generator>, watcher: Arc<dyn WatchStarter>) -> Self {
        Self {
            generator,
            watcher,
            loader: None,
        }
    }

    /// Resolve relative paths against `dir` instead of the working directory.
    pub fn with_base_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.with_loader(DefaultConfigLoader::new(dir))
    }

    /// Use a custom configuration loader.
    pub fn with_loader(mut self, loader: impl ConfigLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Load the configuration and build the plugin.
    pub fn build(self, source: impl Into<ConfigSource>) -> Result<TypedDirectoryPlugin> {
        let config = match self.loader {
            Some(loader) => loader.load(source.into())?,
            None => DefaultConfigLoader::from_current_dir()?.load(source.into())?,
        };

        Ok(TypedDirectoryPlugin::from_config(
            config,
            self.generator,
            self.watcher,
        ))
    }
}

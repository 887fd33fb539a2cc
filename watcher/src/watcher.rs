//! Regenerating watcher implementation.

use std::path::Path;
use std::sync::Arc;

use notify::{Event, EventHandler, RecommendedWatcher, RecursiveMode, Watcher, WatcherKind};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer_opt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use typed_directory_plugin::{Configuration, Generator, Unwatch, WatchSetupError, WatchStarter};

use crate::config::WatchOptions;
use crate::error::{Result, WatcherError};
use crate::event::{EventFilter, FileEventKind};

/// Watch backend that reruns a generator whenever a source directory changes.
pub struct RegeneratingWatcher {
    generator: Arc<dyn Generator>,
    options: WatchOptions,
}

impl RegeneratingWatcher {
    /// Create a watcher driving `generator`.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            options: WatchOptions::default(),
        }
    }

    /// Set the watch options.
    pub fn with_options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Start watching and return the handle that keeps the watch alive.
    pub fn start(&self, config: &Configuration) -> Result<WatchHandle> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| WatcherError::NoRuntime)?;

        for entry in config.entries() {
            if !entry.source_directory.is_dir() {
                return Err(WatcherError::DirectoryNotFound(
                    entry.source_directory.clone(),
                ));
            }
        }

        // One slot: a queued signal already covers every later batch.
        let (change_tx, change_rx) = mpsc::channel(1);
        let filter = EventFilter::from_config(config);

        let debouncer_config =
            notify_debouncer_mini::Config::default().with_timeout(self.options.debounce());
        let mut debouncer: Debouncer<ContentWatcher> = new_debouncer_opt(
            debouncer_config,
            move |res: DebounceEventResult| match res {
                Ok(events) => {
                    let changed = events
                        .iter()
                        .filter(|event| !filter.is_generated(&event.path))
                        .count();
                    if changed == 0 {
                        debug!("Ignoring {} generated file events", events.len());
                        return;
                    }

                    debug!("{changed} source files changed");
                    let _ = change_tx.try_send(());
                }
                Err(e) => {
                    error!("Watch error: {e:?}");
                }
            },
        )?;

        for entry in config.entries() {
            debouncer
                .watcher()
                .watch(&entry.source_directory, RecursiveMode::Recursive)?;
            debug!("Started watching: {}", entry.source_directory.display());

            watch_type_definition(debouncer.watcher(), &entry.type_definition);
        }

        let task = runtime.spawn(regenerate_on_change(
            self.generator.clone(),
            config.clone(),
            self.options.initial_generate,
            change_rx,
        ));

        info!("Watching {} directories", config.len());
        Ok(WatchHandle {
            _debouncer: debouncer,
            task,
        })
    }
}

impl WatchStarter for RegeneratingWatcher {
    fn start_watch(
        &self,
        config: &Configuration,
    ) -> std::result::Result<Box<dyn Unwatch>, WatchSetupError> {
        Ok(Box::new(self.start(config)?))
    }
}

/// OS watcher that drops events which cannot change generated code, such as
/// the generator reading its own sources.
struct ContentWatcher(RecommendedWatcher);

impl Watcher for ContentWatcher {
    fn new<F: EventHandler>(mut event_handler: F, config: notify::Config) -> notify::Result<Self> {
        let filtered = move |res: notify::Result<Event>| match res {
            Ok(event) if !FileEventKind::from(event.kind).alters_content() => {
                debug!("Ignoring {:?} on {:?}", event.kind, event.paths);
            }
            res => event_handler.handle_event(res),
        };
        RecommendedWatcher::new(filtered, config).map(Self)
    }

    fn watch(&mut self, path: &Path, recursive_mode: RecursiveMode) -> notify::Result<()> {
        self.0.watch(path, recursive_mode)
    }

    fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        self.0.unwatch(path)
    }

    fn configure(&mut self, option: notify::Config) -> notify::Result<bool> {
        self.0.configure(option)
    }

    fn kind() -> WatcherKind {
        RecommendedWatcher::kind()
    }
}

fn watch_type_definition(watcher: &mut dyn Watcher, path: &Path) {
    match watcher.watch(path, RecursiveMode::NonRecursive) {
        Ok(()) => debug!("Started watching type file: {}", path.display()),
        Err(e) => warn!("Failed to watch {}: {e}", path.display()),
    }
}

async fn regenerate_on_change(
    generator: Arc<dyn Generator>,
    config: Configuration,
    initial_generate: bool,
    mut changes: mpsc::Receiver<()>,
) {
    if initial_generate {
        regenerate(generator.as_ref(), &config).await;
    }

    while changes.recv().await.is_some() {
        regenerate(generator.as_ref(), &config).await;
    }
}

async fn regenerate(generator: &dyn Generator, config: &Configuration) {
    match generator.generate(config).await {
        Ok(()) => debug!("Regenerated {} modules", config.len()),
        Err(e) => error!("Regeneration failed: {e}"),
    }
}

/// Live watch. Dropping or unwatching it stops the debounced OS watcher and
/// the regeneration task.
pub struct WatchHandle {
    _debouncer: Debouncer<ContentWatcher>,
    task: JoinHandle<()>,
}

impl Unwatch for WatchHandle {
    fn unwatch(self: Box<Self>) {
        drop(self);
        info!("Watcher stopped");
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

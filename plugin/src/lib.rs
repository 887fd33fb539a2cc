//! # Typed Directory Plugin
//!
//! This crate binds typed-directory module generation to a build tool's
//! lifecycle. It generates once before each build, hands watch mode to a
//! long-lived watcher, and keeps generated outputs out of the host's own
//! watch so they never trigger a rebuild loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Typed Directory Plugin                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ConfigSource ──► ConfigLoader ──► Configuration               │
//! │                                        │                        │
//! │  Compiler hooks ──► TypedDirectoryPlugin ──► Generator         │
//! │   before-run            │        │                              │
//! │   watch-run             ▼        ▼                              │
//! │   watch-close     IgnoreRegistry  WatchStarter ──► Unwatch      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use typed_directory_plugin::{Compiler, ConfigSource, TypedDirectoryPlugin};
//!
//! let plugin = TypedDirectoryPlugin::new(
//!     ConfigSource::File("typed-directory.toml".into()),
//!     generator,
//!     watcher,
//! )?;
//!
//! let mut compiler = Compiler::new();
//! compiler.apply(Arc::new(plugin));
//! compiler.run().await?;
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod external;
pub mod plugin;

pub use compiler::{
    AsyncSeriesHook, Compiler, CompilerHooks, IgnoreRegistry, Plugin, SyncHook,
    WatchIgnoreRegistry,
};
pub use config::{ConfigLoader, ConfigSource, Configuration, DefaultConfigLoader, DirectoryEntry};
pub use error::{ConfigError, GenerationError, PluginError, Result, WatchSetupError};
pub use external::{Generator, Unwatch, WatchStarter};
pub use plugin::{PLUGIN_NAME, TypedDirectoryPlugin, TypedDirectoryPluginBuilder, WatchIgnore};

//! # Typed Directory Watcher
//!
//! Filesystem watch backend for the typed-directory plugin. It watches every
//! configured source directory and type file, and reruns the generator after
//! a burst of changes settles.
//!
//! ## Features
//!
//! - **Real-time Watching**: Monitor source directories recursively
//! - **Output Exclusion**: Never react to the generator's own writes
//! - **Debouncing**: Regenerate once per burst of changes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Regenerating Watcher                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Configuration ──► notify ──► FileEventKind ──► debouncer       │
//! │                                                  │              │
//! │                                          EventFilter            │
//! │                                                  ▼              │
//! │  WatchHandle (Unwatch) ◄── regenerate task ──► Generator        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod watcher;

pub use config::WatchOptions;
pub use error::{Result, WatcherError};
pub use event::{EventFilter, FileEventKind};
pub use watcher::{RegeneratingWatcher, WatchHandle};

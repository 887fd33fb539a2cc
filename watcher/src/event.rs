//! File events from directory watching.

use std::path::{Path, PathBuf};

use typed_directory_plugin::Configuration;

/// Kind of file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// File was created.
    Created,

    /// File was modified.
    Modified,

    /// File was deleted.
    Deleted,

    /// File was renamed (old path).
    RenamedFrom,

    /// File was renamed (new path).
    RenamedTo,

    /// File metadata changed.
    MetadataChanged,

    /// File was opened, read or closed.
    Accessed,

    /// Unknown event type.
    Unknown,
}

impl FileEventKind {
    /// Whether this kind can change what the generator would emit.
    pub fn alters_content(self) -> bool {
        !matches!(self, Self::Accessed | Self::MetadataChanged)
    }
}

impl From<notify::EventKind> for FileEventKind {
    fn from(kind: notify::EventKind) -> Self {
        match kind {
            notify::EventKind::Create(_) => Self::Created,
            notify::EventKind::Modify(modify_kind) => match modify_kind {
                notify::event::ModifyKind::Name(rename) => match rename {
                    notify::event::RenameMode::From => Self::RenamedFrom,
                    notify::event::RenameMode::To => Self::RenamedTo,
                    _ => Self::Modified,
                },
                notify::event::ModifyKind::Metadata(_) => Self::MetadataChanged,
                _ => Self::Modified,
            },
            notify::EventKind::Remove(_) => Self::Deleted,
            notify::EventKind::Access(_) => Self::Accessed,
            _ => Self::Unknown,
        }
    }
}

/// Recognizes paths written by the generator itself.
///
/// Besides each configured output, files next to an output whose name starts
/// with the output's file name (`output.ts.tmp`, `.output.ts.swp`) count as
/// generated, so atomic writes through a sibling temp file do not retrigger
/// the watch.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    outputs: Vec<PathBuf>,
}

impl EventFilter {
    /// Build a filter for every configured output.
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            outputs: config.output_paths(),
        }
    }

    /// Whether `path` is a generated output or one of its temp siblings.
    pub fn is_generated(&self, path: &Path) -> bool {
        self.outputs
            .iter()
            .any(|output| path == output || is_temp_sibling(path, output))
    }
}

fn is_temp_sibling(path: &Path, output: &Path) -> bool {
    if path.parent() != output.parent() {
        return false;
    }

    match (
        path.file_name().and_then(|n| n.to_str()),
        output.file_name().and_then(|n| n.to_str()),
    ) {
        (Some(name), Some(output_name)) => name.trim_start_matches('.').starts_with(output_name),
        _ => false,
    }
}

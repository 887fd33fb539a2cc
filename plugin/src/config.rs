//! Configuration types and loading.
//!
//! A configuration is an ordered list of [`DirectoryEntry`] values, one per
//! directory to scan and module to emit. The serialized field names (`dir`,
//! `type`, `output`, `instance`) match the generator's own config files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// One directory to scan and the module generated from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Directory whose files are aggregated.
    #[serde(rename = "dir")]
    pub source_directory: PathBuf,

    /// File declaring the type every entry must satisfy.
    #[serde(rename = "type")]
    pub type_definition: PathBuf,

    /// Generated module path.
    pub output: PathBuf,

    /// Whether each file exports an instance rather than a class.
    #[serde(rename = "instance", default)]
    pub instance_per_file: bool,
}

impl DirectoryEntry {
    /// Create a new entry.
    pub fn new(
        source_directory: impl Into<PathBuf>,
        type_definition: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_directory: source_directory.into(),
            type_definition: type_definition.into(),
            output: output.into(),
            instance_per_file: false,
        }
    }

    /// Mark files as exporting instances.
    pub fn with_instances(mut self) -> Self {
        self.instance_per_file = true;
        self
    }
}

/// Ordered sequence of directory entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    entries: Vec<DirectoryEntry>,
}

impl Configuration {
    /// Create a configuration from entries, preserving their order.
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }

    /// The entries in declaration order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the configuration has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Output path of every entry, in entry order.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.output.clone()).collect()
    }
}

/// Raw input a configuration is loaded from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Entries built in code.
    Entries(Vec<DirectoryEntry>),

    /// A single entry given positionally.
    Single {
        dir: PathBuf,
        type_definition: PathBuf,
        output: PathBuf,
        instance: bool,
    },

    /// Inline JSON: one entry object or an array of them.
    Json(String),

    /// A `.json` or `.toml` config file.
    File(PathBuf),
}

impl From<Vec<DirectoryEntry>> for ConfigSource {
    fn from(entries: Vec<DirectoryEntry>) -> Self {
        Self::Entries(entries)
    }
}

impl From<DirectoryEntry> for ConfigSource {
    fn from(entry: DirectoryEntry) -> Self {
        Self::Entries(vec![entry])
    }
}

/// Turns a [`ConfigSource`] into a [`Configuration`].
pub trait ConfigLoader: Send + Sync {
    /// Load and validate a configuration.
    fn load(&self, source: ConfigSource) -> Result<Configuration, ConfigError>;
}

/// Loader that parses JSON and TOML and resolves paths against a base
/// directory.
#[derive(Debug, Clone)]
pub struct DefaultConfigLoader {
    base_dir: PathBuf,
}

/// JSON accepts either a lone entry or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonEntries {
    Many(Vec<DirectoryEntry>),
    One(DirectoryEntry),
}

/// TOML files hold `[[entries]]` tables.
#[derive(Deserialize)]
struct TomlFile {
    #[serde(default)]
    entries: Vec<DirectoryEntry>,
}

impl DefaultConfigLoader {
    /// Create a loader resolving relative paths against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create a loader rooted at the process working directory.
    pub fn from_current_dir() -> Result<Self, ConfigError> {
        Ok(Self::new(std::env::current_dir()?))
    }

    fn parse(&self, source: ConfigSource) -> Result<(Vec<DirectoryEntry>, PathBuf), ConfigError> {
        match source {
            ConfigSource::Entries(entries) => Ok((entries, self.base_dir.clone())),
            ConfigSource::Single {
                dir,
                type_definition,
                output,
                instance,
            } => {
                let mut entry = DirectoryEntry::new(dir, type_definition, output);
                entry.instance_per_file = instance;
                Ok((vec![entry], self.base_dir.clone()))
            }
            ConfigSource::Json(text) => Ok((parse_json(&text)?, self.base_dir.clone())),
            ConfigSource::File(path) => {
                let path = self.resolve(&path)?;
                let text = std::fs::read_to_string(&path)?;
                let entries = match path.extension().and_then(|e| e.to_str()) {
                    Some("json") => parse_json(&text)?,
                    Some("toml") => toml::from_str::<TomlFile>(&text)?.entries,
                    _ => return Err(ConfigError::UnsupportedFormat(path)),
                };

                // Paths inside a file are relative to the file itself.
                let base = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.base_dir.clone());
                Ok((entries, base))
            }
        }
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, ConfigError> {
        resolve_against(path, &self.base_dir)
    }
}

impl ConfigLoader for DefaultConfigLoader {
    fn load(&self, source: ConfigSource) -> Result<Configuration, ConfigError> {
        let (entries, base) = self.parse(source)?;

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = validate_entry(entry, &base)?;
            if !seen.insert(entry.output.clone()) {
                return Err(ConfigError::DuplicateOutput(entry.output));
            }
            resolved.push(entry);
        }

        debug!("Loaded {} directory entries", resolved.len());
        Ok(Configuration::new(resolved))
    }
}

fn parse_json(text: &str) -> Result<Vec<DirectoryEntry>, ConfigError> {
    Ok(match serde_json::from_str::<JsonEntries>(text)? {
        JsonEntries::Many(entries) => entries,
        JsonEntries::One(entry) => vec![entry],
    })
}

fn validate_entry(entry: DirectoryEntry, base: &Path) -> Result<DirectoryEntry, ConfigError> {
    for (field, value) in [
        ("dir", &entry.source_directory),
        ("type", &entry.type_definition),
        ("output", &entry.output),
    ] {
        if value.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(format!("`{field}` must not be empty")));
        }
    }

    Ok(DirectoryEntry {
        source_directory: resolve_against(&entry.source_directory, base)?,
        type_definition: resolve_against(&entry.type_definition, base)?,
        output: resolve_against(&entry.output, base)?,
        instance_per_file: entry.instance_per_file,
    })
}

fn resolve_against(path: &Path, base: &Path) -> Result<PathBuf, ConfigError> {
    Ok(path.absolutize_from(base)?.into_owned())
}

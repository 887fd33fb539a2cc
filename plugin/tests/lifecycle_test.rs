//! Integration tests driving the plugin through a compiler's lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use typed_directory_plugin::{
    Compiler, ConfigError, ConfigSource, Configuration, DirectoryEntry, GenerationError,
    Generator, PluginError, TypedDirectoryPlugin, Unwatch, WatchSetupError, WatchStarter,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Writes one line per source file into each entry's output.
#[derive(Default)]
struct ListingGenerator {
    runs: AtomicUsize,
}

#[async_trait]
impl Generator for ListingGenerator {
    async fn generate(&self, config: &Configuration) -> Result<(), GenerationError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        for entry in config.entries() {
            let mut names = Vec::new();
            collect_files(&entry.source_directory, &entry.source_directory, &mut names)?;
            names.sort();
            tokio::fs::write(&entry.output, names.join("\n")).await?;
        }
        Ok(())
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.with_extension("").display().to_string());
        }
    }
    Ok(())
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _config: &Configuration) -> Result<(), GenerationError> {
        Err(GenerationError::failed("zoo/lion does not extend Animal"))
    }
}

#[derive(Default)]
struct RecordingWatcher {
    started: AtomicUsize,
    stopped: Arc<AtomicUsize>,
}

impl WatchStarter for RecordingWatcher {
    fn start_watch(&self, _config: &Configuration) -> Result<Box<dyn Unwatch>, WatchSetupError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let stopped = self.stopped.clone();
        Ok(Box::new(move || {
            stopped.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

#[test]
fn test_ignore_set_equals_declared_outputs() {
    let plugin = TypedDirectoryPlugin::builder(
        Arc::new(ListingGenerator::default()),
        Arc::new(RecordingWatcher::default()),
    )
    .with_base_dir("/")
    .build(vec![
        DirectoryEntry::new("/a", "/a/T.ts", "/a/out.ts"),
        DirectoryEntry::new("/b", "/b/T.ts", "/b/out.ts"),
    ])
    .unwrap();

    assert_eq!(
        plugin.watch_ignore().paths(),
        &[PathBuf::from("/a/out.ts"), PathBuf::from("/b/out.ts")]
    );
}

#[test]
fn test_loads_fixture_config_file() {
    let plugin = TypedDirectoryPlugin::builder(
        Arc::new(ListingGenerator::default()),
        Arc::new(RecordingWatcher::default()),
    )
    .build(ConfigSource::File(fixtures_dir().join("typed-directory.json")))
    .unwrap();

    let config = plugin.config();
    assert_eq!(config.len(), 2);
    assert!(config.entries()[0].instance_per_file);
    assert_eq!(
        config.output_paths(),
        vec![
            fixtures_dir().join("animals/output.ts"),
            fixtures_dir().join("classes/output.ts"),
        ]
    );
}

#[test]
fn test_rejected_config_registers_no_hooks() {
    let mut compiler = Compiler::new();

    let result = TypedDirectoryPlugin::new(
        ConfigSource::Json("{ not json".to_string()),
        Arc::new(ListingGenerator::default()),
        Arc::new(RecordingWatcher::default()),
    )
    .map(Arc::new);
    if let Ok(plugin) = &result {
        compiler.apply(plugin.clone());
    }

    assert!(matches!(result, Err(PluginError::Config(ConfigError::Json(_)))));
    assert!(compiler.hooks().before_run.is_empty());
    assert!(compiler.hooks().watch_run.is_empty());
    assert!(compiler.hooks().watch_close.is_empty());
}

#[tokio::test]
async fn test_run_generates_outputs() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let generator = Arc::new(ListingGenerator::default());

    let plugin = TypedDirectoryPlugin::builder(
        generator.clone(),
        Arc::new(RecordingWatcher::default()),
    )
    .with_base_dir(fixtures_dir())
    .build(vec![
        DirectoryEntry::new(
            "animals/content",
            "animals/Animal.ts",
            temp_dir.path().join("animals.ts"),
        )
        .with_instances(),
        DirectoryEntry::new(
            "classes/content",
            "classes/BaseClass.ts",
            temp_dir.path().join("classes.ts"),
        ),
    ])
    .unwrap();

    let mut compiler = Compiler::new();
    compiler.apply(Arc::new(plugin));
    assert_ok!(compiler.run().await);

    assert_eq!(generator.runs.load(Ordering::SeqCst), 1);
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("animals.ts")).unwrap(),
        "domestic/cat\ndomestic/dog\nzoo/lion"
    );
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("classes.ts")).unwrap(),
        "first"
    );
}

#[tokio::test]
async fn test_run_surfaces_generator_failure() {
    let plugin = TypedDirectoryPlugin::builder(
        Arc::new(FailingGenerator),
        Arc::new(RecordingWatcher::default()),
    )
    .with_base_dir("/")
    .build(DirectoryEntry::new("/a", "/a/T.ts", "/a/out.ts"))
    .unwrap();

    let mut compiler = Compiler::new();
    compiler.apply(Arc::new(plugin));

    let err = assert_err!(compiler.run().await);
    assert_eq!(
        err.to_string(),
        "generation error: generation failed: zoo/lion does not extend Animal"
    );
}

#[tokio::test]
async fn test_watch_lifecycle() {
    init_tracing();
    let watcher = Arc::new(RecordingWatcher::default());
    let plugin = Arc::new(
        TypedDirectoryPlugin::builder(Arc::new(ListingGenerator::default()), watcher.clone())
            .with_base_dir("/")
            .build(vec![
                DirectoryEntry::new("/a", "/a/T.ts", "/a/out.ts"),
                DirectoryEntry::new("/b", "/b/T.ts", "/b/out.ts"),
            ])
            .unwrap(),
    );

    let mut compiler = Compiler::new();
    compiler.apply(plugin.clone());
    assert!(!compiler.is_ignored(Path::new("/a/out.ts")));

    assert_ok!(compiler.watch_run().await);
    assert!(plugin.is_watching());
    assert!(compiler.is_ignored(Path::new("/a/out.ts")));
    assert!(compiler.is_ignored(Path::new("/b/out.ts")));
    assert!(!compiler.is_ignored(Path::new("/a/T.ts")));

    assert_ok!(compiler.watch_run().await);
    assert_eq!(watcher.started.load(Ordering::SeqCst), 1);
    assert_eq!(compiler.ignore_registry().registrations(), 1);

    compiler.close_watch();
    assert!(!plugin.is_watching());
    compiler.close_watch();
    assert_eq!(watcher.stopped.load(Ordering::SeqCst), 1);
}

/// Fails the first setup, then behaves like [`RecordingWatcher`].
#[derive(Default)]
struct SecondTryWatcher {
    attempts: AtomicUsize,
}

impl WatchStarter for SecondTryWatcher {
    fn start_watch(&self, _config: &Configuration) -> Result<Box<dyn Unwatch>, WatchSetupError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(WatchSetupError::Other("too many open files".to_string()));
        }
        Ok(Box::new(|| {}))
    }
}

#[tokio::test]
async fn test_watch_retry_registers_ignore_once() {
    let plugin = Arc::new(
        TypedDirectoryPlugin::builder(
            Arc::new(ListingGenerator::default()),
            Arc::new(SecondTryWatcher::default()),
        )
        .with_base_dir("/")
        .build(DirectoryEntry::new("/a", "/a/T.ts", "/a/out.ts"))
        .unwrap(),
    );

    let mut compiler = Compiler::new();
    compiler.apply(plugin.clone());

    let err = assert_err!(compiler.watch_run().await);
    assert!(matches!(err, PluginError::WatchSetup(WatchSetupError::Other(_))));
    assert!(!plugin.is_watching());
    assert!(compiler.is_ignored(Path::new("/a/out.ts")));

    assert_ok!(compiler.watch_run().await);
    assert!(plugin.is_watching());
    assert_eq!(compiler.ignore_registry().registrations(), 1);
}

//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Temporary project directories with the default layout
//! - Settings whose external tools always succeed
//! - Leaves that record when they start and finish

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use gantry::config::{Settings, ToolCommand};
use gantry::core::completion;
use gantry::core::{Context, Node, Task};
use gantry::Error;

/// A temporary project root.
pub struct TestProject {
    /// Keeps the directory alive for the duration of the test.
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().to_path_buf();
        Self { temp_dir, path }
    }

    /// A project with dependency directories and one extra server file.
    pub fn with_layout() -> Self {
        let project = Self::new();
        project.mkdir("client/node_modules/left-pad");
        project.mkdir("server/node_modules/express");
        project.write("server/settings.json", r#"{"port":8080}"#);
        project
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    pub fn mkdir(&self, relative: &str) {
        std::fs::create_dir_all(self.join(relative)).expect("Failed to create directory");
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent");
        }
        std::fs::write(path, contents).expect("Failed to write file");
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.join(relative)).expect("Failed to read file")
    }

    pub fn is_symlink(&self, relative: &str) -> bool {
        std::fs::symlink_metadata(self.join(relative))
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }
}

/// Default settings with every external tool replaced by `true` and
/// bundling switched off.
pub fn stub_settings() -> Settings {
    let mut settings = Settings::default();
    let stub = ToolCommand {
        program: "true".to_string(),
        args: Vec::new(),
    };
    settings.tools.sass = stub.clone();
    settings.tools.css_minifier = stub.clone();
    settings.tools.typescript = stub.clone();
    settings.tools.bundler = stub.clone();
    settings.tools.minifier = stub.clone();
    settings.tools.npm = stub;
    settings.client.javascript.webpack.enabled = false;
    settings
}

pub fn test_ctx() -> Context {
    Context::new(Arc::new(Settings::default()), ".")
}

/// Shared log of `start:<name>` / `end:<name>` entries.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// A leaf that journals its start, sleeps, journals its end, then succeeds
/// or fails.
pub fn timed(name: &str, delay: Duration, fail: bool, journal: &Journal) -> Node {
    let journal = Arc::clone(journal);
    let label = name.to_string();
    let leaf = completion::future(move |_ctx: Context| {
        let journal = Arc::clone(&journal);
        let label = label.clone();
        async move {
            journal.lock().unwrap().push(format!("start:{}", label));
            tokio::time::sleep(delay).await;
            journal.lock().unwrap().push(format!("end:{}", label));
            if fail {
                Err(Error::Config(format!("{} failed", label)))
            } else {
                Ok(())
            }
        }
    });
    Task::new("test", name, leaf).into()
}

/// Position of `entry` in the journal.
pub fn position(entries: &[String], entry: &str) -> usize {
    entries
        .iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("'{}' missing from {:?}", entry, entries))
}

pub fn assert_missing(path: &Path) {
    assert!(
        std::fs::symlink_metadata(path).is_err(),
        "{} should not exist",
        path.display()
    );
}

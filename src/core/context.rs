//! Per-invocation execution context handed to every leaf task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::Settings;
use crate::files::DirectoryEnsurer;

/// Unique identifier for one invocation of the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new unique run identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle events emitted for every task a run executes.
///
/// Observers subscribe through [`Context::with_events`]; the runner never
/// blocks on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A task was started.
    TaskStarted {
        /// Qualified name of the task.
        name: String,
    },
    /// A task reported success.
    TaskFinished {
        /// Qualified name of the task.
        name: String,
        /// Wall-clock time from start to completion.
        duration: Duration,
    },
    /// A task reported an error.
    TaskFailed {
        /// Qualified name of the task.
        name: String,
        /// Rendered error message.
        error: String,
        /// Wall-clock time from start to failure.
        duration: Duration,
    },
}

impl RunEvent {
    /// Qualified name of the task this event belongs to.
    pub fn task_name(&self) -> &str {
        match self {
            RunEvent::TaskStarted { name }
            | RunEvent::TaskFinished { name, .. }
            | RunEvent::TaskFailed { name, .. } => name,
        }
    }
}

/// Everything a leaf needs to do its work.
///
/// Cloning is cheap: settings and the directory cache are shared by `Arc`.
#[derive(Clone)]
pub struct Context {
    settings: Arc<Settings>,
    dirs: DirectoryEnsurer,
    root: PathBuf,
    events: Option<mpsc::UnboundedSender<RunEvent>>,
    run_id: RunId,
    task: Option<String>,
}

impl Context {
    /// Create a context rooted at `root` with a fresh directory cache.
    pub fn new(settings: Arc<Settings>, root: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            dirs: DirectoryEnsurer::new(),
            root: root.into(),
            events: None,
            run_id: RunId::new(),
            task: None,
        }
    }

    /// Share an existing directory ensurer (and its cache) with this context.
    pub fn with_dirs(mut self, dirs: DirectoryEnsurer) -> Self {
        self.dirs = dirs;
        self
    }

    /// Send [`RunEvent`]s to `tx` while tasks run.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Derive the context a specific task runs with.
    pub fn for_task(&self, qualified_name: &str) -> Self {
        let mut ctx = self.clone();
        ctx.task = Some(qualified_name.to_string());
        ctx
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dirs(&self) -> &DirectoryEnsurer {
        &self.dirs
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Qualified name of the task currently running, if any.
    pub fn task_name(&self) -> &str {
        self.task.as_deref().unwrap_or("<anonymous>")
    }

    /// Resolve a settings path against the project root.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub(crate) fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is listening anymore.
            let _ = tx.send(event);
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.root)
            .field("run_id", &self.run_id)
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

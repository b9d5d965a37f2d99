//! Top-level task resolution across scopes.
//!
//! A shared name such as `build` runs every scope's task of that name in
//! parallel; any other name is looked up by its qualified form
//! (`client.build-stylesheets`).

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::Settings;
use crate::core::{Context, Node, RunEvent, Task, TaskRegistry};
use crate::scopes::{self, SHARED_TASKS};
use crate::util::format_elapsed;
use crate::{glog, glog_debug, Error, Result};

/// One invocable name, as shown by `--tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskListing {
    pub name: String,
    pub description: String,
}

/// Merges scope registries and runs tasks by name.
#[derive(Debug, Clone)]
pub struct Invoker {
    registries: Vec<TaskRegistry>,
}

impl Invoker {
    pub fn new(registries: Vec<TaskRegistry>) -> Self {
        Self { registries }
    }

    /// Build the invoker for the built-in scopes.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(scopes::registries(settings))
    }

    pub fn registries(&self) -> &[TaskRegistry] {
        &self.registries
    }

    /// Resolve one top-level name to a runnable tree.
    pub fn resolve(&self, name: &str) -> Option<Node> {
        if SHARED_TASKS.contains(&name) {
            let members: Vec<Node> = self
                .registries
                .iter()
                .filter_map(|registry| registry.get(name).cloned())
                .map(Node::from)
                .collect();
            if members.is_empty() {
                return None;
            }
            return Some(Task::shared(name, Node::parallel(members).into_leaf()).into());
        }

        let (scope, local) = name.split_once('.')?;
        self.registries
            .iter()
            .find(|registry| registry.scope() == scope)
            .and_then(|registry| registry.get(local))
            .cloned()
            .map(Node::from)
    }

    /// Resolve every requested name up front. Several names run in parallel;
    /// no names means `default`.
    pub fn plan(&self, names: &[String]) -> Result<Node> {
        if names.is_empty() {
            return self
                .resolve("default")
                .ok_or_else(|| Error::TaskNotFound("default".to_string()));
        }

        let mut nodes = names
            .iter()
            .map(|name| {
                self.resolve(name)
                    .ok_or_else(|| Error::TaskNotFound(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        if nodes.len() == 1 {
            return Ok(nodes.remove(0));
        }
        Ok(Node::parallel(nodes))
    }

    /// Run `names` against `settings` rooted at `root`.
    pub async fn run(
        &self,
        settings: Arc<Settings>,
        root: impl Into<PathBuf>,
        names: &[String],
    ) -> Result<()> {
        let plan = self.plan(names)?;
        let ctx = Context::new(settings, root);
        self.run_plan(&plan, &ctx).await
    }

    /// Run an already resolved tree, collecting a summary of the run.
    pub async fn run_plan(&self, plan: &Node, ctx: &Context) -> Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let ctx = ctx.clone().with_events(tx);
        glog_debug!(
            "Run {}: {} task(s) planned in {}",
            ctx.run_id().short(),
            plan.task_count(),
            ctx.root().display()
        );

        let start = std::time::Instant::now();
        let result = plan.run(&ctx).await;
        drop(ctx);

        let mut finished = 0usize;
        let mut failed = 0usize;
        while let Ok(event) = rx.try_recv() {
            match event {
                RunEvent::TaskFinished { .. } => finished += 1,
                RunEvent::TaskFailed { .. } => failed += 1,
                RunEvent::TaskStarted { .. } => {}
            }
        }
        glog!(
            "Done in {}: {} task(s) finished, {} failed",
            format_elapsed(start.elapsed()),
            finished,
            failed
        );
        result
    }

    /// Every invocable name: shared names first, then qualified names.
    pub fn list(&self) -> Vec<TaskListing> {
        let mut listings: Vec<TaskListing> = SHARED_TASKS
            .iter()
            .filter(|name| self.registries.iter().any(|r| r.contains(name)))
            .map(|name| TaskListing {
                name: name.to_string(),
                description: format!("Run '{}' in every scope in parallel", name),
            })
            .collect();

        for registry in &self.registries {
            for name in registry.names() {
                if let Some(task) = registry.get(name) {
                    listings.push(TaskListing {
                        name: task.qualified_name.clone(),
                        description: task.description.clone(),
                    });
                }
            }
        }
        listings
    }
}

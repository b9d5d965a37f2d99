//! Series and parallel composition of tasks.
//!
//! A [`Node`] tree is built once per invocation and can be run any number of
//! times. Running a node never mutates it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};

use crate::core::completion::{Completion, Leaf};
use crate::core::context::{Context, RunEvent};
use crate::core::task::Task;
use crate::util::format_elapsed;
use crate::{glog, glog_debug, glog_error, Error};

/// How a parallel node reacts to a failing child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParallelMode {
    /// Wait for every child, then report the first error that settled.
    #[default]
    Settle,
    /// Report the first error as soon as it settles. Remaining children are
    /// detached and still run to completion.
    FailFast,
}

/// A composition tree of tasks.
#[derive(Debug, Clone)]
pub enum Node {
    /// A single task.
    Leaf(Task),
    /// Children run one after another; the first error stops the sequence.
    Series(Vec<Node>),
    /// Children run concurrently behind a completion barrier.
    Parallel(Vec<Node>, ParallelMode),
}

impl Node {
    pub fn series(nodes: impl IntoIterator<Item = Node>) -> Self {
        Node::Series(nodes.into_iter().collect())
    }

    pub fn parallel(nodes: impl IntoIterator<Item = Node>) -> Self {
        Node::Parallel(nodes.into_iter().collect(), ParallelMode::Settle)
    }

    pub fn parallel_with_mode(nodes: impl IntoIterator<Item = Node>, mode: ParallelMode) -> Self {
        Node::Parallel(nodes.into_iter().collect(), mode)
    }

    /// Run the tree and report its single aggregate result.
    ///
    /// Must be called from within a tokio runtime: parallel children are
    /// spawned as separate tasks.
    pub fn run(&self, ctx: &Context) -> BoxFuture<'static, Completion> {
        match self {
            Node::Leaf(task) => run_task(task.clone(), ctx.clone()).boxed(),
            Node::Series(nodes) => run_series(nodes.clone(), ctx.clone()).boxed(),
            Node::Parallel(nodes, mode) => run_parallel(nodes.clone(), *mode, ctx.clone()).boxed(),
        }
    }

    /// Turn the tree into a leaf so it can be registered as a task.
    pub fn into_leaf(self) -> Leaf {
        Leaf::new(move |ctx| self.run(&ctx))
    }

    /// Number of tasks the tree would start if nothing failed.
    pub fn task_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Series(nodes) | Node::Parallel(nodes, _) => {
                nodes.iter().map(Node::task_count).sum()
            }
        }
    }
}

impl From<Task> for Node {
    fn from(task: Task) -> Self {
        Node::Leaf(task)
    }
}

async fn run_task(task: Task, ctx: Context) -> Completion {
    let name = task.qualified_name.clone();
    let ctx = ctx.for_task(&name);

    glog!("Starting '{}'...", name);
    ctx.emit(RunEvent::TaskStarted { name: name.clone() });
    let start = Instant::now();

    // Invoked inside the guarded future so a panic while building it is caught too.
    let result = AssertUnwindSafe(async { task.run.invoke(ctx.clone()).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(Error::TaskJoin(panic_message(payload))));

    let duration = start.elapsed();
    match &result {
        Ok(()) => {
            glog!("Finished '{}' after {}", name, format_elapsed(duration));
            ctx.emit(RunEvent::TaskFinished { name, duration });
        }
        Err(e) => {
            glog_error!("'{}' errored after {}: {}", name, format_elapsed(duration), e);
            ctx.emit(RunEvent::TaskFailed {
                name,
                error: e.to_string(),
                duration,
            });
        }
    }
    result
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("task panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("task panicked: {}", msg)
    } else {
        "task panicked".to_string()
    }
}

async fn run_series(nodes: Vec<Node>, ctx: Context) -> Completion {
    for node in &nodes {
        node.run(&ctx).await?;
    }
    Ok(())
}

async fn run_parallel(nodes: Vec<Node>, mode: ParallelMode, ctx: Context) -> Completion {
    let mut pending: FuturesUnordered<_> = nodes
        .iter()
        .map(|node| tokio::spawn(node.run(&ctx)))
        .collect();

    let mut first_error = None;
    while let Some(joined) = pending.next().await {
        let result = joined
            .map_err(|e| Error::TaskJoin(e.to_string()))
            .and_then(|completion| completion);

        if let Err(e) = result {
            if mode == ParallelMode::FailFast {
                // Dropping the join handles detaches the remaining children.
                glog_debug!(
                    "Parallel fail-fast: reporting error, {} sibling(s) keep running",
                    pending.len()
                );
                return Err(e);
            }
            match first_error {
                None => first_error = Some(e),
                Some(_) => glog_debug!("Parallel: additional sibling error: {}", e),
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

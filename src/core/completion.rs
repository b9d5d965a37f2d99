//! Completion protocol for leaf tasks.
//!
//! A leaf can finish in one of three ways: it returns its result directly,
//! it hands back a future, or it calls an explicit completion signal. All
//! three are wrapped into the same [`Leaf`] shape at registration time, so
//! the combinators only ever see a boxed future yielding one [`Completion`].

use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::oneshot;

use crate::core::context::Context;
use crate::util::blocking;
use crate::{glog_warn, Error, Result};

/// Outcome of one leaf execution.
pub type Completion = Result<()>;

/// Future produced by invoking a leaf.
pub type LeafFuture = BoxFuture<'static, Completion>;

type LeafFn = dyn Fn(Context) -> LeafFuture + Send + Sync;

/// A runnable unit of work, shareable across any number of runs.
#[derive(Clone)]
pub struct Leaf(Arc<LeafFn>);

impl Leaf {
    /// Wrap a function that already produces a [`LeafFuture`].
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Context) -> LeafFuture + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Start the leaf. The returned future settles exactly once.
    pub fn invoke(&self, ctx: Context) -> LeafFuture {
        (self.0)(ctx)
    }
}

impl std::fmt::Debug for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Leaf(..)")
    }
}

/// Leaf that completes synchronously by returning its result.
///
/// The body runs on the blocking pool so filesystem work does not stall
/// sibling tasks.
pub fn sync<F>(f: F) -> Leaf
where
    F: Fn(Context) -> Completion + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Leaf::new(move |ctx| {
        let f = Arc::clone(&f);
        async move { blocking(move || f(ctx)).await }.boxed()
    })
}

/// Leaf that completes when the future it returns settles.
pub fn future<F, Fut>(f: F) -> Leaf
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Completion> + Send + 'static,
{
    Leaf::new(move |ctx| f(ctx).boxed())
}

/// Leaf that reports completion through a [`Done`] signal.
///
/// The body is called when the leaf starts and must not block; it should
/// hand `Done` to whatever finishes the work.
pub fn callback<F>(f: F) -> Leaf
where
    F: Fn(Context, Done) + Send + Sync + 'static,
{
    Leaf::new(move |ctx| {
        let task = ctx.task_name().to_string();
        let (done, rx) = Done::channel(&task);
        f(ctx, done);
        async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(Error::CompletionDropped(task)),
            }
        }
        .boxed()
    })
}

struct DoneInner {
    tx: Mutex<Option<oneshot::Sender<Completion>>>,
    task: String,
}

/// Explicit completion signal for callback-style leaves.
///
/// The first call to [`Done::done`] settles the leaf. Later calls are ignored
/// with a warning. If every clone is dropped without a call, the leaf fails
/// with [`Error::CompletionDropped`].
#[derive(Clone)]
pub struct Done {
    inner: Arc<DoneInner>,
}

impl Done {
    fn channel(task: &str) -> (Self, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        let done = Self {
            inner: Arc::new(DoneInner {
                tx: Mutex::new(Some(tx)),
                task: task.to_string(),
            }),
        };
        (done, rx)
    }

    /// Signal completion, with an error if the work failed.
    pub fn done(&self, error: Option<Error>) {
        let sender = match self.inner.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                let result = match error {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
                // The runner may have stopped listening; nothing to report to.
                let _ = tx.send(result);
            }
            None => glog_warn!(
                "'{}' signalled completion more than once; ignoring the extra signal",
                self.inner.task
            ),
        }
    }

    pub fn ok(&self) {
        self.done(None);
    }

    pub fn fail(&self, error: Error) {
        self.done(Some(error));
    }
}

//! Series and parallel composition tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

use gantry::core::completion;
use gantry::core::{Context, Node, ParallelMode, RunEvent, Task};
use gantry::Error;

use crate::fixtures::{entries, journal, position, test_ctx, timed};

/// Test: Series short-circuits
/// Given Series([A, B, C]) where B fails
/// When the series runs
/// Then A and B run, C never starts, and the result is B's error
#[tokio::test]
async fn test_series_stops_after_failure() {
    let log = journal();
    let tree = Node::series([
        timed("a", Duration::from_millis(5), false, &log),
        timed("b", Duration::from_millis(5), true, &log),
        timed("c", Duration::from_millis(5), false, &log),
    ]);

    let err = assert_err!(tree.run(&test_ctx()).await);
    assert_eq!(err.to_string(), "Configuration error: b failed");
    assert_eq!(entries(&log), vec!["start:a", "end:a", "start:b", "end:b"]);
}

/// Test: Parallel starts every child before any must finish
/// Given Parallel([A, B, C]) of sleeping leaves
/// When the parallel node runs
/// Then all three start before the first one ends,
/// and the node settles only after the last one ends
#[tokio::test]
async fn test_parallel_starts_all_before_finishing() {
    let log = journal();
    let tree = Node::parallel([
        timed("a", Duration::from_millis(60), false, &log),
        timed("b", Duration::from_millis(20), false, &log),
        timed("c", Duration::from_millis(40), false, &log),
    ]);

    assert_ok!(tree.run(&test_ctx()).await);

    let entries = entries(&log);
    assert_eq!(entries.len(), 6, "every child should start and end: {:?}", entries);
    let first_end = entries.iter().position(|e| e.starts_with("end:")).unwrap();
    for name in ["a", "b", "c"] {
        assert!(position(&entries, &format!("start:{}", name)) < first_end);
    }
    assert_eq!(entries.last().unwrap(), "end:a");
}

/// Test: Parallel children run truly concurrently
/// Given three leaves that all wait on the same three-party barrier
/// When the parallel node runs
/// Then it completes, which is only possible if all three are in flight
#[tokio::test]
async fn test_parallel_children_share_a_barrier() {
    let barrier = Arc::new(tokio::sync::Barrier::new(3));
    let nodes: Vec<Node> = (0..3)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            let leaf = completion::future(move |_ctx: Context| {
                let barrier = Arc::clone(&barrier);
                async move {
                    barrier.wait().await;
                    Ok(())
                }
            });
            Task::new("test", &format!("wait-{}", i), leaf).into()
        })
        .collect();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        Node::parallel(nodes).run(&test_ctx()),
    )
    .await
    .expect("parallel children should not wait on each other");
    assert_ok!(result);
}

/// Test: A failing sibling does not mask or cancel the other
/// Given Parallel([A, B]) where A fails fast and B succeeds later
/// When the parallel node runs
/// Then B still runs to completion and the result is A's error
#[tokio::test]
async fn test_parallel_failure_waits_for_siblings() {
    let log = journal();
    let tree = Node::parallel([
        timed("a", Duration::from_millis(5), true, &log),
        timed("b", Duration::from_millis(50), false, &log),
    ]);

    let err = assert_err!(tree.run(&test_ctx()).await);
    assert_eq!(err.to_string(), "Configuration error: a failed");
    assert!(entries(&log).contains(&"end:b".to_string()));
}

/// Test: First error by settlement order wins
/// Given two failing siblings where the second listed fails first
/// When the parallel node runs
/// Then the earlier-settling error is reported
#[tokio::test]
async fn test_parallel_reports_first_settled_error() {
    let log = journal();
    let tree = Node::parallel([
        timed("slow", Duration::from_millis(60), true, &log),
        timed("quick", Duration::from_millis(5), true, &log),
    ]);

    let err = assert_err!(tree.run(&test_ctx()).await);
    assert_eq!(err.to_string(), "Configuration error: quick failed");
}

/// Test: Fail-fast mode reports early but does not cancel
/// Given a fail-fast parallel node with a quick failure and a slow success
/// When the node runs
/// Then it reports the failure before the slow sibling finishes,
/// and the slow sibling still finishes afterwards
#[tokio::test]
async fn test_fail_fast_returns_early_without_cancelling() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let slow = completion::future(move |_ctx: Context| {
        let flag = Arc::clone(&flag);
        async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }
    });
    let log = journal();
    let tree = Node::parallel_with_mode(
        [
            Task::new("test", "slow", slow).into(),
            timed("quick", Duration::from_millis(5), true, &log),
        ],
        ParallelMode::FailFast,
    );

    assert_err!(tree.run(&test_ctx()).await);
    assert!(!finished.load(Ordering::SeqCst));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(finished.load(Ordering::SeqCst), "detached sibling should still finish");
}

/// Test: Nested trees run under qualified names
/// Given Series([Parallel([a, b]), c])
/// When it runs with an event listener
/// Then every leaf reports start and finish under its qualified name
#[tokio::test]
async fn test_nested_tree_emits_events() {
    let log = journal();
    let tree = Node::series([
        Node::parallel([
            timed("a", Duration::from_millis(5), false, &log),
            timed("b", Duration::from_millis(5), false, &log),
        ]),
        timed("c", Duration::from_millis(5), false, &log),
    ]);
    assert_eq!(tree.task_count(), 3);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let ctx = test_ctx().with_events(tx);
    assert_ok!(tree.run(&ctx).await);

    let mut finished = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let RunEvent::TaskFinished { name, .. } = event {
            finished.push(name);
        }
    }
    finished.sort();
    assert_eq!(finished, vec!["test.a", "test.b", "test.c"]);
}

/// Test: All three completion shapes compose the same way
/// Given a sync leaf, a future leaf and a callback leaf
/// When composed in series
/// Then the series succeeds, and a failing callback stops it
#[tokio::test]
async fn test_mixed_completion_shapes() {
    let sync_leaf = completion::sync(|_| Ok(()));
    let future_leaf = completion::future(|_ctx: Context| async { Ok(()) });
    let callback_leaf = completion::callback(|_ctx, done| {
        std::thread::spawn(move || done.ok());
    });
    let failing_callback = completion::callback(|_ctx, done| {
        done.fail(Error::Config("callback failed".into()));
    });

    let ok_tree = Node::series([
        Task::new("mixed", "sync", sync_leaf.clone()).into(),
        Task::new("mixed", "future", future_leaf).into(),
        Task::new("mixed", "callback", callback_leaf).into(),
    ]);
    assert_ok!(ok_tree.run(&test_ctx()).await);

    let failing_tree = Node::series([
        Task::new("mixed", "failing", failing_callback).into(),
        Task::new("mixed", "never", sync_leaf).into(),
    ]);
    let err = assert_err!(failing_tree.run(&test_ctx()).await);
    assert!(matches!(err, Error::Config(_)));
}

/// Test: A dropped completion signal fails the leaf instead of hanging
#[tokio::test]
async fn test_dropped_done_fails() {
    let leaf = completion::callback(|_ctx, done| drop(done));
    let tree: Node = Task::new("test", "forgetful", leaf).into();

    match tree.run(&test_ctx()).await {
        Err(Error::CompletionDropped(task)) => assert_eq!(task, "test.forgetful"),
        other => panic!("expected CompletionDropped, got {:?}", other),
    }
}

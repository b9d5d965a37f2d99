//! Multi-file copy tests.

use tokio_test::{assert_err, assert_ok};

use gantry::files::{copy_files, CopyMapping};
use gantry::Error;

use crate::fixtures::{assert_missing, TestProject};

/// Test: Existing source is copied verbatim
/// Given a.txt containing "hello"
/// When it is copied to out/a.txt
/// Then out/a.txt contains exactly "hello"
#[tokio::test]
async fn test_copy_existing_file() {
    let project = TestProject::new();
    project.write("a.txt", "hello");
    project.mkdir("out");

    let summary = assert_ok!(
        copy_files([CopyMapping::new("a.txt", "out/a.txt").rooted(&project.path)]).await
    );

    assert_eq!(project.read("out/a.txt"), "hello");
    assert_eq!(summary.copied.len(), 1);
    assert_eq!(summary.bytes, 5);
}

/// Test: Missing source only warns
/// Given missing.txt does not exist
/// When it is copied to out/missing.txt
/// Then nothing is created and the result is Ok
#[tokio::test]
async fn test_missing_source_is_not_an_error() {
    let project = TestProject::new();
    project.mkdir("out");

    let summary = assert_ok!(
        copy_files([CopyMapping::new("missing.txt", "out/missing.txt").rooted(&project.path)])
            .await
    );

    assert_missing(&project.join("out/missing.txt"));
    assert_eq!(summary.missing.len(), 1);
    assert!(summary.copied.is_empty());
}

/// Test: Failed write is reported after the rest of the set settles
/// Given one mapping whose destination cannot be written and one that can
/// When the set runs
/// Then the good copy lands and the error names the bad destination
#[tokio::test]
async fn test_write_failure_references_destination() {
    let project = TestProject::new();
    project.write("a.txt", "hello");
    project.write("b.txt", "world");
    // A regular file where a directory is expected makes the write fail,
    // independent of the user the tests run as.
    project.write("protected", "");
    project.mkdir("out");

    let err = assert_err!(
        copy_files([
            CopyMapping::new("a.txt", "protected/a.txt").rooted(&project.path),
            CopyMapping::new("b.txt", "out/b.txt").rooted(&project.path),
        ])
        .await
    );

    match err {
        Error::Write { path, .. } => assert_eq!(path, project.join("protected/a.txt")),
        other => panic!("expected Write error, got {:?}", other),
    }
    assert_eq!(project.read("out/b.txt"), "world");
}

/// Test: Missing and present sources mix freely
#[tokio::test]
async fn test_mixed_present_and_missing() {
    let project = TestProject::new();
    project.write("server/settings.json", "{}");
    project.mkdir("dist");

    let summary = assert_ok!(
        copy_files([
            CopyMapping::new("server/settings.json", "dist/settings.json").rooted(&project.path),
            CopyMapping::new("server/credentials.json", "dist/credentials.json")
                .rooted(&project.path),
        ])
        .await
    );

    assert_eq!(summary.copied.len(), 1);
    assert_eq!(summary.missing.len(), 1);
    assert_eq!(project.read("dist/settings.json"), "{}");
    assert_missing(&project.join("dist/credentials.json"));
}

//! Built-in scopes against a temporary project.
//!
//! Every external tool is `true`, so these tests exercise the orchestration
//! and filesystem work around the tools rather than the tools themselves.
#![cfg(unix)]

use std::sync::Arc;

use tokio_test::{assert_err, assert_ok};

use gantry::config::{Environment, Settings, ToolCommand};
use gantry::invoker::Invoker;
use gantry::Error;

use crate::fixtures::{assert_missing, stub_settings, TestProject};

async fn run(project: &TestProject, settings: Settings, names: &[&str]) -> gantry::Result<()> {
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    Invoker::from_settings(&settings)
        .run(Arc::new(settings), &project.path, &names)
        .await
}

/// Test: Shared build
/// Given a project with dependency directories and one extra server file
/// When `build` runs in development
/// Then output directories exist, dependencies are linked,
/// and the present extra file is copied while the missing one is skipped
#[tokio::test]
async fn test_build_development_project() {
    let project = TestProject::with_layout();

    assert_ok!(run(&project, stub_settings(), &["build"]).await);

    assert!(project.join("dist/serve/css").is_dir());
    assert!(project.is_symlink("dist/node_modules"));
    assert!(project.is_symlink("dist/serve/node_modules"));
    assert_eq!(
        std::fs::read_link(project.join("dist/node_modules")).unwrap(),
        project.join("server/node_modules")
    );
    assert_eq!(project.read("dist/settings.json"), r#"{"port":8080}"#);
    assert_missing(&project.join("dist/credentials.json"));
}

/// Test: Shared clean removes every scope's output but leaves sources
#[tokio::test]
async fn test_clean_after_build() {
    let project = TestProject::with_layout();
    assert_ok!(run(&project, stub_settings(), &["build"]).await);
    project.write("dist/server.js", "console.log('hi')");
    project.write("dist/serve/js/main.js", "main()");

    assert_ok!(run(&project, stub_settings(), &["clean"]).await);

    assert_missing(&project.join("dist/server.js"));
    assert_missing(&project.join("dist/settings.json"));
    assert_missing(&project.join("dist/node_modules"));
    assert_missing(&project.join("dist/serve/js"));
    assert_missing(&project.join("dist/serve/css"));
    assert_missing(&project.join("dist/serve/node_modules"));
    assert!(project.join("server/node_modules/express").is_dir());
    assert!(project.join("client/node_modules/left-pad").is_dir());
}

/// Test: Default rebuilds every scope
#[tokio::test]
async fn test_default_rebuilds() {
    let project = TestProject::with_layout();
    project.write("dist/stale.js", "old");

    assert_ok!(run(&project, stub_settings(), &[]).await);

    assert_missing(&project.join("dist/stale.js"));
    assert_eq!(project.read("dist/settings.json"), r#"{"port":8080}"#);
}

/// Test: Bundling removes untranspiled output but keeps the bundle
#[tokio::test]
async fn test_bundle_step_keeps_bundle_only() {
    let project = TestProject::with_layout();
    // The stub compiler and bundler do nothing, so stage their outputs.
    project.write("dist/serve/js/main.js", "main()");
    project.write("dist/serve/js/bundle.js", "bundle()");
    let mut settings = stub_settings();
    settings.client.javascript.webpack.enabled = true;

    assert_ok!(run(&project, settings, &["client.build-javascript"]).await);

    assert_eq!(project.read("dist/serve/js/bundle.js"), "bundle()");
    assert_missing(&project.join("dist/serve/js/main.js"));
}

/// Test: Production installs dependencies instead of linking them
#[tokio::test]
async fn test_production_does_not_link() {
    let project = TestProject::with_layout();
    let mut settings = stub_settings();
    settings.environment = Environment::Production;

    assert_ok!(run(&project, settings, &["server.build-javascript"]).await);

    assert!(project.join("dist").is_dir());
    assert!(!project.is_symlink("dist/node_modules"));
}

/// Test: A failing tool fails the task and the run
/// Given a TypeScript compiler that exits non-zero
/// When `server.build` runs
/// Then the run fails with the tool's error, and the sibling extras copy
/// still completes
#[tokio::test]
async fn test_failing_tool_surfaces_error() {
    let project = TestProject::with_layout();
    let mut settings = stub_settings();
    settings.tools.typescript = ToolCommand {
        program: "false".to_string(),
        args: Vec::new(),
    };

    let err = assert_err!(run(&project, settings, &["server.build"]).await);
    match err {
        Error::ExternalTool { tool, .. } => assert_eq!(tool, "typescript"),
        other => panic!("expected ExternalTool, got {:?}", other),
    }
    assert_eq!(project.read("dist/settings.json"), r#"{"port":8080}"#);
}

/// Test: Settings on disk drive the run
#[tokio::test]
async fn test_settings_loaded_from_project() {
    let project = TestProject::with_layout();
    let mut settings = stub_settings();
    settings
        .server
        .copy
        .insert("server/settings.json".to_string(), "dist/config/app.json".to_string());
    project.write("gantry.toml", &settings.to_toml_string().unwrap());
    project.mkdir("dist/config");

    let loaded = Settings::load(&project.path, None).unwrap();
    assert_eq!(loaded, settings);
    assert_ok!(run(&project, loaded, &["server.build-extras"]).await);

    assert_eq!(project.read("dist/config/app.json"), r#"{"port":8080}"#);
}

//! Server scope: server JavaScript and the extra files shipped next to it.

use crate::config::Settings;
use crate::core::completion;
use crate::core::{Context, Node, TaskRegistry};
use crate::files::{copy_files, remove_paths, CopyMapping};
use crate::scopes::{clean_leaf, path_var, run_tool};
use crate::tools::{self, ToolVars};
use crate::{glog, glog_debug, Result};

pub const SCOPE: &str = "server";

pub fn registry(_settings: &Settings) -> TaskRegistry {
    let mut registry = TaskRegistry::new(SCOPE);

    let generate_node_modules = registry.task(
        "generate-node-modules",
        "Install or link the server dependency directory",
        completion::future(generate_node_modules),
    );
    let compile_typescript = registry.task(
        "compile-typescript",
        "Transpile the server TypeScript project",
        completion::future(compile_typescript),
    );

    let clean_javascript = registry.register_with(
        "clean-javascript",
        "Delete compiled server JavaScript and dependencies",
        clean_leaf(|s| s.server.javascript.files_to_clean.clone()),
    );
    let clean_extras = registry.register_with(
        "clean-extras",
        "Delete copied extra files",
        completion::future(clean_extras),
    );

    let build_javascript = registry.register_with(
        "build-javascript",
        "Build the server JavaScript",
        Node::parallel([generate_node_modules.into(), compile_typescript.into()]).into_leaf(),
    );
    let build_extras = registry.register_with(
        "build-extras",
        "Copy extra files into the distribution directory",
        completion::future(copy_extras),
    );

    registry.register_with(
        "rebuild-javascript",
        "Clean, then build the server JavaScript",
        Node::series([clean_javascript.clone().into(), build_javascript.clone().into()])
            .into_leaf(),
    );
    registry.register_with(
        "rebuild-extras",
        "Clean, then copy extra files",
        Node::series([clean_extras.clone().into(), build_extras.clone().into()]).into_leaf(),
    );

    let clean = registry.register_with(
        "clean",
        "Delete all server build output",
        Node::parallel([clean_javascript.into(), clean_extras.into()]).into_leaf(),
    );
    let build = registry.register_with(
        "build",
        "Build server JavaScript and copy extra files",
        Node::parallel([build_javascript.into(), build_extras.into()]).into_leaf(),
    );
    // Series, so cleaning never races the build that follows it.
    let rebuild = registry.register_with(
        "rebuild",
        "Clean, then build the server",
        Node::series([clean.into(), build.into()]).into_leaf(),
    );
    registry.register_with("default", "Rebuild the server", Node::from(rebuild).into_leaf());

    registry
}

async fn generate_node_modules(ctx: Context) -> Result<()> {
    let server = &ctx.settings().server;
    tools::provide(&ctx, &server.dist_dir, &server.javascript.node_modules).await
}

async fn compile_typescript(ctx: Context) -> Result<()> {
    let settings = ctx.settings();
    let javascript = &settings.server.javascript;
    ctx.dirs().ensure(ctx.path(&settings.server.dist_dir)).await?;

    let vars = ToolVars::from([
        ("tsconfig", path_var(&javascript.tsconfig)),
        ("output", path_var(&javascript.output_dir)),
    ]);
    run_tool(&ctx, "typescript", &settings.tools.typescript, vars).await
}

/// Copy destinations are file names, not patterns, and may be absolute.
async fn clean_extras(ctx: Context) -> Result<()> {
    let paths = ctx
        .settings()
        .server
        .copy
        .values()
        .map(|destination| ctx.path(destination))
        .collect();
    let summary = remove_paths(paths).await?;
    glog_debug!("Removed {} copied extra file(s)", summary.removed.len());
    Ok(())
}

async fn copy_extras(ctx: Context) -> Result<()> {
    let server = &ctx.settings().server;
    ctx.dirs().ensure(ctx.path(&server.dist_dir)).await?;

    let mappings: Vec<CopyMapping> = server
        .copy
        .iter()
        .map(|(source, destination)| CopyMapping::new(source, destination).rooted(ctx.root()))
        .collect();
    let summary = copy_files(mappings).await?;
    glog!(
        "Copied {} extra file(s) ({} bytes), {} missing",
        summary.copied.len(),
        summary.bytes,
        summary.missing.len()
    );
    Ok(())
}

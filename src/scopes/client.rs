//! Client scope: stylesheets and browser JavaScript.

use crate::config::Settings;
use crate::core::completion;
use crate::core::{Context, Node, TaskRegistry};
use crate::files;
use crate::scopes::{clean_leaf, path_var, run_tool};
use crate::tools::{self, ToolVars};
use crate::Result;

pub const SCOPE: &str = "client";

/// Build the client registry. Optional stages are included according to the
/// toggles in `settings`.
pub fn registry(settings: &Settings) -> TaskRegistry {
    let client = &settings.client;
    let mut registry = TaskRegistry::new(SCOPE);

    // Internal steps, not invocable on their own.
    let compile_sass = registry.task(
        "compile-sass",
        "Compile Sass sources to CSS",
        completion::future(compile_sass),
    );
    let minify_stylesheets = registry.task(
        "minify-stylesheets",
        "Minify compiled CSS in place",
        completion::future(minify_stylesheets),
    );
    let generate_node_modules = registry.task(
        "generate-node-modules",
        "Install or link the client dependency directory",
        completion::future(generate_node_modules),
    );
    let compile_typescript = registry.task(
        "compile-typescript",
        "Transpile the client TypeScript project",
        completion::future(compile_typescript),
    );
    let transpile_javascript = registry.task(
        "transpile-javascript",
        "Bundle compiled JavaScript for the browser",
        completion::future(transpile_javascript),
    );
    let clean_untranspiled = registry.task(
        "clean-untranspiled-javascript",
        "Delete JavaScript superseded by the bundle",
        completion::future(clean_untranspiled_javascript),
    );
    let minify_javascript = registry.task(
        "minify-javascript",
        "Minify and/or mangle the client JavaScript",
        completion::future(minify_javascript),
    );

    let clean_stylesheets = registry.register_with(
        "clean-stylesheets",
        "Delete compiled stylesheets",
        clean_leaf(|s| s.client.stylesheets.files_to_clean.clone()),
    );
    let clean_javascript = registry.register_with(
        "clean-javascript",
        "Delete compiled client JavaScript and dependencies",
        clean_leaf(|s| s.client.javascript.files_to_clean.clone()),
    );

    let mut stylesheet_steps = vec![Node::from(compile_sass)];
    if client.stylesheets.enable_minification {
        stylesheet_steps.push(minify_stylesheets.into());
    }
    let build_stylesheets = registry.register_with(
        "build-stylesheets",
        "Compile (and optionally minify) stylesheets",
        Node::series(stylesheet_steps).into_leaf(),
    );

    let mut javascript_steps = vec![
        Node::from(generate_node_modules),
        Node::from(compile_typescript),
    ];
    if client.javascript.webpack.enabled {
        javascript_steps.push(transpile_javascript.into());
        javascript_steps.push(clean_untranspiled.into());
    }
    if client.javascript.enable_minification || client.javascript.enable_uglification {
        javascript_steps.push(minify_javascript.into());
    }
    let build_javascript = registry.register_with(
        "build-javascript",
        "Build the client JavaScript",
        Node::series(javascript_steps).into_leaf(),
    );

    registry.register_with(
        "rebuild-stylesheets",
        "Clean, then build stylesheets",
        Node::series([clean_stylesheets.clone().into(), build_stylesheets.clone().into()])
            .into_leaf(),
    );
    registry.register_with(
        "rebuild-javascript",
        "Clean, then build the client JavaScript",
        Node::series([clean_javascript.clone().into(), build_javascript.clone().into()])
            .into_leaf(),
    );

    let clean = registry.register_with(
        "clean",
        "Delete all client build output",
        Node::parallel([clean_stylesheets.into(), clean_javascript.into()]).into_leaf(),
    );
    let build = registry.register_with(
        "build",
        "Build stylesheets and JavaScript",
        Node::parallel([build_stylesheets.into(), build_javascript.into()]).into_leaf(),
    );
    let rebuild = registry.register_with(
        "rebuild",
        "Clean, then build the client",
        Node::series([clean.into(), build.into()]).into_leaf(),
    );
    registry.register_with("default", "Rebuild the client", Node::from(rebuild).into_leaf());

    registry
}

async fn compile_sass(ctx: Context) -> Result<()> {
    let settings = ctx.settings();
    let stylesheets = &settings.client.stylesheets;
    ctx.dirs().ensure(ctx.path(&settings.client.dist_dir)).await?;
    ctx.dirs().ensure(ctx.path(&stylesheets.output_dir)).await?;

    let vars = ToolVars::from([
        ("input", path_var(&stylesheets.sass_dir)),
        ("output", path_var(&stylesheets.output_dir)),
    ]);
    run_tool(&ctx, "sass", &settings.tools.sass, vars).await
}

async fn minify_stylesheets(ctx: Context) -> Result<()> {
    let settings = ctx.settings();
    let output = path_var(&settings.client.stylesheets.output_dir);
    let vars = ToolVars::from([("input", output.clone()), ("output", output)]);
    run_tool(&ctx, "css-minifier", &settings.tools.css_minifier, vars).await
}

async fn generate_node_modules(ctx: Context) -> Result<()> {
    let client = &ctx.settings().client;
    tools::provide(&ctx, &client.dist_dir, &client.javascript.node_modules).await
}

async fn compile_typescript(ctx: Context) -> Result<()> {
    let settings = ctx.settings();
    let javascript = &settings.client.javascript;
    ctx.dirs().ensure(ctx.path(&settings.client.dist_dir)).await?;

    let vars = ToolVars::from([
        ("tsconfig", path_var(&javascript.tsconfig)),
        ("output", path_var(&javascript.output_dir)),
    ]);
    run_tool(&ctx, "typescript", &settings.tools.typescript, vars).await
}

async fn transpile_javascript(ctx: Context) -> Result<()> {
    let settings = ctx.settings();
    let webpack = &settings.client.javascript.webpack;
    let bundle_dir = webpack
        .bundle_file
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    let bundle_name = webpack
        .bundle_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    ctx.dirs().ensure(ctx.path(&bundle_dir)).await?;

    let vars = ToolVars::from([
        ("mode", settings.environment.to_string()),
        ("entry", path_var(&webpack.entry_file)),
        ("output", path_var(&bundle_dir)),
        ("bundle", bundle_name),
    ]);
    run_tool(&ctx, "bundler", &settings.tools.bundler, vars).await
}

async fn clean_untranspiled_javascript(ctx: Context) -> Result<()> {
    let javascript = &ctx.settings().client.javascript;
    let mut patterns = javascript.files_to_clean.clone();
    patterns.push(format!("!{}", path_var(&javascript.webpack.bundle_file)));
    files::clean(ctx.root().to_path_buf(), patterns).await?;
    Ok(())
}

async fn minify_javascript(ctx: Context) -> Result<()> {
    let settings = ctx.settings();
    let javascript = &settings.client.javascript;
    ctx.dirs().ensure(ctx.path(&settings.client.dist_dir)).await?;

    let input = if javascript.webpack.enabled {
        &javascript.webpack.bundle_file
    } else {
        &javascript.webpack.entry_file
    };
    let flag = |enabled: bool, name: &str| {
        if enabled {
            name.to_string()
        } else {
            String::new()
        }
    };
    let vars = ToolVars::from([
        ("input", path_var(input)),
        ("compress", flag(javascript.enable_minification, "--compress")),
        ("mangle", flag(javascript.enable_uglification, "--mangle")),
    ]);
    run_tool(&ctx, "minifier", &settings.tools.minifier, vars).await
}

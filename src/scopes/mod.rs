//! Task scopes.
//!
//! Each scope module builds its own [`TaskRegistry`] from the settings; the
//! [`crate::invoker::Invoker`] merges them.

pub mod client;
pub mod server;

use std::path::Path;

use crate::config::{Settings, ToolCommand};
use crate::core::completion::{self, Leaf};
use crate::core::{Context, TaskRegistry};
use crate::files;
use crate::tools::{ExternalTool, ToolVars};
use crate::{glog_debug, Result};

/// Top-level names that fan out to every scope defining them.
pub const SHARED_TASKS: [&str; 4] = ["default", "clean", "build", "rebuild"];

/// Registries for every built-in scope.
pub fn registries(settings: &Settings) -> Vec<TaskRegistry> {
    vec![client::registry(settings), server::registry(settings)]
}

/// Leaf that deletes the patterns `select` picks out of the settings.
fn clean_leaf(select: fn(&Settings) -> Vec<String>) -> Leaf {
    completion::future(move |ctx: Context| async move {
        let patterns = select(ctx.settings());
        let summary = files::clean(ctx.root().to_path_buf(), patterns).await?;
        glog_debug!(
            "{}: removed {} path(s)",
            ctx.task_name(),
            summary.removed.len()
        );
        Ok(())
    })
}

async fn run_tool(ctx: &Context, name: &str, command: &ToolCommand, vars: ToolVars) -> Result<()> {
    ExternalTool::new(name, command)
        .with_timeout(ctx.settings().tool_timeout())
        .run(ctx.root(), &vars)
        .await?;
    Ok(())
}

fn path_var(path: &Path) -> String {
    path.display().to_string()
}

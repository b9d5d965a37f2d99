//! External command execution for opaque build tools.
//!
//! Stylesheet compilers, transpilers, bundlers, minifiers and package
//! installers are all launched the same way: a configured program plus an
//! argument template, run in the project root, with success meaning exit
//! code zero.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;

use crate::config::ToolCommand;
use crate::{glog_debug, glog_trace, Error, Result};

/// Placeholder values substituted into argument templates.
pub type ToolVars = BTreeMap<&'static str, String>;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder regex is valid"))
}

/// Captured output of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A configured external tool.
///
/// # Example
///
/// ```ignore
/// use gantry::tools::{ExternalTool, ToolVars};
///
/// let tool = ExternalTool::new("sass", &settings.tools.sass)
///     .with_timeout(settings.tool_timeout());
/// let vars = ToolVars::from([("input", "client/styles".into()), ("output", "dist/css".into())]);
/// tool.run(Path::new("."), &vars).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ExternalTool {
    /// Name used in logs and errors.
    name: String,
    /// Program and argument template.
    command: ToolCommand,
    /// Timeout for one run.
    timeout: Duration,
}

impl ExternalTool {
    pub fn new(name: &str, command: &ToolCommand) -> Self {
        Self {
            name: name.to_string(),
            command: command.clone(),
            timeout: Duration::from_secs(600),
        }
    }

    /// Set a custom timeout for execution.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Substitute `{placeholder}` tokens in the argument template.
    ///
    /// An argument that is nothing but a placeholder expanding to an empty
    /// string is dropped, so optional flags can be switched off. Unknown
    /// placeholders are a configuration error.
    pub fn render_args(&self, vars: &ToolVars) -> Result<Vec<String>> {
        let mut args = Vec::with_capacity(self.command.args.len());
        for template in &self.command.args {
            let mut unknown = None;
            let rendered = placeholder().replace_all(template, |caps: &regex::Captures| {
                match vars.get(&caps[1]) {
                    Some(value) => value.clone(),
                    None => {
                        unknown.get_or_insert_with(|| caps[1].to_string());
                        String::new()
                    }
                }
            });
            if let Some(name) = unknown {
                return Err(Error::Config(format!(
                    "tool '{}' uses unknown placeholder '{{{}}}'",
                    self.name, name
                )));
            }
            let whole_placeholder = placeholder()
                .find(template)
                .map(|m| m.start() == 0 && m.end() == template.len())
                .unwrap_or(false);
            if rendered.is_empty() && whole_placeholder {
                continue;
            }
            args.push(rendered.into_owned());
        }
        Ok(args)
    }

    /// Locate the program on `PATH`, resolving relative paths against `cwd`.
    pub fn resolve(&self, cwd: &Path) -> Result<PathBuf> {
        which::which_in(&self.command.program, std::env::var_os("PATH"), cwd).map_err(|_| {
            Error::ExternalTool {
                tool: self.name.clone(),
                message: format!("'{}' was not found on PATH", self.command.program),
            }
        })
    }

    /// Run the tool in `cwd`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The program cannot be found or spawned
    /// - The run exceeds the timeout
    /// - The process exits with a non-zero status
    pub async fn run(&self, cwd: &Path, vars: &ToolVars) -> Result<ToolOutput> {
        let binary = self.resolve(cwd)?;
        let args = self.render_args(vars)?;
        glog_debug!("{}: {} {}", self.name, binary.display(), args.join(" "));

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&binary)
                .args(&args)
                .current_dir(cwd)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| Error::Timeout(self.timeout))?
        .map_err(|e| Error::ExternalTool {
            tool: self.name.clone(),
            message: format!("failed to start: {}", e),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        glog_trace!("{} stdout: {}", self.name, stdout.trim());

        if !output.status.success() {
            let message = if stderr.trim().is_empty() {
                match output.status.code() {
                    Some(code) => format!("exited with code {}", code),
                    None => "terminated by signal".to_string(),
                }
            } else {
                stderr.trim().to_string()
            };
            return Err(Error::ExternalTool {
                tool: self.name.clone(),
                message,
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

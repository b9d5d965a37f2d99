//! Dependency directory provisioning.
//!
//! Production builds install dependencies fresh into the distribution
//! directory; development builds symlink the scope's own dependency
//! directory into place.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::{Environment, NodeModules};
use crate::core::Context;
use crate::tools::command::{ExternalTool, ToolVars};
use crate::util::blocking;
use crate::{glog_debug, glog_warn, Error, Result};

/// Make the dependency directory available for a scope whose output lives in
/// `dist_dir`.
pub async fn provide(ctx: &Context, dist_dir: &Path, modules: &NodeModules) -> Result<()> {
    let dist = ctx.path(dist_dir);
    ctx.dirs().ensure(&dist).await?;

    match ctx.settings().environment {
        Environment::Production => {
            let settings = ctx.settings();
            let tool = ExternalTool::new("npm", &settings.tools.npm)
                .with_timeout(settings.tool_timeout());
            let vars = ToolVars::from([("prefix", dist_dir.display().to_string())]);
            tool.run(ctx.root(), &vars).await?;
            Ok(())
        }
        Environment::Development => {
            let source = normalized(&ctx.path(&modules.source_dir));
            let link = normalized(&ctx.path(&modules.output_dir));
            blocking(move || link_directory(&source, &link)).await
        }
    }
}

/// Point `link` at `source`.
///
/// An existing symlink is replaced unless it already points at `source`. An
/// existing real directory is left alone.
pub fn link_directory(source: &Path, link: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(Error::Read {
            path: source.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                "dependency directory does not exist",
            ),
        });
    }
    let target = std::path::absolute(source).map_err(|e| Error::Read {
        path: source.to_path_buf(),
        source: e,
    })?;

    if let Ok(meta) = std::fs::symlink_metadata(link) {
        if !meta.file_type().is_symlink() {
            glog_warn!(
                "'{}' already exists and is not a symlink; leaving it in place",
                link.display()
            );
            return Ok(());
        }
        if std::fs::read_link(link).ok().as_deref() == Some(target.as_path()) {
            glog_debug!("{} already links to {}", link.display(), target.display());
            return Ok(());
        }
        remove_link(link).map_err(|source| Error::Remove {
            path: link.to_path_buf(),
            source,
        })?;
    }

    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    glog_debug!("Linking {} -> {}", link.display(), target.display());
    symlink_dir(&target, link).map_err(|source| Error::Write {
        path: link.to_path_buf(),
        source,
    })
}

/// Drop trailing separators so the path names the link itself.
fn normalized(path: &Path) -> PathBuf {
    path.components().collect()
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(unix)]
fn remove_link(link: &Path) -> io::Result<()> {
    std::fs::remove_file(link)
}

#[cfg(windows)]
fn remove_link(link: &Path) -> io::Result<()> {
    std::fs::remove_dir(link)
}

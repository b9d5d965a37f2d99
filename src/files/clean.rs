//! Deletion of build outputs described by glob lists.
//!
//! Patterns are relative to a project root. A leading `!` turns a pattern
//! into an exclusion, and a trailing `/` names the directory itself. Nothing
//! that matches an exclusion is deleted, and neither is any directory that
//! contains such a path.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::util::blocking;
use crate::{glog_debug, glog_trace, Error, Result};

/// What a clean pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanSummary {
    /// Removed paths, relative to the root, in deletion order.
    pub removed: Vec<PathBuf>,
}

/// A compiled set of include and exclude patterns.
#[derive(Debug, Clone)]
pub struct CleanSet {
    include: GlobSet,
    exclude: GlobSet,
    bases: Vec<PathBuf>,
}

impl CleanSet {
    /// Compile `patterns`. An invalid glob is a configuration error.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();
        let mut bases = Vec::new();

        for raw in patterns {
            let raw = raw.as_ref().trim();
            let (negated, pattern) = match raw.strip_prefix('!') {
                Some(rest) => (true, normalize(rest)),
                None => (false, normalize(raw)),
            };
            if pattern.is_empty() {
                continue;
            }

            if negated {
                exclude.add(compile(&pattern)?);
                // `dir/**` also shields `dir` itself.
                if let Some(prefix) = pattern.strip_suffix("/**") {
                    exclude.add(compile(prefix)?);
                }
            } else {
                include.add(compile(&pattern)?);
                bases.push(literal_prefix(&pattern));
            }
        }

        Ok(Self {
            include: include.build().map_err(|e| Error::Config(e.to_string()))?,
            exclude: exclude.build().map_err(|e| Error::Config(e.to_string()))?,
            bases,
        })
    }

    /// Whether `relative` would be deleted, ignoring directory protection.
    pub fn matches(&self, relative: &Path) -> bool {
        let key = slash_path(relative);
        self.include.is_match(&key) && !self.exclude.is_match(&key)
    }

    /// Delete every matching path under `root`, deepest first.
    pub fn clean(&self, root: &Path) -> Result<CleanSummary> {
        let mut entries = BTreeSet::new();
        for base in &self.bases {
            collect(root, base, &mut entries)?;
        }

        let mut protected: HashSet<PathBuf> = HashSet::new();
        for entry in &entries {
            if self.exclude.is_match(slash_path(entry)) {
                for ancestor in entry.ancestors() {
                    if ancestor.as_os_str().is_empty() {
                        break;
                    }
                    protected.insert(ancestor.to_path_buf());
                }
            }
        }

        let mut targets: Vec<&PathBuf> = entries
            .iter()
            .filter(|entry| !protected.contains(*entry))
            .filter(|entry| self.include.is_match(slash_path(entry)))
            .collect();
        targets.sort_by_key(|entry| Reverse(entry.components().count()));

        let mut summary = CleanSummary::default();
        for relative in targets {
            if remove_entry(&root.join(relative))? {
                summary.removed.push(relative.clone());
            }
        }

        glog_debug!(
            "CleanSet: removed {} path(s) under {}",
            summary.removed.len(),
            root.display()
        );
        Ok(summary)
    }
}

/// Delete everything `patterns` match under `root`.
pub async fn clean(root: PathBuf, patterns: Vec<String>) -> Result<CleanSummary> {
    blocking(move || CleanSet::new(&patterns)?.clean(&root)).await
}

/// Delete each of `paths` as a literal path, never as a pattern.
///
/// Paths that do not exist are skipped. Directories are removed with their
/// contents and symlinks are removed without touching their targets.
pub async fn remove_paths(paths: Vec<PathBuf>) -> Result<CleanSummary> {
    blocking(move || {
        let mut summary = CleanSummary::default();
        for path in paths {
            if remove_entry(&path)? {
                summary.removed.push(path);
            }
        }
        Ok(summary)
    })
    .await
}

/// Remove one file, symlink or directory tree. `Ok(false)` if it was already gone.
fn remove_entry(path: &Path) -> Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(Error::Remove {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        remove_link_or_file(path)
    };
    match removed {
        Ok(()) => {
            glog_trace!("Removed {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(Error::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn compile(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::Config(format!("invalid clean pattern '{}': {}", pattern, e)))
}

fn normalize(pattern: &str) -> String {
    let trimmed = pattern.trim_start_matches("./");
    trimmed.trim_end_matches('/').to_string()
}

/// Leading path components that contain no glob syntax.
fn literal_prefix(pattern: &str) -> PathBuf {
    pattern
        .split('/')
        .take_while(|part| !part.contains(['*', '?', '[', '{']))
        .collect()
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Record `base` and, if it is a real directory, everything beneath it.
/// Symlinks are recorded but never followed.
fn collect(root: &Path, base: &Path, entries: &mut BTreeSet<PathBuf>) -> Result<()> {
    let path = root.join(base);
    let meta = match fs::symlink_metadata(&path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => return Err(Error::Read { path, source }),
    };
    if !base.as_os_str().is_empty() {
        entries.insert(base.to_path_buf());
    }
    if !meta.is_dir() {
        return Ok(());
    }

    // Entries may vanish under a concurrent clean of an overlapping tree.
    let read_dir = match fs::read_dir(&path) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => return Err(Error::Read { path, source }),
    };
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(source) => {
                return Err(Error::Read {
                    path: path.clone(),
                    source,
                })
            }
        };
        collect(root, &base.join(entry.file_name()), entries)?;
    }
    Ok(())
}

#[cfg(windows)]
fn remove_link_or_file(path: &Path) -> io::Result<()> {
    // Directory symlinks on Windows need remove_dir.
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(not(windows))]
fn remove_link_or_file(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

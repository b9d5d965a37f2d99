//! Concurrent multi-file copy with partial-failure tolerance.

use std::path::{Path, PathBuf};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};

use crate::{glog_debug, glog_trace, glog_warn, Error, Result};

/// One source file to copy to one destination file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CopyMapping {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl CopyMapping {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Resolve both paths against `root`.
    pub fn rooted(&self, root: &Path) -> Self {
        Self::new(root.join(&self.source), root.join(&self.destination))
    }
}

/// What a copy set did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopySummary {
    /// Mappings whose source was copied.
    pub copied: Vec<CopyMapping>,
    /// Mappings skipped because the source does not exist.
    pub missing: Vec<CopyMapping>,
    /// Total bytes written.
    pub bytes: u64,
}

enum Outcome {
    Copied(u64),
    Missing,
}

/// Copy every mapping concurrently.
///
/// A missing source is logged and counted, never an error. The set resolves
/// only after every mapping has settled; if any read or write failed, the
/// first failure to settle is returned.
pub async fn copy_files<I>(mappings: I) -> Result<CopySummary>
where
    I: IntoIterator<Item = CopyMapping>,
{
    let mut pending: FuturesUnordered<_> = mappings
        .into_iter()
        .map(|mapping| async move {
            let outcome = copy_one(&mapping).await;
            (mapping, outcome)
        })
        .collect();

    let mut summary = CopySummary::default();
    let mut first_error = None;

    while let Some((mapping, outcome)) = pending.next().await {
        match outcome {
            Ok(Outcome::Copied(bytes)) => {
                summary.bytes += bytes;
                summary.copied.push(mapping);
            }
            Ok(Outcome::Missing) => summary.missing.push(mapping),
            Err(e) => match first_error {
                None => first_error = Some(e),
                Some(_) => glog_debug!("copy_files: additional failure: {}", e),
            },
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}

async fn copy_one(mapping: &CopyMapping) -> Result<Outcome> {
    let source = &mapping.source;
    let destination = &mapping.destination;

    // Unreadable metadata counts as absent, same as a missing file.
    if !tokio::fs::try_exists(source).await.unwrap_or(false) {
        let expected = std::path::absolute(source).unwrap_or_else(|_| source.clone());
        glog_warn!(
            "Could not find file '{}' to copy to '{}' (expected file to be at path: '{}').",
            source.display(),
            destination.display(),
            expected.display()
        );
        return Ok(Outcome::Missing);
    }

    let data = tokio::fs::read(source).await.map_err(|e| Error::Read {
        path: source.clone(),
        source: e,
    })?;
    tokio::fs::write(destination, &data)
        .await
        .map_err(|e| Error::Write {
            path: destination.clone(),
            source: e,
        })?;

    glog_trace!(
        "Copied '{}' -> '{}' ({} bytes)",
        source.display(),
        destination.display(),
        data.len()
    );
    Ok(Outcome::Copied(data.len() as u64))
}

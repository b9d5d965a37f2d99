//! Idempotent, memoized directory creation.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::util::blocking;
use crate::{glog_debug, glog_trace, Error, Result};

/// Backing store the ensurer checks and creates directories in.
pub trait DirectoryStore: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing ancestors.
    fn create_all(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl DirectoryStore for FsStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_all(&self, path: &Path) -> io::Result<()> {
        match std::fs::create_dir_all(path) {
            // Lost a race with another creator.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            other => other,
        }
    }
}

/// Paths known to exist as directories.
///
/// A path is only recorded after its existence check or creation has
/// actually completed.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    verified: RwLock<HashMap<PathBuf, bool>>,
}

impl DirectoryCache {
    pub fn is_verified(&self, path: &Path) -> bool {
        let verified = match self.verified.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        verified.get(path).copied().unwrap_or(false)
    }

    fn mark_verified(&self, path: PathBuf) {
        let mut verified = match self.verified.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        verified.insert(path, true);
    }

    pub fn len(&self) -> usize {
        match self.verified.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Creates directories at most once per process.
///
/// Clones share the same cache. No lock is held across the check-then-create
/// sequence, so concurrent callers for one path may both reach the store;
/// the store treats "already exists" as success.
#[derive(Clone)]
pub struct DirectoryEnsurer {
    cache: Arc<DirectoryCache>,
    store: Arc<dyn DirectoryStore>,
}

impl DirectoryEnsurer {
    /// Ensurer over the real filesystem with an empty cache.
    pub fn new() -> Self {
        Self::with_store(Arc::new(FsStore))
    }

    pub fn with_store(store: Arc<dyn DirectoryStore>) -> Self {
        Self {
            cache: Arc::new(DirectoryCache::default()),
            store,
        }
    }

    pub fn cache(&self) -> &DirectoryCache {
        &self.cache
    }

    /// Make sure `path` exists as a directory.
    pub async fn ensure(&self, path: impl AsRef<Path>) -> Result<()> {
        let key = cache_key(path.as_ref());
        if self.cache.is_verified(&key) {
            glog_trace!("DirectoryEnsurer: cache hit {}", key.display());
            return Ok(());
        }
        let ensurer = self.clone();
        blocking(move || ensurer.ensure_uncached(key)).await
    }

    /// Blocking variant of [`DirectoryEnsurer::ensure`].
    pub fn ensure_blocking(&self, path: impl AsRef<Path>) -> Result<()> {
        let key = cache_key(path.as_ref());
        if self.cache.is_verified(&key) {
            return Ok(());
        }
        self.ensure_uncached(key)
    }

    fn ensure_uncached(&self, path: PathBuf) -> Result<()> {
        if self.store.exists(&path) {
            glog_trace!("DirectoryEnsurer: {} already exists", path.display());
            self.cache.mark_verified(path);
            return Ok(());
        }

        glog_debug!("DirectoryEnsurer: creating {}", path.display());
        self.store
            .create_all(&path)
            .map_err(|source| Error::CreateDir {
                path: path.clone(),
                source,
            })?;
        self.cache.mark_verified(path);
        Ok(())
    }
}

impl Default for DirectoryEnsurer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DirectoryEnsurer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryEnsurer")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

fn cache_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

//! Filesystem primitives used by leaf tasks.

mod clean;
mod copy;
mod directory;

pub use clean::{clean, remove_paths, CleanSet, CleanSummary};
pub use copy::{copy_files, CopyMapping, CopySummary};
pub use directory::{DirectoryCache, DirectoryEnsurer, DirectoryStore, FsStore};

//! Worker log discovery.
//!
//! Walks a directory tree for files named with the runner's worker log
//! prefix and reports each one only once per agent lifetime.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use super::error::WatcherError;

/// File name prefix the runner uses for worker logs.
pub const DEFAULT_FILE_PREFIX: &str = "Worker_";

/// Memory of which paths have already been reported.
///
/// Implementations only ever grow.
pub trait SeenFiles: Send {
    /// Check whether `path` was already recorded.
    fn contains(&self, path: &Path) -> bool;

    /// Record `path`. Returns `true` if it was not present before.
    fn insert(&mut self, path: PathBuf) -> bool;

    /// Number of recorded paths.
    fn len(&self) -> usize;

    /// Whether nothing has been recorded yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory, insertion-ordered [`SeenFiles`] set scoped to the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySeenFiles {
    paths: IndexSet<PathBuf>,
}

impl MemorySeenFiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate recorded paths in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

impl SeenFiles for MemorySeenFiles {
    fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    fn insert(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}

/// Finds worker log files that have not been reported yet.
#[derive(Debug)]
pub struct FileDiscovery<S = MemorySeenFiles> {
    prefix: String,
    seen: S,
}

impl FileDiscovery<MemorySeenFiles> {
    /// Create a discovery with an empty in-memory seen set.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_seen(prefix, MemorySeenFiles::new())
    }
}

impl<S: SeenFiles> FileDiscovery<S> {
    /// Create a discovery backed by an existing seen set.
    #[must_use]
    pub fn with_seen(prefix: impl Into<String>, seen: S) -> Self {
        Self {
            prefix: prefix.into(),
            seen,
        }
    }

    /// Get the file name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Get the seen set.
    #[must_use]
    pub fn seen(&self) -> &S {
        &self.seen
    }

    /// Check whether a file name follows the worker log convention.
    #[must_use]
    pub fn is_candidate(&self, file_name: &OsStr) -> bool {
        is_candidate_name(&self.prefix, file_name)
    }

    /// Walk `root` and return candidates not reported by earlier calls.
    ///
    /// Paths are returned in walk order. Symlinks are not followed. New
    /// paths are recorded only after the walk completes, so a failed walk
    /// leaves the seen set untouched.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::Walk` if `root` or any directory below it
    /// cannot be read.
    pub fn discover(&mut self, root: &Path) -> Result<Vec<PathBuf>, WatcherError> {
        self.discover_with(root, &list_dir)
    }

    /// Same as [`discover`](Self::discover), with the walk run on tokio's
    /// blocking pool so large trees do not stall the runtime.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::Walk` if the walk fails or its task is lost.
    pub async fn discover_async(&mut self, root: &Path) -> Result<Vec<PathBuf>, WatcherError> {
        let walk_root = root.to_path_buf();
        let prefix = self.prefix.clone();
        let candidates =
            tokio::task::spawn_blocking(move || collect(&walk_root, &prefix, &list_dir))
                .await
                .map_err(|e| walk_error(root, std::io::Error::other(e)))??;

        Ok(self.commit(root, candidates))
    }

    fn discover_with<L>(&mut self, root: &Path, list: &L) -> Result<Vec<PathBuf>, WatcherError>
    where
        L: Fn(&Path) -> Result<Vec<Entry>, WatcherError>,
    {
        let candidates = collect(root, &self.prefix, list)?;
        Ok(self.commit(root, candidates))
    }

    /// Record candidates from a completed walk; returns the new ones.
    fn commit(&mut self, root: &Path, candidates: Vec<PathBuf>) -> Vec<PathBuf> {
        let new_files: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|path| self.seen.insert(path.clone()))
            .collect();

        tracing::debug!(
            root = %root.display(),
            new = new_files.len(),
            seen = self.seen.len(),
            "Discovered worker files"
        );

        new_files
    }
}

/// One directory entry as seen by the walk.
#[derive(Debug)]
struct Entry {
    path: PathBuf,
    is_dir: bool,
}

fn is_candidate_name(prefix: &str, file_name: &OsStr) -> bool {
    file_name.to_string_lossy().starts_with(prefix)
}

/// List `dir` without following symlinks.
fn list_dir(dir: &Path) -> Result<Vec<Entry>, WatcherError> {
    let entries = std::fs::read_dir(dir).map_err(|source| walk_error(dir, source))?;

    entries
        .map(|entry| {
            let entry = entry.map_err(|source| walk_error(dir, source))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|source| walk_error(&path, source))?;
            Ok(Entry {
                path,
                is_dir: file_type.is_dir(),
            })
        })
        .collect()
}

/// Collect candidates under `root` without touching any seen set.
fn collect<L>(root: &Path, prefix: &str, list: &L) -> Result<Vec<PathBuf>, WatcherError>
where
    L: Fn(&Path) -> Result<Vec<Entry>, WatcherError>,
{
    let metadata = std::fs::symlink_metadata(root).map_err(|source| walk_error(root, source))?;
    let mut candidates = Vec::new();

    if metadata.is_dir() {
        collect_dir(root, prefix, list, &mut candidates)?;
    } else if root
        .file_name()
        .is_some_and(|name| is_candidate_name(prefix, name))
    {
        candidates.push(root.to_path_buf());
    }

    Ok(candidates)
}

fn collect_dir<L>(
    dir: &Path,
    prefix: &str,
    list: &L,
    candidates: &mut Vec<PathBuf>,
) -> Result<(), WatcherError>
where
    L: Fn(&Path) -> Result<Vec<Entry>, WatcherError>,
{
    for entry in list(dir)? {
        if entry.is_dir {
            collect_dir(&entry.path, prefix, list, candidates)?;
        } else if entry
            .path
            .file_name()
            .is_some_and(|name| is_candidate_name(prefix, name))
        {
            candidates.push(entry.path);
        }
    }

    Ok(())
}

fn walk_error(path: &Path, source: std::io::Error) -> WatcherError {
    WatcherError::Walk {
        path: path.to_path_buf(),
        source,
    }
}

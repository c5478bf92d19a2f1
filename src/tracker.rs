//! Processed-token tracker
//!
//! Remembers which outcome tokens already had their history fetched. The
//! backing file is an append-only log with one token per line; a line is
//! written as soon as a token is marked, so an interrupted run only loses the
//! token that was in flight. The file is never rewritten during a run.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Persistent set of processed identifiers
#[derive(Debug)]
pub struct ProcessedItemTracker {
    path: PathBuf,
    ids: Mutex<HashSet<String>>,
}

impl ProcessedItemTracker {
    /// Open the tracker backed by `path`.
    ///
    /// Creates the parent directory if needed. A missing file yields an empty
    /// set; an unreadable file is logged and also yields an empty set.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!(dir = ?parent, error = %e, "Failed to create cache directory");
            }
        }

        let ids = load_ids(&path);
        tracing::info!(path = ?path, count = ids.len(), "Loaded processed token cache");

        Self {
            path,
            ids: Mutex::new(ids),
        }
    }

    /// Backing file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `id` has been marked processed
    pub fn is_processed(&self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() {
            return false;
        }
        self.ids().contains(id)
    }

    /// Mark `id` processed, appending it to the backing file if it is new.
    ///
    /// Returns `true` only when the id was not already present. A failed
    /// append is logged; the in-memory entry is kept either way.
    pub fn mark_processed(&self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() {
            return false;
        }

        let mut ids = self.ids();
        if !ids.insert(id.to_string()) {
            return false;
        }

        if let Err(e) = self.append(id) {
            tracing::warn!(path = ?self.path, id, error = %e, "Failed to persist processed token");
        }

        true
    }

    /// Number of processed ids
    pub fn count(&self) -> usize {
        self.ids().len()
    }

    /// Snapshot of all processed ids, sorted
    pub fn all_processed_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids().iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Forget everything and delete the backing file
    pub fn clear(&self) {
        let mut ids = self.ids();
        ids.clear();

        match fs::remove_file(&self.path) {
            Ok(()) => tracing::info!(path = ?self.path, "Cleared processed token cache"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Failed to delete processed token cache")
            }
        }
    }

    fn append(&self, id: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{id}")?;
        file.flush()
    }

    fn ids(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_ids(path: &Path) -> HashSet<String> {
    match fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Failed to read processed token cache");
            HashSet::new()
        }
    }
}

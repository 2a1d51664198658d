//! Startup reconciliation of the registry against the filesystem.
//!
//! Loads the snapshot into the tracked set, then makes sure every tracked path
//! exists as a directory, recreating the ones that went missing. A failing
//! path is logged and skipped; the remaining paths are still checked.

use crate::error::BurrowError;
use crate::registry::FolderRegistry;
use std::fs;
use std::sync::PoisonError;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A tracked path that could not be restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileFailure {
    pub path: String,
    pub error: String,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Number of tracked paths inspected on disk.
    pub checked: usize,
    /// Paths that were missing and have been recreated.
    pub recreated: Vec<String>,
    /// Paths that were missing and could not be recreated.
    pub failed: Vec<ReconcileFailure>,
    /// Snapshot entries dropped because they point outside the sandbox.
    pub rejected: Vec<String>,
    pub elapsed: Duration,
}

impl ReconcileReport {
    /// True when every tracked path is now present on disk.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.rejected.is_empty()
    }
}

impl FolderRegistry {
    /// Load the snapshot and recreate tracked folders missing from disk.
    ///
    /// Snapshot entries are merged into the current set. The registry lock is
    /// held for the whole pass.
    pub fn reconcile(&self) -> ReconcileReport {
        let start = Instant::now();
        let mut report = ReconcileReport::default();
        let mut tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);

        match self.store.load() {
            Ok(Some(keys)) => {
                debug!(
                    "Loaded {} entries from {}",
                    keys.len(),
                    self.store.path().display()
                );
                tracked.extend(keys);
            }
            Ok(None) => debug!(
                "No snapshot at {}, nothing to restore",
                self.store.path().display()
            ),
            Err(e) => error!("Failed to load created folders snapshot: {}", e),
        }

        info!("Running checks...");

        let mut entries: Vec<String> = tracked.iter().cloned().collect();
        entries.sort();
        let mut rewritten = false;

        for entry in entries {
            let (key, full) = match self.paths.resolve_checked(&entry) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("Dropping invalid snapshot entry {:?}: {}", entry, e);
                    tracked.remove(&entry);
                    report.rejected.push(entry);
                    rewritten = true;
                    continue;
                }
            };

            // Snapshots written by hand may spell a path differently.
            if key != entry {
                tracked.remove(&entry);
                rewritten = true;
                if !tracked.insert(key.clone()) {
                    continue;
                }
            }

            report.checked += 1;
            if full.is_dir() {
                continue;
            }

            warn!("Folder missing, recreating: {}", key);
            match fs::create_dir_all(&full) {
                Ok(()) => {
                    info!("Folder recreated: {}", key);
                    report.recreated.push(key);
                }
                Err(e) => {
                    // Something other than a directory occupies the path.
                    let err = if fs::symlink_metadata(&full).is_ok() {
                        BurrowError::NotADirectory(full)
                    } else {
                        BurrowError::io_with_path(e, full)
                    };
                    error!("Failed to recreate folder {}: {}", key, err);
                    report.failed.push(ReconcileFailure {
                        path: key,
                        error: err.to_string(),
                    });
                }
            }
        }

        if rewritten {
            self.persist(&tracked);
        }

        report.elapsed = start.elapsed();
        info!("Checks complete in {:?}", report.elapsed);
        report
    }
}

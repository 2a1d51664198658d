//! Registry of managed folders and its mutation API.
//!
//! [`FolderRegistry`] owns the tracked-path set, the layout of its sandbox and
//! the snapshot store. Every mutation holds the registry lock for the whole
//! check-then-act sequence (membership check, filesystem change, set update,
//! snapshot write), so concurrent calls on the same path serialize cleanly.

use crate::config::RegistryConfig;
use crate::error::{BurrowError, Result};
use crate::paths::SandboxPaths;
use crate::snapshot::SnapshotStore;
use std::collections::HashSet;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// What [`FolderRegistry::try_create_folder`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The path was already tracked; nothing was touched.
    AlreadyTracked,
    /// A directory already existed on disk and is now tracked.
    Adopted,
    /// The directory was created and is now tracked.
    Created,
}

/// What [`FolderRegistry::try_remove_folder`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The path was deleted from disk and untracked.
    Removed,
    /// Nothing existed on disk; the path is untracked.
    AlreadyAbsent,
}

/// Self-healing registry of folders managed under one sandbox root.
///
/// # Example
///
/// ```rust,no_run
/// use burrow_core::FolderRegistry;
///
/// let registry = FolderRegistry::builder("./.Nutdat").keep_backup(true).open();
/// registry.create_folder("media");
/// registry.create_folder("media/file");
/// registry.remove_folder("media");
/// registry.shutdown();
/// ```
#[derive(Debug)]
pub struct FolderRegistry {
    pub(crate) paths: SandboxPaths,
    pub(crate) store: SnapshotStore,
    pub(crate) tracked: Mutex<HashSet<String>>,
    /// Set while the in-memory set differs from the last snapshot written.
    unsaved: AtomicBool,
}

impl FolderRegistry {
    /// Create an empty registry. Nothing is read from disk until
    /// [`reconcile`](Self::reconcile) runs.
    pub fn new(config: RegistryConfig) -> Self {
        let paths = SandboxPaths::new(&config);
        let store = SnapshotStore::new(&paths, config.keep_backup);
        Self {
            paths,
            store,
            tracked: Mutex::new(HashSet::new()),
            unsaved: AtomicBool::new(false),
        }
    }

    /// Open the registry at `root` with default settings, restoring any
    /// folders recorded in its snapshot.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        RegistryBuilder::new(root).open()
    }

    /// Start configuring a registry rooted at `root`.
    pub fn builder(root: impl Into<PathBuf>) -> RegistryBuilder {
        RegistryBuilder::new(root)
    }

    /// Sandbox layout of this registry.
    pub fn paths(&self) -> &SandboxPaths {
        &self.paths
    }

    /// Location of the snapshot file.
    pub fn snapshot_path(&self) -> &Path {
        self.store.path()
    }

    // ========================================
    // Mutations
    // ========================================

    /// Create (or adopt) a managed folder. Failures are logged, never returned.
    pub fn create_folder(&self, path: &str) {
        if let Err(e) = self.try_create_folder(path) {
            error!("Failed to create folder {}: {}", path, e);
        }
    }

    /// Delete a managed folder and forget it. Failures are logged, never
    /// returned.
    pub fn remove_folder(&self, path: &str) {
        if let Err(e) = self.try_remove_folder(path) {
            error!("Failed to remove folder {}: {}", path, e);
        }
    }

    /// Create (or adopt) a managed folder and report what happened.
    ///
    /// An already-tracked path is a no-op without any I/O. An existing,
    /// untracked directory is registered as-is. On a failed create the path
    /// stays untracked and no snapshot is written.
    pub fn try_create_folder(&self, path: &str) -> Result<CreateOutcome> {
        let (key, full) = self.paths.resolve_checked(path)?;
        let mut tracked = self.lock_tracked()?;

        if tracked.contains(&key) {
            return Ok(CreateOutcome::AlreadyTracked);
        }

        let outcome = if full.is_dir() {
            info!(
                "Folder already exists on disk but not registered, registering now: {}",
                key
            );
            CreateOutcome::Adopted
        } else {
            fs::create_dir_all(&full).map_err(|e| BurrowError::Io {
                message: format!("Failed to create folder {}", full.display()),
                path: Some(full.clone()),
                source: Some(e),
            })?;
            debug!("Created folder: {}", key);
            CreateOutcome::Created
        };

        tracked.insert(key);
        self.persist(&tracked);
        Ok(outcome)
    }

    /// Delete a managed folder recursively and untrack it.
    ///
    /// On a failed delete the registry is left unchanged. Tracked paths
    /// nested below `path` stay tracked.
    pub fn try_remove_folder(&self, path: &str) -> Result<RemoveOutcome> {
        let (key, full) = self.paths.resolve_checked(path)?;
        let mut tracked = self.lock_tracked()?;

        let outcome = match remove_path(&full) {
            Ok(true) => RemoveOutcome::Removed,
            Ok(false) => RemoveOutcome::AlreadyAbsent,
            Err(e) => return Err(BurrowError::io_with_path(e, full)),
        };

        tracked.remove(&key);
        let prefix = format!("{}/", key);
        let nested = tracked.iter().filter(|p| p.starts_with(&prefix)).count();
        if nested > 0 {
            warn!(
                "{} tracked folder(s) below {} stay registered and will be restored on the next check",
                nested, key
            );
        }

        self.persist(&tracked);
        info!("Folder removed: {}", key);
        Ok(outcome)
    }

    // ========================================
    // Queries
    // ========================================

    /// Whether `path` (in any equivalent spelling) is tracked.
    pub fn is_tracked(&self, path: &str) -> bool {
        match self.paths.normalize(path) {
            Ok(key) => self.read_tracked().contains(&key),
            Err(_) => false,
        }
    }

    /// All tracked paths, sorted.
    pub fn tracked_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.read_tracked().iter().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.read_tracked().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_tracked().is_empty()
    }

    /// True when the last snapshot write failed and memory is ahead of disk.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved.load(Ordering::SeqCst)
    }

    // ========================================
    // Lifecycle
    // ========================================

    /// Drop the registry, retrying the snapshot write if the last one failed.
    ///
    /// A registry whose snapshot is already current writes nothing, so an
    /// unreadable snapshot is never replaced without a mutation.
    pub fn shutdown(self) {
        let tracked = self.read_tracked();
        if self.has_unsaved_changes() {
            self.persist(&tracked);
        }
        info!(
            "Registry at {} shut down with {} tracked folder(s)",
            self.paths.root().display(),
            tracked.len()
        );
    }

    // ========================================
    // Internals
    // ========================================

    fn lock_tracked(&self) -> Result<MutexGuard<'_, HashSet<String>>> {
        self.tracked.lock().map_err(|_| BurrowError::LockPoisoned)
    }

    /// Read access that tolerates a poisoned lock; a panic cannot leave the
    /// set half-updated.
    fn read_tracked(&self) -> MutexGuard<'_, HashSet<String>> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the snapshot, logging instead of returning failures.
    pub(crate) fn persist(&self, tracked: &HashSet<String>) {
        match self.store.save(tracked) {
            Ok(()) => self.unsaved.store(false, Ordering::SeqCst),
            Err(e) => {
                self.unsaved.store(true, Ordering::SeqCst);
                error!("Failed to save created folders snapshot: {}", e);
            }
        }
    }
}

/// Delete `path` whatever it is. Returns `false` when nothing was there.
///
/// Symlinks are removed as links, never followed.
fn remove_path(path: &Path) -> io::Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}

/// Builder for configuring a [`FolderRegistry`].
///
/// ```rust,no_run
/// use burrow_core::FolderRegistry;
///
/// let registry = FolderRegistry::builder("/srv/data")
///     .meta_dir_name(".registry")
///     .keep_backup(true)
///     .open();
/// ```
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    config: RegistryConfig,
}

impl RegistryBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            config: RegistryConfig::new(root),
        }
    }

    /// Name of the hidden metadata directory. Default: `.nutburrow`
    pub fn meta_dir_name(mut self, name: impl Into<String>) -> Self {
        self.config.meta_dir_name = name.into();
        self
    }

    /// Snapshot file name. Default: `created_folders.json`
    pub fn snapshot_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.snapshot_file_name = name.into();
        self
    }

    /// Keep a `.bak` copy of the previous snapshot. Default: `false`
    pub fn keep_backup(mut self, enable: bool) -> Self {
        self.config.keep_backup = enable;
        self
    }

    /// Build an empty registry without touching the disk.
    pub fn build(self) -> FolderRegistry {
        FolderRegistry::new(self.config)
    }

    /// Build the registry, load its snapshot and repair missing folders.
    pub fn open(self) -> FolderRegistry {
        let registry = self.build();
        registry.reconcile();
        registry
    }
}

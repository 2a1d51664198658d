//! Durable JSON snapshot of the tracked-path set.
//!
//! The snapshot is a JSON object whose keys are tracked paths and whose values
//! are empty objects:
//!
//! ```json
//! {
//!   "media": {},
//!   "media/file": {}
//! }
//! ```
//!
//! Saves are atomic:
//! 1. Serialize to a temp file next to the snapshot (PID+TID suffix)
//! 2. fsync the temp file
//! 3. Optionally copy the current snapshot to `.json.bak`, only if it parses
//! 4. Rename the temp file over the snapshot

use crate::config::PathsConfig;
use crate::error::{BurrowError, Result};
use crate::paths::SandboxPaths;
use serde::de::IgnoredAny;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use tracing::{debug, warn};

/// Value stored for every key; serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
struct Presence {}

/// Reads and writes the snapshot file of one sandbox.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    meta_dir: PathBuf,
    path: PathBuf,
    keep_backup: bool,
}

impl SnapshotStore {
    pub fn new(paths: &SandboxPaths, keep_backup: bool) -> Self {
        Self {
            meta_dir: paths.meta_dir(),
            path: paths.snapshot_path(),
            keep_backup,
        }
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the backup written before each save when backups are on.
    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension(PathsConfig::BACKUP_EXTENSION)
    }

    /// Load the tracked set from disk.
    ///
    /// Returns `None` when no snapshot exists yet. When the snapshot cannot be
    /// read or parsed and backups are enabled, the backup is tried before the
    /// original error is returned.
    pub fn load(&self) -> Result<Option<HashSet<String>>> {
        match read_snapshot(&self.path) {
            Ok(keys) => Ok(keys),
            Err(e) if self.keep_backup => {
                let backup = self.backup_path();
                match read_snapshot(&backup) {
                    Ok(Some(keys)) => {
                        warn!(
                            "Snapshot {} unreadable ({}), restored {} entries from {}",
                            self.path.display(),
                            e,
                            keys.len(),
                            backup.display()
                        );
                        Ok(Some(keys))
                    }
                    _ => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the snapshot with `keys`.
    pub fn save(&self, keys: &HashSet<String>) -> Result<()> {
        fs::create_dir_all(&self.meta_dir).map_err(|e| BurrowError::Io {
            message: format!("Failed to create metadata directory {}", self.meta_dir.display()),
            path: Some(self.meta_dir.clone()),
            source: Some(e),
        })?;

        // Sorted keys keep the file stable across saves of the same set.
        let ordered: BTreeMap<&str, Presence> =
            keys.iter().map(|k| (k.as_str(), Presence {})).collect();
        let serialized = serde_json::to_string_pretty(&ordered).map_err(|e| BurrowError::Json {
            message: format!("Failed to serialize snapshot: {}", e),
            source: Some(e),
        })?;

        let temp_path = sibling_with_suffix(
            &self.path,
            &format!(
                "{}.{}.{}",
                process::id(),
                thread_id(),
                PathsConfig::TEMP_EXTENSION
            ),
        );
        if let Err(e) = write_synced(&temp_path, serialized.as_bytes()) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        if self.keep_backup && self.path.exists() {
            let backup = self.backup_path();
            // A corrupt primary must never replace the last good backup.
            if let Err(e) = read_snapshot(&self.path) {
                warn!(
                    "Not backing up unreadable snapshot {}: {}",
                    self.path.display(),
                    e
                );
            } else if let Err(e) = fs::copy(&self.path, &backup) {
                warn!("Failed to create backup {}: {}", backup.display(), e);
            } else {
                debug!("Created backup: {}", backup.display());
            }
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            BurrowError::Io {
                message: format!(
                    "Failed to rename {} to {}",
                    temp_path.display(),
                    self.path.display()
                ),
                path: Some(self.path.clone()),
                source: Some(e),
            }
        })?;

        debug!("Wrote {} entries to {}", keys.len(), self.path.display());
        Ok(())
    }
}

/// Parse one snapshot file, ignoring the per-key values.
fn read_snapshot(path: &Path) -> Result<Option<HashSet<String>>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(BurrowError::Io {
                message: format!("Failed to read {}", path.display()),
                path: Some(path.to_path_buf()),
                source: Some(e),
            })
        }
    };

    let map: BTreeMap<String, IgnoredAny> =
        serde_json::from_str(&contents).map_err(|e| BurrowError::Json {
            message: format!("Failed to parse {}: {}", path.display(), e),
            source: Some(e),
        })?;

    Ok(Some(map.into_keys().collect()))
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| BurrowError::Io {
            message: format!("Failed to create temp file {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        })?;

    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| BurrowError::Io {
            message: format!("Failed to write temp file {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        })
}

/// Numeric identifier of the current thread for temp file names.
fn thread_id() -> u64 {
    let mut hasher = DefaultHasher::new();
    thread::current().id().hash(&mut hasher);
    hasher.finish()
}

/// `dir/name` -> `dir/name.{suffix}`
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

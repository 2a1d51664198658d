//! Centralized configuration for the folder registry.
//!
//! Holds the fixed layout names and the per-registry [`RegistryConfig`].

use std::path::PathBuf;

/// Fixed directory and file names of the sandbox layout.
pub struct PathsConfig;

impl PathsConfig {
    /// Sandbox root used when the caller does not choose one.
    pub const DEFAULT_ROOT: &'static str = "./.Nutdat";
    /// Hidden directory under the root holding registry metadata.
    pub const META_DIR_NAME: &'static str = ".nutburrow";
    pub const SNAPSHOT_FILE_NAME: &'static str = "created_folders.json";
    pub const BACKUP_EXTENSION: &'static str = "json.bak";
    pub const TEMP_EXTENSION: &'static str = "tmp";
}

/// Settings for one registry instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Base directory under which all managed folders live.
    pub root: PathBuf,
    /// Name of the hidden metadata directory inside `root`.
    pub meta_dir_name: String,
    /// File name of the snapshot inside the metadata directory.
    pub snapshot_file_name: String,
    /// Copy the previous snapshot to `*.json.bak` before each save and fall
    /// back to it when the primary snapshot is unreadable.
    pub keep_backup: bool,
}

impl RegistryConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            meta_dir_name: PathsConfig::META_DIR_NAME.to_string(),
            snapshot_file_name: PathsConfig::SNAPSHOT_FILE_NAME.to_string(),
            keep_backup: false,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(PathsConfig::DEFAULT_ROOT)
    }
}

//! Mapping of logical folder paths onto the sandbox root.
//!
//! A logical path is always relative to the sandbox root. [`SandboxPaths::resolve`]
//! is a plain join; [`SandboxPaths::normalize`] is the guard that every
//! filesystem mutation goes through, rejecting:
//! - Empty paths
//! - Absolute paths (`/etc`, `C:\`)
//! - Parent directory traversal (`../`)
//! - Paths inside the hidden metadata directory

use crate::config::RegistryConfig;
use crate::error::{BurrowError, Result};
use std::path::{Component, Path, PathBuf};

/// Resolved layout of one sandbox root.
#[derive(Debug, Clone)]
pub struct SandboxPaths {
    root: PathBuf,
    meta_dir_name: String,
    snapshot_file_name: String,
}

impl SandboxPaths {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            root: config.root.clone(),
            meta_dir_name: config.meta_dir_name.clone(),
            snapshot_file_name: config.snapshot_file_name.clone(),
        }
    }

    /// The sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{meta_dir}`
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(&self.meta_dir_name)
    }

    /// `{root}/{meta_dir}/{snapshot_file}`
    pub fn snapshot_path(&self) -> PathBuf {
        self.meta_dir().join(&self.snapshot_file_name)
    }

    /// Join a logical path onto the sandbox root without any validation.
    pub fn resolve(&self, logical: &str) -> PathBuf {
        self.root.join(logical)
    }

    /// Normalize a logical path into its tracked form.
    ///
    /// Components are joined with `/`; `.` segments and redundant separators
    /// are dropped, so `"./media//file/"` becomes `"media/file"`.
    pub fn normalize(&self, logical: &str) -> Result<String> {
        if logical.trim().is_empty() {
            return Err(BurrowError::InvalidPath {
                path: logical.to_string(),
                reason: "Empty path".to_string(),
            });
        }

        let mut components: Vec<&str> = Vec::new();
        for component in Path::new(logical).components() {
            match component {
                Component::Prefix(_) | Component::RootDir => {
                    return Err(BurrowError::InvalidPath {
                        path: logical.to_string(),
                        reason: "Absolute path not allowed".to_string(),
                    });
                }
                Component::ParentDir => {
                    return Err(BurrowError::PathEscapesRoot(logical.to_string()));
                }
                Component::CurDir => continue,
                Component::Normal(part) => {
                    // Input is &str, so every component is valid UTF-8.
                    let part = part.to_str().ok_or_else(|| BurrowError::InvalidPath {
                        path: logical.to_string(),
                        reason: "Invalid UTF-8 in path".to_string(),
                    })?;
                    components.push(part);
                }
            }
        }

        let Some(first) = components.first() else {
            return Err(BurrowError::InvalidPath {
                path: logical.to_string(),
                reason: "No valid components".to_string(),
            });
        };
        if *first == self.meta_dir_name {
            return Err(BurrowError::ReservedPath(logical.to_string()));
        }

        Ok(components.join("/"))
    }

    /// Normalize a logical path and resolve it under the root.
    pub fn resolve_checked(&self, logical: &str) -> Result<(String, PathBuf)> {
        let key = self.normalize(logical)?;
        let full = self.resolve(&key);
        Ok((key, full))
    }
}

//! Burrow Core - self-healing registry of managed folders.
//!
//! A [`FolderRegistry`] creates folders under a sandbox root, remembers which
//! folders it owns in a JSON snapshot stored in a hidden metadata directory,
//! and on startup recreates any managed folder that disappeared from disk.
//!
//! # Example
//!
//! ```rust,no_run
//! use burrow_core::FolderRegistry;
//!
//! // Loads `./.Nutdat/.nutburrow/created_folders.json` and repairs drift.
//! let registry = FolderRegistry::open("./.Nutdat");
//!
//! registry.create_folder("media");
//! registry.create_folder("media/file");
//! assert!(registry.is_tracked("media/file"));
//!
//! registry.remove_folder("media");
//! registry.shutdown();
//! ```

pub mod config;
pub mod error;
pub mod paths;
pub mod reconcile;
pub mod registry;
pub mod snapshot;

// Re-export commonly used types
pub use config::{PathsConfig, RegistryConfig};
pub use error::{BurrowError, Result};
pub use paths::SandboxPaths;
pub use reconcile::{ReconcileFailure, ReconcileReport};
pub use registry::{CreateOutcome, FolderRegistry, RegistryBuilder, RemoveOutcome};
pub use snapshot::SnapshotStore;

//! Integration tests for the FolderRegistry public interface.
//!
//! Each test runs against its own temporary sandbox root and checks the
//! registry, the filesystem and the persisted snapshot together.

use burrow_core::{CreateOutcome, FolderRegistry};
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn snapshot_keys(registry: &FolderRegistry) -> Vec<String> {
    let text = fs::read_to_string(registry.snapshot_path()).expect("snapshot missing");
    let map: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&text).expect("snapshot is not a JSON object");
    map.into_keys().collect()
}

fn sandbox() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

#[test]
fn test_create_is_idempotent() {
    let tmp = sandbox();
    let registry = FolderRegistry::open(tmp.path());

    registry.create_folder("p");
    fs::remove_file(registry.snapshot_path()).unwrap();
    fs::write(tmp.path().join("p/marker"), b"keep").unwrap();

    registry.create_folder("p");

    // No snapshot write and no directory recreation on the second call.
    assert!(!registry.snapshot_path().exists());
    assert!(tmp.path().join("p/marker").is_file());
    assert_eq!(registry.tracked_paths(), vec!["p"]);
}

#[test]
fn test_snapshot_round_trip() {
    let tmp = sandbox();
    {
        let registry = FolderRegistry::open(tmp.path());
        registry.create_folder("media");
        fs::write(tmp.path().join("media/track.ogg"), b"audio").unwrap();
    }

    let reopened = FolderRegistry::open(tmp.path());
    assert_eq!(reopened.tracked_paths(), vec!["media"]);
    // Existing directory was kept, not recreated.
    assert!(tmp.path().join("media/track.ogg").is_file());
}

#[test]
fn test_reconcile_self_heals_deleted_folder() {
    let tmp = sandbox();
    let registry = FolderRegistry::open(tmp.path());
    registry.create_folder("a");
    fs::remove_dir_all(tmp.path().join("a")).unwrap();

    let report = registry.reconcile();

    assert!(tmp.path().join("a").is_dir());
    assert!(registry.is_tracked("a"));
    assert_eq!(report.recreated, vec!["a".to_string()]);
}

#[test]
fn test_restart_self_heals_deleted_folder() {
    let tmp = sandbox();
    FolderRegistry::open(tmp.path()).create_folder("library/books");
    fs::remove_dir_all(tmp.path().join("library")).unwrap();

    let registry = FolderRegistry::open(tmp.path());
    assert!(tmp.path().join("library/books").is_dir());
    assert!(registry.is_tracked("library/books"));
}

#[test]
fn test_removal_consistency() {
    let tmp = sandbox();
    let registry = FolderRegistry::open(tmp.path());
    registry.create_folder("a");
    registry.remove_folder("a");

    assert!(!tmp.path().join("a").exists());
    assert!(!registry.is_tracked("a"));
    assert!(snapshot_keys(&registry).is_empty());
}

#[test]
fn test_reconcile_tolerates_partial_failure() {
    let tmp = sandbox();
    let registry = FolderRegistry::open(tmp.path());
    registry.create_folder("a");
    registry.create_folder("b");

    fs::remove_dir_all(tmp.path().join("a")).unwrap();
    fs::write(tmp.path().join("a"), b"not a directory").unwrap();
    fs::remove_dir_all(tmp.path().join("b")).unwrap();

    let report = registry.reconcile();

    assert_eq!(report.checked, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, "a");
    assert_eq!(report.recreated, vec!["b".to_string()]);
    assert!(tmp.path().join("b").is_dir());
    assert!(registry.is_tracked("a"));
}

#[test]
fn test_snapshot_contains_new_key_once() {
    let tmp = sandbox();
    let registry = FolderRegistry::open(tmp.path());
    registry.create_folder("w");
    registry.create_folder("x");
    registry.create_folder("x/");

    assert_eq!(snapshot_keys(&registry), vec!["w", "x"]);
}

#[test]
fn test_adopts_preexisting_directory() {
    let tmp = sandbox();
    fs::create_dir_all(tmp.path().join("old/inner")).unwrap();
    let registry = FolderRegistry::open(tmp.path());

    assert_eq!(
        registry.try_create_folder("old").unwrap(),
        CreateOutcome::Adopted
    );
    assert!(tmp.path().join("old/inner").is_dir());
    assert_eq!(snapshot_keys(&registry), vec!["old"]);
}

#[test]
fn test_concurrent_creates_of_same_path() {
    let tmp = sandbox();
    let registry = Arc::new(FolderRegistry::open(tmp.path()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.try_create_folder("shared").unwrap())
        })
        .collect();
    let outcomes: Vec<CreateOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let created = outcomes
        .iter()
        .filter(|o| **o == CreateOutcome::Created)
        .count();
    assert_eq!(created, 1);
    assert_eq!(registry.tracked_paths(), vec!["shared"]);
    assert_eq!(snapshot_keys(&registry), vec!["shared"]);
}

#[test]
fn test_concurrent_mutations_keep_snapshot_in_sync() {
    let tmp = sandbox();
    let registry = Arc::new(FolderRegistry::open(tmp.path()));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let name = format!("dir-{i}");
                registry.create_folder(&name);
                if i % 2 == 0 {
                    registry.remove_folder(&name);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected: Vec<String> = registry.tracked_paths();
    assert_eq!(expected.len(), 8);
    assert_eq!(snapshot_keys(&registry), expected);
}

#[test]
fn test_escaping_paths_never_reach_disk() {
    let tmp = sandbox();
    let root = tmp.path().join("root");
    let registry = FolderRegistry::open(&root);

    registry.create_folder("../evil");
    registry.create_folder("/abs");
    registry.create_folder(".nutburrow/created_folders.json");

    assert!(!tmp.path().join("evil").exists());
    assert!(registry.is_empty());
}

#[test]
fn test_keep_backup_survives_corrupt_snapshot() {
    let tmp = sandbox();
    {
        let registry = FolderRegistry::builder(tmp.path()).keep_backup(true).open();
        registry.create_folder("one");
        registry.create_folder("two");
    }
    let snapshot = tmp.path().join(".nutburrow/created_folders.json");
    fs::write(&snapshot, "truncated{").unwrap();

    let registry = FolderRegistry::builder(tmp.path()).keep_backup(true).open();
    assert_eq!(registry.tracked_paths(), vec!["one"]);
}

#[test]
fn test_mutation_after_backup_restore_keeps_backup() {
    let tmp = sandbox();
    {
        let registry = FolderRegistry::builder(tmp.path()).keep_backup(true).open();
        registry.create_folder("one");
        registry.create_folder("two");
    }
    let snapshot = tmp.path().join(".nutburrow/created_folders.json");
    fs::write(&snapshot, "truncated{").unwrap();

    let registry = FolderRegistry::builder(tmp.path()).keep_backup(true).open();
    registry.create_folder("three");

    let backup_path = tmp.path().join(".nutburrow/created_folders.json.bak");
    let backup = fs::read_to_string(backup_path).unwrap();
    let map: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&backup).expect("backup is not a JSON object");
    assert_eq!(map.into_keys().collect::<Vec<_>>(), vec!["one"]);
    assert_eq!(snapshot_keys(&registry), vec!["one", "three"]);
}

#[test]
fn test_open_and_shutdown_without_mutation_keeps_snapshot() {
    let tmp = sandbox();
    let meta = tmp.path().join(".nutburrow");
    fs::create_dir_all(&meta).unwrap();
    let snapshot = meta.join("created_folders.json");
    fs::write(&snapshot, "{ not json").unwrap();

    let registry = FolderRegistry::open(tmp.path());
    assert!(registry.is_empty());
    registry.shutdown();

    assert_eq!(fs::read_to_string(&snapshot).unwrap(), "{ not json");
}

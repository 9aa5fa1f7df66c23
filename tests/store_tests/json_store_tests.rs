//! Tests for JsonStore
//!
//! These tests verify:
//! - Opening by URL (file and directory)
//! - Applying migration bodies with the version header first
//! - Operator keys quarantined with `_`
//! - Version bookkeeping (set_version, NIL_VERSION)
//! - Lock/unlock (blocking and cancellable) and drop semantics

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use cfgmigrate::document::ConfigValue;
use cfgmigrate::store::{ConfigStore, JsonStore};
use cfgmigrate::{MigrateError, NIL_VERSION};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, PathBuf, JsonStore) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("app.json");
    let store = JsonStore::open(&format!("json://{}", path.display())).unwrap();
    (temp_dir, path, store)
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_empty_file() {
    let (_temp, path, store) = setup_temp_store();

    assert!(path.exists());
    assert_eq!(store.version().unwrap(), NIL_VERSION);
}

#[test]
fn test_open_directory_uses_default_file() {
    let temp_dir = TempDir::new().unwrap();

    let store = JsonStore::open(&format!("json://{}", temp_dir.path().display())).unwrap();

    assert_eq!(store.path(), temp_dir.path().join("config.json"));
}

#[test]
fn test_open_existing_keeps_content() {
    let (_temp, path, store) = setup_temp_store();
    store.run(br#"{"port": 80}"#, 1).unwrap();
    drop(store);

    let reopened = JsonStore::open_path(&path).unwrap();

    assert_eq!(reopened.version().unwrap(), 1);
}

// =============================================================================
// Run Tests
// =============================================================================

#[test]
fn test_run_writes_pretty_document() {
    let (_temp, path, store) = setup_temp_store();

    store.run(br#"{"port": 80, "host": "localhost"}"#, 1).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "{\n    \"version\": 1,\n    \"host\": \"localhost\",\n    \"port\": 80\n}\n"
    );
}

#[test]
fn test_run_keeps_operator_values_and_quarantines_extras() {
    let (_temp, path, store) = setup_temp_store();
    store.run(br#"{"port": 80}"#, 1).unwrap();

    fs::write(&path, r#"{"version": 1, "port": 8080, "custom": {"x": 1}}"#).unwrap();
    store.run(br#"{"port": 80, "debug": false}"#, 2).unwrap();

    let (version, document) = store.read().unwrap();
    assert_eq!(version, 2);
    assert_eq!(document["port"].as_i64(), Some(8080));
    assert_eq!(document["debug"], ConfigValue::Bool(false));
    assert_eq!(document["_custom"].get("_x").and_then(|v| v.as_i64()), Some(1));
    assert!(!document.contains_key("custom"));
}

#[test]
fn test_run_ignores_version_in_body() {
    let (_temp, _path, store) = setup_temp_store();

    store.run(br#"{"version": 99, "a": 1}"#, 4).unwrap();

    assert_eq!(store.version().unwrap(), 4);
}

#[test]
fn test_run_rejects_non_mapping_body() {
    let (_temp, _path, store) = setup_temp_store();

    let result = store.run(b"[1, 2, 3]", 1);

    assert!(matches!(result, Err(MigrateError::Serialization(_))));
}

#[test]
fn test_run_rejects_malformed_body() {
    let (_temp, _path, store) = setup_temp_store();

    let result = store.run(b"{not json", 1);

    assert!(matches!(result, Err(MigrateError::Serialization(_))));
}

// =============================================================================
// Version Tests
// =============================================================================

#[test]
fn test_set_version_keeps_document() {
    let (_temp, _path, store) = setup_temp_store();
    store.run(br#"{"a": 1}"#, 1).unwrap();

    store.set_version(5).unwrap();

    let (version, document) = store.read().unwrap();
    assert_eq!(version, 5);
    assert_eq!(document["a"].as_i64(), Some(1));
}

#[test]
fn test_set_nil_version_removes_marker() {
    let (_temp, path, store) = setup_temp_store();
    store.run(br#"{"a": 1}"#, 1).unwrap();

    store.set_version(NIL_VERSION).unwrap();

    assert_eq!(store.version().unwrap(), NIL_VERSION);
    assert!(!fs::read_to_string(&path).unwrap().contains("version"));
}

#[test]
fn test_invalid_version_marker() {
    let (_temp, path, store) = setup_temp_store();
    fs::write(&path, r#"{"version": "three"}"#).unwrap();

    assert!(matches!(store.version(), Err(MigrateError::Storage(_))));
}

// =============================================================================
// Lock Tests
// =============================================================================

#[test]
fn test_lock_twice_is_locked() {
    let (_temp, _path, store) = setup_temp_store();

    store.lock().unwrap();
    assert!(matches!(store.lock(), Err(MigrateError::Locked)));

    store.unlock().unwrap();
    store.lock().unwrap();
    store.unlock().unwrap();
}

#[test]
fn test_cancelled_lock_leaves_store_unlocked() {
    let (_temp, path, store) = setup_temp_store();
    let holder = JsonStore::open_path(&path).unwrap();
    holder.lock().unwrap();

    let cancel = AtomicBool::new(true);
    assert!(store.supports_cancel());
    assert!(matches!(store.lock_cancellable(&cancel), Err(MigrateError::LockTimeout)));

    // A cancelled attempt does not count as held
    holder.unlock().unwrap();
    store.lock().unwrap();
    store.unlock().unwrap();
}

#[test]
fn test_cancellable_lock_acquires_free_file() {
    let (_temp, _path, store) = setup_temp_store();

    store.lock_cancellable(&AtomicBool::new(false)).unwrap();

    assert!(matches!(store.lock(), Err(MigrateError::Locked)));
    store.unlock().unwrap();
}

#[test]
fn test_unlock_without_lock_is_ok() {
    let (_temp, _path, store) = setup_temp_store();

    store.unlock().unwrap();
}

// =============================================================================
// Drop/Close Tests
// =============================================================================

#[test]
fn test_drop_all_removes_file() {
    let (_temp, path, store) = setup_temp_store();
    store.run(br#"{"a": 1}"#, 1).unwrap();

    store.drop_all().unwrap();

    assert!(!path.exists());
    assert!(matches!(store.version(), Err(MigrateError::Closed)));
}

#[test]
fn test_closed_store_rejects_calls() {
    let (_temp, _path, store) = setup_temp_store();

    store.close().unwrap();

    assert!(matches!(store.run(b"{}", 1), Err(MigrateError::Closed)));
    assert!(matches!(store.lock(), Err(MigrateError::Closed)));
}

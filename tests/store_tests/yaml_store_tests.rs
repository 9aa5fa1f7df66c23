//! Tests for YamlStore
//!
//! These tests verify:
//! - `version: N` is always the first line
//! - Operator keys are quarantined with `#` and stay parseable
//! - Nulls are written bare
//! - Scalars that need quotes keep them

use std::fs;
use std::path::PathBuf;

use cfgmigrate::document::ConfigValue;
use cfgmigrate::store::{ConfigStore, YamlStore};
use cfgmigrate::NIL_VERSION;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, PathBuf, YamlStore) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("app.yaml");
    let store = YamlStore::open(&format!("yaml://{}", path.display())).unwrap();
    (temp_dir, path, store)
}

// =============================================================================
// Run Tests
// =============================================================================

#[test]
fn test_run_writes_version_header_first() {
    let (_temp, path, store) = setup_temp_store();

    store.run(b"port: 80\nhost: localhost\n", 1).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, "version: 1\nhost: localhost\nport: 80\n");
}

#[test]
fn test_run_writes_bare_nulls() {
    let (_temp, path, store) = setup_temp_store();

    store.run(b"token:\nport: 80\n", 1).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, "version: 1\nport: 80\ntoken:\n");
}

#[test]
fn test_run_quarantines_operator_keys() {
    let (_temp, path, store) = setup_temp_store();
    store.run(b"port: 80\n", 1).unwrap();

    fs::write(&path, "version: 1\nport: 9090\ncustom: hello\n").unwrap();
    store.run(b"port: 80\nworkers: 4\n", 2).unwrap();

    let (version, document) = store.read().unwrap();
    assert_eq!(version, 2);
    assert_eq!(document["port"].as_i64(), Some(9090));
    assert_eq!(document["workers"].as_i64(), Some(4));
    assert_eq!(document["#custom"].as_str(), Some("hello"));
    assert!(!document.contains_key("custom"));

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("version: 2\n"));
}

#[test]
fn test_quarantine_is_stable_across_migrations() {
    let (_temp, path, store) = setup_temp_store();
    fs::write(&path, "version: 1\nlegacy: true\n").unwrap();

    store.run(b"a: 1\n", 2).unwrap();
    store.run(b"a: 1\nb: 2\n", 3).unwrap();

    let (_, document) = store.read().unwrap();
    assert_eq!(document["#legacy"], ConfigValue::Bool(true));
    assert!(!document.contains_key("##legacy"));
}

#[test]
fn test_string_that_looks_like_number_keeps_type() {
    let (_temp, _path, store) = setup_temp_store();

    store.run(b"zip: \"01234\"\n", 1).unwrap();

    let (_, document) = store.read().unwrap();
    assert_eq!(document["zip"].as_str(), Some("01234"));
}

#[test]
fn test_nested_mapping() {
    let (_temp, path, store) = setup_temp_store();
    fs::write(&path, "version: 1\ndb:\n  url: pg://prod\n  pool: 8\n").unwrap();

    store.run(b"db:\n  url: pg://localhost\n  timeout: 30\n", 2).unwrap();

    let (_, document) = store.read().unwrap();
    let db = &document["db"];
    assert_eq!(db.get("url").and_then(ConfigValue::as_str), Some("pg://prod"));
    assert_eq!(db.get("timeout").and_then(ConfigValue::as_i64), Some(30));
    assert_eq!(db.get("#pool").and_then(ConfigValue::as_i64), Some(8));
}

// =============================================================================
// Version Tests
// =============================================================================

#[test]
fn test_empty_file_is_nil_version() {
    let (_temp, _path, store) = setup_temp_store();

    assert_eq!(store.version().unwrap(), NIL_VERSION);
}

#[test]
fn test_set_nil_version_on_empty_document_writes_nothing() {
    let (_temp, path, store) = setup_temp_store();
    store.run(b"", 1).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "version: 1\n");

    store.set_version(NIL_VERSION).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "");
    assert_eq!(store.version().unwrap(), NIL_VERSION);
}

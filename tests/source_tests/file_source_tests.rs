//! Tests for FileSource
//!
//! These tests verify:
//! - Script discovery from `{version}_{title}.{up|down}.{ext}` names
//! - Ordered navigation (first/prev/next)
//! - Reading up and down scripts
//! - Rejection of duplicates and missing directories

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use cfgmigrate::source::{FileSource, MigrationSource};
use cfgmigrate::MigrateError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

fn write_script(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

fn setup_migrations() -> (TempDir, FileSource) {
    let (temp, dir) = setup_temp_dir();
    write_script(&dir, "1_init.up.yaml", "port: 80\n");
    write_script(&dir, "1_init.down.yaml", "");
    write_script(&dir, "3_add_cache.up.yaml", "port: 80\ncache: true\n");
    write_script(&dir, "3_add_cache.down.yaml", "port: 80\n");
    write_script(&dir, "7_tls.up.yaml", "port: 443\n");
    write_script(&dir, "README.md", "not a migration");

    let source = FileSource::open(&format!("file://{}", dir.display())).unwrap();
    (temp, source)
}

fn read_all(script: Option<(Box<dyn Read + Send>, String)>) -> (String, String) {
    let (mut body, identifier) = script.unwrap();
    let mut text = String::new();
    body.read_to_string(&mut text).unwrap();
    (text, identifier)
}

// =============================================================================
// Navigation Tests
// =============================================================================

#[test]
fn test_first() {
    let (_temp, source) = setup_migrations();

    assert_eq!(source.first().unwrap(), Some(1));
}

#[test]
fn test_next_and_prev() {
    let (_temp, source) = setup_migrations();

    assert_eq!(source.next(1).unwrap(), Some(3));
    assert_eq!(source.next(3).unwrap(), Some(7));
    assert_eq!(source.next(7).unwrap(), None);

    assert_eq!(source.prev(7).unwrap(), Some(3));
    assert_eq!(source.prev(3).unwrap(), Some(1));
    assert_eq!(source.prev(1).unwrap(), None);
}

#[test]
fn test_empty_directory_has_no_first() {
    let (_temp, dir) = setup_temp_dir();
    let source = FileSource::open_dir(&dir).unwrap();

    assert_eq!(source.first().unwrap(), None);
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_up() {
    let (_temp, source) = setup_migrations();

    let (body, identifier) = read_all(source.read_up(3).unwrap());

    assert_eq!(identifier, "add_cache");
    assert_eq!(body, "port: 80\ncache: true\n");
}

#[test]
fn test_read_down() {
    let (_temp, source) = setup_migrations();

    let (body, identifier) = read_all(source.read_down(3).unwrap());

    assert_eq!(identifier, "add_cache");
    assert_eq!(body, "port: 80\n");
}

#[test]
fn test_read_missing_script_is_none() {
    let (_temp, source) = setup_migrations();

    assert!(source.read_down(7).unwrap().is_none());
    assert!(source.read_up(2).unwrap().is_none());
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_duplicate_script_rejected() {
    let (_temp, dir) = setup_temp_dir();
    write_script(&dir, "1_init.up.yaml", "a: 1\n");
    write_script(&dir, "0001_other.up.yaml", "b: 1\n");

    let result = FileSource::open_dir(&dir);

    assert!(matches!(result, Err(MigrateError::Source(_))));
}

#[test]
fn test_missing_directory_rejected() {
    let (_temp, dir) = setup_temp_dir();

    let result = FileSource::open_dir(&dir.join("nope"));

    assert!(matches!(result, Err(MigrateError::Source(_))));
}

//! Tests for document reconciliation
//!
//! These tests verify:
//! - Schema defaults are filled in, operator values survive
//! - Undeclared keys are quarantined with the store's marker
//! - Quarantine reaches into nested mappings
//! - Repeated reconciliation is stable

use cfgmigrate::document::{merge, quarantine, reconcile, ConfigValue, Map};

// =============================================================================
// Helper Functions
// =============================================================================

fn json(text: &str) -> Map {
    serde_json::from_str::<ConfigValue>(text)
        .unwrap()
        .into_object()
        .unwrap()
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_merge_fills_defaults() {
    let schema = json(r#"{"port": 80, "host": "localhost"}"#);
    let current = Map::new();

    assert_eq!(merge(&schema, &current), schema);
}

#[test]
fn test_merge_operator_value_wins() {
    let schema = json(r#"{"port": 80, "tls": {"enabled": false, "cert": ""}}"#);
    let current = json(r#"{"port": 8443, "tls": {"enabled": true}}"#);

    let merged = merge(&schema, &current);

    assert_eq!(merged, json(r#"{"port": 8443, "tls": {"enabled": true, "cert": ""}}"#));
}

#[test]
fn test_merge_scalar_replaces_mapping() {
    let schema = json(r#"{"log": {"level": "info"}}"#);
    let current = json(r#"{"log": "stderr"}"#);

    assert_eq!(merge(&schema, &current), json(r#"{"log": "stderr"}"#));
}

// =============================================================================
// Quarantine Tests
// =============================================================================

#[test]
fn test_quarantine_marks_undeclared_keys() {
    let schema = json(r#"{"port": 80}"#);
    let merged = json(r#"{"port": 80, "custom": 1}"#);

    let out = quarantine(merged, &schema, '_');

    assert_eq!(out, json(r#"{"port": 80, "_custom": 1}"#));
}

#[test]
fn test_quarantine_marks_nested_subtree() {
    let schema = json(r#"{"db": {"url": ""}}"#);
    let merged = json(r#"{"db": {"url": "pg://", "pool": {"size": 4}}}"#);

    let out = quarantine(merged, &schema, '#');

    assert_eq!(out, json(r##"{"db": {"url": "pg://", "#pool": {"#size": 4}}}"##));
}

#[test]
fn test_quarantine_leaves_marked_keys() {
    let schema = json(r#"{"port": 80}"#);
    let merged = json(r#"{"port": 80, "_old": true}"#);

    let out = quarantine(merged, &schema, '_');

    assert_eq!(out, json(r#"{"port": 80, "_old": true}"#));
}

#[test]
fn test_quarantine_fresh_value_wins_collision() {
    let schema = json(r#"{"port": 80}"#);
    let merged = json(r#"{"port": 80, "old": "new", "_old": "stale"}"#);

    let out = quarantine(merged, &schema, '_');

    assert_eq!(out, json(r#"{"port": 80, "_old": "new"}"#));
}

// =============================================================================
// Reconcile Tests
// =============================================================================

#[test]
fn test_reconcile_removed_key_is_quarantined() {
    let current = json(r#"{"port": 8080, "legacy": "yes"}"#);
    let schema = json(r#"{"port": 80}"#);

    let out = reconcile(&schema, &current, '_');

    assert_eq!(out, json(r#"{"port": 8080, "_legacy": "yes"}"#));
}

#[test]
fn test_reconcile_strips_version() {
    let current = json(r#"{"version": 3, "a": 1}"#);
    let schema = json(r#"{"version": 4, "a": 0}"#);

    let out = reconcile(&schema, &current, '_');

    assert!(!out.contains_key("version"));
    assert_eq!(out, json(r#"{"a": 1}"#));
}

#[test]
fn test_reconcile_is_idempotent() {
    let current = json(r#"{"a": 1, "extra": {"x": 1}}"#);
    let schema = json(r#"{"a": 0, "b": 2}"#);

    let once = reconcile(&schema, &current, '_');
    let twice = reconcile(&schema, &once, '_');

    assert_eq!(once, twice);
    assert_eq!(once, json(r#"{"a": 1, "b": 2, "_extra": {"_x": 1}}"#));
}

#[test]
fn test_reconcile_empty_schema_quarantines_everything() {
    let current = json(r#"{"a": 1}"#);

    let out = reconcile(&Map::new(), &current, '#');

    assert_eq!(out, json(r##"{"#a": 1}"##));
}

//! Integration tests for the bulk loader against the in-memory store
//!
//! These tests cover striping, per-document reconciliation, replace-mode
//! duplicate handling, read-back checks and dry runs.

use cifdb::adapters::memory::MemoryStore;
use cifdb::adapters::store::DocumentStore;
use cifdb::core::load::{BulkLoader, LoadMode, LoadOptions, LoadTarget};
use cifdb::domain::Document;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn entries(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| document(json!({"rcsb_id": format!("{i:04}"), "entry": {"id": i}})))
        .collect()
}

fn keys() -> Vec<String> {
    vec!["rcsb_id".to_string()]
}

fn target() -> LoadTarget {
    LoadTarget::new("pdbx", "pdbx_core_entry")
}

fn loader(store: &MemoryStore, options: LoadOptions) -> BulkLoader {
    BulkLoader::new(Arc::new(store.clone()), options)
}

#[tokio::test]
async fn test_large_load_is_striped_into_sub_lists() {
    let store = MemoryStore::new();
    let options = LoadOptions {
        max_step_length: 2000,
        chunk_size: 500,
        concurrency: 4,
        ..LoadOptions::default()
    };
    let documents = entries(2500);

    let outcome = loader(&store, options)
        .load(&target(), LoadMode::Full, &documents, None, Some(&keys()))
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.success_list, (0..2500).collect::<Vec<_>>());
    assert!(outcome.fail_list.is_empty());
    assert_eq!(store.count("pdbx", "pdbx_core_entry").await.unwrap(), 2500);

    // Two sub-lists of 1250, three chunks each, plus the setup handle
    assert_eq!(store.connection_count(), 7);
    assert_eq!(store.insert_call_count(), 6);
}

#[tokio::test]
async fn test_dropped_acknowledgements_are_reconciled_by_key() {
    let store = MemoryStore::new();
    store.drop_acknowledgements(3);
    let options = LoadOptions {
        chunk_size: 0,
        concurrency: 1,
        ..LoadOptions::default()
    };
    let documents = entries(40);

    let outcome = loader(&store, options)
        .load(&target(), LoadMode::Full, &documents, None, Some(&keys()))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.fail_list, vec![0, 1, 2]);
    assert_eq!(outcome.success_list.len(), 37);

    let succeeded: HashSet<usize> = outcome.success_list.iter().copied().collect();
    assert!(outcome.fail_list.iter().all(|i| !succeeded.contains(i)));
    assert_eq!(outcome.attempted(), 40);
    assert_eq!(store.count("pdbx", "pdbx_core_entry").await.unwrap(), 37);
}

#[tokio::test]
async fn test_count_mismatch_without_keys_fails_the_chunk() {
    let store = MemoryStore::new();
    store.drop_acknowledgements(1);
    let options = LoadOptions {
        chunk_size: 10,
        concurrency: 1,
        ..LoadOptions::default()
    };
    let documents = entries(20);

    let outcome = loader(&store, options)
        .load(&target(), LoadMode::Full, &documents, None, None)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.fail_list, (0..10).collect::<Vec<_>>());
    assert_eq!(outcome.success_list, (10..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_replace_keeps_last_duplicate() {
    let store = MemoryStore::new();
    let options = LoadOptions::default();
    let key = vec!["THE_KEY".to_string()];

    let existing = vec![document(json!({"THE_KEY": "A", "version": 0}))];
    let seeded = loader(&store, options.clone())
        .load(&target(), LoadMode::Append, &existing, None, Some(&key))
        .await;
    assert!(seeded.success);

    let documents = vec![
        document(json!({"THE_KEY": "A", "version": 1})),
        document(json!({"THE_KEY": "A", "version": 2})),
        document(json!({"THE_KEY": "B", "version": 1})),
    ];
    let outcome = loader(&store, options)
        .load(&target(), LoadMode::Replace, &documents, None, Some(&key))
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.superseded, vec![0]);
    assert_eq!(outcome.success_list, vec![1, 2]);

    let stored = store.documents("pdbx", "pdbx_core_entry");
    assert_eq!(stored.len(), 2);
    let a: Vec<&Document> = stored.iter().filter(|d| d["THE_KEY"] == "A").collect();
    assert_eq!(a.len(), 1);
    assert_eq!(a[0]["version"], 2);
}

#[tokio::test]
async fn test_replace_without_keys_touches_nothing() {
    let store = MemoryStore::new();
    let documents = entries(5);

    let outcome = loader(&store, LoadOptions::default())
        .load(&target(), LoadMode::Replace, &documents, None, None)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.fail_list.len(), 5);
    assert_eq!(store.connection_count(), 0);
    assert!(!store
        .collection_exists("pdbx", "pdbx_core_entry")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_read_back_mismatch_is_reported() {
    let store = MemoryStore::new();
    store.corrupt_read_back(true);
    let options = LoadOptions {
        read_back_check: true,
        ..LoadOptions::default()
    };
    let documents = entries(6);

    let outcome = loader(&store, options)
        .load(&target(), LoadMode::Full, &documents, None, Some(&keys()))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.read_back_mismatches, (0..6).collect::<Vec<_>>());
    assert!(outcome.fail_list.is_empty());
}

#[tokio::test]
async fn test_read_back_match_keeps_success() {
    let store = MemoryStore::new();
    let options = LoadOptions {
        read_back_check: true,
        ..LoadOptions::default()
    };

    let outcome = loader(&store, options)
        .load(&target(), LoadMode::Full, &entries(6), None, None)
        .await;

    assert!(outcome.success);
    assert!(outcome.read_back_mismatches.is_empty());
}

#[tokio::test]
async fn test_dry_run_leaves_store_untouched() {
    let store = MemoryStore::new();
    let options = LoadOptions {
        dry_run: true,
        ..LoadOptions::default()
    };

    let outcome = loader(&store, options)
        .load(&target(), LoadMode::Full, &entries(25), None, Some(&keys()))
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.success_list.len(), 25);
    assert_eq!(store.connection_count(), 0);
    assert_eq!(store.insert_call_count(), 0);
    assert!(!store.database_exists("pdbx").await.unwrap());
}

#[tokio::test]
async fn test_insert_failure_fails_every_chunk() {
    let store = MemoryStore::new();
    store.fail_inserts(true);

    let outcome = loader(&store, LoadOptions::default())
        .load(&target(), LoadMode::Full, &entries(30), None, Some(&keys()))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.fail_list, (0..30).collect::<Vec<_>>());
    assert!(outcome.success_list.is_empty());
    assert!(!outcome.errors.is_empty());
}

#[tokio::test]
async fn test_full_mode_replaces_previous_contents() {
    let store = MemoryStore::new();
    let options = LoadOptions::default();

    loader(&store, options.clone())
        .load(&target(), LoadMode::Full, &entries(10), None, None)
        .await;
    let outcome = loader(&store, options)
        .load(&target(), LoadMode::Full, &entries(4), None, None)
        .await;

    assert!(outcome.success);
    assert_eq!(store.count("pdbx", "pdbx_core_entry").await.unwrap(), 4);
}

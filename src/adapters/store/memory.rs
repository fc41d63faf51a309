//! In-process document store
//!
//! Used for tests and local runs without a database. Failure injection lets tests
//! drop insert acknowledgements, fail whole calls, or corrupt read-backs.

use crate::adapters::store::traits::{DocumentStore, InsertedDocument, StoreConnector};
use crate::domain::{Document, DocumentId, KeyPath, KeyTuple, Result, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<(DocumentId, Document)>,
    unique_key: Option<Vec<KeyPath>>,
}

#[derive(Debug, Default)]
struct Failures {
    /// Documents still to be rejected silently, counted across all calls
    drop_acknowledgements: AtomicUsize,
    fail_inserts: AtomicBool,
    fail_deletes: AtomicBool,
    fail_connect: AtomicBool,
    corrupt_read_back: AtomicBool,
}

#[derive(Debug, Default)]
struct Inner {
    collections: Mutex<HashMap<(String, String), Collection>>,
    failures: Failures,
    connections: AtomicUsize,
    insert_calls: AtomicUsize,
}

/// Shared in-memory store; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the next `count` documents offered to `insert_many`
    pub fn drop_acknowledgements(&self, count: usize) {
        self.inner
            .failures
            .drop_acknowledgements
            .store(count, Ordering::SeqCst);
    }

    /// Makes every `insert_many` call fail
    pub fn fail_inserts(&self, fail: bool) {
        self.inner.failures.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes every `delete_many` call fail
    pub fn fail_deletes(&self, fail: bool) {
        self.inner.failures.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Makes every `connect` call fail
    pub fn fail_connect(&self, fail: bool) {
        self.inner.failures.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Makes `fetch_one` return altered documents
    pub fn corrupt_read_back(&self, corrupt: bool) {
        self.inner
            .failures
            .corrupt_read_back
            .store(corrupt, Ordering::SeqCst);
    }

    /// Number of handles opened through [`StoreConnector::connect`]
    pub fn connection_count(&self) -> usize {
        self.inner.connections.load(Ordering::SeqCst)
    }

    pub fn insert_call_count(&self) -> usize {
        self.inner.insert_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of the documents in a collection, in insertion order
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.lock()
            .get(&(database.to_string(), collection.to_string()))
            .map(|c| c.documents.iter().map(|(_, d)| d.clone()).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), Collection>> {
        // Poisoning leaves the map consistent; every mutation is a single call
        match self.inner.collections.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn take_dropped_acknowledgement(&self) -> bool {
        self.inner
            .failures
            .drop_acknowledgements
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn key(database: &str, collection: &str) -> (String, String) {
    (database.to_string(), collection.to_string())
}

fn not_found(database: &str, collection: &str) -> StoreError {
    StoreError::NotFound(format!("collection {database}.{collection}"))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn database_exists(&self, database: &str) -> Result<bool> {
        Ok(self.lock().keys().any(|(db, _)| db == database))
    }

    async fn collection_exists(&self, database: &str, collection: &str) -> Result<bool> {
        Ok(self.lock().contains_key(&key(database, collection)))
    }

    async fn create_collection(&self, database: &str, collection: &str) -> Result<()> {
        self.lock().entry(key(database, collection)).or_default();
        tracing::debug!(database, collection, "Created in-memory collection");
        Ok(())
    }

    async fn drop_collection(&self, database: &str, collection: &str) -> Result<()> {
        self.lock().remove(&key(database, collection));
        Ok(())
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        key_paths: &[KeyPath],
        unique: bool,
    ) -> Result<()> {
        let mut collections = self.lock();
        let target = collections
            .get_mut(&key(database, collection))
            .ok_or_else(|| StoreError::IndexCreationFailed(not_found(database, collection).to_string()))?;
        if unique {
            target.unique_key = Some(key_paths.to_vec());
        }
        Ok(())
    }

    async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<InsertedDocument>> {
        self.inner.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.failures.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::InsertFailed("injected insert failure".to_string()).into());
        }

        let mut collections = self.lock();
        let target = collections
            .get_mut(&key(database, collection))
            .ok_or_else(|| StoreError::InsertFailed(not_found(database, collection).to_string()))?;

        let mut existing: HashSet<KeyTuple> = match &target.unique_key {
            Some(paths) => target
                .documents
                .iter()
                .map(|(_, d)| KeyTuple::from_document(d, paths))
                .collect(),
            None => HashSet::new(),
        };

        let mut inserted = Vec::with_capacity(documents.len());
        for document in documents {
            if self.take_dropped_acknowledgement() {
                continue;
            }
            if let Some(paths) = &target.unique_key {
                if !existing.insert(KeyTuple::from_document(document, paths)) {
                    tracing::debug!(database, collection, "Unique index rejected document");
                    continue;
                }
            }
            let id = DocumentId::generate();
            target.documents.push((id.clone(), document.clone()));
            inserted.push(InsertedDocument {
                id,
                document: document.clone(),
            });
        }
        Ok(inserted)
    }

    async fn delete_many(
        &self,
        database: &str,
        collection: &str,
        key_paths: &[KeyPath],
        keys: &[KeyTuple],
    ) -> Result<u64> {
        if self.inner.failures.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::DeleteFailed("injected delete failure".to_string()).into());
        }

        let wanted: HashSet<&KeyTuple> = keys.iter().collect();
        let mut collections = self.lock();
        let Some(target) = collections.get_mut(&key(database, collection)) else {
            return Ok(0);
        };
        let before = target.documents.len();
        target
            .documents
            .retain(|(_, d)| !wanted.contains(&KeyTuple::from_document(d, key_paths)));
        Ok((before - target.documents.len()) as u64)
    }

    async fn fetch_one(
        &self,
        database: &str,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>> {
        let collections = self.lock();
        let target = collections
            .get(&key(database, collection))
            .ok_or_else(|| StoreError::FetchFailed(not_found(database, collection).to_string()))?;

        let mut found = target
            .documents
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, d)| d.clone());
        if self.inner.failures.corrupt_read_back.load(Ordering::SeqCst) {
            if let Some(document) = found.as_mut() {
                document.insert("_corrupted".to_string(), Value::Bool(true));
            }
        }
        Ok(found)
    }

    async fn count(&self, database: &str, collection: &str) -> Result<u64> {
        Ok(self
            .lock()
            .get(&key(database, collection))
            .map(|c| c.documents.len() as u64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>> {
        if self.inner.failures.fail_connect.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionFailed("injected connection failure".to_string()).into());
        }
        self.inner.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.clone()))
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

//! Document store abstraction traits
//!
//! The bulk loader talks to the target store only through these traits. Every
//! method is a single bounded round trip; drivers do not retry.

use crate::domain::{Document, DocumentId, KeyPath, KeyTuple, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A document accepted by the store, with the identifier it was given
///
/// The copy is what the store actually wrote, so it can be compared against a
/// later fetch without relying on the caller's document being mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertedDocument {
    pub id: DocumentId,
    pub document: Document,
}

/// Document store driver contract
///
/// `database` and `collection` name the target; drivers map them onto their own
/// namespaces (a schema and table for PostgreSQL).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Test the store connection
    async fn test_connection(&self) -> Result<()>;

    async fn database_exists(&self, database: &str) -> Result<bool>;

    async fn collection_exists(&self, database: &str, collection: &str) -> Result<bool>;

    /// Create a collection (and its database if needed)
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be created.
    async fn create_collection(&self, database: &str, collection: &str) -> Result<()>;

    /// Drop a collection; dropping a missing collection is not an error
    async fn drop_collection(&self, database: &str, collection: &str) -> Result<()>;

    /// Create an index over the key paths
    ///
    /// # Arguments
    ///
    /// * `key_paths` - Dot-notation paths forming the index key
    /// * `unique` - Reject documents whose key tuple is already present
    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        key_paths: &[KeyPath],
        unique: bool,
    ) -> Result<()>;

    /// Insert documents
    ///
    /// # Returns
    ///
    /// The documents the store confirmed, which may be fewer than requested (for
    /// example when a unique index rejects some of them). Order follows the input
    /// for the confirmed documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the call as a whole failed.
    async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<InsertedDocument>>;

    /// Delete every document whose key tuple over `key_paths` equals one of `keys`
    ///
    /// # Returns
    ///
    /// Number of documents deleted.
    async fn delete_many(
        &self,
        database: &str,
        collection: &str,
        key_paths: &[KeyPath],
        keys: &[KeyTuple],
    ) -> Result<u64>;

    /// Fetch one document by generated identifier
    async fn fetch_one(
        &self,
        database: &str,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>>;

    /// Number of documents in a collection
    async fn count(&self, database: &str, collection: &str) -> Result<u64>;
}

/// Opens store handles
///
/// The loader calls [`StoreConnector::connect`] once for setup and once per
/// chunk task, so workers never share a handle.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Open a handle to the store
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>>;

    /// Store description safe for logs (no credentials)
    fn describe(&self) -> String;
}

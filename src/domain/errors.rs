//! Domain error types
//!
//! This module defines the error hierarchy for cifdb.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main cifdb error type
///
/// This is the primary error type used throughout the library. Public
/// boundaries (bulk load, fetch) convert it into boolean or empty outcomes;
/// everything beneath them propagates it with `?`.
#[derive(Debug, Error)]
pub enum CifdbError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Schema catalog definition errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// Source document parsing errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Category mapping errors
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Data selector errors
    #[error("Selector error: {0}")]
    Selector(String),

    /// Document store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Document store errors
///
/// Errors raised by store drivers. These never escape the bulk loader;
/// they are recorded as failures of the chunk that triggered them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to the store
    #[error("Failed to connect to document store: {0}")]
    ConnectionFailed(String),

    /// Failed to create a collection
    #[error("Failed to create collection: {0}")]
    CollectionCreationFailed(String),

    /// Failed to drop a collection
    #[error("Failed to drop collection: {0}")]
    CollectionDropFailed(String),

    /// Failed to create an index
    #[error("Failed to create index: {0}")]
    IndexCreationFailed(String),

    /// Failed to insert documents
    #[error("Failed to insert documents: {0}")]
    InsertFailed(String),

    /// Failed to delete documents
    #[error("Failed to delete documents: {0}")]
    DeleteFailed(String),

    /// Failed to fetch a document
    #[error("Failed to fetch document: {0}")]
    FetchFailed(String),

    /// Database or collection not found
    #[error("Not found: {0}")]
    NotFound(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for CifdbError {
    fn from(err: std::io::Error) -> Self {
        CifdbError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for CifdbError {
    fn from(err: serde_json::Error) -> Self {
        CifdbError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for CifdbError {
    fn from(err: toml::de::Error) -> Self {
        CifdbError::Configuration(format!("TOML parse error: {err}"))
    }
}

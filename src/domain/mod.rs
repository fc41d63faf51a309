//! Domain models and types for cifdb.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Source records** ([`SourceContainer`], [`Category`], [`ContainerMetadata`])
//! - **Mapped output** ([`MappedRow`], [`TableRowMap`], [`Document`])
//! - **Document keys** ([`KeyPath`], [`KeyTuple`], [`DocumentId`])
//! - **Error types** ([`CifdbError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, CifdbError>`]:
//!
//! ```rust
//! use cifdb::domain::{CifdbError, Result};
//!
//! fn example() -> Result<()> {
//!     Err(CifdbError::Validation("bad input".to_string()))
//! }
//! ```

pub mod container;
pub mod context;
pub mod document;
pub mod errors;
pub mod result;

// Re-export commonly used types for convenience
pub use container::{is_null_marker, Category, ContainerMetadata, SourceContainer, MISSING_VALUE};
pub use context::ResultExt;
pub use document::{
    Document, DocumentId, KeyPath, KeyTuple, MappedRow, PathLookup, TableRowMap,
};
pub use errors::{CifdbError, StoreError};
pub use result::Result;

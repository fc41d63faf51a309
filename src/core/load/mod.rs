//! Bulk loading of documents into the target store

pub mod loader;
pub mod outcome;
pub mod summary;

pub use loader::{BulkLoader, LoadMode, LoadOptions, LoadTarget};
pub use outcome::LoadOutcome;
pub use summary::LoadSummary;

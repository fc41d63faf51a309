//! External system integrations for cifdb.
//!
//! - [`source`] - Parsers turning input locators into source containers
//! - [`store`] - Document store abstraction (trait-based) and the in-memory store
//! - [`postgresql`] - PostgreSQL JSONB document store
//!
//! Adapters isolate external dependencies so the pipeline can run against the
//! in-memory store in tests.

pub mod postgresql;
pub mod source;
pub mod store;

pub use store::memory;

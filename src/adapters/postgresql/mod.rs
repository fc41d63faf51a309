//! PostgreSQL document store integration
//!
//! Collections are JSONB tables inside a schema named after the target database.

pub mod client;
pub mod store;

pub use client::PostgreSQLClient;
pub use store::PostgresStore;

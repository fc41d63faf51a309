//! Document store abstraction layer
//!
//! Trait-based access to the target store so the loader can run against
//! PostgreSQL or the in-memory store.

pub mod factory;
pub mod memory;
pub mod traits;

pub use factory::create_store_connector;
pub use memory::MemoryStore;
pub use traits::{DocumentStore, InsertedDocument, StoreConnector};

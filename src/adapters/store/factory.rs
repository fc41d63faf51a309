//! Store connector factory
//!
//! Builds the connector for the configured backend.

use crate::adapters::postgresql::PostgresStore;
use crate::adapters::store::{MemoryStore, StoreConnector};
use crate::config::{CifdbConfig, StoreBackend};
use crate::domain::{CifdbError, Result};
use std::sync::Arc;

/// Create a store connector based on configuration
///
/// # Errors
///
/// Returns a configuration error if the selected backend has no configuration
/// section, or if the PostgreSQL pool cannot be built.
pub fn create_store_connector(config: &CifdbConfig) -> Result<Arc<dyn StoreConnector>> {
    match config.store.backend {
        StoreBackend::PostgreSQL => {
            let pg_config = config.postgresql.clone().ok_or_else(|| {
                CifdbError::Configuration(
                    "PostgreSQL configuration missing for store.backend = 'postgresql'"
                        .to_string(),
                )
            })?;
            let store = PostgresStore::new(pg_config)?;
            tracing::info!(target = %store.describe(), "Using PostgreSQL document store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::info!("Using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

//! Load pipeline - ties configuration, parsing, preparation and loading together
//!
//! The pipeline reads locators, builds documents with [`DataPrep`] on a
//! blocking thread, then hands them to the [`BulkLoader`].

use crate::adapters::source::{create_source_parser, read_path_list};
use crate::adapters::store::{create_store_connector, StoreConnector};
use crate::config::CifdbConfig;
use crate::core::load::{BulkLoader, LoadSummary, LoadTarget};
use crate::core::prep::{DataPrep, PreparedDocuments};
use crate::domain::{CifdbError, Document, Result};
use crate::schema::SchemaCatalog;
use std::sync::Arc;
use std::time::Instant;

/// Load pipeline
pub struct LoadPipeline {
    config: CifdbConfig,
    prep: DataPrep,
}

impl LoadPipeline {
    /// Create a pipeline, reading the schema catalog named by the configuration
    pub fn new(config: CifdbConfig) -> Result<Self> {
        let catalog = SchemaCatalog::from_file(&config.schema.path, config.schema.strict_methods)?;
        tracing::info!(
            schema = %catalog.name,
            tables = catalog.tables().len(),
            path = %config.schema.path,
            "Loaded schema catalog"
        );
        Ok(Self::with_catalog(config, Arc::new(catalog)))
    }

    /// Create a pipeline over an already-loaded catalog
    pub fn with_catalog(config: CifdbConfig, catalog: Arc<SchemaCatalog>) -> Self {
        let mut prep =
            DataPrep::new(catalog).with_parser(Arc::from(create_source_parser(config.source.format)));
        prep.set_include_list(config.processing.include_tables.clone());
        prep.set_exclude_list(config.processing.exclude_tables.clone());
        Self { config, prep }
    }

    pub fn config(&self) -> &CifdbConfig {
        &self.config
    }

    pub fn prep(&self) -> &DataPrep {
        &self.prep
    }

    /// Inline locators followed by those from the path-list file
    pub fn locators(&self) -> Result<Vec<String>> {
        let mut locators = self.config.source.locators.clone();
        if let Some(path_list) = &self.config.source.path_list {
            locators.extend(read_path_list(path_list)?);
        }
        Ok(locators)
    }

    /// Parse, select, map and reshape every configured locator
    pub async fn prepare(&self) -> Result<PreparedDocuments> {
        let locators = self.locators()?;
        let prep = self.prep.clone();
        let processing = self.config.processing.clone();

        tracing::info!(locators = locators.len(), "Preparing documents");
        tokio::task::spawn_blocking(move || {
            prep.fetch_documents(
                &locators,
                processing.style,
                processing.filters,
                &processing.selectors,
                processing.slice.as_deref(),
            )
        })
        .await
        .map_err(|e| CifdbError::Other(format!("Document preparation task failed: {e}")))
    }

    /// Parse every configured locator into one aggregate document
    ///
    /// Slicing does not apply to the aggregate.
    pub async fn prepare_aggregate(&self) -> Result<(Document, Vec<String>)> {
        let locators = self.locators()?;
        let prep = self.prep.clone();
        let processing = self.config.processing.clone();

        tokio::task::spawn_blocking(move || {
            prep.fetch(
                &locators,
                processing.style,
                processing.filters,
                &processing.selectors,
            )
        })
        .await
        .map_err(|e| CifdbError::Other(format!("Document preparation task failed: {e}")))
    }

    /// Run the full pipeline against the configured store
    pub async fn run(&self) -> Result<LoadSummary> {
        let connector = create_store_connector(&self.config)?;
        self.run_with_connector(connector).await
    }

    /// Run the full pipeline against the given store
    pub async fn run_with_connector(&self, connector: Arc<dyn StoreConnector>) -> Result<LoadSummary> {
        let start = Instant::now();
        let mut summary = LoadSummary::new();
        summary.dry_run = self.config.application.dry_run;
        summary.locators = self.locators()?.len();

        let prepared = self.prepare().await?;
        summary.containers_read = prepared.containers_read;
        summary.rejected_locators = prepared.rejected_locators.clone();
        summary.documents_built = prepared.documents.len();
        summary.cardinality_violations = prepared.cardinality_violations;

        if prepared.documents.is_empty() {
            tracing::warn!("No documents were built; nothing to load");
        } else {
            let loader_config = &self.config.loader;
            let loader = BulkLoader::new(connector, loader_config.options(summary.dry_run));
            let target = LoadTarget::new(&loader_config.database, &loader_config.collection);
            let key_paths = (!loader_config.key_paths.is_empty()).then_some(&loader_config.key_paths[..]);

            let outcome = loader
                .load(
                    &target,
                    loader_config.mode,
                    &prepared.documents,
                    loader_config.index_attributes.as_deref(),
                    key_paths,
                )
                .await;
            for index in &outcome.fail_list {
                if let Some(name) = prepared.container_names.get(*index) {
                    tracing::debug!(container = %name, index, "Document failed to load");
                }
            }
            summary.record_outcome(&outcome);
        }

        let summary = summary.with_duration(start.elapsed());
        summary.log_summary();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::adapters::store::DocumentStore;
    use crate::config::parse_config;
    use std::io::Write;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{
        "name": "pdbx_core",
        "tables": [
            {
                "id": "ENTRY",
                "name": "entry",
                "attributes": [
                    {"id": "ID", "name": "id", "order": 1,
                     "source": {"category": "entry", "attribute": "id"}}
                ],
                "categories": [{"category": "entry"}],
                "unit_cardinality": true
            }
        ]
    }"#;

    fn config(dir: &TempDir, extra: &str) -> CifdbConfig {
        let schema = dir.path().join("schema.json");
        std::fs::write(&schema, CATALOG).unwrap();

        let mut locators = Vec::new();
        for id in ["1ABC", "2XYZ", "3DEF"] {
            let path = dir.path().join(format!("{id}.cif"));
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "data_{id}\n_entry.id {id}").unwrap();
            locators.push(format!("\"{}\"", path.display()));
        }

        parse_config(&format!(
            r#"
[schema]
path = "{}"

[source]
locators = [{}]

[processing]
style = "rowwise_by_name_with_cardinality"

[loader]
collection = "entry"
key_paths = ["entry.id"]
{extra}

[store]
backend = "memory"
"#,
            schema.display(),
            locators.join(", ")
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_loads_every_container() {
        let dir = TempDir::new().unwrap();
        let pipeline = LoadPipeline::new(config(&dir, "")).unwrap();
        let store = Arc::new(MemoryStore::new());

        let summary = pipeline.run_with_connector(store.clone()).await.unwrap();
        assert_eq!(summary.locators, 3);
        assert_eq!(summary.containers_read, 3);
        assert_eq!(summary.documents_built, 3);
        assert_eq!(summary.documents_loaded, 3);
        assert!(summary.is_successful());
        assert_eq!(store.count("cifdb", "entry").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_run_dry_run_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, "");
        config.application.dry_run = true;
        let pipeline = LoadPipeline::new(config).unwrap();
        let store = Arc::new(MemoryStore::new());

        let summary = pipeline.run_with_connector(store.clone()).await.unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.documents_loaded, 3);
        assert!(!store.collection_exists("cifdb", "entry").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreadable_locator_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, "document_limit = 10");
        config.source.locators.push("/nonexistent/9ZZZ.cif".to_string());
        let pipeline = LoadPipeline::new(config).unwrap();

        let summary = pipeline
            .run_with_connector(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert_eq!(summary.rejected_locators, vec!["/nonexistent/9ZZZ.cif"]);
        assert_eq!(summary.documents_loaded, 3);
    }

    #[test]
    fn test_missing_schema_file() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, "");
        config.schema.path = dir.path().join("missing.json").display().to_string();
        assert!(LoadPipeline::new(config).is_err());
    }
}

//! Validate config command implementation
//!
//! This module implements the `validate-config` command, which checks the
//! configuration file and the schema catalog it names.

use super::{EXIT_CONFIG, EXIT_OK};
use crate::adapters::postgresql::client::redact_connection_string;
use crate::config::{load_config, CifdbConfig, StoreBackend};
use crate::schema::SchemaCatalog;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let catalog = match SchemaCatalog::from_file(&config.schema.path, config.schema.strict_methods) {
            Ok(c) => {
                println!("✅ Schema catalog loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load schema catalog {}", config.schema.path);
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let problems = catalog_problems(&config, &catalog);
        if !problems.is_empty() {
            println!("❌ Configuration does not match the schema catalog");
            for problem in &problems {
                println!("   - {problem}");
            }
            return Ok(EXIT_CONFIG);
        }

        println!("✅ Configuration is valid");
        println!();
        print_summary(&config, &catalog);
        Ok(EXIT_OK)
    }
}

/// Selector, slice and table names the configuration uses but the catalog lacks
fn catalog_problems(config: &CifdbConfig, catalog: &SchemaCatalog) -> Vec<String> {
    let processing = &config.processing;
    let mut problems: Vec<String> = processing
        .selectors
        .iter()
        .filter(|name| catalog.data_selectors(name).is_none())
        .map(|name| format!("Undefined data selector '{name}'"))
        .collect();
    if let Some(slice) = &processing.slice {
        if !catalog.has_slice(slice) {
            problems.push(format!("Undefined slice '{slice}'"));
        }
    }
    problems.extend(
        processing
            .include_tables
            .iter()
            .flatten()
            .chain(&processing.exclude_tables)
            .filter(|id| !catalog.has_schema_object(id))
            .map(|id| format!("Unknown table '{id}'")),
    );
    problems
}

fn print_summary(config: &CifdbConfig, catalog: &SchemaCatalog) {
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    println!("  Dry Run: {}", config.application.dry_run);
    println!("  Schema: {} ({} tables)", catalog.name, catalog.tables().len());
    println!("  Source Format: {:?}", config.source.format);
    println!("  Inline Locators: {}", config.source.locators.len());
    if let Some(path_list) = &config.source.path_list {
        println!("  Path List: {path_list}");
    }
    println!("  Style: {}", config.processing.style);
    println!("  Selectors: {:?}", config.processing.selectors);
    if let Some(slice) = &config.processing.slice {
        println!("  Slice: {slice}");
    }
    println!(
        "  Target: {}.{}",
        config.loader.database, config.loader.collection
    );
    println!("  Mode: {}", config.loader.mode);
    println!("  Key Paths: {:?}", config.loader.key_paths);
    println!(
        "  Workers: {} (chunk size {}, max step {})",
        config.loader.concurrency, config.loader.chunk_size, config.loader.max_step_length
    );

    match config.store.backend {
        StoreBackend::PostgreSQL => {
            if let Some(ref pg_config) = config.postgresql {
                use secrecy::ExposeSecret;
                println!("  Store: PostgreSQL");
                println!(
                    "  PostgreSQL Connection: {}",
                    redact_connection_string(pg_config.connection_string.expose_secret().as_str())
                );
                println!("  Max Connections: {}", pg_config.max_connections);
            }
        }
        StoreBackend::Memory => println!("  Store: in-memory"),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    const CATALOG: &str = r#"{
        "name": "core",
        "tables": [{"id": "ENTRY", "name": "entry",
            "attributes": [{"id": "ID", "name": "id", "order": 1,
                            "source": {"category": "entry", "attribute": "id"}}],
            "categories": [{"category": "entry"}]}]
    }"#;

    #[test]
    fn test_catalog_problems() {
        let catalog = SchemaCatalog::from_json_str(CATALOG, true).unwrap();
        let config = parse_config(
            r#"
[schema]
path = "schema.json"
[processing]
selectors = ["PUBLIC_RELEASE"]
slice = "ENTITY"
exclude_tables = ["ENTRY", "ASSEMBLY"]
[loader]
collection = "entry"
[store]
backend = "memory"
"#,
        )
        .unwrap();

        let problems = catalog_problems(&config, &catalog);
        assert_eq!(problems.len(), 3);
        assert!(problems[0].contains("PUBLIC_RELEASE"));
        assert!(problems[1].contains("ENTITY"));
        assert!(problems[2].contains("ASSEMBLY"));
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let args = ValidateArgs::default();
        assert_eq!(args.execute("/nonexistent/cifdb.toml").await.unwrap(), EXIT_CONFIG);
    }
}

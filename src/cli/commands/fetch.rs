//! Fetch command implementation
//!
//! Builds documents exactly as `load` would and writes them as JSON instead
//! of loading them.

use super::{apply_processing_overrides, EXIT_CONFIG, EXIT_FATAL, EXIT_OK, EXIT_PARTIAL};
use crate::config::load_config;
use crate::core::pipeline::LoadPipeline;
use crate::domain::Document;
use clap::Args;
use serde::Serialize;
use std::io::Write;

/// Arguments for the fetch command
#[derive(Args, Debug, Default)]
pub struct FetchArgs {
    /// Write JSON to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Merge all containers into one document
    #[arg(long)]
    pub aggregate: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Override slice name
    #[arg(long)]
    pub slice: Option<String>,

    /// Override document style
    #[arg(long)]
    pub style: Option<String>,

    /// Write only the first N documents
    #[arg(long)]
    pub document_limit: Option<usize>,
}

/// JSON written by the fetch command
#[derive(Debug, Serialize)]
pub struct FetchOutput {
    /// Source container of each document, aligned with `documents`
    pub containers: Vec<String>,
    pub documents: Vec<Document>,
    pub rejected_locators: Vec<String>,
}

impl FetchArgs {
    /// Execute the fetch command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        if let Err(e) =
            apply_processing_overrides(&mut config, self.style.as_deref(), self.slice.as_deref())
        {
            eprintln!("❌ {e}");
            return Ok(EXIT_CONFIG);
        }
        if let Err(e) = config.validate() {
            eprintln!("Configuration validation failed: {e}");
            return Ok(EXIT_CONFIG);
        }

        let pipeline = match LoadPipeline::new(config) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create pipeline");
                eprintln!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let mut output = if self.aggregate {
            match pipeline.prepare_aggregate().await {
                Ok((document, containers)) => FetchOutput {
                    containers,
                    documents: vec![document],
                    rejected_locators: Vec::new(),
                },
                Err(e) => return fatal(e),
            }
        } else {
            match pipeline.prepare().await {
                Ok(prepared) => FetchOutput {
                    containers: prepared.container_names,
                    documents: prepared.documents,
                    rejected_locators: prepared.rejected_locators,
                },
                Err(e) => return fatal(e),
            }
        };
        if let Some(limit) = self.document_limit {
            output.documents.truncate(limit);
            if !self.aggregate {
                output.containers.truncate(limit);
            }
        }

        let json = if self.pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };

        match &self.output {
            Some(path) => {
                std::fs::write(path, json)?;
                eprintln!("✅ Wrote {} documents to {path}", output.documents.len());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{json}")?;
            }
        }
        tracing::info!(
            documents = output.documents.len(),
            rejected = output.rejected_locators.len(),
            "Fetch completed"
        );

        Ok(if output.rejected_locators.is_empty() {
            EXIT_OK
        } else {
            EXIT_PARTIAL
        })
    }
}

fn fatal(error: crate::domain::CifdbError) -> anyhow::Result<i32> {
    tracing::error!(error = %error, "Fetch failed");
    eprintln!("Fetch failed: {error}");
    Ok(EXIT_FATAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_writes_documents() {
        let dir = TempDir::new().unwrap();
        let schema = dir.path().join("schema.json");
        std::fs::write(
            &schema,
            r#"{"name": "core", "tables": [{"id": "ENTRY", "name": "entry",
                "attributes": [{"id": "ID", "name": "id", "order": 1,
                                "source": {"category": "entry", "attribute": "id"}}],
                "categories": [{"category": "entry"}]}]}"#,
        )
        .unwrap();
        let cif = dir.path().join("1abc.cif");
        std::fs::write(&cif, "data_1ABC\n_entry.id 1ABC\n").unwrap();
        let config = dir.path().join("cifdb.toml");
        std::fs::write(
            &config,
            format!(
                "[schema]\npath = \"{}\"\n[source]\nlocators = [\"{}\"]\n[processing]\nstyle = \"rowwise_by_name\"\n[loader]\ncollection = \"entry\"\n[store]\nbackend = \"memory\"\n",
                schema.display(),
                cif.display()
            ),
        )
        .unwrap();
        let output = dir.path().join("out.json");

        let args = FetchArgs {
            output: Some(output.display().to_string()),
            ..FetchArgs::default()
        };
        assert_eq!(args.execute(config.to_str().unwrap()).await.unwrap(), EXIT_OK);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["containers"], serde_json::json!(["1ABC"]));
        assert_eq!(
            written["documents"][0]["entry"],
            serde_json::json!([{"id": "1ABC"}])
        );
    }

    #[tokio::test]
    async fn test_bad_style_is_configuration_error() {
        let args = FetchArgs {
            style: Some("sideways".to_string()),
            ..FetchArgs::default()
        };
        assert_eq!(args.execute("/nonexistent/cifdb.toml").await.unwrap(), EXIT_CONFIG);
    }
}

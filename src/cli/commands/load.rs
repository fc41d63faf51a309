//! Load command implementation
//!
//! This module implements the `load` command: build documents from the
//! configured source files and bulk load them into the document store.

use super::{apply_processing_overrides, EXIT_CONFIG, EXIT_FATAL, EXIT_OK, EXIT_PARTIAL};
use crate::config::load_config;
use crate::core::load::LoadMode;
use crate::core::pipeline::LoadPipeline;
use clap::Args;

/// Arguments for the load command
#[derive(Args, Debug, Default)]
pub struct LoadArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - build documents without writing to the store
    #[arg(long)]
    pub dry_run: bool,

    /// Override load mode (full, append or replace)
    #[arg(long)]
    pub mode: Option<String>,

    /// Override target collection
    #[arg(long)]
    pub collection: Option<String>,

    /// Override slice name
    #[arg(long)]
    pub slice: Option<String>,

    /// Override document style
    #[arg(long)]
    pub style: Option<String>,

    /// Load only the first N documents
    #[arg(long)]
    pub document_limit: Option<usize>,
}

impl LoadArgs {
    /// Execute the load command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting load command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        // Apply CLI overrides
        if let Some(mode) = &self.mode {
            tracing::info!(mode = %mode, "Overriding load mode from CLI");
            config.loader.mode = match mode.parse::<LoadMode>() {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("❌ {e}");
                    return Ok(EXIT_CONFIG);
                }
            };
        }
        if let Some(collection) = &self.collection {
            tracing::info!(collection = %collection, "Overriding collection from CLI");
            config.loader.collection = collection.clone();
        }
        if let Some(limit) = self.document_limit {
            config.loader.document_limit = Some(limit);
        }
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
        if let Err(e) =
            apply_processing_overrides(&mut config, self.style.as_deref(), self.slice.as_deref())
        {
            eprintln!("❌ {e}");
            return Ok(EXIT_CONFIG);
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(EXIT_CONFIG);
        }

        let dry_run = config.application.dry_run;
        if dry_run {
            tracing::info!("Dry run mode enabled - no data will be written");
            println!("🔍 DRY RUN MODE - No data will be written to the store");
            println!();
        }

        // Full mode drops the collection first
        if !self.yes && !dry_run && config.loader.mode == LoadMode::Full {
            println!("Load Configuration:");
            println!(
                "  Target: {}.{}",
                config.loader.database, config.loader.collection
            );
            println!("  Mode: {} (existing collection is dropped)", config.loader.mode);
            println!("  Style: {}", config.processing.style);
            if let Some(slice) = &config.processing.slice {
                println!("  Slice: {slice}");
            }
            println!();
            print!("Proceed with load? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Load cancelled.");
                return Ok(EXIT_OK);
            }
        }

        let pipeline = match LoadPipeline::new(config) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create load pipeline");
                eprintln!("❌ Failed to initialize load: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("🚀 Starting load...");
        println!();

        let summary = match pipeline.run().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Load failed");
                eprintln!("Load failed: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        println!();
        println!("📊 Load Summary:");
        println!("  Locators: {}", summary.locators);
        println!("  Containers Read: {}", summary.containers_read);
        println!("  Rejected Locators: {}", summary.rejected_locators.len());
        println!("  Documents Built: {}", summary.documents_built);
        println!("  Loaded: {}", summary.documents_loaded);
        println!("  Failed: {}", summary.documents_failed);
        if summary.documents_superseded > 0 {
            println!("  Superseded Duplicates: {}", summary.documents_superseded);
        }
        if summary.read_back_mismatches > 0 {
            println!("  Read-back Mismatches: {}", summary.read_back_mismatches);
        }
        if summary.cardinality_violations > 0 {
            println!("  Cardinality Violations: {}", summary.cardinality_violations);
        }
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!("  Success Rate: {:.2}%", summary.success_rate());
        println!();

        if !summary.errors.is_empty() {
            println!("⚠️  Errors encountered:");
            for error in summary.errors.iter().take(10) {
                println!("  - {error}");
            }
            if summary.errors.len() > 10 {
                println!("  ... and {} more errors", summary.errors.len() - 10);
            }
            println!();
        }

        let exit_code = if summary.is_successful() {
            println!("✅ Load completed successfully!");
            EXIT_OK
        } else {
            println!("⚠️  Load completed with failures");
            EXIT_PARTIAL
        };
        Ok(exit_code)
    }
}

//! Core business logic for cifdb.
//!
//! # Modules
//!
//! - [`select`] - Data selectors deciding which containers are admitted
//! - [`mapping`] - Category mapping from source containers onto schema tables
//! - [`reshape`] - Output styles and slicing into documents
//! - [`load`] - Bulk loading into a document store
//! - [`prep`] - Read-side pipeline over one schema catalog
//! - [`pipeline`] - End-to-end load driven by configuration
//!
//! # Load Workflow
//!
//! 1. **Parse**: Read each locator into source containers
//! 2. **Select**: Drop containers failing the configured data selectors
//! 3. **Map**: Build table rows, including derived categories and computed attributes
//! 4. **Reshape**: Serialize rows in the configured style, optionally per slice
//! 5. **Load**: Stripe documents into sub-lists and insert chunks concurrently
//! 6. **Report**: Log a load summary
//!
//! # Example
//!
//! ```rust,no_run
//! use cifdb::config::load_config;
//! use cifdb::core::pipeline::LoadPipeline;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("cifdb.toml")?;
//! let pipeline = LoadPipeline::new(config)?;
//! let summary = pipeline.run().await?;
//!
//! println!("Loaded: {}", summary.documents_loaded);
//! println!("Failed: {}", summary.documents_failed);
//! # Ok(())
//! # }
//! ```

pub mod load;
pub mod mapping;
pub mod pipeline;
pub mod prep;
pub mod reshape;
pub mod select;

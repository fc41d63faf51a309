// cifdb - mmCIF to document store loader
// Copyright (c) 2025 cifdb Contributors
// Licensed under the MIT License

//! # cifdb - mmCIF to document store loader
//!
//! cifdb turns macromolecular structure files (mmCIF) into JSON documents
//! shaped by a schema catalog and bulk loads them into a document store.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Parsing** mmCIF or JSON container files into category tables
//! - **Selecting** containers with named data selectors
//! - **Mapping** categories onto schema tables, including derived categories
//!   and computed attributes
//! - **Reshaping** rows into documents in one of several styles, optionally
//!   partitioned by a slice
//! - **Loading** documents concurrently with per-document success reporting
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Selection, mapping, reshaping, loading and the pipeline
//! - [`schema`] - Schema catalog definitions
//! - [`adapters`] - Source parsers and document stores (PostgreSQL, in-memory)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cifdb::config::load_config;
//! use cifdb::core::pipeline::LoadPipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("cifdb.toml")?;
//!     let pipeline = LoadPipeline::new(config)?;
//!     let summary = pipeline.run().await?;
//!
//!     println!("Loaded {} documents", summary.documents_loaded);
//!     Ok(())
//! }
//! ```
//!
//! ## Building documents without a store
//!
//! ```rust,no_run
//! use cifdb::core::mapping::FilterFlags;
//! use cifdb::core::prep::DataPrep;
//! use cifdb::core::reshape::Style;
//! use cifdb::schema::SchemaCatalog;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = SchemaCatalog::from_file("schema/pdbx_core.json", true)?;
//! let prep = DataPrep::new(Arc::new(catalog));
//!
//! let prepared = prep.fetch_documents(
//!     &["data/1abc.cif"],
//!     Style::RowwiseByName,
//!     FilterFlags::default(),
//!     &["PUBLIC_RELEASE"],
//!     Some("ENTITY"),
//! );
//! println!("{} documents", prepared.documents.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::CifdbError`]. The bulk loader and the
//! document preparation entry points log errors and report them as failed or
//! empty results instead.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod schema;

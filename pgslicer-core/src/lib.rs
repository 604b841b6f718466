//! Core library for pg-slicer.
//!
//! pg-slicer produces a small, loadable PostgreSQL dump: the schema DDL plus
//! a sample of every table in which each mandatory foreign key of a sampled
//! row points at a row that is also in the sample.
//!
//! # Security Guarantees
//! - Sessions are opened read-only
//! - Credentials are zeroed on drop and never logged
//! - Nothing is written until every query has succeeded
//!
//! # Architecture
//! - [`adapters`]: read-only access to the source database behind
//!   [`SourceAdapter`]
//! - [`slicer`]: dependency layering, condition building, sampling and
//!   bulk-load encoding
//! - [`ddl`]: schema rendering
//! - [`dump`]: ties introspection, sampling and rendering together
//!
//! # Example
//! ```rust,no_run
//! use pgslicer_core::{ConnectionConfig, SliceOptions, adapters::create_adapter, dump};
//!
//! # async fn run() -> pgslicer_core::Result<()> {
//! let config = ConnectionConfig::new("shop").with_username("reader");
//! let adapter = create_adapter(&config)?;
//! adapter.test_connection().await?;
//!
//! let dump = dump::generate_dump(adapter.as_ref(), &SliceOptions::new().with_limit(20)).await?;
//! print!("{}", dump.render());
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod ddl;
pub mod dump;
pub mod error;
pub mod logging;
pub mod models;
pub mod security;
pub mod slicer;

// Re-export commonly used types
pub use adapters::{SelectQuery, SourceAdapter, create_adapter};
pub use config::{ConfigFile, ConnectionConfig, SliceOptions};
pub use dump::{Dump, generate_dump};
pub use error::{Result, SlicerError};
pub use models::{CellValue, Column, DatabaseSchema, Relation, RelationKind, Table};
pub use slicer::{SampleContext, SliceOutcome, SliceSummary, Slicer};

//! Bulk product import system.
//!
//! This module turns a batch of product records into catalog rows inside one
//! transaction:
//!
//! 1. **Data Preparation** (`data_builder`) - Stages records into columnar format
//! 2. **Database Operations** (`database_operations`) - Bulk inserts using PostgreSQL UNNEST
//! 3. **Coordination** (`coordinator`) - Orchestrates one import run
//! 4. **Statistics** (`stats`) - Tracks row counts and the caller-facing outcome
//!
//! # Architecture
//!
//! Taxonomy terms are resolved once per distinct name within a run, entry ids
//! are reserved from the entry sequence up front, and each destination table
//! is then written with a single UNNEST insert. Any failure rolls the whole
//! run back, including the resume checkpoint when one is given.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use catalog_importer::catalog::import::BulkImporter;
//! use catalog_importer::catalog::store::PgCatalogStore;
//!
//! let importer = BulkImporter::new(PgCatalogStore::new(pool), ImportConfig::from_env());
//!
//! let outcome = importer.create_products(&records).await;
//! println!("success: {}", outcome.success);
//! ```

pub mod coordinator;
pub mod data_builder;
pub mod data_structures;
pub mod database_operations;
pub mod stats;

// Re-export main types
pub use coordinator::{BatchError, BatchedImport, BulkImporter, ImportCheckpoint};
pub use stats::{ImportOutcome, ImportStats};

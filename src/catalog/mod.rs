//! Product catalog import.
//!
//! Records come in from JSON, CSV or the sample generator, are validated, and
//! are written by [`import::BulkImporter`] through the [`store`] seam. Taxonomy
//! terms are resolved by a [`taxonomy::TaxonomyResolver`] scoped to one run.

pub mod csv_job;
pub mod csv_source;
pub mod database;
pub mod error;
pub mod import;
pub mod pg_config;
pub mod record;
pub mod sample;
pub mod slug;
pub mod store;
pub mod taxonomy;

pub use error::ImportError;
pub use import::{BulkImporter, ImportOutcome, ImportStats};
pub use record::ProductRecord;
pub use store::{CatalogStore, CatalogTransaction, PgCatalogStore, StoreError};
pub use taxonomy::{Taxonomy, TaxonomyResolver};

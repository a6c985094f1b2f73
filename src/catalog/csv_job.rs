//! Resumable CSV import.
//!
//! Each step reads the next `batch_size` data rows after the stored offset
//! and imports them as one run that also advances the checkpoint, so rows and
//! offset commit or roll back together. The run that exhausts the file writes
//! offset 0, so the next invocation starts the file over.

use crate::catalog::csv_source::{self, CsvSourceError};
use crate::catalog::database::{load_import_offset, reset_import_offset};
use crate::catalog::error::ImportError;
use crate::catalog::import::{BulkImporter, ImportCheckpoint, ImportStats};
use crate::catalog::store::CatalogStore;
use rocket_db_pools::sqlx::PgPool;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvJobError {
    #[error(transparent)]
    Source(#[from] CsvSourceError),
    #[error("import of rows after offset {offset} failed: {source}")]
    Import {
        offset: u64,
        #[source]
        source: ImportError,
    },
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] sqlx::Error),
}

/// Summary of one `run_csv_import` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CsvRunReport {
    pub source: String,
    pub start_offset: u64,
    /// Offset the checkpoint points at after this call.
    pub next_offset: u64,
    pub exhausted: bool,
    pub batches: usize,
    pub stats: ImportStats,
}

/// Options for a CSV import call.
#[derive(Debug, Clone, Copy)]
pub struct CsvJobOptions {
    pub batch_size: usize,
    /// Keep importing batches until the file is exhausted.
    pub all: bool,
    /// Discard the stored offset and start from the first data row.
    pub reset: bool,
}

/// Import the next batch (or every remaining batch) of `path`.
///
/// The checkpoint is keyed by the path as given and written by the import
/// transaction itself; a failed batch leaves it where it was.
pub async fn run_csv_import<S: CatalogStore>(
    pool: &PgPool,
    importer: &BulkImporter<S>,
    path: &Path,
    options: CsvJobOptions,
) -> Result<CsvRunReport, CsvJobError> {
    let source = path.display().to_string();

    if options.reset {
        reset_import_offset(pool, &source).await?;
    }

    let start_offset = load_import_offset(pool, &source).await?;
    let mut report = CsvRunReport {
        source: source.clone(),
        start_offset,
        next_offset: start_offset,
        ..CsvRunReport::default()
    };

    log::info!("csv import of {} resuming at row {}", source, start_offset);

    loop {
        let offset = report.next_offset;
        let batch = csv_source::read_file_batch(path, offset, options.batch_size)?;
        let checkpoint = ImportCheckpoint {
            source: &source,
            offset: if batch.exhausted { 0 } else { batch.next_offset },
        };

        let stats = importer
            .try_create_products_at(&batch.records, checkpoint)
            .await
            .map_err(|source| CsvJobError::Import { offset, source })?;

        report.stats.merge(stats);
        report.batches += 1;
        report.exhausted = batch.exhausted;
        report.next_offset = checkpoint.offset;

        if batch.exhausted {
            log::info!("csv import of {} complete, checkpoint reset", source);
            break;
        }
        if !options.all {
            break;
        }
    }

    Ok(report)
}

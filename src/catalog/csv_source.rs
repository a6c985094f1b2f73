//! CSV input for the importer.
//!
//! Rows are deserialized by header name into [`ProductRecord`]s, so column
//! order is free and unknown columns are ignored. Batches are addressed by a
//! row offset counted in data rows (the header is not counted), which lets a
//! caller persist the offset and resume a partially imported file.

use crate::catalog::record::ProductRecord;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvSourceError {
    #[error("failed to open CSV file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("CSV header is missing the required 'name' column")]
    MissingNameColumn,
    #[error("CSV data row {row}: {source}")]
    Row {
        /// 1-based data row number (header excluded).
        row: u64,
        #[source]
        source: csv::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One batch of records read from a CSV source.
#[derive(Debug, Default)]
pub struct CsvBatch {
    pub records: Vec<ProductRecord>,
    /// Offset to pass to the next `read_batch` call.
    pub next_offset: u64,
    /// True when no data rows remain after this batch.
    pub exhausted: bool,
}

fn reader_for<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input)
}

fn check_headers<R: Read>(reader: &mut csv::Reader<R>) -> Result<(), CsvSourceError> {
    let headers = reader.headers()?;
    if !headers.iter().any(|header| header == "name") {
        return Err(CsvSourceError::MissingNameColumn);
    }
    Ok(())
}

/// Read up to `batch_size` records starting after `offset` data rows.
pub fn read_batch<R: Read>(
    input: R,
    offset: u64,
    batch_size: usize,
) -> Result<CsvBatch, CsvSourceError> {
    let mut reader = reader_for(input);
    check_headers(&mut reader)?;

    let headers = reader.headers()?.clone();
    let mut rows = reader.records();
    let mut row_number = 0u64;

    // Skip already imported rows
    while row_number < offset {
        match rows.next() {
            Some(row) => {
                row?;
                row_number += 1;
            }
            None => {
                return Ok(CsvBatch {
                    records: Vec::new(),
                    next_offset: row_number,
                    exhausted: true,
                });
            }
        }
    }

    let mut records = Vec::with_capacity(batch_size);
    while records.len() < batch_size {
        let Some(row) = rows.next() else {
            return Ok(CsvBatch {
                records,
                next_offset: row_number,
                exhausted: true,
            });
        };
        row_number += 1;
        let record: ProductRecord = row
            .and_then(|raw| raw.deserialize(Some(&headers)))
            .map_err(|source| CsvSourceError::Row {
                row: row_number,
                source,
            })?;
        records.push(record);
    }

    let exhausted = rows.next().is_none();
    Ok(CsvBatch {
        records,
        next_offset: row_number,
        exhausted,
    })
}

/// Read every record in the source.
pub fn read_all<R: Read>(input: R) -> Result<Vec<ProductRecord>, CsvSourceError> {
    let mut reader = reader_for(input);
    check_headers(&mut reader)?;

    reader
        .deserialize()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|source| CsvSourceError::Row {
                row: index as u64 + 1,
                source,
            })
        })
        .collect()
}

/// Open `path` and read one batch.
pub fn read_file_batch(
    path: &std::path::Path,
    offset: u64,
    batch_size: usize,
) -> Result<CsvBatch, CsvSourceError> {
    let file = std::fs::File::open(path).map_err(|err| CsvSourceError::Open {
        path: path.display().to_string(),
        source: csv::Error::from(err),
    })?;
    read_batch(std::io::BufReader::new(file), offset, batch_size)
}

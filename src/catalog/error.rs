use crate::catalog::record::RecordError;
use crate::catalog::store::StoreError;
use crate::catalog::taxonomy::Taxonomy;
use thiserror::Error;

/// Errors raised by an import run.
///
/// Validation variants are raised before any transaction is opened; the rest
/// abort an open transaction and roll it back.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("record {index}: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: RecordError,
    },
    #[error("records {first} and {second} share the title {title:?}")]
    DuplicateTitle {
        title: String,
        first: usize,
        second: usize,
    },
    #[error("term name {name:?} in {taxonomy} has no usable characters")]
    InvalidTermName { name: String, taxonomy: Taxonomy },
    #[error("term {slug:?} in {taxonomy} was not resolved before staging")]
    UnresolvedTerm { slug: String, taxonomy: Taxonomy },
    #[error("requested {expected} entry ids, storage reserved {actual}")]
    IdReservation { expected: usize, actual: usize },
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ImportError {
    /// True when the failure is caused by the input rather than storage.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ImportError::InvalidRecord { .. }
                | ImportError::DuplicateTitle { .. }
                | ImportError::InvalidTermName { .. }
        )
    }
}

impl From<sqlx::Error> for ImportError {
    fn from(err: sqlx::Error) -> Self {
        ImportError::Store(StoreError::Database(err))
    }
}

//! Data structures for bulk database operations.
//!
//! These structures hold staged rows in parallel vectors (columnar format)
//! so each destination table is written with a single PostgreSQL UNNEST
//! insert. Every row already carries its concrete entry id: ids are reserved
//! from the entry sequence before staging starts.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Staged catalog entry rows.
///
/// All vectors must have the same length. Each index represents one entry.
#[derive(Debug, Default, Clone)]
pub struct EntriesData {
    pub ids: Vec<i64>,
    pub titles: Vec<String>,
    pub bodies: Vec<String>,
    pub excerpts: Vec<String>,
    pub statuses: Vec<String>,
    pub entry_types: Vec<String>,
    pub author_ids: Vec<i64>,
    pub created_at: Vec<NaiveDateTime>,
    pub created_at_utc: Vec<DateTime<Utc>>,
    pub comment_statuses: Vec<String>,
    pub ping_statuses: Vec<String>,
    pub slugs: Vec<String>,
}

impl EntriesData {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Staged attribute (meta) rows.
///
/// All vectors must have the same length. Each index represents one key/value
/// pair belonging to `entry_ids[i]`.
#[derive(Debug, Default, Clone)]
pub struct AttributesData {
    pub entry_ids: Vec<i64>,
    pub keys: Vec<String>,
    pub values: Vec<String>,
}

impl AttributesData {
    pub fn len(&self) -> usize {
        self.entry_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_ids.is_empty()
    }
}

/// Staged entry-to-term edges.
#[derive(Debug, Default, Clone)]
pub struct RelationshipsData {
    pub entry_ids: Vec<i64>,
    pub term_taxonomy_ids: Vec<i64>,
}

impl RelationshipsData {
    pub fn len(&self) -> usize {
        self.entry_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_ids.is_empty()
    }
}

/// The three row groups produced by staging one run.
#[derive(Debug, Default, Clone)]
pub struct StagedBatch {
    pub entries: EntriesData,
    pub attributes: AttributesData,
    pub relationships: RelationshipsData,
}

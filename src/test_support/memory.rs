//! In-memory catalog store for unit tests.
//!
//! Transactions work on a private copy of the committed state and write it
//! back on commit, so a dropped or rolled-back transaction leaves nothing
//! behind. Every storage call is appended to an operation log, and a single
//! [`FailPoint`] can be armed to make the next matching call fail.

use crate::catalog::import::data_structures::{AttributesData, EntriesData, RelationshipsData};
use crate::catalog::store::{CatalogStore, CatalogTransaction, StoreError, StoreResult};
use crate::catalog::taxonomy::Taxonomy;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Storage call at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    FindTerm,
    InsertTerm,
    ReserveEntryIds,
    InsertEntries,
    InsertAttributes,
    InsertRelationships,
    SaveCheckpoint,
    Commit,
}

/// One recorded storage call. Bulk inserts carry their row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    Begin,
    FindTerm,
    InsertTerm,
    ReserveEntryIds(usize),
    InsertEntries(usize),
    InsertAttributes(usize),
    InsertRelationships(usize),
    SaveCheckpoint(u64),
    Commit,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTerm {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTermTaxonomy {
    pub id: i64,
    pub term_id: i64,
    pub taxonomy: Taxonomy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub entry_type: String,
    pub created_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAttribute {
    pub entry_id: i64,
    pub key: String,
    pub value: String,
}

/// Committed (or working) catalog contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    pub terms: Vec<MemoryTerm>,
    pub term_taxonomies: Vec<MemoryTermTaxonomy>,
    pub entries: Vec<MemoryEntry>,
    pub attributes: Vec<MemoryAttribute>,
    /// `(entry_id, term_taxonomy_id)` pairs.
    pub relationships: Vec<(i64, i64)>,
    /// Row offset per import source.
    pub checkpoints: HashMap<String, u64>,
    next_term_id: i64,
    next_term_taxonomy_id: i64,
}

impl MemoryCatalog {
    fn find_term(&self, slug: &str, taxonomy: Taxonomy) -> Option<i64> {
        self.term_taxonomies
            .iter()
            .filter(|tt| tt.taxonomy == taxonomy)
            .find(|tt| {
                self.terms
                    .iter()
                    .any(|term| term.id == tt.term_id && term.slug == slug)
            })
            .map(|tt| tt.id)
    }

    fn insert_term(&mut self, name: &str, slug: &str, taxonomy: Taxonomy) -> i64 {
        self.next_term_id += 1;
        self.next_term_taxonomy_id += 1;
        self.terms.push(MemoryTerm {
            id: self.next_term_id,
            name: name.to_string(),
            slug: slug.to_string(),
        });
        self.term_taxonomies.push(MemoryTermTaxonomy {
            id: self.next_term_taxonomy_id,
            term_id: self.next_term_id,
            taxonomy,
        });
        self.next_term_taxonomy_id
    }
}

#[derive(Debug, Default)]
struct Shared {
    committed: MemoryCatalog,
    // Entry ids come from a sequence outside transactional control
    next_entry_id: i64,
    fail_at: Option<FailPoint>,
    operations: Vec<StoreOperation>,
}

impl Shared {
    fn record(&mut self, operation: StoreOperation, point: Option<FailPoint>) -> StoreResult<()> {
        self.operations.push(operation);
        match (point, self.fail_at) {
            (Some(point), Some(armed)) if point == armed => {
                self.fail_at = None;
                Err(StoreError::Backend(format!("injected failure at {:?}", point)))
            }
            _ => Ok(()),
        }
    }
}

/// Cloneable handle to one in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure for the next call matching `point`.
    pub fn fail_at(&self, point: FailPoint) {
        self.shared.lock().fail_at = Some(point);
    }

    /// Insert a committed term directly, returning its term-taxonomy id.
    pub fn seed_term(&self, name: &str, slug: &str, taxonomy: Taxonomy) -> i64 {
        self.shared.lock().committed.insert_term(name, slug, taxonomy)
    }

    /// Delete every committed term, cascading to the relationships that
    /// reference them, as an outside writer would.
    pub fn clear_terms(&self) {
        let mut shared = self.shared.lock();
        let catalog = &mut shared.committed;
        catalog.terms.clear();
        catalog.term_taxonomies.clear();
        catalog.relationships.clear();
    }

    pub fn committed(&self) -> MemoryCatalog {
        self.shared.lock().committed.clone()
    }

    pub fn operations(&self) -> Vec<StoreOperation> {
        self.shared.lock().operations.clone()
    }
}

#[rocket::async_trait]
impl CatalogStore for MemoryCatalogStore {
    type Transaction = MemoryCatalogTransaction;

    async fn begin(&self) -> StoreResult<MemoryCatalogTransaction> {
        let working = {
            let mut shared = self.shared.lock();
            shared.record(StoreOperation::Begin, None)?;
            shared.committed.clone()
        };

        Ok(MemoryCatalogTransaction {
            shared: Arc::clone(&self.shared),
            working,
        })
    }
}

/// Open transaction over a private working copy.
#[derive(Debug)]
pub struct MemoryCatalogTransaction {
    shared: Arc<Mutex<Shared>>,
    working: MemoryCatalog,
}

impl MemoryCatalogTransaction {
    /// Uncommitted view of the catalog as seen by this transaction.
    pub fn snapshot(&self) -> &MemoryCatalog {
        &self.working
    }

    fn record(&self, operation: StoreOperation, point: FailPoint) -> StoreResult<()> {
        self.shared.lock().record(operation, Some(point))
    }
}

fn check_lengths(expected: usize, columns: &[usize]) -> StoreResult<()> {
    if columns.iter().any(|&len| len != expected) {
        return Err(StoreError::Backend(
            "staged columns differ in length".to_string(),
        ));
    }
    Ok(())
}

#[rocket::async_trait]
impl CatalogTransaction for MemoryCatalogTransaction {
    async fn find_term(&mut self, slug: &str, taxonomy: Taxonomy) -> StoreResult<Option<i64>> {
        self.record(StoreOperation::FindTerm, FailPoint::FindTerm)?;
        Ok(self.working.find_term(slug, taxonomy))
    }

    async fn insert_term(
        &mut self,
        name: &str,
        slug: &str,
        taxonomy: Taxonomy,
    ) -> StoreResult<i64> {
        self.record(StoreOperation::InsertTerm, FailPoint::InsertTerm)?;
        if self.working.find_term(slug, taxonomy).is_some() {
            return Err(StoreError::Backend(format!(
                "duplicate term '{}' in {}",
                slug, taxonomy
            )));
        }
        Ok(self.working.insert_term(name, slug, taxonomy))
    }

    async fn reserve_entry_ids(&mut self, count: usize) -> StoreResult<Vec<i64>> {
        let mut shared = self.shared.lock();
        shared.record(
            StoreOperation::ReserveEntryIds(count),
            Some(FailPoint::ReserveEntryIds),
        )?;
        let first = shared.next_entry_id + 1;
        shared.next_entry_id += count as i64;
        Ok((first..=shared.next_entry_id).collect())
    }

    async fn insert_entries(&mut self, data: &EntriesData) -> StoreResult<usize> {
        self.record(StoreOperation::InsertEntries(data.len()), FailPoint::InsertEntries)?;
        check_lengths(
            data.len(),
            &[
                data.titles.len(),
                data.slugs.len(),
                data.statuses.len(),
                data.entry_types.len(),
                data.created_at_utc.len(),
            ],
        )?;

        for index in 0..data.len() {
            let id = data.ids[index];
            if self.working.entries.iter().any(|entry| entry.id == id) {
                return Err(StoreError::Backend(format!("duplicate entry id {}", id)));
            }
            self.working.entries.push(MemoryEntry {
                id,
                title: data.titles[index].clone(),
                slug: data.slugs[index].clone(),
                status: data.statuses[index].clone(),
                entry_type: data.entry_types[index].clone(),
                created_at_utc: data.created_at_utc[index],
            });
        }
        Ok(data.len())
    }

    async fn insert_attributes(&mut self, data: &AttributesData) -> StoreResult<usize> {
        self.record(
            StoreOperation::InsertAttributes(data.len()),
            FailPoint::InsertAttributes,
        )?;
        check_lengths(data.len(), &[data.keys.len(), data.values.len()])?;

        for index in 0..data.len() {
            let (entry_id, key) = (data.entry_ids[index], &data.keys[index]);
            if !self.working.entries.iter().any(|entry| entry.id == entry_id) {
                return Err(StoreError::Backend(format!(
                    "attribute references missing entry {}",
                    entry_id
                )));
            }
            if self
                .working
                .attributes
                .iter()
                .any(|attr| attr.entry_id == entry_id && &attr.key == key)
            {
                return Err(StoreError::Backend(format!(
                    "duplicate attribute {} on entry {}",
                    key, entry_id
                )));
            }
            self.working.attributes.push(MemoryAttribute {
                entry_id,
                key: key.clone(),
                value: data.values[index].clone(),
            });
        }
        Ok(data.len())
    }

    async fn insert_relationships(&mut self, data: &RelationshipsData) -> StoreResult<usize> {
        self.record(
            StoreOperation::InsertRelationships(data.len()),
            FailPoint::InsertRelationships,
        )?;
        check_lengths(data.len(), &[data.term_taxonomy_ids.len()])?;

        for (&entry_id, &term_taxonomy_id) in data.entry_ids.iter().zip(&data.term_taxonomy_ids) {
            if !self
                .working
                .term_taxonomies
                .iter()
                .any(|tt| tt.id == term_taxonomy_id)
            {
                return Err(StoreError::Backend(format!(
                    "relationship references missing term taxonomy {}",
                    term_taxonomy_id
                )));
            }
            let edge = (entry_id, term_taxonomy_id);
            if self.working.relationships.contains(&edge) {
                return Err(StoreError::Backend(format!(
                    "duplicate relationship {:?}",
                    edge
                )));
            }
            self.working.relationships.push(edge);
        }
        Ok(data.len())
    }

    async fn save_checkpoint(&mut self, source: &str, offset: u64) -> StoreResult<()> {
        self.record(StoreOperation::SaveCheckpoint(offset), FailPoint::SaveCheckpoint)?;
        self.working.checkpoints.insert(source.to_string(), offset);
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        let mut shared = self.shared.lock();
        shared.record(StoreOperation::Commit, Some(FailPoint::Commit))?;
        shared.committed = self.working;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.shared.lock().record(StoreOperation::Rollback, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = MemoryCatalogStore::new();
        let mut tx = store.begin().await.expect("begin");
        tx.insert_term("Tools", "tools", Taxonomy::Category)
            .await
            .expect("insert");

        assert_eq!(tx.snapshot().terms.len(), 1);
        assert!(store.committed().terms.is_empty());

        tx.rollback().await.expect("rollback");
        assert!(store.committed().terms.is_empty());
    }

    #[tokio::test]
    async fn test_reserved_ids_are_not_reused_after_rollback() {
        let store = MemoryCatalogStore::new();

        let mut first = store.begin().await.expect("begin");
        let ids = first.reserve_entry_ids(2).await.expect("reserve");
        first.rollback().await.expect("rollback");

        let mut second = store.begin().await.expect("begin");
        let next = second.reserve_entry_ids(1).await.expect("reserve");

        assert_eq!(ids, vec![1, 2]);
        assert_eq!(next, vec![3]);
    }

    #[tokio::test]
    async fn test_relationship_to_missing_term_is_rejected() {
        let store = MemoryCatalogStore::new();
        let mut tx = store.begin().await.expect("begin");
        let ids = tx.reserve_entry_ids(1).await.expect("reserve");
        let edges = RelationshipsData {
            entry_ids: ids,
            term_taxonomy_ids: vec![42],
        };

        let err = tx
            .insert_relationships(&edges)
            .await
            .expect_err("dangling term");
        assert!(err.to_string().contains("missing term taxonomy 42"));
    }

    #[tokio::test]
    async fn test_fail_point_fires_once() {
        let store = MemoryCatalogStore::new();
        store.fail_at(FailPoint::FindTerm);
        let mut tx = store.begin().await.expect("begin");

        assert!(tx.find_term("a", Taxonomy::Tag).await.is_err());
        assert!(tx.find_term("a", Taxonomy::Tag).await.is_ok());
    }
}

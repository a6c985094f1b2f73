//! Import coordination for bulk product operations.
//!
//! The BulkImporter runs one import as a single transaction:
//! 1. Validate records
//! 2. Resolve the product-type term and every distinct category/tag term
//! 3. Reserve one entry id per record
//! 4. Stage entries, attributes and relationships in memory
//! 5. Flush each row group with one bulk insert
//! 6. Advance the resume checkpoint, when the caller supplies one
//! 7. Commit, or roll back on any error

use crate::catalog::error::ImportError;
use crate::catalog::import::data_builder::{self, StagingContext};
use crate::catalog::import::stats::{ImportOutcome, ImportStats};
use crate::catalog::record::ProductRecord;
use crate::catalog::store::{CatalogStore, CatalogTransaction};
use crate::catalog::taxonomy::{Taxonomy, TaxonomyResolver};
use crate::config::{DuplicateTitles, ImportConfig};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Totals for an import split into several runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchedImport {
    pub stats: ImportStats,
    pub batches: usize,
}

/// A chunked import that stopped at a failing run.
#[derive(Debug, Error)]
#[error("batch {batch} failed after {} committed batches: {source}", .committed.batches)]
pub struct BatchError {
    /// 0-based index of the failing chunk.
    pub batch: usize,
    pub committed: BatchedImport,
    #[source]
    pub source: ImportError,
}

/// Resume position written in the same transaction as the rows it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportCheckpoint<'a> {
    pub source: &'a str,
    pub offset: u64,
}

/// Coordinates bulk import runs against a catalog store.
///
/// Every run resolves taxonomy terms through its own [`TaxonomyResolver`],
/// so nothing cached by one run is trusted by the next.
///
/// Runs must not overlap on one store; `PgCatalogStore` enforces this with a
/// transaction-scoped advisory lock.
pub struct BulkImporter<S> {
    store: S,
    config: ImportConfig,
}

impl<S: CatalogStore> BulkImporter<S> {
    pub fn new(store: S, config: ImportConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Import `records` and report the result as an [`ImportOutcome`].
    ///
    /// This is the caller-facing entry point: errors are folded into
    /// `{success: false, error}` after the transaction has been rolled back.
    pub async fn create_products(&self, records: &[ProductRecord]) -> ImportOutcome {
        match self.try_create_products(records).await {
            Ok(stats) => ImportOutcome::completed(stats.records),
            Err(err) => {
                log::error!("product import failed: {}", err);
                ImportOutcome::failed(err.to_string())
            }
        }
    }

    /// Import `records` in one transaction, returning typed statistics.
    ///
    /// # Errors
    /// Validation errors are returned before any storage call. Every other
    /// error is returned after the transaction has been rolled back.
    pub async fn try_create_products(
        &self,
        records: &[ProductRecord],
    ) -> Result<ImportStats, ImportError> {
        self.run(records, None).await
    }

    /// Import `records` and advance `checkpoint` in the same transaction.
    ///
    /// The checkpoint is written even when `records` is empty. If the run
    /// fails, neither the rows nor the new offset are committed.
    pub async fn try_create_products_at(
        &self,
        records: &[ProductRecord],
        checkpoint: ImportCheckpoint<'_>,
    ) -> Result<ImportStats, ImportError> {
        self.run(records, Some(checkpoint)).await
    }

    /// Import `records` as consecutive runs of at most `batch_size` records.
    ///
    /// Each chunk commits on its own. The first failing chunk stops the loop;
    /// chunks committed before it stay committed and are counted in the
    /// returned error.
    pub async fn import_in_batches(
        &self,
        records: &[ProductRecord],
        batch_size: usize,
    ) -> Result<BatchedImport, BatchError> {
        let batch_size = batch_size.max(1);
        let total_batches = records.len().div_ceil(batch_size);
        let mut report = BatchedImport::default();

        for (idx, chunk) in records.chunks(batch_size).enumerate() {
            match self.try_create_products(chunk).await {
                Ok(stats) => {
                    report.stats.merge(stats);
                    report.batches += 1;
                }
                Err(source) => {
                    return Err(BatchError {
                        batch: idx,
                        committed: report,
                        source,
                    });
                }
            }

            if (idx + 1) % 10 == 0 || idx + 1 == total_batches {
                log::debug!("imported batch {}/{}", idx + 1, total_batches);
            }
        }

        Ok(report)
    }

    async fn run(
        &self,
        records: &[ProductRecord],
        checkpoint: Option<ImportCheckpoint<'_>>,
    ) -> Result<ImportStats, ImportError> {
        validate_records(records, self.config.duplicate_titles)?;

        if records.is_empty() && checkpoint.is_none() {
            log::debug!("empty import batch, nothing to write");
            return Ok(ImportStats::default());
        }

        log::info!("importing {} products", records.len());

        let mut tx = self.store.begin().await?;
        let mut resolver = TaxonomyResolver::new();

        match self.write_run(&mut tx, records, &mut resolver, checkpoint).await {
            Ok(mut stats) => {
                tx.commit().await?;
                stats.terms_created = resolver.created_count();

                log::info!(
                    "import committed: {} entries, {} attributes, {} relationships, {} new terms",
                    stats.entries,
                    stats.attributes,
                    stats.relationships,
                    stats.terms_created
                );
                Ok(stats)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    log::warn!("rollback after failed import also failed: {}", rollback_err);
                }
                log::warn!("import rolled back: {}", err);
                Err(err)
            }
        }
    }

    async fn write_run(
        &self,
        tx: &mut S::Transaction,
        records: &[ProductRecord],
        resolver: &mut TaxonomyResolver,
        checkpoint: Option<ImportCheckpoint<'_>>,
    ) -> Result<ImportStats, ImportError> {
        let stats = if records.is_empty() {
            ImportStats::default()
        } else {
            self.stage_and_flush(tx, records, resolver).await?
        };

        if let Some(checkpoint) = checkpoint {
            tx.save_checkpoint(checkpoint.source, checkpoint.offset).await?;
        }

        Ok(stats)
    }

    async fn stage_and_flush(
        &self,
        tx: &mut S::Transaction,
        records: &[ProductRecord],
        resolver: &mut TaxonomyResolver,
    ) -> Result<ImportStats, ImportError> {
        // Phase 1: resolve shared terms once, outside the per-record loop
        let type_name = data_builder::product_type_name(&self.config);
        resolver.resolve(tx, &type_name, Taxonomy::ProductType).await?;
        for (name, taxonomy) in data_builder::collect_term_requests(records, &self.config) {
            resolver.resolve(tx, name, taxonomy).await?;
        }

        // Phase 2: reserve entry ids so staged rows carry concrete owners
        let entry_ids = tx.reserve_entry_ids(records.len()).await?;

        // Phase 3: stage in memory
        let context = StagingContext {
            config: &self.config,
            now: Utc::now(),
        };
        let batch = data_builder::stage_products(records, &entry_ids, resolver, &context)?;

        // Phase 4: one bulk insert per table
        let mut stats = ImportStats {
            records: records.len(),
            ..ImportStats::default()
        };

        if !batch.entries.is_empty() {
            stats.entries = tx.insert_entries(&batch.entries).await?;
        }
        if !batch.attributes.is_empty() {
            stats.attributes = tx.insert_attributes(&batch.attributes).await?;
        }
        if !batch.relationships.is_empty() {
            stats.relationships = tx.insert_relationships(&batch.relationships).await?;
        }

        Ok(stats)
    }
}

/// Check names and the duplicate-title policy before any storage call.
fn validate_records(records: &[ProductRecord], policy: DuplicateTitles) -> Result<(), ImportError> {
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        record
            .validate()
            .map_err(|source| ImportError::InvalidRecord { index, source })?;

        if policy == DuplicateTitles::Reject {
            if let Some(&first) = seen.get(record.title()) {
                return Err(ImportError::DuplicateTitle {
                    title: record.title().to_string(),
                    first,
                    second: index,
                });
            }
            seen.insert(record.title(), index);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::import::data_builder::AttributeKey;
    use crate::config::TaxonomyAssignment;
    use crate::test_support::memory::{FailPoint, MemoryCatalogStore, StoreOperation};
    use std::collections::HashSet;

    fn importer(
        store: &MemoryCatalogStore,
        config: ImportConfig,
    ) -> BulkImporter<MemoryCatalogStore> {
        BulkImporter::new(store.clone(), config)
    }

    fn abc_records() -> Vec<ProductRecord> {
        ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, name)| ProductRecord {
                sku: Some(format!("SKU-{}", i + 1)),
                regular_price: Some("10".to_string()),
                ..ProductRecord::named(*name)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_three_record_scenario() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());

        let outcome = importer.create_products(&abc_records()).await;

        assert_eq!(outcome, ImportOutcome::completed(3));
        let state = store.committed();
        assert_eq!(state.entries.len(), 3);
        assert_eq!(state.attributes.len(), 27);
        assert_eq!(state.relationships.len(), 9);
    }

    #[tokio::test]
    async fn test_each_table_is_written_with_one_insert() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());

        importer
            .try_create_products(&abc_records())
            .await
            .expect("import");

        let ops = store.operations();
        let count = |wanted: StoreOperation| ops.iter().filter(|op| **op == wanted).count();
        assert_eq!(count(StoreOperation::Begin), 1);
        assert_eq!(count(StoreOperation::InsertEntries(3)), 1);
        assert_eq!(count(StoreOperation::InsertAttributes(27)), 1);
        assert_eq!(count(StoreOperation::InsertRelationships(9)), 1);
        assert_eq!(count(StoreOperation::ReserveEntryIds(3)), 1);
        // type + default category + default tag
        assert_eq!(count(StoreOperation::FindTerm), 3);
        assert_eq!(ops.last(), Some(&StoreOperation::Commit));
    }

    #[tokio::test]
    async fn test_entries_have_full_attribute_vocabulary_and_relationships() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());
        importer
            .try_create_products(&abc_records())
            .await
            .expect("import");

        let state = store.committed();
        let expected: HashSet<&str> = AttributeKey::ALL.iter().map(|key| key.as_str()).collect();
        for entry in &state.entries {
            let keys: Vec<&str> = state
                .attributes
                .iter()
                .filter(|attr| attr.entry_id == entry.id)
                .map(|attr| attr.key.as_str())
                .collect();
            assert_eq!(keys.len(), AttributeKey::ALL.len());
            assert_eq!(keys.iter().copied().collect::<HashSet<_>>(), expected);

            let edges = state
                .relationships
                .iter()
                .filter(|(entry_id, _)| *entry_id == entry.id)
                .count();
            assert!(edges >= 1);
        }
    }

    #[tokio::test]
    async fn test_empty_input_touches_no_storage() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());

        let outcome = importer.create_products(&[]).await;

        assert_eq!(outcome, ImportOutcome::completed(0));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn test_attribute_flush_failure_rolls_back_everything() {
        let store = MemoryCatalogStore::new();
        store.fail_at(FailPoint::InsertAttributes);
        let importer = importer(&store, ImportConfig::default());

        let outcome = importer.create_products(&abc_records()).await;

        assert!(!outcome.success);
        assert!(outcome.error.is_some());
        let state = store.committed();
        assert!(state.entries.is_empty());
        assert!(state.attributes.is_empty());
        assert!(state.relationships.is_empty());
        assert!(state.terms.is_empty());
        assert_eq!(store.operations().last(), Some(&StoreOperation::Rollback));
    }

    #[tokio::test]
    async fn test_commit_failure_leaves_no_rows() {
        let store = MemoryCatalogStore::new();
        store.fail_at(FailPoint::Commit);
        let importer = importer(&store, ImportConfig::default());

        let result = importer.try_create_products(&abc_records()).await;

        assert!(matches!(result, Err(ImportError::Store(_))));
        assert!(store.committed().entries.is_empty());
    }

    #[tokio::test]
    async fn test_blank_name_fails_before_storage() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());
        let records = vec![ProductRecord::named("ok"), ProductRecord::named("  ")];

        let err = importer
            .try_create_products(&records)
            .await
            .expect_err("invalid");

        assert!(matches!(err, ImportError::InvalidRecord { index: 1, .. }));
        assert!(err.is_invalid_input());
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_titles_rejected_by_default() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());
        let records = vec![ProductRecord::named("Dup"), ProductRecord::named("Dup")];

        let err = importer
            .try_create_products(&records)
            .await
            .expect_err("duplicate");

        assert!(matches!(
            err,
            ImportError::DuplicateTitle {
                first: 0,
                second: 1,
                ..
            }
        ));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_titles_allowed_get_distinct_entries() {
        let store = MemoryCatalogStore::new();
        let config = ImportConfig {
            duplicate_titles: DuplicateTitles::Allow,
            ..ImportConfig::default()
        };
        let importer = importer(&store, config);
        let records = vec![
            ProductRecord {
                sku: Some("DUP-1".to_string()),
                ..ProductRecord::named("Dup")
            },
            ProductRecord {
                sku: Some("DUP-2".to_string()),
                ..ProductRecord::named("Dup")
            },
        ];

        importer
            .try_create_products(&records)
            .await
            .expect("import");

        let state = store.committed();
        assert_eq!(state.entries.len(), 2);
        let (first, second) = (state.entries[0].id, state.entries[1].id);
        assert_ne!(first, second);

        // Each entry owns the SKU of the record it was staged from
        let sku_of = |entry_id: i64| {
            state
                .attributes
                .iter()
                .find(|attr| attr.entry_id == entry_id && attr.key == "_sku")
                .map(|attr| attr.value.clone())
        };
        assert_eq!(sku_of(first).as_deref(), Some("DUP-1"));
        assert_eq!(sku_of(second).as_deref(), Some("DUP-2"));
    }

    #[tokio::test]
    async fn test_second_run_finds_committed_terms() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());

        let first = importer
            .try_create_products(&[ProductRecord::named("One")])
            .await
            .expect("first run");
        let second = importer
            .try_create_products(&[ProductRecord::named("Two")])
            .await
            .expect("second run");

        assert_eq!(first.terms_created, 3);
        assert_eq!(second.terms_created, 0);
        assert_eq!(store.committed().term_taxonomies.len(), 3);
        // Each run looks its terms up again
        let lookups = store
            .operations()
            .into_iter()
            .filter(|op| *op == StoreOperation::FindTerm)
            .count();
        assert_eq!(lookups, 6);
    }

    #[tokio::test]
    async fn test_terms_deleted_between_runs_are_recreated() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());

        importer
            .try_create_products(&[ProductRecord::named("One")])
            .await
            .expect("first run");
        store.clear_terms();

        let second = importer
            .try_create_products(&[ProductRecord::named("Two")])
            .await
            .expect("second run");

        assert_eq!(second.terms_created, 3);
        let state = store.committed();
        assert_eq!(state.term_taxonomies.len(), 3);
        assert_eq!(state.relationships.len(), 3);
        for (_, term_taxonomy_id) in &state.relationships {
            assert!(state.term_taxonomies.iter().any(|tt| tt.id == *term_taxonomy_id));
        }
    }

    #[tokio::test]
    async fn test_checkpoint_commits_with_the_rows() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());
        let checkpoint = ImportCheckpoint {
            source: "feed.csv",
            offset: 3,
        };

        importer
            .try_create_products_at(&abc_records(), checkpoint)
            .await
            .expect("import");

        let state = store.committed();
        assert_eq!(state.entries.len(), 3);
        assert_eq!(state.checkpoints.get("feed.csv"), Some(&3));
        let ops = store.operations();
        let position = |wanted: StoreOperation| {
            ops.iter()
                .position(|op| *op == wanted)
                .expect("operation recorded")
        };
        assert!(position(StoreOperation::SaveCheckpoint(3)) < position(StoreOperation::Commit));
    }

    #[tokio::test]
    async fn test_checkpoint_failure_commits_no_entries() {
        let store = MemoryCatalogStore::new();
        store.fail_at(FailPoint::SaveCheckpoint);
        let importer = importer(&store, ImportConfig::default());
        let checkpoint = ImportCheckpoint {
            source: "feed.csv",
            offset: 3,
        };

        let result = importer
            .try_create_products_at(&abc_records(), checkpoint)
            .await;

        assert!(matches!(result, Err(ImportError::Store(_))));
        let state = store.committed();
        assert!(state.entries.is_empty());
        assert!(state.attributes.is_empty());
        assert!(state.terms.is_empty());
        assert!(state.checkpoints.is_empty());
        assert_eq!(store.operations().last(), Some(&StoreOperation::Rollback));
    }

    #[tokio::test]
    async fn test_checkpoint_without_records_is_still_saved() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());
        let checkpoint = ImportCheckpoint {
            source: "feed.csv",
            offset: 0,
        };

        let stats = importer
            .try_create_products_at(&[], checkpoint)
            .await
            .expect("checkpoint only");

        assert_eq!(stats, ImportStats::default());
        assert_eq!(
            store.operations(),
            vec![
                StoreOperation::Begin,
                StoreOperation::SaveCheckpoint(0),
                StoreOperation::Commit
            ]
        );
        assert_eq!(store.committed().checkpoints.get("feed.csv"), Some(&0));
    }

    #[tokio::test]
    async fn test_fixed_assignment_links_default_terms_only() {
        let store = MemoryCatalogStore::new();
        let config = ImportConfig {
            taxonomy_assignment: TaxonomyAssignment::Fixed,
            default_category: "Test Category".to_string(),
            default_tag: "test".to_string(),
            ..ImportConfig::default()
        };
        let importer = importer(&store, config);
        let records = vec![ProductRecord {
            categories: Some("Ignored".to_string()),
            tags: Some("also, ignored".to_string()),
            ..ProductRecord::named("Fixed")
        }];

        let stats = importer
            .try_create_products(&records)
            .await
            .expect("import");

        assert_eq!(stats.relationships, 3);
        let slugs: HashSet<String> = store
            .committed()
            .terms
            .iter()
            .map(|term| term.slug.clone())
            .collect();
        assert!(slugs.contains("test-category"));
        assert!(!slugs.contains("ignored"));
    }

    #[tokio::test]
    async fn test_slug_is_stable_across_runs() {
        let config = ImportConfig {
            duplicate_titles: DuplicateTitles::Allow,
            ..ImportConfig::default()
        };
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, config);

        for _ in 0..2 {
            importer
                .try_create_products(&[ProductRecord::named("Same Title!")])
                .await
                .expect("import");
        }

        let state = store.committed();
        assert_eq!(state.entries.len(), 2);
        assert_eq!(state.entries[0].slug, "same-title");
        assert_eq!(state.entries[0].slug, state.entries[1].slug);
    }

    #[tokio::test]
    async fn test_import_in_batches_commits_each_chunk() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());
        let records: Vec<ProductRecord> = (1..=5)
            .map(|i| ProductRecord::named(format!("Item {i}")))
            .collect();

        let report = importer
            .import_in_batches(&records, 2)
            .await
            .expect("import");

        assert_eq!(report.batches, 3);
        assert_eq!(report.stats.records, 5);
        assert_eq!(report.stats.attributes, 45);
        let commits = store
            .operations()
            .into_iter()
            .filter(|op| *op == StoreOperation::Commit)
            .count();
        assert_eq!(commits, 3);
    }

    #[tokio::test]
    async fn test_import_in_batches_stops_at_failing_chunk() {
        let store = MemoryCatalogStore::new();
        let importer = importer(&store, ImportConfig::default());
        let records = vec![
            ProductRecord::named("First"),
            ProductRecord::named("Second"),
            ProductRecord::named(" "),
            ProductRecord::named("Fourth"),
        ];

        let err = importer
            .import_in_batches(&records, 2)
            .await
            .expect_err("second chunk is invalid");

        assert_eq!(err.batch, 1);
        assert_eq!(err.committed.batches, 1);
        assert!(matches!(err.source, ImportError::InvalidRecord { index: 0, .. }));
        assert_eq!(store.committed().entries.len(), 2);
    }
}

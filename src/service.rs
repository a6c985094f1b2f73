//! Import state managed by Rocket.
//!
//! The service holds no term cache of its own. Every request imports through
//! runs that resolve their terms afresh, so terms removed between requests
//! are looked up (or recreated) instead of served from memory.

use crate::catalog::import::{BatchError, BatchedImport, BulkImporter};
use crate::catalog::store::{CatalogStore, PgCatalogStore};
use crate::catalog::{ImportError, ImportStats, ProductRecord};
use crate::config::ImportConfig;

pub struct ImportService<S = PgCatalogStore> {
    importer: BulkImporter<S>,
}

impl<S: CatalogStore> ImportService<S> {
    pub fn new(store: S, config: ImportConfig) -> Self {
        Self {
            importer: BulkImporter::new(store, config),
        }
    }

    pub fn config(&self) -> &ImportConfig {
        self.importer.config()
    }

    /// Import `records` as one transaction.
    pub async fn import(&self, records: &[ProductRecord]) -> Result<ImportStats, ImportError> {
        self.importer.try_create_products(records).await
    }

    /// Import `records` in runs of the configured batch size.
    pub async fn import_batched(
        &self,
        records: &[ProductRecord],
    ) -> Result<BatchedImport, BatchError> {
        self.importer
            .import_in_batches(records, self.config().batch_size)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory::MemoryCatalogStore;

    #[tokio::test]
    async fn test_terms_removed_between_requests_are_resolved_again() {
        let store = MemoryCatalogStore::new();
        let service = ImportService::new(store.clone(), ImportConfig::default());

        service
            .import(&[ProductRecord::named("One")])
            .await
            .expect("first");
        store.clear_terms();

        let second = service
            .import(&[ProductRecord::named("Two")])
            .await
            .expect("second");

        assert_eq!(second.terms_created, 3);
        let state = store.committed();
        assert_eq!(state.term_taxonomies.len(), 3);
        let live: Vec<i64> = state.term_taxonomies.iter().map(|tt| tt.id).collect();
        assert!(
            state
                .relationships
                .iter()
                .all(|(_, term_taxonomy_id)| live.contains(term_taxonomy_id))
        );
    }

    #[tokio::test]
    async fn test_batched_import_uses_configured_batch_size() {
        let store = MemoryCatalogStore::new();
        let config = ImportConfig {
            batch_size: 4,
            ..ImportConfig::default()
        };
        let service = ImportService::new(store.clone(), config);
        let records: Vec<ProductRecord> = (0..10)
            .map(|i| ProductRecord::named(format!("P{i}")))
            .collect();

        let report = service.import_batched(&records).await.expect("import");

        assert_eq!(report.batches, 3);
        assert_eq!(store.committed().entries.len(), 10);
    }
}

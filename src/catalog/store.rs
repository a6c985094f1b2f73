//! Storage seam for the importer.
//!
//! [`CatalogStore`] opens transactions; [`CatalogTransaction`] exposes the
//! handful of primitives an import run needs: term lookup, term
//! insert-and-return-id, entry id reservation, the three bulk inserts, the
//! resumable-import checkpoint, and commit/rollback. [`PgCatalogStore`] is
//! the PostgreSQL implementation used by the server and the CLI.

use crate::catalog::database::checkpoint;
use crate::catalog::import::data_structures::{AttributesData, EntriesData, RelationshipsData};
use crate::catalog::import::database_operations;
use crate::catalog::pg_config::PgConfig;
use crate::catalog::taxonomy::Taxonomy;
use rocket_db_pools::sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

/// Advisory lock key that serializes import runs across processes.
pub const IMPORT_LOCK_KEY: i64 = 0x00C4_7A10_6000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Source of import transactions.
#[rocket::async_trait]
pub trait CatalogStore: Send + Sync {
    type Transaction: CatalogTransaction;

    async fn begin(&self) -> StoreResult<Self::Transaction>;
}

/// One open import transaction.
///
/// Dropping a transaction without calling [`commit`](Self::commit) must
/// discard every write made through it.
#[rocket::async_trait]
pub trait CatalogTransaction: Send + Sized {
    /// Term-taxonomy id for `slug` in `taxonomy`, if present.
    async fn find_term(&mut self, slug: &str, taxonomy: Taxonomy) -> StoreResult<Option<i64>>;

    /// Insert a term and its taxonomy row, returning the term-taxonomy id.
    async fn insert_term(&mut self, name: &str, slug: &str, taxonomy: Taxonomy)
    -> StoreResult<i64>;

    /// Reserve `count` distinct entry ids.
    async fn reserve_entry_ids(&mut self, count: usize) -> StoreResult<Vec<i64>>;

    async fn insert_entries(&mut self, data: &EntriesData) -> StoreResult<usize>;

    async fn insert_attributes(&mut self, data: &AttributesData) -> StoreResult<usize>;

    async fn insert_relationships(&mut self, data: &RelationshipsData) -> StoreResult<usize>;

    /// Record that `source` has been imported up to row `offset`.
    ///
    /// Becomes visible only if the transaction commits.
    async fn save_checkpoint(&mut self, source: &str, offset: u64) -> StoreResult<()>;

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

/// PostgreSQL-backed catalog store.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
    synchronous_commit: bool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            synchronous_commit: false,
        }
    }

    /// Keep synchronous commit enabled for import transactions.
    pub fn with_synchronous_commit(mut self, enabled: bool) -> Self {
        self.synchronous_commit = enabled;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[rocket::async_trait]
impl CatalogStore for PgCatalogStore {
    type Transaction = PgCatalogTransaction;

    async fn begin(&self) -> StoreResult<PgCatalogTransaction> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(IMPORT_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        PgConfig::apply_bulk_import_settings(&mut tx, self.synchronous_commit).await?;

        Ok(PgCatalogTransaction { tx })
    }
}

/// Open import transaction on PostgreSQL.
///
/// Wraps an sqlx [`Transaction`], which rolls back when dropped uncommitted.
pub struct PgCatalogTransaction {
    tx: Transaction<'static, Postgres>,
}

#[rocket::async_trait]
impl CatalogTransaction for PgCatalogTransaction {
    async fn find_term(&mut self, slug: &str, taxonomy: Taxonomy) -> StoreResult<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"SELECT tt.id
               FROM catalog_terms t
               JOIN catalog_term_taxonomy tt ON tt.term_id = t.id
               WHERE t.slug = $1 AND tt.taxonomy = $2
               ORDER BY tt.id
               LIMIT 1"#,
        )
        .bind(slug)
        .bind(taxonomy.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn insert_term(
        &mut self,
        name: &str,
        slug: &str,
        taxonomy: Taxonomy,
    ) -> StoreResult<i64> {
        let term_id: i64 = sqlx::query_scalar(
            "INSERT INTO catalog_terms (name, slug) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&mut *self.tx)
        .await?;

        let term_taxonomy_id: i64 = sqlx::query_scalar(
            r#"INSERT INTO catalog_term_taxonomy (term_id, taxonomy, description, parent, count)
               VALUES ($1, $2, '', 0, 0)
               RETURNING id"#,
        )
        .bind(term_id)
        .bind(taxonomy.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(term_taxonomy_id)
    }

    async fn reserve_entry_ids(&mut self, count: usize) -> StoreResult<Vec<i64>> {
        Ok(database_operations::reserve_entry_ids(&mut self.tx, count).await?)
    }

    async fn insert_entries(&mut self, data: &EntriesData) -> StoreResult<usize> {
        Ok(database_operations::insert_entries_batch(&mut self.tx, data).await?)
    }

    async fn insert_attributes(&mut self, data: &AttributesData) -> StoreResult<usize> {
        Ok(database_operations::insert_attributes_batch(&mut self.tx, data).await?)
    }

    async fn insert_relationships(&mut self, data: &RelationshipsData) -> StoreResult<usize> {
        Ok(database_operations::insert_relationships_batch(&mut self.tx, data).await?)
    }

    async fn save_checkpoint(&mut self, source: &str, offset: u64) -> StoreResult<()> {
        Ok(checkpoint::save_import_offset(&mut self.tx, source, offset).await?)
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

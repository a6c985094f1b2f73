use rocket_db_pools::sqlx::{PgPool, Postgres, Transaction};

/// Tables written by an import run, in dependency order.
pub const CATALOG_TABLES: [&str; 5] = [
    "catalog_entries",
    "catalog_entry_meta",
    "catalog_terms",
    "catalog_term_taxonomy",
    "catalog_term_relationships",
];

/// PostgreSQL configuration management for bulk imports
pub struct PgConfig;

impl PgConfig {
    /// Apply transaction-level settings for one import run.
    ///
    /// With `synchronous_commit` false the commit returns before the WAL is
    /// flushed; the run is still atomic, nothing is visible before commit.
    pub async fn apply_bulk_import_settings(
        tx: &mut Transaction<'_, Postgres>,
        synchronous_commit: bool,
    ) -> Result<(), sqlx::Error> {
        log::debug!(
            "applying bulk import settings (synchronous_commit={})",
            synchronous_commit
        );

        if !synchronous_commit {
            sqlx::query("SET LOCAL synchronous_commit = 'off'")
                .execute(&mut **tx)
                .await?;
        }

        // Sorting for the unique-index checks on large meta batches
        sqlx::query("SET LOCAL work_mem = '64MB'")
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Run VACUUM ANALYZE on specific tables
    pub async fn vacuum_analyze_tables(pool: &PgPool, tables: &[&str]) -> Result<(), sqlx::Error> {
        for table in tables {
            log::debug!("running VACUUM ANALYZE on table: {}", table);
            let query = format!("VACUUM ANALYZE {}", table);
            sqlx::query(&query).execute(pool).await?;
        }

        Ok(())
    }

    /// Check current configuration settings
    pub async fn check_config(pool: &PgPool) -> Result<ConfigSnapshot, sqlx::Error> {
        let synchronous_commit: (String,) = sqlx::query_as("SHOW synchronous_commit")
            .fetch_one(pool)
            .await?;

        let work_mem: (String,) = sqlx::query_as("SHOW work_mem").fetch_one(pool).await?;

        let max_connections: (String,) = sqlx::query_as("SHOW max_connections")
            .fetch_one(pool)
            .await?;

        Ok(ConfigSnapshot {
            synchronous_commit: synchronous_commit.0,
            work_mem: work_mem.0,
            max_connections: max_connections.0,
        })
    }
}

/// Snapshot of current PostgreSQL configuration
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub synchronous_commit: String,
    pub work_mem: String,
    pub max_connections: String,
}

impl std::fmt::Display for ConfigSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PostgreSQL Configuration:")?;
        writeln!(f, "  synchronous_commit: {}", self.synchronous_commit)?;
        writeln!(f, "  work_mem: {}", self.work_mem)?;
        writeln!(f, "  max_connections: {}", self.max_connections)?;
        Ok(())
    }
}

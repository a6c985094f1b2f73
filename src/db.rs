use rocket_db_pools::{Database, sqlx};

/// Catalog database pool, configured under `databases.catalog_db`.
#[derive(Database)]
#[database("catalog_db")]
pub struct CatalogDb(sqlx::PgPool);

//! Checkpoints for resumable CSV imports.
//!
//! A checkpoint records how many data rows of a source file have been
//! imported. It is keyed by the source path, so several files can be worked
//! through independently. Import runs advance it inside their own
//! transaction, so the offset and the rows it covers commit together.

use rocket_db_pools::sqlx::{self, PgConnection, PgPool};

/// Load the stored row offset for `source`, or 0 when none exists.
pub async fn load_import_offset(pool: &PgPool, source: &str) -> Result<u64, sqlx::Error> {
    let offset: Option<i64> =
        sqlx::query_scalar("SELECT row_offset FROM import_checkpoints WHERE source = $1")
            .bind(source)
            .fetch_optional(pool)
            .await?;

    Ok(offset.map(|value| value.max(0) as u64).unwrap_or(0))
}

/// Persist the row offset reached for `source` on `conn`.
pub async fn save_import_offset(
    conn: &mut PgConnection,
    source: &str,
    offset: u64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO import_checkpoints (source, row_offset, updated_at)
           VALUES ($1, $2, NOW())
           ON CONFLICT (source)
           DO UPDATE SET row_offset = EXCLUDED.row_offset, updated_at = EXCLUDED.updated_at"#,
    )
    .bind(source)
    .bind(offset as i64)
    .execute(&mut *conn)
    .await?;

    log::debug!("checkpoint for {} saved at row {}", source, offset);
    Ok(())
}

/// Start `source` over from its first data row.
pub async fn reset_import_offset(pool: &PgPool, source: &str) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    save_import_offset(&mut conn, source, 0).await
}

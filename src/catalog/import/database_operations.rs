//! Bulk database insert operations.
//!
//! Provides batch insert operations using PostgreSQL's UNNEST so each
//! destination table is written with exactly one statement per run,
//! regardless of how many records the run carries.

use crate::catalog::import::data_structures::{AttributesData, EntriesData, RelationshipsData};
use rocket_db_pools::sqlx::PgConnection;

/// Reserve `count` catalog entry ids from the entry sequence.
///
/// Sequence values are handed out outside transactional control, so ids
/// reserved by a run that later rolls back are skipped, never reused.
pub async fn reserve_entry_ids(
    conn: &mut PgConnection,
    count: usize,
) -> Result<Vec<i64>, sqlx::Error> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = sqlx::query_scalar(
        r#"SELECT nextval(pg_get_serial_sequence('catalog_entries', 'id'))
           FROM generate_series(1, $1)"#,
    )
    .bind(count as i64)
    .fetch_all(&mut *conn)
    .await?;

    log::trace!("reserved {} entry ids", ids.len());
    Ok(ids)
}

/// Insert a batch of catalog entries.
///
/// # Arguments
/// * `conn` - Connection inside the import transaction
/// * `data` - Staged entries in columnar format, ids pre-allocated
///
/// # Returns
/// Number of entry rows inserted
pub async fn insert_entries_batch(
    conn: &mut PgConnection,
    data: &EntriesData,
) -> Result<usize, sqlx::Error> {
    if data.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO catalog_entries (
            id, title, body, excerpt, status, entry_type, author_id,
            created_at, created_at_utc, comment_status, ping_status, slug
           )
           SELECT * FROM UNNEST(
               $1::int8[],
               $2::text[],
               $3::text[],
               $4::text[],
               $5::text[],
               $6::text[],
               $7::int8[],
               $8::timestamp[],
               $9::timestamptz[],
               $10::text[],
               $11::text[],
               $12::text[]
           )"#,
    )
    .bind(&data.ids)
    .bind(&data.titles)
    .bind(&data.bodies)
    .bind(&data.excerpts)
    .bind(&data.statuses)
    .bind(&data.entry_types)
    .bind(&data.author_ids)
    .bind(&data.created_at)
    .bind(&data.created_at_utc)
    .bind(&data.comment_statuses)
    .bind(&data.ping_statuses)
    .bind(&data.slugs)
    .execute(&mut *conn)
    .await?;

    let rows_affected = result.rows_affected() as usize;
    log::trace!("bulk inserted {} entries", rows_affected);
    Ok(rows_affected)
}

/// Insert a batch of entry attributes.
///
/// The `(entry_id, meta_key)` unique index rejects a second value for the
/// same key, which aborts the run.
///
/// # Returns
/// Number of attribute rows inserted
pub async fn insert_attributes_batch(
    conn: &mut PgConnection,
    data: &AttributesData,
) -> Result<usize, sqlx::Error> {
    if data.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO catalog_entry_meta (entry_id, meta_key, meta_value)
           SELECT * FROM UNNEST($1::int8[], $2::text[], $3::text[])"#,
    )
    .bind(&data.entry_ids)
    .bind(&data.keys)
    .bind(&data.values)
    .execute(&mut *conn)
    .await?;

    let rows_affected = result.rows_affected() as usize;
    log::trace!("bulk inserted {} attributes", rows_affected);
    Ok(rows_affected)
}

/// Insert a batch of entry-to-term relationships.
///
/// # Returns
/// Number of relationship rows inserted
pub async fn insert_relationships_batch(
    conn: &mut PgConnection,
    data: &RelationshipsData,
) -> Result<usize, sqlx::Error> {
    if data.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO catalog_term_relationships (entry_id, term_taxonomy_id)
           SELECT * FROM UNNEST($1::int8[], $2::int8[])"#,
    )
    .bind(&data.entry_ids)
    .bind(&data.term_taxonomy_ids)
    .execute(&mut *conn)
    .await?;

    let rows_affected = result.rows_affected() as usize;
    log::trace!("bulk inserted {} relationships", rows_affected);
    Ok(rows_affected)
}

use catalog_importer::test_support::{TestDatabase, TestDatabaseError};
use sqlx::migrate::Migrator;

static TEST_MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn table_count(pool: &sqlx::PgPool) -> i64 {
    sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM information_schema.tables
           WHERE table_schema = 'public'
             AND table_name IN ('catalog_entries', 'catalog_entry_meta', 'catalog_terms',
                                'catalog_term_taxonomy', 'catalog_term_relationships',
                                'import_checkpoints')"#,
    )
    .fetch_one(pool)
    .await
    .expect("lookup succeeded")
}

#[tokio::test]
async fn migrations_apply_and_revert_cleanly() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping migration revert test: no test database configured");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();

    TEST_MIGRATOR.run(&pool).await.expect("migrations run");
    assert_eq!(table_count(&pool).await, 6);

    TEST_MIGRATOR.undo(&pool, 0).await.expect("migrations revert");
    assert_eq!(table_count(&pool).await, 0, "catalog tables should be dropped after revert");

    TEST_MIGRATOR.run(&pool).await.expect("migrations rerun");
    assert_eq!(table_count(&pool).await, 6);

    test_db.close().await.expect("failed to drop test database");
}

//! Ephemeral PostgreSQL databases for integration tests.
//!
//! A server is taken from `TEST_DATABASE_URL` when set. Otherwise, with
//! `TEST_DATABASE_CONTAINER=1`, a disposable Postgres container is started.
//! Each [`TestDatabase`] creates its own uniquely named database on that
//! server, applies the migrations, and drops the database on close or drop.

use log::LevelFilter;
use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
use testcontainers::{GenericImage, ImageExt, core::WaitFor};
use testcontainers_modules::testcontainers::{
    ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
};
use thiserror::Error;
use tokio::runtime::Handle;
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";

#[derive(Debug, Error)]
pub enum TestDatabaseError {
    #[error("neither TEST_DATABASE_URL nor TEST_DATABASE_CONTAINER=1 is set")]
    MissingUrl,
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("container error: {0}")]
    Container(#[from] TestcontainersError),
}

/// Ephemeral database factory for integration tests.
pub struct TestDatabase {
    pool: Option<PgPool>,
    admin_options: PgConnectOptions,
    database_name: String,
    container: Option<ContainerAsync<GenericImage>>,
}

impl TestDatabase {
    /// Provision a fresh database on the server chosen by the environment.
    pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
        if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
            return Self::on_server(&url, None).await;
        }

        let use_container = std::env::var("TEST_DATABASE_CONTAINER")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if use_container {
            return Self::in_container().await;
        }

        Err(TestDatabaseError::MissingUrl)
    }

    /// Provision a fresh database inside a disposable Postgres container.
    pub async fn in_container() -> Result<Self, TestDatabaseError> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_DB", "postgres")
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(5432).await?;
        let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

        Self::on_server(&url, Some(container)).await
    }

    async fn on_server(
        url: &str,
        container: Option<ContainerAsync<GenericImage>>,
    ) -> Result<Self, TestDatabaseError> {
        let base_options: PgConnectOptions = url.parse()?;
        let base_options = base_options.log_statements(LevelFilter::Off);

        let base_name = base_options
            .get_database()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "postgres".to_string());

        let admin_options = base_options.clone().database("postgres");
        let admin_pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(admin_options.clone())
            .await?;

        let database_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
        let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", database_name);
        sqlx::query(&create_sql).execute(&admin_pool).await?;
        admin_pool.close().await;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(base_options.database(&database_name))
            .await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self {
            pool: Some(pool),
            admin_options,
            database_name,
            container,
        })
    }

    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref().expect("test database pool is available")
    }

    pub fn pool_clone(&self) -> PgPool {
        self.pool().clone()
    }

    /// Empty every catalog table and restart identity sequences.
    pub async fn truncate(&self) -> Result<(), TestDatabaseError> {
        sqlx::query(
            r#"TRUNCATE catalog_term_relationships, catalog_entry_meta, catalog_entries,
                        catalog_term_taxonomy, catalog_terms, import_checkpoints
               RESTART IDENTITY CASCADE"#,
        )
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Close pool connections and drop the ephemeral database.
    pub async fn close(mut self) -> Result<(), TestDatabaseError> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }

        drop_database_with_fallback(self.admin_options.clone(), &self.database_name).await?;

        if let Some(container) = self.container.take() {
            drop(container);
        }

        Ok(())
    }
}

async fn drop_database_with_fallback(
    admin_options: PgConnectOptions,
    database_name: &str,
) -> Result<(), sqlx::Error> {
    let admin_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_with(admin_options)
        .await?;

    let drop_force = format!("DROP DATABASE \"{}\" WITH (FORCE)", database_name);
    match sqlx::query(&drop_force).execute(&admin_pool).await {
        Ok(_) => Ok(()),
        Err(err) if force_drop_unsupported(&err) => {
            let drop_sql = format!("DROP DATABASE \"{}\"", database_name);
            sqlx::query(&drop_sql).execute(&admin_pool).await?;
            Ok(())
        }
        Err(err) => Err(err),
    }
}

// FORCE needs PostgreSQL 13+
fn force_drop_unsupported(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err
                .code()
                .map(|code| code == "42601" || code == "0A000")
                .unwrap_or(false)
    )
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            let admin_options = self.admin_options.clone();
            let db_name = self.database_name.clone();
            if let Ok(handle) = Handle::try_current() {
                handle.spawn(async move {
                    pool.close().await;
                    let _ = drop_database_with_fallback(admin_options, &db_name).await;
                });
            } else {
                std::thread::spawn(move || {
                    if let Ok(rt) = tokio::runtime::Runtime::new() {
                        rt.block_on(async move {
                            pool.close().await;
                            let _ = drop_database_with_fallback(admin_options, &db_name).await;
                        });
                    }
                });
            }
        }

        if let Some(container) = self.container.take() {
            drop(container);
        }
    }
}

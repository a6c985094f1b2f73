//! Helpers shared by unit and integration tests.
//!
//! - [`memory`]: in-memory catalog store with failure injection
//! - [`database`]: ephemeral PostgreSQL databases
//! - [`TestRocketBuilder`]: Rocket instances with chosen routes and state

pub mod database;
pub mod memory;

pub use database::{TestDatabase, TestDatabaseError};

use crate::catalog::PgCatalogStore;
use crate::config::ImportConfig;
use crate::service::ImportService;
use rocket::config::LogLevel;
use rocket::figment::Figment;
use rocket::local::asynchronous::Client as AsyncClient;
use rocket::local::blocking::Client;
use rocket::{Build, Rocket, Route};
use rocket_db_pools::sqlx::PgPool;

/// Builder for constructing Rocket instances tailored for integration tests.
#[derive(Default)]
pub struct TestRocketBuilder {
    figment: Figment,
    mounts: Vec<(String, Vec<Route>)>,
    pg_pool: Option<PgPool>,
    import_config: Option<ImportConfig>,
}

impl TestRocketBuilder {
    /// Start a builder with random port and logging disabled.
    pub fn new() -> Self {
        let figment = rocket::Config::figment()
            .merge(("port", 0))
            .merge(("log_level", LogLevel::Off))
            .merge(("cli_colors", false));

        Self {
            figment,
            ..Self::default()
        }
    }

    /// Mount routes under `/api/v1`.
    pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
        self.mounts.push(("/api/v1".to_string(), routes));
        self
    }

    /// Manage a `PgPool` and an [`ImportService`] backed by it.
    pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
        self.pg_pool = Some(pool);
        self
    }

    /// Import configuration for the managed [`ImportService`]; defaults otherwise.
    pub fn import_config(mut self, config: ImportConfig) -> Self {
        self.import_config = Some(config);
        self
    }

    /// Finish building the Rocket instance.
    pub fn build(self) -> Rocket<Build> {
        let mut rocket = rocket::custom(self.figment);

        for (base, routes) in self.mounts {
            rocket = rocket.mount(base, routes);
        }

        if let Some(pool) = self.pg_pool {
            let config = self.import_config.unwrap_or_default();
            let store = PgCatalogStore::new(pool.clone())
                .with_synchronous_commit(config.synchronous_commit);
            rocket = rocket
                .manage(ImportService::new(store, config))
                .manage(pool);
        }

        rocket
    }

    /// Convenience helper to produce a blocking local client.
    pub fn blocking_client(self) -> Client {
        Client::tracked(self.build()).expect("valid Rocket instance")
    }

    /// Convenience helper to produce an asynchronous local client.
    pub async fn async_client(self) -> AsyncClient {
        AsyncClient::tracked(self.build())
            .await
            .expect("valid Rocket instance")
    }
}

#[macro_use]
extern crate rocket;

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod service;

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support;

use crate::catalog::PgCatalogStore;
use crate::catalog::database::run_migrations;
use crate::config::ImportConfig;
use crate::db::CatalogDb;
use crate::request_logger::RequestLogger;
use crate::service::ImportService;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use rocket_db_pools::Database;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Initialize `env_logger` once per process.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let import_config = ImportConfig::from_env();
    log::info!(
        "import config: batch_size={}, taxonomy_mode={:?}, duplicate_titles={:?}",
        import_config.batch_size,
        import_config.taxonomy_assignment,
        import_config.duplicate_titles
    );

    rocket::build()
        .attach(RequestLogger)
        .attach(CatalogDb::init())
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match CatalogDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        match run_migrations(&pool).await {
                            Ok(_) => Ok(rocket),
                            Err(e) => {
                                log::error!("database migrations failed: {}", e);
                                Err(rocket)
                            }
                        }
                    }
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        // Clone the pool into managed state and build the shared import service
        .attach(AdHoc::try_on_ignite(
            "Manage DB Pool and Import Service",
            move |rocket| async move {
                match CatalogDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        let store = PgCatalogStore::new(pool.clone())
                            .with_synchronous_commit(import_config.synchronous_commit);
                        let service = ImportService::new(store, import_config);

                        Ok(rocket.manage(pool).manage(service))
                    }
                    None => Err(rocket),
                }
            },
        ))
        .mount(
            "/api/v1",
            routes![
                // Health routes
                routes::health::live_health,
                routes::health::ready_health,
                // Import routes
                routes::imports::import_products,
                routes::imports::import_csv,
                routes::imports::import_sample,
            ],
        )
}

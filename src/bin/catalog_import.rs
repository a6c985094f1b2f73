use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use catalog_importer::catalog::csv_job::{CsvJobOptions, run_csv_import};
use catalog_importer::catalog::database::run_migrations;
use catalog_importer::catalog::pg_config::{CATALOG_TABLES, PgConfig};
use catalog_importer::catalog::sample::generate_sample_products;
use catalog_importer::catalog::{BulkImporter, PgCatalogStore};
use catalog_importer::config::ImportConfig;

#[derive(Parser, Debug)]
#[command(
    name = "catalog-import",
    about = "Bulk import products into the catalog database"
)]
struct Args {
    /// Run VACUUM ANALYZE on the catalog tables after importing.
    #[arg(long, global = true)]
    analyze: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import the next batch of a CSV file, resuming from its checkpoint.
    Csv {
        /// CSV file with a header row; `name` is the only required column.
        #[arg(long)]
        file: PathBuf,

        /// Rows per batch; defaults to IMPORT_BATCH_SIZE.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Keep importing batches until the file is exhausted.
        #[arg(long)]
        all: bool,

        /// Start from the first data row, discarding the stored checkpoint.
        #[arg(long)]
        reset: bool,
    },
    /// Generate and import synthetic test products.
    Sample {
        #[arg(long, default_value_t = 1000)]
        count: usize,
    },
    /// Print the server settings that affect import throughput.
    Settings,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    catalog_importer::init_logger();

    let args = Args::parse();
    let config = ImportConfig::from_env();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    run_migrations(&pool).await?;

    let store =
        PgCatalogStore::new(pool.clone()).with_synchronous_commit(config.synchronous_commit);
    let batch_size = config.batch_size;
    let sample_max = config.sample_max;
    let importer = BulkImporter::new(store, config);
    let started = Instant::now();

    match args.command {
        Command::Csv {
            file,
            batch_size: requested,
            all,
            reset,
        } => {
            let options = CsvJobOptions {
                batch_size: requested.unwrap_or(batch_size).max(1),
                all,
                reset,
            };
            let report = run_csv_import(&pool, &importer, &file, options).await?;

            println!(
                "imported {} products from {} in {} batches ({:.2}s)",
                report.stats.records,
                report.source,
                report.batches,
                started.elapsed().as_secs_f64()
            );
            if report.exhausted {
                println!("file exhausted, checkpoint reset to row 0");
            } else {
                println!("next run resumes at row {}", report.next_offset);
            }
        }
        Command::Sample { count } => {
            if count == 0 || count > sample_max {
                return Err(format!("--count must be between 1 and {sample_max}").into());
            }

            let records = {
                let mut rng = rand::thread_rng();
                generate_sample_products(count, &mut rng)
            };
            let report = importer.import_in_batches(&records, batch_size).await?;

            println!(
                "created {} products in {} batches ({:.2}s)",
                report.stats.records,
                report.batches,
                started.elapsed().as_secs_f64()
            );
        }
        Command::Settings => {
            println!("{}", PgConfig::check_config(&pool).await?);
            return Ok(());
        }
    }

    if args.analyze {
        log::info!("running VACUUM ANALYZE on catalog tables");
        PgConfig::vacuum_analyze_tables(&pool, &CATALOG_TABLES).await?;
    }

    pool.close().await;
    Ok(())
}

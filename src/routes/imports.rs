//! Import endpoints.
//!
//! `POST /imports` imports a JSON batch as one transaction. The CSV and sample
//! endpoints split their input into runs of the configured batch size.

use crate::catalog::csv_source;
use crate::catalog::sample::generate_sample_products;
use crate::error::ApiError;
use crate::models::{ApiResponse, ImportReport, ImportRequest};
use crate::service::ImportService;
use rocket::data::{Data, ToByteUnit};
use rocket::serde::json::Json;
use rocket::{State, post};
use std::time::Instant;

const CSV_BODY_LIMIT_MIB: u64 = 64;
const DEFAULT_SAMPLE_COUNT: usize = 1000;

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Import a JSON batch of products in a single transaction.
#[post("/imports", format = "json", data = "<request>")]
pub async fn import_products(
    service: &State<ImportService>,
    request: Json<ImportRequest>,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    let started = Instant::now();
    let records = request.into_inner().products;

    let stats = service.import(&records).await?;

    Ok(Json(ApiResponse::new(ImportReport {
        success: true,
        count: stats.records,
        batches: usize::from(stats.records > 0),
        stats,
        elapsed_ms: elapsed_ms(started),
    })))
}

/// Import a CSV document sent as the request body.
#[post("/imports/csv", data = "<body>")]
pub async fn import_csv(
    service: &State<ImportService>,
    body: Data<'_>,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    let started = Instant::now();

    let body = body
        .open(CSV_BODY_LIMIT_MIB.mebibytes())
        .into_string()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read CSV body: {}", e)))?;
    if !body.is_complete() {
        return Err(ApiError::BadRequest(format!(
            "CSV body exceeds {} MiB",
            CSV_BODY_LIMIT_MIB
        )));
    }

    let records = csv_source::read_all(body.as_bytes())?;
    let report = service.import_batched(&records).await?;

    Ok(Json(ApiResponse::new(ImportReport {
        success: true,
        count: report.stats.records,
        batches: report.batches,
        stats: report.stats,
        elapsed_ms: elapsed_ms(started),
    })))
}

/// Generate and import `count` synthetic products.
#[post("/imports/sample?<count>")]
pub async fn import_sample(
    service: &State<ImportService>,
    count: Option<usize>,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    let started = Instant::now();
    let count = count.unwrap_or(DEFAULT_SAMPLE_COUNT);
    let max = service.config().sample_max;
    if count == 0 || count > max {
        return Err(ApiError::BadRequest(format!(
            "count must be between 1 and {}",
            max
        )));
    }

    let records = {
        let mut rng = rand::thread_rng();
        generate_sample_products(count, &mut rng)
    };
    let report = service.import_batched(&records).await?;

    Ok(Json(ApiResponse::new(ImportReport {
        success: true,
        count: report.stats.records,
        batches: report.batches,
        stats: report.stats,
        elapsed_ms: elapsed_ms(started),
    })))
}

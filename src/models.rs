use crate::catalog::ImportStats;
use serde::{Deserialize, Serialize};

/// Envelope for every successful API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Body of `POST /imports`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub products: Vec<crate::catalog::ProductRecord>,
}

/// Result of an import request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub success: bool,
    pub count: usize,
    /// Number of committed runs; 0 for empty input.
    pub batches: usize,
    pub stats: ImportStats,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
}

//! HTTP route handlers grouped by resource.
//!
//! Every handler is mounted under `/api/v1` and returns its payload wrapped
//! in [`ApiResponse`](crate::models::ApiResponse).

pub mod health;
pub mod imports;

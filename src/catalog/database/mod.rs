//! Database management for the importer.
//!
//! This module provides:
//! - Schema migrations
//! - Resumable CSV import checkpoints

pub mod checkpoint;
pub mod migration;

pub use checkpoint::{load_import_offset, reset_import_offset, save_import_offset};
pub use migration::run_migrations;

//! Importer configuration loaded from environment variables.

use serde::Serialize;
use std::env;
use std::str::FromStr;

fn lookup_bool(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn lookup_parsed<T: FromStr>(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn lookup_string(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// How category and tag terms are chosen for each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyAssignment {
    /// Every record gets the default category and tag; its own lists are ignored.
    Fixed,
    /// Records use their own lists, falling back to the defaults when empty.
    #[default]
    PerRecord,
}

impl FromStr for TaxonomyAssignment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(TaxonomyAssignment::Fixed),
            "per_record" | "per-record" | "record" => Ok(TaxonomyAssignment::PerRecord),
            other => Err(format!("unknown taxonomy mode '{other}'")),
        }
    }
}

/// Policy for two records with the same title in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTitles {
    #[default]
    Reject,
    /// Each record still becomes its own entry.
    Allow,
}

impl FromStr for DuplicateTitles {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(DuplicateTitles::Reject),
            "allow" => Ok(DuplicateTitles::Allow),
            other => Err(format!("unknown duplicate title policy '{other}'")),
        }
    }
}

/// Runtime configuration for import runs.
#[derive(Debug, Clone, Serialize)]
pub struct ImportConfig {
    /// Records per run when a caller chunks a larger input.
    pub batch_size: usize,
    pub synchronous_commit: bool,
    /// Slug of the product-type term linked to every entry.
    pub product_type: String,
    pub default_category: String,
    pub default_tag: String,
    pub taxonomy_assignment: TaxonomyAssignment,
    pub duplicate_titles: DuplicateTitles,
    pub author_id: i64,
    /// Offset applied to the wall-clock `created_at` column.
    pub utc_offset_minutes: i32,
    pub schema_version: String,
    pub sample_max: usize,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let utc_offset_minutes =
            lookup_parsed(lookup, "IMPORT_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes)
                .clamp(-(23 * 60 + 59), 23 * 60 + 59);

        Self {
            batch_size: lookup_parsed(lookup, "IMPORT_BATCH_SIZE", defaults.batch_size).max(1),
            synchronous_commit: lookup_bool(
                lookup,
                "IMPORT_SYNCHRONOUS_COMMIT",
                defaults.synchronous_commit,
            ),
            product_type: lookup_string(lookup, "IMPORT_PRODUCT_TYPE", &defaults.product_type),
            default_category: lookup_string(
                lookup,
                "IMPORT_DEFAULT_CATEGORY",
                &defaults.default_category,
            ),
            default_tag: lookup_string(lookup, "IMPORT_DEFAULT_TAG", &defaults.default_tag),
            taxonomy_assignment: lookup_parsed(
                lookup,
                "IMPORT_TAXONOMY_MODE",
                defaults.taxonomy_assignment,
            ),
            duplicate_titles: lookup_parsed(
                lookup,
                "IMPORT_DUPLICATE_TITLES",
                defaults.duplicate_titles,
            ),
            author_id: lookup_parsed(lookup, "IMPORT_AUTHOR_ID", defaults.author_id),
            utc_offset_minutes,
            schema_version: lookup_string(
                lookup,
                "IMPORT_SCHEMA_VERSION",
                &defaults.schema_version,
            ),
            sample_max: lookup_parsed(lookup, "IMPORT_SAMPLE_MAX", defaults.sample_max).max(1),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            synchronous_commit: false,
            product_type: "simple".to_string(),
            default_category: "Uncategorized".to_string(),
            default_tag: "imported".to_string(),
            taxonomy_assignment: TaxonomyAssignment::PerRecord,
            duplicate_titles: DuplicateTitles::Reject,
            author_id: 0,
            utc_offset_minutes: 0,
            schema_version: "1.0.0".to_string(),
            sample_max: 10_000,
        }
    }
}

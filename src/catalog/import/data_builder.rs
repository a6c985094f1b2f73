//! Data preparation for bulk database operations.
//!
//! Transforms product records into the columnar row groups of
//! [`StagedBatch`]. Staging is pure: term ids come from the resolver's cache
//! and entry ids are reserved before staging starts, so no storage call is
//! made per record.

use crate::catalog::error::ImportError;
use crate::catalog::import::data_structures::StagedBatch;
use crate::catalog::record::ProductRecord;
use crate::catalog::slug::sanitize_title;
use crate::catalog::taxonomy::{Taxonomy, TaxonomyResolver, TermKey};
use crate::config::{ImportConfig, TaxonomyAssignment};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use std::collections::HashSet;

pub const ENTRY_STATUS: &str = "published";
pub const ENTRY_TYPE: &str = "product";
pub const DISCUSSION_STATUS: &str = "closed";
pub const STOCK_STATUS: &str = "instock";
pub const MANAGE_STOCK: &str = "yes";
pub const VISIBILITY: &str = "visible";

/// Fixed attribute vocabulary written for every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    Sku,
    RegularPrice,
    Price,
    SalePrice,
    StockStatus,
    ManageStock,
    Stock,
    Visibility,
    ProductVersion,
}

impl AttributeKey {
    pub const ALL: [AttributeKey; 9] = [
        AttributeKey::Sku,
        AttributeKey::RegularPrice,
        AttributeKey::Price,
        AttributeKey::SalePrice,
        AttributeKey::StockStatus,
        AttributeKey::ManageStock,
        AttributeKey::Stock,
        AttributeKey::Visibility,
        AttributeKey::ProductVersion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKey::Sku => "_sku",
            AttributeKey::RegularPrice => "_regular_price",
            AttributeKey::Price => "_price",
            AttributeKey::SalePrice => "_sale_price",
            AttributeKey::StockStatus => "_stock_status",
            AttributeKey::ManageStock => "_manage_stock",
            AttributeKey::Stock => "_stock",
            AttributeKey::Visibility => "_visibility",
            AttributeKey::ProductVersion => "_product_version",
        }
    }

    /// Value of this attribute for `record`. Absent fields become empty strings.
    pub fn value_for(&self, record: &ProductRecord, config: &ImportConfig) -> String {
        match self {
            AttributeKey::Sku => record.sku.clone().unwrap_or_default(),
            // Effective price starts out equal to the regular price
            AttributeKey::RegularPrice | AttributeKey::Price => {
                record.regular_price.clone().unwrap_or_default()
            }
            AttributeKey::SalePrice => record.sale_price.clone().unwrap_or_default(),
            AttributeKey::StockStatus => STOCK_STATUS.to_string(),
            AttributeKey::ManageStock => MANAGE_STOCK.to_string(),
            AttributeKey::Stock => record
                .stock_quantity
                .map(|quantity| quantity.to_string())
                .unwrap_or_default(),
            AttributeKey::Visibility => VISIBILITY.to_string(),
            AttributeKey::ProductVersion => config.schema_version.clone(),
        }
    }
}

/// Inputs shared by every record of one run.
pub struct StagingContext<'a> {
    pub config: &'a ImportConfig,
    /// Instant recorded on every entry of the run.
    pub now: DateTime<Utc>,
}

impl StagingContext<'_> {
    /// `now` as wall-clock time in the configured offset.
    pub fn local_now(&self) -> NaiveDateTime {
        let offset = FixedOffset::east_opt(self.config.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix());
        self.now.with_timezone(&offset).naive_local()
    }
}

/// Display name of the product-type term: `simple` becomes `Simple`.
pub fn product_type_name(config: &ImportConfig) -> String {
    let mut chars = config.product_type.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Category and tag names linked to `record`, categories first.
pub fn record_term_names<'a>(
    record: &'a ProductRecord,
    config: &'a ImportConfig,
) -> Vec<(&'a str, Taxonomy)> {
    let (categories, tags) = match config.taxonomy_assignment {
        TaxonomyAssignment::Fixed => (Vec::new(), Vec::new()),
        TaxonomyAssignment::PerRecord => (record.category_names(), record.tag_names()),
    };

    let mut names = Vec::with_capacity(categories.len().max(1) + tags.len().max(1));
    if categories.is_empty() {
        names.push((config.default_category.as_str(), Taxonomy::Category));
    } else {
        names.extend(categories.into_iter().map(|name| (name, Taxonomy::Category)));
    }
    if tags.is_empty() {
        names.push((config.default_tag.as_str(), Taxonomy::Tag));
    } else {
        names.extend(tags.into_iter().map(|name| (name, Taxonomy::Tag)));
    }
    names
}

/// Distinct category and tag names referenced by a batch, in first-seen order.
///
/// Resolving this list before staging hoists every term lookup out of the
/// per-record loop.
pub fn collect_term_requests<'a>(
    records: &'a [ProductRecord],
    config: &'a ImportConfig,
) -> Vec<(&'a str, Taxonomy)> {
    let mut seen = HashSet::new();
    let mut requests = Vec::new();

    for record in records {
        for (name, taxonomy) in record_term_names(record, config) {
            if seen.insert(TermKey::new(name, taxonomy)) {
                requests.push((name, taxonomy));
            }
        }
    }

    requests
}

fn cached_term(
    resolver: &TaxonomyResolver,
    name: &str,
    taxonomy: Taxonomy,
) -> Result<i64, ImportError> {
    resolver
        .cached(name, taxonomy)
        .ok_or_else(|| ImportError::UnresolvedTerm {
            slug: sanitize_title(name),
            taxonomy,
        })
}

/// Stage entry, attribute and relationship rows for a batch.
///
/// # Arguments
/// * `records` - Records in input order
/// * `entry_ids` - One reserved id per record, same order
/// * `resolver` - Resolver already holding every term the batch references
/// * `context` - Run-wide values (config, timestamp)
///
/// # Errors
/// `IdReservation` when ids and records differ in length; `UnresolvedTerm`
/// when a referenced term was not resolved beforehand.
pub fn stage_products(
    records: &[ProductRecord],
    entry_ids: &[i64],
    resolver: &TaxonomyResolver,
    context: &StagingContext<'_>,
) -> Result<StagedBatch, ImportError> {
    if entry_ids.len() != records.len() {
        return Err(ImportError::IdReservation {
            expected: records.len(),
            actual: entry_ids.len(),
        });
    }

    let config = context.config;
    let type_term_id = cached_term(resolver, &product_type_name(config), Taxonomy::ProductType)?;
    let created_at = context.local_now();

    let mut batch = StagedBatch::default();
    let attribute_count = records.len() * AttributeKey::ALL.len();
    batch.attributes.entry_ids.reserve(attribute_count);
    batch.attributes.keys.reserve(attribute_count);
    batch.attributes.values.reserve(attribute_count);

    for (record, &entry_id) in records.iter().zip(entry_ids) {
        let title = record.title();

        let entries = &mut batch.entries;
        entries.ids.push(entry_id);
        entries.titles.push(title.to_string());
        entries.bodies.push(record.description.clone().unwrap_or_default());
        entries
            .excerpts
            .push(record.short_description.clone().unwrap_or_default());
        entries.statuses.push(ENTRY_STATUS.to_string());
        entries.entry_types.push(ENTRY_TYPE.to_string());
        entries.author_ids.push(config.author_id);
        entries.created_at.push(created_at);
        entries.created_at_utc.push(context.now);
        entries.comment_statuses.push(DISCUSSION_STATUS.to_string());
        entries.ping_statuses.push(DISCUSSION_STATUS.to_string());
        entries.slugs.push(sanitize_title(title));

        for key in AttributeKey::ALL {
            batch.attributes.entry_ids.push(entry_id);
            batch.attributes.keys.push(key.as_str().to_string());
            batch.attributes.values.push(key.value_for(record, config));
        }

        // Same term listed twice on one record must not produce two edges
        let mut linked = vec![type_term_id];
        for (name, taxonomy) in record_term_names(record, config) {
            let term_id = cached_term(resolver, name, taxonomy)?;
            if !linked.contains(&term_id) {
                linked.push(term_id);
            }
        }
        for term_id in linked {
            batch.relationships.entry_ids.push(entry_id);
            batch.relationships.term_taxonomy_ids.push(term_id);
        }
    }

    log::debug!(
        "staged {} entries, {} attributes, {} relationships",
        batch.entries.len(),
        batch.attributes.len(),
        batch.relationships.len()
    );

    Ok(batch)
}

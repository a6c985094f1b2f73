//! Product records handed to the importer.
//!
//! A [`ProductRecord`] is the normalized input row: it comes from a JSON
//! request body, a CSV file (one row per record, header-named columns) or the
//! sample generator. It carries no identifier; identity only exists once the
//! importer has allocated an entry id for it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One product to import.
///
/// Only `name` is required. Prices are kept as text so the stored attribute
/// values match the input byte for byte (`"19.90"` stays `"19.90"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, alias = "price")]
    pub regular_price: Option<String>,
    #[serde(default)]
    pub sale_price: Option<String>,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    /// Comma-separated category names.
    #[serde(default)]
    pub categories: Option<String>,
    /// Comma-separated tag names.
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("product name is empty")]
    EmptyName,
}

impl ProductRecord {
    /// Convenience constructor used by callers that only know the title.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.name.trim().is_empty() {
            return Err(RecordError::EmptyName);
        }
        Ok(())
    }

    /// Title as persisted: surrounding whitespace removed.
    pub fn title(&self) -> &str {
        self.name.trim()
    }

    pub fn category_names(&self) -> Vec<&str> {
        split_list(self.categories.as_deref())
    }

    pub fn tag_names(&self) -> Vec<&str> {
        split_list(self.tags.as_deref())
    }
}

/// Split a comma-separated list, dropping blank items and keeping order.
fn split_list(raw: Option<&str>) -> Vec<&str> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_name() {
        assert_eq!(ProductRecord::named("").validate(), Err(RecordError::EmptyName));
        assert_eq!(ProductRecord::named("   ").validate(), Err(RecordError::EmptyName));
        assert!(ProductRecord::named("Widget").validate().is_ok());
    }

    #[test]
    fn test_title_is_trimmed() {
        assert_eq!(ProductRecord::named("  Widget \n").title(), "Widget");
    }

    #[test]
    fn test_list_splitting() {
        let record = ProductRecord {
            categories: Some("Tools, Garden ,,".to_string()),
            tags: Some("test, sample".to_string()),
            ..ProductRecord::named("Rake")
        };
        assert_eq!(record.category_names(), vec!["Tools", "Garden"]);
        assert_eq!(record.tag_names(), vec!["test", "sample"]);
        assert!(ProductRecord::named("Bare").category_names().is_empty());
    }

    #[test]
    fn test_deserialize_json_with_price_alias() {
        let record: ProductRecord = serde_json::from_str(
            r#"{"name": "Widget", "price": "19.90", "stock_quantity": 4}"#,
        )
        .expect("valid record");
        assert_eq!(record.regular_price.as_deref(), Some("19.90"));
        assert_eq!(record.stock_quantity, Some(4));
        assert_eq!(record.sku, None);
    }
}

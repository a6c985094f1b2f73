//! Import statistics tracking.
//!
//! Tracks the number of rows written during import runs and the result
//! object handed back to callers.

use serde::{Deserialize, Serialize};

/// Statistics for a single import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    /// Number of input records processed
    pub records: usize,
    /// Number of catalog entry rows inserted
    pub entries: usize,
    /// Number of attribute rows inserted
    pub attributes: usize,
    /// Number of term relationship rows inserted
    pub relationships: usize,
    /// Number of taxonomy terms created by this run
    pub terms_created: usize,
}

impl ImportStats {
    /// Merge another ImportStats into this one by summing all counts.
    ///
    /// Used to combine statistics from several runs over one input.
    pub fn merge(&mut self, other: ImportStats) {
        self.records += other.records;
        self.entries += other.entries;
        self.attributes += other.attributes;
        self.relationships += other.relationships;
        self.terms_created += other.terms_created;
    }
}

/// Result of `create_products`: either a count or an error message.
///
/// Serializes as `{"success": true, "count": 3}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportOutcome {
    pub fn completed(count: usize) -> Self {
        Self {
            success: true,
            count: Some(count),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sums_counts() {
        let mut total = ImportStats {
            records: 2,
            entries: 2,
            attributes: 18,
            relationships: 6,
            terms_created: 3,
        };
        total.merge(ImportStats {
            records: 1,
            entries: 1,
            attributes: 9,
            relationships: 3,
            terms_created: 0,
        });

        assert_eq!(total.records, 3);
        assert_eq!(total.attributes, 27);
        assert_eq!(total.terms_created, 3);
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let ok = serde_json::to_value(ImportOutcome::completed(3)).expect("serialize");
        assert_eq!(ok, serde_json::json!({"success": true, "count": 3}));

        let failed = serde_json::to_value(ImportOutcome::failed("boom")).expect("serialize");
        assert_eq!(failed, serde_json::json!({"success": false, "error": "boom"}));
    }
}

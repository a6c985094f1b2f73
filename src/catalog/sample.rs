//! Synthetic product generator used for smoke-testing an installation.

use crate::catalog::record::ProductRecord;
use rand::Rng;

pub const SAMPLE_CATEGORY: &str = "Test Category";
pub const SAMPLE_TAGS: &str = "test, sample";

/// Generate `count` products numbered from 1.
///
/// Regular prices fall in 10..=100 and sale prices in 5..=90, always below
/// the regular price. Stock is 1..=1000.
pub fn generate_sample_products<R: Rng>(count: usize, rng: &mut R) -> Vec<ProductRecord> {
    (1..=count)
        .map(|i| {
            let regular: u32 = rng.gen_range(10..=100);
            let sale: u32 = rng.gen_range(5..regular.min(91));

            ProductRecord {
                name: format!("Test Product {i}"),
                description: Some(format!("This is test product number {i}")),
                short_description: Some(format!("Short description {i}")),
                sku: Some(format!("TEST-{i}")),
                regular_price: Some(regular.to_string()),
                sale_price: Some(sale.to_string()),
                stock_quantity: Some(rng.gen_range(1..=1000)),
                categories: Some(SAMPLE_CATEGORY.to_string()),
                tags: Some(SAMPLE_TAGS.to_string()),
            }
        })
        .collect()
}

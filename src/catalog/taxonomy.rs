//! Taxonomy namespaces and the memoizing term resolver.
//!
//! Every catalog entry is linked to a product-type term plus category and tag
//! terms. Terms are looked up by slug within their namespace and created on
//! first reference. A [`TaxonomyResolver`] is created for one import run and
//! dropped with it, so two records naming the same category cost one lookup
//! in total while a later run always sees the committed term tables.

use crate::catalog::error::ImportError;
use crate::catalog::slug::sanitize_title;
use crate::catalog::store::CatalogTransaction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Closed set of taxonomy namespaces understood by the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Taxonomy {
    ProductType,
    Category,
    Tag,
}

impl Taxonomy {
    /// Value stored in `catalog_term_taxonomy.taxonomy`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Taxonomy::ProductType => "product_type",
            Taxonomy::Category => "product_cat",
            Taxonomy::Tag => "product_tag",
        }
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized identity of a term: its slug within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermKey {
    pub slug: String,
    pub taxonomy: Taxonomy,
}

impl TermKey {
    pub fn new(name: &str, taxonomy: Taxonomy) -> Self {
        Self {
            slug: sanitize_title(name),
            taxonomy,
        }
    }
}

/// Memoizing get-or-create resolver for taxonomy terms.
///
/// Cached ids are only valid inside the transaction that resolved them; a
/// resolver must not be carried from one run to the next.
#[derive(Debug, Default)]
pub struct TaxonomyResolver {
    cache: HashMap<TermKey, i64>,
    lookups: usize,
    created: usize,
}

impl TaxonomyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the term-taxonomy id for `name` in `taxonomy`, creating the
    /// term on first reference.
    ///
    /// # Errors
    /// `InvalidTermName` when the name has no slug characters; storage errors
    /// from the transaction otherwise.
    pub async fn resolve<T: CatalogTransaction>(
        &mut self,
        tx: &mut T,
        name: &str,
        taxonomy: Taxonomy,
    ) -> Result<i64, ImportError> {
        let name = name.trim();
        let key = TermKey::new(name, taxonomy);
        if key.slug.is_empty() {
            return Err(ImportError::InvalidTermName {
                name: name.to_string(),
                taxonomy,
            });
        }

        if let Some(&id) = self.cache.get(&key) {
            return Ok(id);
        }

        self.lookups += 1;
        let id = match tx.find_term(&key.slug, taxonomy).await? {
            Some(id) => id,
            None => {
                let id = tx.insert_term(name, &key.slug, taxonomy).await?;
                log::debug!("created {} term '{}' (id {})", taxonomy, key.slug, id);
                self.created += 1;
                id
            }
        };

        self.cache.insert(key, id);
        Ok(id)
    }

    /// Cached id for `name`, without touching storage.
    pub fn cached(&self, name: &str, taxonomy: Taxonomy) -> Option<i64> {
        self.cache.get(&TermKey::new(name.trim(), taxonomy)).copied()
    }

    /// Number of storage lookups performed (cache misses).
    pub fn lookup_count(&self) -> usize {
        self.lookups
    }

    /// Number of terms this resolver has created.
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Number of distinct terms held by this resolver.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::store::CatalogStore;
    use crate::test_support::memory::{FailPoint, MemoryCatalogStore};

    #[tokio::test]
    async fn test_repeated_resolution_creates_one_term() {
        let store = MemoryCatalogStore::new();
        let mut tx = store.begin().await.expect("begin");
        let mut resolver = TaxonomyResolver::new();

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(
                resolver
                    .resolve(&mut tx, "Test Category", Taxonomy::Category)
                    .await
                    .expect("resolve"),
            );
        }

        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(resolver.created_count(), 1);
        assert_eq!(resolver.lookup_count(), 1);
        assert_eq!(tx.snapshot().term_taxonomies.len(), 1);
    }

    #[tokio::test]
    async fn test_name_variants_share_a_term() {
        let store = MemoryCatalogStore::new();
        let mut tx = store.begin().await.expect("begin");
        let mut resolver = TaxonomyResolver::new();

        let a = resolver
            .resolve(&mut tx, "Test Category", Taxonomy::Category)
            .await
            .expect("resolve");
        let b = resolver
            .resolve(&mut tx, "  test   CATEGORY", Taxonomy::Category)
            .await
            .expect("resolve");

        assert_eq!(a, b);
        assert_eq!(resolver.created_count(), 1);
    }

    #[tokio::test]
    async fn test_same_name_in_different_namespaces_is_distinct() {
        let store = MemoryCatalogStore::new();
        let mut tx = store.begin().await.expect("begin");
        let mut resolver = TaxonomyResolver::new();

        let category = resolver
            .resolve(&mut tx, "sale", Taxonomy::Category)
            .await
            .expect("resolve");
        let tag = resolver
            .resolve(&mut tx, "sale", Taxonomy::Tag)
            .await
            .expect("resolve");

        assert_ne!(category, tag);
        assert_eq!(resolver.created_count(), 2);
    }

    #[tokio::test]
    async fn test_existing_term_is_found_not_created() {
        let store = MemoryCatalogStore::new();
        let existing = store.seed_term("Simple", "simple", Taxonomy::ProductType);

        let mut tx = store.begin().await.expect("begin");
        let mut resolver = TaxonomyResolver::new();
        let id = resolver
            .resolve(&mut tx, "simple", Taxonomy::ProductType)
            .await
            .expect("resolve");

        assert_eq!(id, existing);
        assert_eq!(resolver.created_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let store = MemoryCatalogStore::new();
        let mut tx = store.begin().await.expect("begin");
        let mut resolver = TaxonomyResolver::new();

        let err = resolver
            .resolve(&mut tx, " ?! ", Taxonomy::Tag)
            .await
            .expect_err("blank name");
        assert!(matches!(err, ImportError::InvalidTermName { .. }));
        assert_eq!(resolver.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_propagates_and_is_not_cached() {
        let store = MemoryCatalogStore::new();
        store.fail_at(FailPoint::InsertTerm);
        let mut tx = store.begin().await.expect("begin");
        let mut resolver = TaxonomyResolver::new();

        let err = resolver
            .resolve(&mut tx, "Tools", Taxonomy::Category)
            .await
            .expect_err("injected failure");
        assert!(matches!(err, ImportError::Store(_)));
        assert!(resolver.cached("Tools", Taxonomy::Category).is_none());
    }

    #[tokio::test]
    async fn test_cached_lookup_ignores_surrounding_whitespace() {
        let store = MemoryCatalogStore::new();
        let mut tx = store.begin().await.expect("begin");
        let mut resolver = TaxonomyResolver::new();

        let id = resolver
            .resolve(&mut tx, "Tools", Taxonomy::Category)
            .await
            .expect("resolve");

        assert_eq!(resolver.cached("  Tools\t", Taxonomy::Category), Some(id));
        assert_eq!(resolver.len(), 1);
    }
}

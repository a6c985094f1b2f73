//! URL-safe slug derivation for catalog titles and taxonomy term names.
//!
//! The same rule serves two purposes: it produces the `slug` column of every
//! catalog entry, and it is the normalized comparison key used when looking up
//! taxonomy terms, so "Test Category", "test category" and "  Test   Category "
//! all resolve to one term.

use regex::Regex;
use std::sync::OnceLock;

static DISALLOWED_REGEX: OnceLock<Regex> = OnceLock::new();
static SEPARATOR_REGEX: OnceLock<Regex> = OnceLock::new();

fn disallowed_regex() -> &'static Regex {
    DISALLOWED_REGEX.get_or_init(|| {
        Regex::new(r"[^\p{Alphabetic}\p{Nd}\s_-]").expect("Invalid slug character regex")
    })
}

fn separator_regex() -> &'static Regex {
    SEPARATOR_REGEX.get_or_init(|| Regex::new(r"[\s-]+").expect("Invalid slug separator regex"))
}

/// Convert a title into its slug.
///
/// ## Rules
///
/// - Lowercased (Unicode aware)
/// - Periods become dashes
/// - Anything other than letters, digits, whitespace, `_` and `-` is dropped
/// - Runs of whitespace and dashes collapse into a single `-`
/// - Leading and trailing dashes are trimmed
///
/// The function is pure: the same title always yields the same slug.
///
/// ## Examples
///
/// ```rust
/// use catalog_importer::catalog::slug::sanitize_title;
///
/// assert_eq!(sanitize_title("Test Product 1"), "test-product-1");
/// assert_eq!(sanitize_title("Foo's  Bar!"), "foos-bar");
/// assert_eq!(sanitize_title("v1.2 Kit"), "v1-2-kit");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase().replace('.', "-");
    let stripped = disallowed_regex().replace_all(&lowered, "");
    let dashed = separator_regex().replace_all(&stripped, "-");
    dashed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_titles() {
        assert_eq!(sanitize_title("Test Product 1"), "test-product-1");
        assert_eq!(sanitize_title("Simple"), "simple");
        assert_eq!(sanitize_title("Test Category"), "test-category");
    }

    #[test]
    fn test_punctuation_is_dropped() {
        assert_eq!(sanitize_title("Foo's  Bar!"), "foos-bar");
        assert_eq!(sanitize_title("50% off (today)"), "50-off-today");
        assert_eq!(sanitize_title("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_separators_collapse_and_trim() {
        assert_eq!(sanitize_title("  -- A -- B --  "), "a-b");
        assert_eq!(sanitize_title("v1.2 Kit"), "v1-2-kit");
        assert_eq!(sanitize_title("tab\tand\nnewline"), "tab-and-newline");
    }

    #[test]
    fn test_unicode_letters_are_kept() {
        assert_eq!(sanitize_title("Café Crème"), "café-crème");
    }

    #[test]
    fn test_case_and_whitespace_variants_share_a_slug() {
        let a = sanitize_title("Test Category");
        let b = sanitize_title("  test   CATEGORY ");
        assert_eq!(a, b);
    }

    #[test]
    fn test_slug_is_deterministic() {
        let title = "Deluxe Widget, 2-pack";
        assert_eq!(sanitize_title(title), sanitize_title(title));
        assert_eq!(sanitize_title(title), "deluxe-widget-2-pack");
    }

    #[test]
    fn test_symbol_only_title_yields_empty_slug() {
        assert_eq!(sanitize_title("!!!"), "");
    }
}

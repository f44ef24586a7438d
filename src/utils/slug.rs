//! URL-safe slug derivation for page identifiers.

use std::sync::LazyLock;

use regex::Regex;

static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s-]").expect("NON_SLUG: hardcoded regex is valid")
});

static SEPARATOR_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-\s]+").expect("SEPARATOR_RUN: hardcoded regex is valid")
});

/// Convert arbitrary text to a URL-safe slug.
///
/// Lowercases, drops everything but word characters, whitespace and
/// hyphens, then collapses separator runs into single hyphens.
///
/// # Examples
/// ```
/// # use siteport::utils::slugify;
/// assert_eq!(slugify("Our Team"), "our-team");
/// assert_eq!(slugify("  Wei  Chen! "), "wei-chen");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let cleaned = NON_SLUG.replace_all(lowered.trim(), "");
    let joined = SEPARATOR_RUN.replace_all(&cleaned, "-");
    joined.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Publications"), "publications");
        assert_eq!(slugify("our-team"), "our-team");
    }

    #[test]
    fn test_slugify_strips_punctuation() {
        assert_eq!(slugify("Research & Facilities!"), "research-facilities");
    }

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("a  --  b"), "a-b");
    }

    #[test]
    fn test_slugify_trims_hyphens() {
        assert_eq!(slugify("-home-"), "home");
        assert_eq!(slugify("   "), "");
    }
}

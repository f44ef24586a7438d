//! The `SiteProfile` type: one value describing the site being migrated.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::{DEFAULT_DELAY_SECS, DEFAULT_MAX_RETRIES, DEFAULT_USER_AGENT};

/// Maps a source folder under the imported assets tree to a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderRule {
    pub folder: String,
    pub category: String,
}

/// Describes one asset category: manifest description plus the prefix used
/// when generating descriptive names for opaque files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub prefix: String,
    pub description: String,
}

/// Configuration for one migration run.
///
/// Built via [`SiteProfile::builder`] (the base URL is required) or loaded
/// from a JSON profile file. All fields are immutable for the duration of
/// a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Root URL of the legacy site. Crawling and page imports never leave
    /// this prefix.
    pub(crate) base_url: String,
    /// Site-name suffix stripped from `<title>` text (e.g. a `" - Lab"`
    /// tail the host appends to every page).
    pub(crate) site_name: Option<String>,
    /// CSS selector for the main content area; `<body>` when unset.
    pub(crate) content_selector: Option<String>,
    /// Known page slugs, used for imports and for mapping cache files back
    /// to their pages.
    pub(crate) pages: Vec<String>,

    /// Regex matching hosted-image URLs worth downloading.
    pub(crate) image_url_pattern: String,
    /// Regex matching the size suffix the host appends to image URLs.
    pub(crate) image_size_suffix: String,
    /// Suffix requesting the highest-resolution variant of an image.
    pub(crate) image_hires_suffix: String,
    /// Filename fragment identifying the shared hero banner, if any.
    pub(crate) hero_marker: Option<String>,
    /// Prefix of opaque generated filenames that should be renamed to
    /// descriptive per-category names.
    pub(crate) opaque_name_prefix: Option<String>,

    pub(crate) folder_rules: Vec<FolderRule>,
    pub(crate) categories: Vec<CategoryRule>,
    /// Category used when no folder rule matches.
    pub(crate) default_category: String,

    pub(crate) cache_dir: PathBuf,
    pub(crate) pages_dir: PathBuf,
    pub(crate) assets_dir: PathBuf,
    /// Root-relative URL prefix for imported images, as referenced from
    /// the migrated pages (decoupled from where `assets_dir` sits on
    /// disk).
    pub(crate) assets_prefix: String,
    pub(crate) report_dir: PathBuf,

    /// Politeness delay between outbound requests, in seconds.
    pub(crate) delay_secs: f64,
    /// Download attempts per item before giving up.
    pub(crate) max_retries: u32,
    /// Re-fetch and re-write even when cached/unchanged.
    pub(crate) force: bool,
    pub(crate) user_agent: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            site_name: None,
            content_selector: None,
            pages: Vec::new(),
            image_url_pattern: r"^https://lh\d+\.googleusercontent\.com/".to_string(),
            image_size_suffix: r"=w\d+$".to_string(),
            image_hires_suffix: "=w16383".to_string(),
            hero_marker: None,
            opaque_name_prefix: None,
            folder_rules: Vec::new(),
            categories: vec![CategoryRule {
                name: "general".to_string(),
                prefix: "general-image".to_string(),
                description: "Hero images, logos, and miscellaneous".to_string(),
            }],
            default_category: "general".to_string(),
            cache_dir: PathBuf::from(".cache/siteport"),
            pages_dir: PathBuf::from("pages"),
            assets_dir: PathBuf::from("assets/img/imported"),
            assets_prefix: "/assets/img/imported".to_string(),
            report_dir: PathBuf::from("reports"),
            delay_secs: DEFAULT_DELAY_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            force: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SiteProfile {
    /// Load a profile from a JSON file, validating patterns and the base
    /// URL.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        let profile: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse profile {}", path.display()))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check the invariants a usable profile must hold.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow!("profile is missing base_url"));
        }
        self.image_url_regex()?;
        self.image_size_regex()?;
        Ok(())
    }

    /// Override the force flag (CLI `--force`).
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Override the politeness delay (CLI `--delay`).
    #[must_use]
    pub fn with_delay_secs(mut self, secs: f64) -> Self {
        self.delay_secs = secs;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn site_name(&self) -> Option<&str> {
        self.site_name.as_deref()
    }

    #[must_use]
    pub fn content_selector(&self) -> Option<&str> {
        self.content_selector.as_deref()
    }

    #[must_use]
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    /// URL of a page identified by slug.
    #[must_use]
    pub fn page_url(&self, slug: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), slug)
    }

    /// Slug → URL pairs covering every cache file a full import produces:
    /// the base page itself plus each configured page.
    #[must_use]
    pub fn known_cache_pages(&self) -> Vec<(String, String)> {
        let mut known = vec![("base".to_string(), self.base_url.clone())];
        for slug in &self.pages {
            known.push((slug.clone(), self.page_url(slug)));
        }
        known
    }

    /// Compiled hosted-image URL pattern.
    pub fn image_url_regex(&self) -> Result<Regex> {
        Regex::new(&self.image_url_pattern)
            .map_err(|e| anyhow!("invalid image_url_pattern '{}': {e}", self.image_url_pattern))
    }

    /// Compiled image size-suffix pattern.
    pub fn image_size_regex(&self) -> Result<Regex> {
        Regex::new(&self.image_size_suffix)
            .map_err(|e| anyhow!("invalid image_size_suffix '{}': {e}", self.image_size_suffix))
    }

    #[must_use]
    pub fn image_hires_suffix(&self) -> &str {
        &self.image_hires_suffix
    }

    /// Whether a filename is the shared hero banner.
    #[must_use]
    pub fn is_hero_filename(&self, name: &str) -> bool {
        self.hero_marker
            .as_deref()
            .is_some_and(|marker| name.contains(marker))
    }

    /// Whether a filename is an opaque generated name that should be
    /// replaced with a descriptive one.
    #[must_use]
    pub fn is_opaque_name(&self, name: &str) -> bool {
        self.opaque_name_prefix
            .as_deref()
            .is_some_and(|prefix| name.starts_with(prefix))
    }

    /// Source folders the organizer walks, in rule order.
    #[must_use]
    pub fn source_folders(&self) -> Vec<&str> {
        self.folder_rules.iter().map(|r| r.folder.as_str()).collect()
    }

    /// Category for a source folder; falls back to the default category.
    #[must_use]
    pub fn category_for_folder(&self, folder: &str) -> &str {
        self.folder_rules
            .iter()
            .find(|r| r.folder == folder)
            .map_or(self.default_category.as_str(), |r| r.category.as_str())
    }

    #[must_use]
    pub fn categories(&self) -> &[CategoryRule] {
        &self.categories
    }

    /// Generated-name prefix for a category; falls back to the category
    /// name itself.
    #[must_use]
    pub fn prefix_for_category<'a>(&'a self, category: &'a str) -> &'a str {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map_or(category, |c| c.prefix.as_str())
    }

    #[must_use]
    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    #[must_use]
    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    #[must_use]
    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Root-relative URL prefix under which imported images are served.
    #[must_use]
    pub fn assets_prefix(&self) -> &str {
        self.assets_prefix.trim_end_matches('/')
    }

    #[must_use]
    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs.max(0.0))
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn force(&self) -> bool {
        self.force
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url_joins_cleanly() {
        let profile = SiteProfile::builder()
            .base_url("https://sites.example.com/view/lab/")
            .build()
            .unwrap();
        assert_eq!(
            profile.page_url("contact"),
            "https://sites.example.com/view/lab/contact"
        );
    }

    #[test]
    fn test_known_cache_pages_includes_base() {
        let profile = SiteProfile::builder()
            .base_url("https://sites.example.com/view/lab")
            .pages(vec!["home".to_string(), "contact".to_string()])
            .build()
            .unwrap();
        let known = profile.known_cache_pages();
        assert_eq!(known.len(), 3);
        assert_eq!(known[0].0, "base");
        assert_eq!(known[0].1, "https://sites.example.com/view/lab");
    }

    #[test]
    fn test_category_lookup_falls_back_to_default() {
        let profile = SiteProfile::default();
        assert_eq!(profile.category_for_folder("unknown"), "general");
        assert_eq!(profile.prefix_for_category("general"), "general-image");
        assert_eq!(profile.prefix_for_category("nonexistent"), "nonexistent");
    }

    #[test]
    fn test_validate_rejects_missing_base_url() {
        assert!(SiteProfile::default().validate().is_err());
    }

    #[test]
    fn test_hero_and_opaque_predicates_default_off() {
        let profile = SiteProfile::default();
        assert!(!profile.is_hero_filename("anything"));
        assert!(!profile.is_opaque_name("anything"));
    }

    #[test]
    fn test_profile_json_round_trip() {
        let profile = SiteProfile::builder()
            .base_url("https://sites.example.com/view/lab")
            .hero_marker("HERO123")
            .build()
            .unwrap();
        let json = serde_json::to_string(&profile).unwrap();
        let back: SiteProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.base_url(), profile.base_url());
        assert!(back.is_hero_filename("xxHERO123yy"));
    }
}

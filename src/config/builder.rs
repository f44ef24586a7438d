//! Typestate builder for [`SiteProfile`].
//!
//! The base URL is the one required field; `build()` is only available
//! once it has been provided, and pattern validation happens exactly once
//! at build time.

use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::Result;

use super::profile::{CategoryRule, FolderRule, SiteProfile};

/// Marker state: the base URL has been set.
pub struct WithBaseUrl;

pub struct SiteProfileBuilder<State = ()> {
    profile: SiteProfile,
    _phantom: PhantomData<State>,
}

impl SiteProfile {
    /// Create a builder with defaults for everything but the base URL.
    #[must_use]
    pub fn builder() -> SiteProfileBuilder<()> {
        SiteProfileBuilder {
            profile: Self::default(),
            _phantom: PhantomData,
        }
    }
}

impl SiteProfileBuilder<()> {
    /// Set the legacy site's root URL.
    ///
    /// A missing scheme defaults to `https://`; a trailing slash is
    /// trimmed so page URLs join cleanly.
    pub fn base_url(mut self, url: impl Into<String>) -> SiteProfileBuilder<WithBaseUrl> {
        let url = url.into();
        let normalized = if url.starts_with("http://") || url.starts_with("https://") {
            url
        } else {
            format!("https://{url}")
        };
        self.profile.base_url = normalized.trim_end_matches('/').to_string();
        SiteProfileBuilder {
            profile: self.profile,
            _phantom: PhantomData,
        }
    }
}

impl SiteProfileBuilder<WithBaseUrl> {
    /// Validate patterns and produce the finished profile.
    pub fn build(self) -> Result<SiteProfile> {
        self.profile.validate()?;
        Ok(self.profile)
    }
}

impl<State> SiteProfileBuilder<State> {
    #[must_use]
    pub fn site_name(mut self, name: impl Into<String>) -> Self {
        self.profile.site_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn content_selector(mut self, selector: impl Into<String>) -> Self {
        self.profile.content_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn pages(mut self, slugs: Vec<String>) -> Self {
        self.profile.pages = slugs;
        self
    }

    #[must_use]
    pub fn image_url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.profile.image_url_pattern = pattern.into();
        self
    }

    #[must_use]
    pub fn image_size_suffix(mut self, pattern: impl Into<String>) -> Self {
        self.profile.image_size_suffix = pattern.into();
        self
    }

    #[must_use]
    pub fn image_hires_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.profile.image_hires_suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn hero_marker(mut self, marker: impl Into<String>) -> Self {
        self.profile.hero_marker = Some(marker.into());
        self
    }

    #[must_use]
    pub fn opaque_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.profile.opaque_name_prefix = Some(prefix.into());
        self
    }

    /// Map a source folder to a category. Rule order is walk order.
    #[must_use]
    pub fn folder_rule(mut self, folder: impl Into<String>, category: impl Into<String>) -> Self {
        self.profile.folder_rules.push(FolderRule {
            folder: folder.into(),
            category: category.into(),
        });
        self
    }

    /// Register a category with its generated-name prefix and manifest
    /// description.
    #[must_use]
    pub fn category(
        mut self,
        name: impl Into<String>,
        prefix: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        // Re-registering replaces, so the built-in "general" entry can be
        // overridden.
        self.profile.categories.retain(|c| c.name != name);
        self.profile.categories.push(CategoryRule {
            name,
            prefix: prefix.into(),
            description: description.into(),
        });
        self
    }

    #[must_use]
    pub fn default_category(mut self, name: impl Into<String>) -> Self {
        self.profile.default_category = name.into();
        self
    }

    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile.cache_dir = dir.into();
        self
    }

    #[must_use]
    pub fn pages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile.pages_dir = dir.into();
        self
    }

    #[must_use]
    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile.assets_dir = dir.into();
        self
    }

    #[must_use]
    pub fn assets_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.profile.assets_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile.report_dir = dir.into();
        self
    }

    #[must_use]
    pub fn delay_secs(mut self, secs: f64) -> Self {
        self.profile.delay_secs = secs;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.profile.max_retries = retries;
        self
    }

    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.profile.force = force;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.profile.user_agent = agent.into();
        self
    }
}

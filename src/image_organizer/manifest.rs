//! Image manifest types written by the reorganize pass.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::config::SiteProfile;

/// One relocated image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub original_path: String,
    pub new_path: String,
    pub category: String,
    pub source_page: String,
    pub original_filename: String,
    pub new_filename: String,
    pub file_size: u64,
}

/// A file that turned out not to be an image (typically an HTML error
/// page saved under an image name).
#[derive(Debug, Clone, Serialize)]
pub struct InvalidFile {
    pub original_path: String,
    pub source_page: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestSummary {
    pub total_images: usize,
    pub invalid_files: usize,
    pub by_category: BTreeMap<String, usize>,
}

/// The manifest recording every image move for traceability.
#[derive(Debug, Clone, Serialize)]
pub struct ImageManifest {
    pub generated: String,
    pub description: String,
    pub categories: BTreeMap<String, String>,
    pub images: Vec<ImageRecord>,
    pub invalid_files: Vec<InvalidFile>,
    pub summary: ManifestSummary,
}

impl ImageManifest {
    /// Empty manifest carrying the profile's category descriptions.
    #[must_use]
    pub fn new(profile: &SiteProfile) -> Self {
        let site = profile.site_name().unwrap_or("site");
        Self {
            generated: Utc::now().to_rfc3339(),
            description: format!("Image manifest for {site} website migration"),
            categories: profile
                .categories()
                .iter()
                .map(|c| (c.name.clone(), c.description.clone()))
                .collect(),
            images: Vec::new(),
            invalid_files: Vec::new(),
            summary: ManifestSummary {
                total_images: 0,
                invalid_files: 0,
                by_category: BTreeMap::new(),
            },
        }
    }

    /// Recompute the summary block from the recorded images.
    pub fn finalize(&mut self, profile: &SiteProfile) {
        let mut by_category: BTreeMap<String, usize> = profile
            .categories()
            .iter()
            .map(|c| (c.name.clone(), 0))
            .collect();
        for image in &self.images {
            *by_category.entry(image.category.clone()).or_insert(0) += 1;
        }
        self.summary = ManifestSummary {
            total_images: self.images.len(),
            invalid_files: self.invalid_files.len(),
            by_category,
        };
    }

    /// Write the manifest as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_counts_by_category() {
        let profile = SiteProfile::builder()
            .category("team", "team-member", "Profile photos")
            .base_url("https://example.com")
            .build()
            .unwrap();

        let mut manifest = ImageManifest::new(&profile);
        for category in ["team", "team", "general"] {
            manifest.images.push(ImageRecord {
                original_path: "imported/x".to_string(),
                new_path: format!("{category}/x.jpg"),
                category: category.to_string(),
                source_page: "home".to_string(),
                original_filename: "x".to_string(),
                new_filename: "x.jpg".to_string(),
                file_size: 1,
            });
        }
        manifest.finalize(&profile);

        assert_eq!(manifest.summary.total_images, 3);
        assert_eq!(manifest.summary.by_category["team"], 2);
        assert_eq!(manifest.summary.by_category["general"], 1);
    }
}

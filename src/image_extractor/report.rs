//! Extraction report types and rendering.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

/// One unique image discovered in the cached HTML.
#[derive(Debug, Clone, Serialize)]
pub struct ImageEntry {
    pub filename: String,
    pub pages: Vec<String>,
    pub normalized_url: String,
}

/// Outcome of one download attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub filename: String,
    pub status: String,
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub pages: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub total_unique_images_in_cache: usize,
    pub images_matched_to_existing_files: usize,
    pub missing_images_identified: usize,
    pub images_still_missing: usize,
}

/// Full extraction report, serialized as JSON and rendered as Markdown.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub generated_at: String,
    pub summary: ExtractionSummary,
    pub images_by_page: BTreeMap<String, usize>,
    pub all_images: Vec<ImageEntry>,
    pub download_results: Vec<DownloadResult>,
    pub still_missing: Vec<ImageEntry>,
}

impl ExtractionReport {
    /// Render the Markdown companion report.
    ///
    /// `downloaded` holds the filename stems present on disk after the
    /// download pass.
    #[must_use]
    pub fn to_markdown(&self, downloaded: &HashSet<String>) -> String {
        let mut lines: Vec<String> = vec![
            "# Image Extraction Report".to_string(),
            String::new(),
            format!("**Generated:** {}", self.generated_at),
            String::new(),
            "## Summary".to_string(),
            String::new(),
            format!(
                "- **Total unique images in cache:** {}",
                self.summary.total_unique_images_in_cache
            ),
            format!(
                "- **Images matched to existing files:** {}",
                self.summary.images_matched_to_existing_files
            ),
            format!(
                "- **Missing images identified:** {}",
                self.summary.missing_images_identified
            ),
            format!(
                "- **Images still missing:** {}",
                self.summary.images_still_missing
            ),
            String::new(),
            "## Images by Page".to_string(),
            String::new(),
            "| Page | Image Count |".to_string(),
            "|------|-------------|".to_string(),
        ];

        for (page, count) in &self.images_by_page {
            lines.push(format!("| {page} | {count} |"));
        }

        lines.extend([
            String::new(),
            "## Image Inventory".to_string(),
            String::new(),
        ]);

        // Group entries by page for per-page tables.
        let mut by_page: BTreeMap<&str, Vec<&ImageEntry>> = BTreeMap::new();
        for entry in &self.all_images {
            for page in &entry.pages {
                by_page.entry(page.as_str()).or_default().push(entry);
            }
        }

        for (page, entries) in by_page {
            lines.push(format!("### {}", title_case(page)));
            lines.push(String::new());
            lines.push("| Filename | Status |".to_string());
            lines.push("|----------|--------|".to_string());
            for entry in entries {
                let status = if downloaded.contains(&entry.filename) {
                    "Downloaded"
                } else {
                    "Missing"
                };
                let shown: String = entry.filename.chars().take(50).collect();
                lines.push(format!("| `{shown}...` | {status} |"));
            }
            lines.push(String::new());
        }

        if !self.still_missing.is_empty() {
            lines.push("## Still Missing (Requires Manual Review)".to_string());
            lines.push(String::new());
            for entry in &self.still_missing {
                lines.push(format!(
                    "- `{}` (pages: {})",
                    entry.filename,
                    entry.pages.join(", ")
                ));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

fn title_case(slug: &str) -> String {
    slug.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

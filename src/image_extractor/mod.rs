//! Image extraction: scan cached HTML for hosted-image URLs, audit what
//! is already on disk, and download whatever is missing at the highest
//! resolution the host serves.

pub mod report;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::Utc;
use regex::Regex;
use scraper::{Html, Selector};

use crate::config::SiteProfile;
use crate::error::MigrateError;
use crate::fetch_cache::{Fetcher, cache_key};
use report::{DownloadResult, ExtractionReport, ExtractionSummary, ImageEntry};

static IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("IMG_SEL: hardcoded selector is valid"));
static STYLED_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[style]").expect("STYLED_SEL: hardcoded selector is valid"));
static STYLE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(["']?([^"')\s]+)["']?\)"#).expect("STYLE_URL_RE: hardcoded regex is valid")
});

/// One reference to an image from one page.
#[derive(Debug, Clone)]
struct PageRef {
    page: String,
    filename: String,
}

/// Extract all hosted-image URLs from one HTML document.
fn extract_image_urls(html: &str, hosted_re: &Regex) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut urls = Vec::new();

    for img in document.select(&IMG_SEL) {
        if let Some(src) = img.value().attr("src") {
            if hosted_re.is_match(src) {
                urls.push(src.to_string());
            }
        }
    }

    // Background images in inline styles reference the same host.
    for styled in document.select(&STYLED_SEL) {
        if let Some(style) = styled.value().attr("style") {
            for caps in STYLE_URL_RE.captures_iter(style) {
                let url = &caps[1];
                if hosted_re.is_match(url) {
                    urls.push(url.to_string());
                }
            }
        }
    }

    urls
}

/// Strip the size suffix so variants of one image share a URL.
fn normalize_image_url(url: &str, size_re: &Regex) -> String {
    size_re.replace(url, "").into_owned()
}

/// Filename token for an image URL: the final path segment, minus any
/// size suffix.
fn filename_from_url(url: &str, size_re: &Regex) -> String {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let last = path.rsplit('/').next().unwrap_or(&path);
    size_re.replace(last, "").into_owned()
}

/// Scan every cached HTML file, mapping each back to its page slug.
///
/// Returns normalized URL → referencing pages, in sorted URL order.
fn scan_cache(profile: &SiteProfile) -> Result<BTreeMap<String, Vec<PageRef>>> {
    let cache_dir = profile.cache_dir();
    if !cache_dir.exists() {
        return Err(MigrateError::NotFound(cache_dir.to_path_buf()).into());
    }

    let hosted_re = profile.image_url_regex()?;
    let size_re = profile.image_size_regex()?;

    // The page mapping is computed from the profile, not hardcoded: each
    // known page URL hashes to its cache filename.
    let known: HashMap<String, String> = profile
        .known_cache_pages()
        .into_iter()
        .map(|(slug, url)| (format!("{}.html", cache_key(&url)), slug))
        .collect();

    let mut entries: Vec<PathBuf> = std::fs::read_dir(cache_dir)
        .with_context(|| format!("failed to read {}", cache_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "html"))
        .collect();
    entries.sort();

    let mut results: BTreeMap<String, Vec<PageRef>> = BTreeMap::new();
    for cache_file in entries {
        let file_name = cache_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some(page) = known.get(&file_name) else {
            log::warn!("unknown cache file: {file_name}");
            continue;
        };

        log::info!("scanning: {page}");
        let html = std::fs::read_to_string(&cache_file)
            .with_context(|| format!("failed to read {}", cache_file.display()))?;

        for url in extract_image_urls(&html, &hosted_re) {
            let normalized = normalize_image_url(&url, &size_re);
            let refs = results.entry(normalized).or_default();
            if !refs.iter().any(|r| &r.page == page) {
                refs.push(PageRef {
                    page: page.clone(),
                    filename: filename_from_url(&url, &size_re),
                });
            }
        }
    }

    Ok(results)
}

/// Audit downloaded images, keyed by filename stem (size suffix removed).
fn audit_existing(profile: &SiteProfile) -> Result<HashMap<String, Vec<PathBuf>>> {
    let mut existing: HashMap<String, Vec<PathBuf>> = HashMap::new();
    let assets_dir = profile.assets_dir();
    if !assets_dir.exists() {
        return Ok(existing);
    }

    let size_re = profile.image_size_regex()?;
    for page_entry in std::fs::read_dir(assets_dir)? {
        let page_dir = page_entry?.path();
        if !page_dir.is_dir() {
            continue;
        }
        for file_entry in std::fs::read_dir(&page_dir)? {
            let file = file_entry?.path();
            let Some(name) = file.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            if !file.is_file() || name.starts_with('.') {
                continue;
            }
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or(name);
            let stem = size_re.replace(&stem, "").into_owned();
            existing.entry(stem).or_default().push(file);
        }
    }

    Ok(existing)
}

/// Run the full extraction pass and write both reports.
///
/// Fails with [`MigrateError::MissingImages`] when images remain missing
/// after the download pass (the reports are written first).
pub async fn run(profile: &SiteProfile, fetcher: &Fetcher) -> Result<ExtractionReport> {
    let image_data = scan_cache(profile)?;
    log::info!("found {} unique images across all pages", image_data.len());

    let all_images: Vec<ImageEntry> = image_data
        .iter()
        .map(|(normalized, refs)| ImageEntry {
            filename: refs[0].filename.clone(),
            pages: refs.iter().map(|r| r.page.clone()).collect(),
            normalized_url: normalized.clone(),
        })
        .collect();

    let mut images_by_page: BTreeMap<String, usize> = BTreeMap::new();
    for entry in &all_images {
        for page in &entry.pages {
            *images_by_page.entry(page.clone()).or_insert(0) += 1;
        }
    }

    let existing = audit_existing(profile)?;
    log::info!("found {} unique filenames already downloaded", existing.len());

    let (matched, missing): (Vec<&ImageEntry>, Vec<&ImageEntry>) = all_images
        .iter()
        .partition(|entry| existing.contains_key(&entry.filename));
    let (matched_count, missing_count) = (matched.len(), missing.len());
    log::info!("matched: {matched_count}, missing: {missing_count}");

    let hires_suffix = profile.image_hires_suffix();
    let mut download_results: Vec<DownloadResult> = Vec::new();
    for entry in &missing {
        let high_res_url = format!("{}{hires_suffix}", entry.normalized_url);
        let primary_page = entry.pages.first().cloned().unwrap_or_default();
        let dest_dir = profile.assets_dir().join(&primary_page);
        let dest_path = dest_dir.join(format!("{}{hires_suffix}", entry.filename));

        if dest_path.exists() {
            log::info!("already exists: {}", dest_path.display());
            download_results.push(DownloadResult {
                filename: entry.filename.clone(),
                status: "skipped".to_string(),
                path: Some(dest_path.display().to_string()),
                url: None,
                pages: entry.pages.clone(),
            });
            continue;
        }

        let status = match fetcher.fetch_bytes(&high_res_url).await {
            Ok(bytes) => {
                tokio::fs::create_dir_all(&dest_dir)
                    .await
                    .with_context(|| format!("failed to create {}", dest_dir.display()))?;
                tokio::fs::write(&dest_path, bytes)
                    .await
                    .with_context(|| format!("failed to write {}", dest_path.display()))?;
                fetcher.pause().await;
                "success"
            }
            Err(e) => {
                log::warn!("download failed for {}: {e}", entry.filename);
                "failed"
            }
        };
        download_results.push(DownloadResult {
            filename: entry.filename.clone(),
            status: status.to_string(),
            path: (status == "success").then(|| dest_path.display().to_string()),
            url: Some(high_res_url),
            pages: entry.pages.clone(),
        });
    }

    // Re-audit so the verification step sees the downloads just made.
    let final_existing = audit_existing(profile)?;
    let still_missing: Vec<ImageEntry> = all_images
        .iter()
        .filter(|entry| !final_existing.contains_key(&entry.filename))
        .cloned()
        .collect();

    log::info!(
        "verification: {} in cache, {} downloaded, {} still missing",
        all_images.len(),
        final_existing.len(),
        still_missing.len()
    );

    let report = ExtractionReport {
        generated_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        summary: ExtractionSummary {
            total_unique_images_in_cache: all_images.len(),
            images_matched_to_existing_files: matched_count,
            missing_images_identified: missing_count,
            images_still_missing: still_missing.len(),
        },
        images_by_page,
        all_images,
        download_results,
        still_missing,
    };

    let downloaded: HashSet<String> = final_existing.keys().cloned().collect();
    write_reports(&report, profile, &downloaded)?;

    if report.summary.images_still_missing > 0 {
        for entry in &report.still_missing {
            log::warn!(
                "still missing: {} (pages: {})",
                entry.filename,
                entry.pages.join(", ")
            );
        }
        return Err(MigrateError::MissingImages(report.summary.images_still_missing).into());
    }

    Ok(report)
}

fn write_reports(
    report: &ExtractionReport,
    profile: &SiteProfile,
    downloaded: &HashSet<String>,
) -> Result<()> {
    let report_dir = profile.report_dir();
    std::fs::create_dir_all(report_dir)
        .with_context(|| format!("failed to create {}", report_dir.display()))?;

    let json_path = report_dir.join("image-extraction-report.json");
    std::fs::write(&json_path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;
    log::info!("report saved to {}", json_path.display());

    let md_path = report_dir.join("image-extraction-report.md");
    std::fs::write(&md_path, report.to_markdown(downloaded))
        .with_context(|| format!("failed to write {}", md_path.display()))?;
    log::info!("markdown report saved to {}", md_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile() -> SiteProfile {
        SiteProfile::builder()
            .image_url_pattern(r"^https://img\.example\.com/")
            .base_url("https://sites.example.com/view/lab")
            .build()
            .unwrap()
    }

    #[test]
    fn test_extract_image_urls_filters_by_host() {
        let profile = test_profile();
        let hosted_re = profile.image_url_regex().unwrap();
        let html = r#"
            <img src="https://img.example.com/abc=w1280">
            <img src="https://other.example.com/x.png">
            <div style="background-image: url('https://img.example.com/bg=w640')"></div>
        "#;
        let urls = extract_image_urls(html, &hosted_re);
        assert_eq!(
            urls,
            vec![
                "https://img.example.com/abc=w1280",
                "https://img.example.com/bg=w640"
            ]
        );
    }

    #[test]
    fn test_normalize_image_url_strips_size() {
        let profile = test_profile();
        let size_re = profile.image_size_regex().unwrap();
        assert_eq!(
            normalize_image_url("https://img.example.com/abc=w1280", &size_re),
            "https://img.example.com/abc"
        );
        assert_eq!(
            normalize_image_url("https://img.example.com/abc", &size_re),
            "https://img.example.com/abc"
        );
    }

    #[test]
    fn test_filename_from_url() {
        let profile = test_profile();
        let size_re = profile.image_size_regex().unwrap();
        assert_eq!(
            filename_from_url("https://img.example.com/sitesv/TOKEN123=w1280", &size_re),
            "TOKEN123"
        );
        assert_eq!(
            filename_from_url("https://img.example.com/photo.jpg", &size_re),
            "photo.jpg"
        );
    }

    #[test]
    fn test_audit_existing_groups_by_stem() {
        let dir = tempfile::TempDir::new().unwrap();
        let assets = dir.path().join("assets");
        std::fs::create_dir_all(assets.join("home")).unwrap();
        std::fs::write(assets.join("home/TOKEN=w16383"), "img").unwrap();
        std::fs::write(assets.join("home/.hidden"), "x").unwrap();

        let profile = SiteProfile::builder()
            .assets_dir(&assets)
            .base_url("https://example.com")
            .build()
            .unwrap();

        let existing = audit_existing(&profile).unwrap();
        assert!(existing.contains_key("TOKEN"));
        assert_eq!(existing.len(), 1);
    }
}

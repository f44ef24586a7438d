//! Breadth-first inventory crawl of the legacy site.
//!
//! Walks internal links from the base URL with a visited set, records a
//! summary per page, collects referenced asset URLs, and writes
//! `site-map.json` plus a human-readable `inventory.md`.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use serde::Serialize;

use crate::config::SiteProfile;
use crate::fetch_cache::Fetcher;
use crate::utils::constants::EXCERPT_MAX_CHARS;
use crate::utils::excerpt;

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("TITLE_SEL: hardcoded selector is valid"));
static SECTION_ID_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("section[id]").expect("SECTION_ID_SEL: hardcoded selector is valid")
});
static SECTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section").expect("SECTION_SEL: hardcoded selector is valid"));
static IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("IMG_SEL: hardcoded selector is valid"));
static STYLED_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[style*="background-image"]"#)
        .expect("STYLED_SEL: hardcoded selector is valid")
});
static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("ANCHOR_SEL: hardcoded selector is valid"));

/// One crawled page in the inventory.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub url: String,
    pub title: String,
    pub sections: Vec<String>,
    pub excerpt: String,
}

/// Result of a full inventory crawl.
#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    pub pages: Vec<PageSummary>,
    pub assets: Vec<String>,
}

/// Strip the fragment and keep only URLs that belong to the site.
fn normalize_internal(url: &str, base_url: &str) -> Option<String> {
    let clean = url.split('#').next().unwrap_or(url);
    if !clean.starts_with(base_url) {
        return None;
    }
    Some(clean.trim_end_matches('#').to_string())
}

fn defrag(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

/// Pull the URL out of an inline `background-image: url(...)` style.
fn background_image_url(style: &str) -> Option<String> {
    let after = style.split_once("url(")?.1;
    let inside = after.split_once(')')?.0;
    let url = inside.trim().trim_matches(|c| c == '"' || c == '\'');
    (!url.is_empty()).then(|| url.to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn summarize_page(url: &str, document: &Html) -> PageSummary {
    let title = document
        .select(&TITLE_SEL)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default();

    let sections = document
        .select(&SECTION_ID_SEL)
        .filter_map(|s| s.value().attr("id"))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    let section_text = document
        .select(&SECTION_SEL)
        .map(|s| collapse_whitespace(&s.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    PageSummary {
        url: url.to_string(),
        title,
        sections,
        excerpt: excerpt(&section_text, EXCERPT_MAX_CHARS).to_string(),
    }
}

/// Crawl the whole site breadth-first from the profile's base URL.
///
/// A page that fails to fetch is logged, marked visited, and skipped; the
/// crawl continues.
pub async fn crawl(profile: &SiteProfile, fetcher: &Fetcher) -> Result<Inventory> {
    let base_url = profile.base_url();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::from([base_url.to_string()]);
    let mut pages: Vec<PageSummary> = Vec::new();
    let mut assets: BTreeSet<String> = BTreeSet::new();

    while let Some(current) = queue.pop_front() {
        if visited.contains(&current) {
            continue;
        }

        let html = match fetcher.fetch_page(&current).await {
            Ok(html) => html,
            Err(e) => {
                log::warn!("failed to crawl {current}: {e}");
                visited.insert(current);
                continue;
            }
        };
        visited.insert(current.clone());

        let document = Html::parse_document(&html);
        pages.push(summarize_page(&current, &document));

        for img in document.select(&IMG_SEL) {
            if let Some(src) = img.value().attr("src") {
                assets.insert(defrag(src).to_string());
            }
        }

        for styled in document.select(&STYLED_SEL) {
            if let Some(style) = styled.value().attr("style") {
                if let Some(url) = background_image_url(style) {
                    assets.insert(defrag(&url).to_string());
                }
            }
        }

        for link in document.select(&ANCHOR_SEL) {
            let Some(href) = link.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() {
                continue;
            }
            if href.starts_with("http") {
                if href.starts_with(base_url) {
                    if let Some(internal) = normalize_internal(href, base_url) {
                        if !visited.contains(&internal) {
                            queue.push_back(internal);
                        }
                    }
                } else {
                    assets.insert(defrag(href).to_string());
                }
            } else if href.starts_with('/') {
                if let Ok(current_url) = url::Url::parse(&current) {
                    if let Ok(joined) = current_url.join(href) {
                        if let Some(internal) = normalize_internal(joined.as_str(), base_url) {
                            if !visited.contains(&internal) {
                                queue.push_back(internal);
                            }
                        }
                    }
                }
            }
        }

        fetcher.pause().await;
    }

    pages.sort_by(|a, b| a.url.cmp(&b.url));
    log::info!(
        "crawled {} pages, discovered {} unique assets",
        pages.len(),
        assets.len()
    );

    Ok(Inventory {
        pages,
        assets: assets.into_iter().collect(),
    })
}

/// Write `site-map.json` and `inventory.md` under `output_dir`.
pub fn write_outputs(inventory: &Inventory, profile: &SiteProfile, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let site_map = output_dir.join("site-map.json");
    std::fs::write(&site_map, serde_json::to_string_pretty(inventory)?)
        .with_context(|| format!("failed to write {}", site_map.display()))?;

    let mut md = String::new();
    let heading = profile.site_name().unwrap_or("Site");
    md.push_str(&format!("# {heading} Inventory\n\n"));
    for (idx, page) in inventory.pages.iter().enumerate() {
        let label = if page.title.is_empty() {
            &page.url
        } else {
            &page.title
        };
        md.push_str(&format!("## {}. {label}\n", idx + 1));
        md.push_str(&format!("- URL: {}\n", page.url));
        if !page.sections.is_empty() {
            md.push_str(&format!("- Sections: {}\n", page.sections.join(", ")));
        }
        if !page.excerpt.is_empty() {
            md.push_str(&format!("- Excerpt: {}\n", page.excerpt));
        }
        md.push('\n');
    }
    md.push_str("## Assets\n");
    for asset in &inventory.assets {
        md.push_str(&format!("- {asset}\n"));
    }

    let inventory_md = output_dir.join("inventory.md");
    std::fs::write(&inventory_md, md)
        .with_context(|| format!("failed to write {}", inventory_md.display()))?;

    log::info!("inventory written to {}", output_dir.display());
    Ok(())
}

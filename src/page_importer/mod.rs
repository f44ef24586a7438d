//! Page import: fetch legacy pages, clean their HTML, localize images,
//! convert to Markdown with front matter, and write `pages/<slug>.md`.
//!
//! Writes are idempotent: a page whose rendered content is unchanged is
//! left alone so repeated runs touch nothing (unless forced).

pub mod front_matter;

use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use htmd::HtmlToMarkdown;
use htmd::options::{BulletListMarker, HeadingStyle, Options};
use lol_html::{RewriteStrSettings, element, rewrite_str};
use scraper::{Html, Selector};
use url::Url;
use xxhash_rust::xxh3::xxh3_64;

use crate::config::SiteProfile;
use crate::fetch_cache::Fetcher;
use crate::utils::slugify;

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("TITLE_SEL: hardcoded selector is valid"));
static H1_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("H1_SEL: hardcoded selector is valid"));
static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("BODY_SEL: hardcoded selector is valid"));
static IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("IMG_SEL: hardcoded selector is valid"));
static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("ANCHOR_SEL: hardcoded selector is valid"));

/// Derive the slug identifying a page URL.
///
/// The base URL itself (with or without a trailing slash) is `home`; any
/// other page is the slugified final path segment.
#[must_use]
pub fn slug_for_url(url: &str, base_url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed == base_url.trim_end_matches('/') {
        return "home".to_string();
    }
    let last = trimmed.rsplit('/').next().unwrap_or("");
    let slug = slugify(last);
    if slug.is_empty() { "home".to_string() } else { slug }
}

/// Extract the page title: `<title>` minus the configured site-name
/// suffix, falling back to the first `<h1>`, then to a placeholder.
fn extract_title(document: &Html, profile: &SiteProfile) -> String {
    if let Some(title_el) = document.select(&TITLE_SEL).next() {
        let mut title = title_el.text().collect::<String>().trim().to_string();
        if let Some(site_name) = profile.site_name() {
            if let Some(stripped) = title.strip_suffix(site_name) {
                title = stripped.trim_end_matches(['-', '–', ' ']).to_string();
            }
        }
        if !title.is_empty() {
            return title;
        }
    }

    if let Some(h1) = document.select(&H1_SEL).next() {
        let text = h1.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            return text;
        }
    }

    "Untitled Page".to_string()
}

/// Pick the main content fragment: the configured selector when it
/// matches, otherwise `<body>`, otherwise the whole document.
fn select_content(document: &Html, profile: &SiteProfile) -> String {
    if let Some(selector_str) = profile.content_selector() {
        match Selector::parse(selector_str) {
            Ok(selector) => {
                if let Some(el) = document.select(&selector).next() {
                    return el.html();
                }
                log::debug!("content selector '{selector_str}' matched nothing, using <body>");
            }
            Err(e) => log::warn!("invalid content selector '{selector_str}': {e:?}"),
        }
    }

    document
        .select(&BODY_SEL)
        .next()
        .map_or_else(|| document.root_element().html(), |body| body.html())
}

/// Remove elements that have no place in imported content.
fn clean_html(html: &str) -> Result<String> {
    fn drop_element(el: &mut lol_html::html_content::Element<'_, '_>) -> lol_html::HandlerResult {
        el.remove();
        Ok(())
    }
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("script", drop_element),
                element!("style", drop_element),
                element!("noscript", drop_element),
                element!("iframe", drop_element),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| anyhow::anyhow!("HTML cleanup error: {e}"))
}

/// Download one image and return its root-relative imported path.
///
/// Already-downloaded files are not re-fetched. A failed download is
/// logged and yields `None`; the page import carries on with the original
/// reference.
async fn download_image(
    fetcher: &Fetcher,
    image_url: &str,
    slug: &str,
    profile: &SiteProfile,
) -> Option<String> {
    let parsed = Url::parse(image_url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let raw_name = parsed
        .path()
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("image_{}.jpg", &hex::encode(xxh3_64(image_url.as_bytes()).to_be_bytes())[..8])
        });
    let filename = sanitize_filename::sanitize(&raw_name);

    let image_dir = profile.assets_dir().join(slug);
    let image_path = image_dir.join(&filename);

    if !image_path.exists() {
        log::info!("downloading image: {filename}");
        let bytes = match fetcher.fetch_bytes(image_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("failed to download {image_url}: {e}");
                return None;
            }
        };
        if let Err(e) = tokio::fs::create_dir_all(&image_dir).await {
            log::warn!("failed to create {}: {e}", image_dir.display());
            return None;
        }
        if let Err(e) = tokio::fs::write(&image_path, bytes).await {
            log::warn!("failed to write {}: {e}", image_path.display());
            return None;
        }
    }

    Some(format!("{}/{slug}/{filename}", profile.assets_prefix()))
}

/// Download every referenced image and point its `src` at the imported
/// copy.
async fn localize_images(
    html: &str,
    page_url: &str,
    slug: &str,
    profile: &SiteProfile,
    fetcher: &Fetcher,
) -> Result<String> {
    let base = Url::parse(page_url)
        .with_context(|| format!("invalid page URL {page_url}"))?;

    let sources: Vec<String> = {
        let document = Html::parse_fragment(html);
        document
            .select(&IMG_SEL)
            .filter_map(|img| img.value().attr("src"))
            .map(str::to_string)
            .collect()
    };

    let mut replacements: HashMap<String, String> = HashMap::new();
    for src in sources {
        if replacements.contains_key(&src) {
            continue;
        }
        let Ok(absolute) = base.join(&src) else {
            continue;
        };
        if let Some(local) = download_image(fetcher, absolute.as_str(), slug, profile).await {
            replacements.insert(src, local);
        }
    }

    if replacements.is_empty() {
        return Ok(html.to_string());
    }

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img[src]", |el| {
                if let Some(src) = el.get_attribute("src") {
                    if let Some(local) = replacements.get(&src) {
                        el.set_attribute("src", local)?;
                    }
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| anyhow::anyhow!("image rewrite error: {e}"))
}

/// Convert cleaned HTML to Markdown (ATX headings, `-` bullets).
pub fn html_to_markdown(html: &str) -> Result<String> {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript", "iframe"])
        .options(Options {
            heading_style: HeadingStyle::Atx,
            bullet_list_marker: BulletListMarker::Dash,
            ..Options::default()
        })
        .build();
    let markdown = converter
        .convert(html)
        .map_err(|e| anyhow::anyhow!("markdown conversion error: {e}"))?;
    Ok(markdown.trim().to_string())
}

/// Write `pages/<slug>.md`, skipping the write when content is unchanged.
///
/// Returns whether the file was written.
pub fn write_page(slug: &str, content: &str, profile: &SiteProfile) -> Result<bool> {
    let pages_dir = profile.pages_dir();
    std::fs::create_dir_all(pages_dir)
        .with_context(|| format!("failed to create {}", pages_dir.display()))?;
    let output_file = pages_dir.join(format!("{slug}.md"));

    if !profile.force() && output_file.exists() {
        let existing = std::fs::read_to_string(&output_file)
            .with_context(|| format!("failed to read {}", output_file.display()))?;
        if existing == content {
            log::info!("no changes: {}", output_file.display());
            return Ok(false);
        }
    }

    std::fs::write(&output_file, content)
        .with_context(|| format!("failed to write {}", output_file.display()))?;
    log::info!("written: {}", output_file.display());
    Ok(true)
}

/// Import a single page identified by slug and URL.
pub async fn import_page(
    profile: &SiteProfile,
    fetcher: &Fetcher,
    slug: &str,
    url: &str,
) -> Result<()> {
    log::info!("processing: {slug}");

    let html = fetcher.fetch_page(url).await?;
    let document = Html::parse_document(&html);

    let title = extract_title(&document, profile);
    let content = select_content(&document, profile);
    let cleaned = clean_html(&content)?;
    let localized = localize_images(&cleaned, url, slug, profile, fetcher).await?;
    let markdown = html_to_markdown(&localized)?;

    let permalink = if slug == "home" {
        "/".to_string()
    } else {
        format!("/{slug}/")
    };
    let full_content = format!(
        "{}{markdown}",
        front_matter::render(&title, &permalink, url)
    );

    write_page(slug, &full_content, profile)?;
    fetcher.pause().await;
    Ok(())
}

/// Discover page URLs from the base page's navigation links.
///
/// The legacy host leans on client-side navigation, so this returns at
/// least the base page plus any directly linked siblings; `--pages` slugs
/// supplement the set later.
pub async fn discover_pages(profile: &SiteProfile, fetcher: &Fetcher) -> Result<Vec<String>> {
    log::info!("discovering pages...");
    let base_url = profile.base_url();
    let html = fetcher.fetch_page(base_url).await?;
    let document = Html::parse_document(&html);

    let base = Url::parse(base_url).with_context(|| format!("invalid base URL {base_url}"))?;
    let mut pages = vec![base_url.to_string()];

    for link in document.select(&ANCHOR_SEL) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.contains(base_url.trim_start_matches("https://").trim_start_matches("http://")) {
            continue;
        }
        if let Ok(full) = base.join(href) {
            let full = full.to_string();
            if !pages.contains(&full) {
                pages.push(full);
            }
        }
    }

    Ok(pages)
}

/// Build the slug → URL table, guaranteeing every requested slug has an
/// entry.
#[must_use]
pub fn ensure_slug_pages(
    discovered: &[String],
    requested: &[String],
    profile: &SiteProfile,
) -> Vec<(String, String)> {
    let base_url = profile.base_url();
    let mut table: Vec<(String, String)> = Vec::new();

    for url in discovered {
        let slug = slug_for_url(url, base_url);
        if !table.iter().any(|(s, _)| s == &slug) {
            table.push((slug, url.clone()));
        }
    }
    for slug in requested {
        if !table.iter().any(|(s, _)| s == slug) {
            table.push((slug.clone(), profile.page_url(slug)));
        }
    }

    table
}

/// Run a full import: discover pages, then import each target slug.
pub async fn run(profile: &SiteProfile, fetcher: &Fetcher, requested: &[String]) -> Result<()> {
    let discovered = discover_pages(profile, fetcher).await?;
    log::info!("discovered {} page(s)", discovered.len());

    let url_map = ensure_slug_pages(&discovered, requested, profile);
    let targets: Vec<String> = if requested.is_empty() {
        url_map.iter().map(|(slug, _)| slug.clone()).collect()
    } else {
        requested.to_vec()
    };

    for slug in &targets {
        let Some((_, url)) = url_map.iter().find(|(s, _)| s == slug) else {
            log::warn!("no URL for slug '{slug}', skipping");
            continue;
        };
        if let Err(e) = import_page(profile, fetcher, slug, url).await {
            log::warn!("failed to import '{slug}': {e}");
        }
    }

    log::info!(
        "import complete: pages in {}, images in {}",
        profile.pages_dir().display(),
        profile.assets_dir().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile() -> SiteProfile {
        SiteProfile::builder()
            .site_name("MSD Soft Matter Lab")
            .base_url("https://sites.example.com/view/lab")
            .build()
            .unwrap()
    }

    #[test]
    fn test_slug_for_url() {
        let base = "https://sites.example.com/view/lab";
        assert_eq!(slug_for_url(base, base), "home");
        assert_eq!(slug_for_url("https://sites.example.com/view/lab/", base), "home");
        assert_eq!(
            slug_for_url("https://sites.example.com/view/lab/Our-Team", base),
            "our-team"
        );
    }

    #[test]
    fn test_extract_title_strips_site_suffix() {
        let profile = test_profile();
        let doc = Html::parse_document(
            "<html><head><title>Research - MSD Soft Matter Lab</title></head></html>",
        );
        assert_eq!(extract_title(&doc, &profile), "Research");
    }

    #[test]
    fn test_extract_title_h1_fallback() {
        let profile = test_profile();
        let doc = Html::parse_document("<html><body><h1>Facilities</h1></body></html>");
        assert_eq!(extract_title(&doc, &profile), "Facilities");
    }

    #[test]
    fn test_extract_title_placeholder() {
        let profile = test_profile();
        let doc = Html::parse_document("<html><body><p>nothing</p></body></html>");
        assert_eq!(extract_title(&doc, &profile), "Untitled Page");
    }

    #[test]
    fn test_clean_html_removes_noise() {
        let html = "<div><script>x()</script><style>a{}</style><p>Keep</p><iframe src=\"x\"></iframe></div>";
        let cleaned = clean_html(html).unwrap();
        assert!(cleaned.contains("<p>Keep</p>"));
        assert!(!cleaned.contains("script"));
        assert!(!cleaned.contains("style"));
        assert!(!cleaned.contains("iframe"));
    }

    #[test]
    fn test_html_to_markdown_atx_and_dashes() {
        let md = html_to_markdown("<h2>Topics</h2><ul><li>one</li><li>two</li></ul>").unwrap();
        assert!(md.contains("## Topics"));
        assert!(md.contains("- one"));
        assert!(md.contains("- two"));
    }

    #[test]
    fn test_ensure_slug_pages_appends_requested() {
        let profile = test_profile();
        let discovered = vec![
            "https://sites.example.com/view/lab".to_string(),
            "https://sites.example.com/view/lab/research".to_string(),
        ];
        let requested = vec!["contact".to_string()];
        let table = ensure_slug_pages(&discovered, &requested, &profile);

        assert_eq!(table.len(), 3);
        assert_eq!(table[0].0, "home");
        assert_eq!(table[1].0, "research");
        assert_eq!(
            table[2],
            (
                "contact".to_string(),
                "https://sites.example.com/view/lab/contact".to_string()
            )
        );
    }

    #[test]
    fn test_write_page_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let profile = SiteProfile::builder()
            .pages_dir(dir.path().join("pages"))
            .base_url("https://example.com")
            .build()
            .unwrap();

        assert!(write_page("home", "content", &profile).unwrap());
        assert!(!write_page("home", "content", &profile).unwrap());
        assert!(write_page("home", "changed", &profile).unwrap());
    }
}

//! Streaming rewrite of internal references in relocated HTML.
//!
//! Scans every link-bearing attribute (`a[href]`, `link[href]`,
//! `script[src]`, `img[src]`, `source[src]`) and the text of inline
//! `<style>` blocks, rewriting each internal reference to a root-relative
//! path through the asset map. External URLs, anchors, and scheme-qualified
//! values are never touched. Query strings and fragments survive the
//! rewrite.

pub mod resolver;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use regex::{Captures, Regex};
use url::Url;

use crate::asset_relocator::AssetMap;
use crate::error::MigrateError;
pub use resolver::resolve;

/// Prefixes that mark a reference as external or non-relocatable.
const SKIP_PREFIXES: &[&str] = &["http://", "https://", "//", "#", "mailto:", "tel:"];

static CSS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(["']?([^"')]+)["']?\)"#).expect("CSS_URL_RE: hardcoded regex is valid")
});

/// Whether a raw reference value must be left untouched.
fn should_skip(value: &str, in_css: bool) -> bool {
    if SKIP_PREFIXES.iter().any(|p| value.starts_with(p)) {
        return true;
    }
    if in_css && value.starts_with("data:") {
        return true;
    }
    // Absolute URLs with uncommon schemes (javascript:, ftp:, data: in
    // attributes) parse successfully; relative references do not.
    Url::parse(value).is_ok()
}

/// Rebase one reference to a root-relative path via the asset map.
///
/// Returns `None` when the value is skipped or the rewrite would be a
/// no-op. The query string and fragment of the original value are carried
/// over unchanged.
fn rebase_reference(value: &str, map: &AssetMap, in_css: bool) -> Option<String> {
    if value.is_empty() || should_skip(value, in_css) {
        return None;
    }

    let (rest, fragment) = match value.split_once('#') {
        Some((rest, frag)) => (rest, Some(frag)),
        None => (value, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    if path.is_empty() {
        return None;
    }

    let resolved = resolve(path, map);
    let mut rebased = format!("/{resolved}");
    if let Some(query) = query {
        rebased.push('?');
        rebased.push_str(query);
    }
    if let Some(fragment) = fragment {
        rebased.push('#');
        rebased.push_str(fragment);
    }

    if rebased == value { None } else { Some(rebased) }
}

/// Rewrite `url(...)` references inside a CSS block.
///
/// Returns the rewritten CSS and the number of references changed.
#[must_use]
pub fn rewrite_css_urls(css: &str, map: &AssetMap) -> (String, usize) {
    let mut changes = 0usize;
    let rewritten = CSS_URL_RE.replace_all(css, |caps: &Captures| {
        let raw = caps[1].trim();
        match rebase_reference(raw, map, true) {
            Some(rebased) => {
                changes += 1;
                format!("url(\"{rebased}\")")
            }
            None => caps[0].to_string(),
        }
    });
    (rewritten.into_owned(), changes)
}

/// Rewrite every internal reference in an HTML document.
///
/// Returns the rewritten document and the number of references changed
/// (zero means the caller can skip writing the file back).
pub fn rewrite_html(html: &str, map: &AssetMap) -> Result<(String, usize)> {
    let changes = AtomicUsize::new(0);
    // Inline <style> text arrives in chunks; buffer until the last one so
    // a url(...) split across chunks cannot be missed.
    let style_buffer = RefCell::new(String::new());

    let output = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("a[href]", |el| {
                    if let Some(value) = el.get_attribute("href") {
                        if let Some(rebased) = rebase_reference(&value, map, false) {
                            el.set_attribute("href", &rebased)?;
                            changes.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(())
                }),
                element!("link[href]", |el| {
                    if let Some(value) = el.get_attribute("href") {
                        if let Some(rebased) = rebase_reference(&value, map, false) {
                            el.set_attribute("href", &rebased)?;
                            changes.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(())
                }),
                element!("script[src]", |el| {
                    if let Some(value) = el.get_attribute("src") {
                        if let Some(rebased) = rebase_reference(&value, map, false) {
                            el.set_attribute("src", &rebased)?;
                            changes.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(())
                }),
                element!("img[src]", |el| {
                    if let Some(value) = el.get_attribute("src") {
                        if let Some(rebased) = rebase_reference(&value, map, false) {
                            el.set_attribute("src", &rebased)?;
                            changes.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(())
                }),
                element!("source[src]", |el| {
                    if let Some(value) = el.get_attribute("src") {
                        if let Some(rebased) = rebase_reference(&value, map, false) {
                            el.set_attribute("src", &rebased)?;
                            changes.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(())
                }),
                text!("style", |chunk| {
                    style_buffer.borrow_mut().push_str(chunk.as_str());
                    if chunk.last_in_text_node() {
                        let css = style_buffer.take();
                        let (rewritten, count) = rewrite_css_urls(&css, map);
                        changes.fetch_add(count, Ordering::Relaxed);
                        chunk.replace(&rewritten, ContentType::Html);
                    } else {
                        chunk.remove();
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| anyhow::anyhow!("HTML rewrite error: {e}"))?;

    Ok((output, changes.load(Ordering::Relaxed)))
}

/// Rewrite one relocated document in place.
///
/// Returns whether the file was modified. Unchanged documents are not
/// written back.
pub fn rewrite_document(path: &Path, map: &AssetMap) -> Result<bool> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let (rewritten, count) = rewrite_html(&html, map).map_err(|e| MigrateError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if count == 0 {
        return Ok(false);
    }
    std::fs::write(path, rewritten)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::debug!("rewrote {count} reference(s) in {}", path.display());
    Ok(true)
}

/// Totals for one rewriting pass over a staged tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct RewriteStats {
    pub documents: usize,
    pub modified: usize,
    pub skipped: usize,
}

/// Rewrite every `.html`/`.htm` file under the staging root.
///
/// A document that fails to parse is logged and skipped; a single
/// malformed file never aborts the batch.
pub fn rewrite_tree(staging_root: &Path, map: &AssetMap) -> Result<RewriteStats> {
    if !staging_root.exists() {
        return Err(MigrateError::NotFound(staging_root.to_path_buf()).into());
    }

    let mut html_files: Vec<PathBuf> = jwalk::WalkDir::new(staging_root)
        .skip_hidden(false)
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.ok()?;
            if !entry.file_type().is_file() {
                return None;
            }
            let path = entry.path();
            let ext = path.extension()?.to_string_lossy().to_lowercase();
            (ext == "html" || ext == "htm").then_some(path)
        })
        .collect();
    html_files.sort();

    let mut stats = RewriteStats {
        documents: html_files.len(),
        ..RewriteStats::default()
    };
    for path in &html_files {
        match rewrite_document(path, map) {
            Ok(true) => stats.modified += 1,
            Ok(false) => {}
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                stats.skipped += 1;
            }
        }
    }

    log::info!(
        "processed {} HTML files ({} modified, {} skipped)",
        stats.documents,
        stats.modified,
        stats.skipped
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> AssetMap {
        let mut map = AssetMap::new();
        map.insert("old/style.css", "css/style.css");
        map.insert("assets/logo.png", "images/logo.png");
        map.insert("scripts/app.js", "js/app.js");
        map.insert("about.html", "about.html");
        map
    }

    #[test]
    fn test_rewrite_relative_stylesheet_link() {
        let map = sample_map();
        let html = r#"<link rel="stylesheet" href="../old/style.css">"#;
        let (out, count) = rewrite_html(html, &map).unwrap();
        assert_eq!(count, 1);
        assert!(out.contains(r#"href="/css/style.css""#));
    }

    #[test]
    fn test_external_and_anchor_links_untouched() {
        let map = sample_map();
        let html = concat!(
            r#"<a href="https://external.example.com/x">ext</a>"#,
            r#"<a href="//cdn.example.com/lib.js">cdn</a>"#,
            r##"<a href="#section">anchor</a>"##,
            r#"<a href="mailto:lab@example.com">mail</a>"#,
            r#"<a href="tel:+1555">tel</a>"#,
        );
        let (out, count) = rewrite_html(html, &map).unwrap();
        assert_eq!(count, 0);
        assert_eq!(out, html);
    }

    #[test]
    fn test_external_img_byte_for_byte_unchanged() {
        let map = sample_map();
        let html = r#"<img src="http://external.example.com/x.png">"#;
        let (out, count) = rewrite_html(html, &map).unwrap();
        assert_eq!(count, 0);
        assert_eq!(out, html);
    }

    #[test]
    fn test_uncommon_scheme_skipped() {
        let map = sample_map();
        let html = r#"<a href="ftp://files.example.com/x">f</a><a href="javascript:void(0)">j</a>"#;
        let (out, count) = rewrite_html(html, &map).unwrap();
        assert_eq!(count, 0);
        assert_eq!(out, html);
    }

    #[test]
    fn test_query_and_fragment_preserved() {
        let map = sample_map();
        let html = r#"<a href="about.html?tab=2#team">about</a>"#;
        let (out, count) = rewrite_html(html, &map).unwrap();
        assert_eq!(count, 1);
        assert!(out.contains(r#"href="/about.html?tab=2#team""#));
    }

    #[test]
    fn test_script_and_img_rewritten() {
        let map = sample_map();
        let html = r#"<script src="scripts/app.js"></script><img src="/assets/logo.png">"#;
        let (out, count) = rewrite_html(html, &map).unwrap();
        assert_eq!(count, 2);
        assert!(out.contains(r#"src="/js/app.js""#));
        assert!(out.contains(r#"src="/images/logo.png""#));
    }

    #[test]
    fn test_unmapped_reference_becomes_root_relative() {
        let map = sample_map();
        let html = r#"<img src="unknown/photo.png">"#;
        let (out, count) = rewrite_html(html, &map).unwrap();
        // Best effort: no mapping, but the reference is still rooted so it
        // no longer depends on the document's own depth.
        assert_eq!(count, 1);
        assert!(out.contains(r#"src="/unknown/photo.png""#));
    }

    #[test]
    fn test_other_attributes_preserved() {
        let map = sample_map();
        let html = r#"<a href="old/style.css" class="btn" id="l1" target="_blank">x</a>"#;
        let (out, _) = rewrite_html(html, &map).unwrap();
        assert!(out.contains(r#"class="btn""#));
        assert!(out.contains(r#"id="l1""#));
        assert!(out.contains(r#"target="_blank""#));
    }

    #[test]
    fn test_css_url_rewrite_preserves_query() {
        let map = sample_map();
        let css = "background: url('assets/logo.png?v=2');";
        let (out, count) = rewrite_css_urls(css, &map);
        assert_eq!(count, 1);
        assert_eq!(out, r#"background: url("/images/logo.png?v=2");"#);
    }

    #[test]
    fn test_css_skips_data_and_external_urls() {
        let map = sample_map();
        let css = "a{background:url(data:image/png;base64,xyz)} b{background:url(https://x.com/a.png)}";
        let (out, count) = rewrite_css_urls(css, &map);
        assert_eq!(count, 0);
        assert_eq!(out, css);
    }

    #[test]
    fn test_inline_style_block_rewritten() {
        let map = sample_map();
        let html = "<style>\nbody { background: url(\"assets/logo.png\"); }\n</style>";
        let (out, count) = rewrite_html(html, &map).unwrap();
        assert_eq!(count, 1);
        assert!(out.contains(r#"url("/images/logo.png")"#));
    }

    #[test]
    fn test_rewrite_is_stable_fixed_point() {
        let map = sample_map();
        let html = r#"<link href="../old/style.css"><img src="assets/logo.png">"#;
        let (first, count) = rewrite_html(html, &map).unwrap();
        assert_eq!(count, 2);
        let (second, count) = rewrite_html(&first, &map).unwrap();
        assert_eq!(count, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rewrite_document_skips_unchanged_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        let html = r#"<a href="https://external.example.com/">x</a>"#;
        std::fs::write(&path, html).unwrap();

        let modified = rewrite_document(&path, &sample_map()).unwrap();
        assert!(!modified);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), html);
    }

    #[test]
    fn test_rewrite_tree_walks_html_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(
            root.join("index.html"),
            r#"<link href="old/style.css">"#,
        )
        .unwrap();
        std::fs::write(
            root.join("sub/page.htm"),
            r#"<img src="../assets/logo.png">"#,
        )
        .unwrap();
        std::fs::write(root.join("notes.txt"), "url(assets/logo.png)").unwrap();

        let stats = rewrite_tree(root, &sample_map()).unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.modified, 2);
        assert_eq!(stats.skipped, 0);

        let index = std::fs::read_to_string(root.join("index.html")).unwrap();
        assert!(index.contains(r#"href="/css/style.css""#));
        // Non-HTML files are never touched.
        assert_eq!(
            std::fs::read_to_string(root.join("notes.txt")).unwrap(),
            "url(assets/logo.png)"
        );
    }
}

//! Asset relocation: classify every file in a raw mirror tree and copy it
//! into a clean staging layout, recording the old→new path mapping.
//!
//! The mapping ([`AssetMap`]) is built once per run, then consumed
//! read-only by the link rewriter. Keys are always normalized POSIX
//! relative paths so lookups are insensitive to how a reference was
//! spelled in HTML.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::error::MigrateError;
use crate::utils::{basename, copy_preserving_mtime, normalize_ref, posix_rel};

/// Image extensions relocated into `images/`.
const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg", "webp", "ico"];
/// Font extensions relocated into `fonts/`.
const FONT_EXTS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];

/// Compute the staging destination for a source-relative path.
///
/// Evaluated by file extension, case-insensitively, first match wins:
/// images, stylesheets, scripts and fonts move to flat type directories
/// (directory structure discarded); HTML keeps its path unless it is
/// nested more than two segments deep, in which case it flattens to the
/// staging root; everything else keeps its full relative path.
///
/// Total and deterministic: every input maps to exactly one output.
#[must_use]
pub fn classify(rel_path: &Path) -> PathBuf {
    let ext = rel_path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let file_name = rel_path.file_name().unwrap_or(rel_path.as_os_str());

    if IMAGE_EXTS.contains(&ext.as_str()) {
        return Path::new("images").join(file_name);
    }
    if ext == "css" {
        return Path::new("css").join(file_name);
    }
    if ext == "js" {
        return Path::new("js").join(file_name);
    }
    if FONT_EXTS.contains(&ext.as_str()) {
        return Path::new("fonts").join(file_name);
    }
    if ext == "html" || ext == "htm" {
        // Flatten deep nesting so public URLs stay short; shallow
        // structure is preserved as-is.
        if rel_path.components().count() > 2 {
            return PathBuf::from(file_name);
        }
        return rel_path.to_path_buf();
    }

    rel_path.to_path_buf()
}

/// Old-path → new-path mapping produced by the relocation pass.
///
/// Alongside the primary map, a basename index supports the resolver's
/// filename fallback in O(1). When several originals share a basename the
/// index keeps the lexicographically smallest original path, making the
/// fallback deterministic regardless of insertion order.
#[derive(Debug, Default, Clone)]
pub struct AssetMap {
    by_original: HashMap<String, String>,
    /// basename → (original key that claimed it, destination)
    by_basename: HashMap<String, (String, String)>,
}

impl AssetMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one relocated file. Both paths are normalized to POSIX key
    /// form.
    pub fn insert(&mut self, original: &str, destination: &str) {
        let key = normalize_ref(original);
        let dest = normalize_ref(destination);

        let name = basename(&key).to_string();
        if !name.is_empty() {
            match self.by_basename.get(&name) {
                Some((existing_key, _)) if existing_key.as_str() <= key.as_str() => {}
                _ => {
                    self.by_basename.insert(name, (key.clone(), dest.clone()));
                }
            }
        }

        self.by_original.insert(key, dest);
    }

    /// Exact lookup by normalized original path.
    #[must_use]
    pub fn get(&self, original: &str) -> Option<&str> {
        self.by_original.get(original).map(String::as_str)
    }

    /// Fallback lookup by basename.
    #[must_use]
    pub fn get_by_basename(&self, name: &str) -> Option<&str> {
        self.by_basename.get(name).map(|(_, dest)| dest.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_original.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_original.is_empty()
    }

    /// Entries sorted by original path, for manifests and tests.
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .by_original
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort();
        entries
    }
}

#[derive(Serialize)]
struct AssetMapManifest<'a> {
    generated: String,
    source_root: String,
    file_count: usize,
    files: std::collections::BTreeMap<&'a str, &'a str>,
}

/// Walk `source_root`, copy every regular file to its classified
/// destination under `staging_root`, and return the resulting map.
///
/// Fails with [`MigrateError::NotFound`] when the source is missing.
/// Re-running over an unchanged source produces the same map and
/// overwrites destinations identically.
pub fn build_asset_map(source_root: &Path, staging_root: &Path) -> Result<AssetMap> {
    if !source_root.exists() {
        return Err(MigrateError::NotFound(source_root.to_path_buf()).into());
    }
    std::fs::create_dir_all(staging_root)
        .with_context(|| format!("failed to create {}", staging_root.display()))?;

    // Collect and sort first so map insertion order is stable across runs
    // and platforms.
    let mut files: Vec<PathBuf> = jwalk::WalkDir::new(source_root)
        .skip_hidden(false)
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.ok()?;
            entry.file_type().is_file().then(|| entry.path())
        })
        .collect();
    files.sort();

    let mut map = AssetMap::new();
    for src in &files {
        let rel = src.strip_prefix(source_root).unwrap_or(src);
        let dest_rel = classify(rel);
        let dest = staging_root.join(&dest_rel);

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        copy_preserving_mtime(src, &dest)?;

        map.insert(&posix_rel(rel), &posix_rel(&dest_rel));
    }

    log::info!("organized {} files into {}", map.len(), staging_root.display());
    Ok(map)
}

/// Write the old→new mapping beside the staged tree for traceability.
pub fn write_asset_map_manifest(
    map: &AssetMap,
    source_root: &Path,
    staging_root: &Path,
) -> Result<PathBuf> {
    let manifest = AssetMapManifest {
        generated: Utc::now().to_rfc3339(),
        source_root: source_root.display().to_string(),
        file_count: map.len(),
        files: map.sorted_entries().into_iter().collect(),
    };

    let path = staging_root.join("asset-map.json");
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classify_images_flatten() {
        assert_eq!(
            classify(Path::new("old/deep/logo.png")),
            PathBuf::from("images/logo.png")
        );
        assert_eq!(classify(Path::new("x.JPG")), PathBuf::from("images/x.JPG"));
        assert_eq!(
            classify(Path::new("favicon.ico")),
            PathBuf::from("images/favicon.ico")
        );
    }

    #[test]
    fn test_classify_css_js_fonts() {
        assert_eq!(
            classify(Path::new("old/style.css")),
            PathBuf::from("css/style.css")
        );
        assert_eq!(
            classify(Path::new("static/app.js")),
            PathBuf::from("js/app.js")
        );
        assert_eq!(
            classify(Path::new("t/f/inter.woff2")),
            PathBuf::from("fonts/inter.woff2")
        );
    }

    #[test]
    fn test_classify_html_depth_rules() {
        // Two segments or fewer: structure preserved.
        assert_eq!(
            classify(Path::new("index.html")),
            PathBuf::from("index.html")
        );
        assert_eq!(
            classify(Path::new("blog/post.html")),
            PathBuf::from("blog/post.html")
        );
        // Deeper than two segments: flattened to the staging root.
        assert_eq!(
            classify(Path::new("a/b/c/page.html")),
            PathBuf::from("page.html")
        );
        assert_eq!(
            classify(Path::new("a/b/page.htm")),
            PathBuf::from("page.htm")
        );
    }

    #[test]
    fn test_classify_other_preserved() {
        assert_eq!(
            classify(Path::new("downloads/paper.pdf")),
            PathBuf::from("downloads/paper.pdf")
        );
        assert_eq!(classify(Path::new("robots.txt")), PathBuf::from("robots.txt"));
        assert_eq!(classify(Path::new("LICENSE")), PathBuf::from("LICENSE"));
    }

    #[test]
    fn test_classify_is_deterministic() {
        let p = Path::new("some/dir/photo.jpeg");
        assert_eq!(classify(p), classify(p));
    }

    #[test]
    fn test_asset_map_basename_tie_break() {
        let mut map = AssetMap::new();
        map.insert("b/x.png", "images/x-b.png");
        map.insert("a/x.png", "images/x-a.png");
        // Lexicographically smallest original wins, whatever the
        // insertion order was.
        assert_eq!(map.get_by_basename("x.png"), Some("images/x-a.png"));

        let mut reversed = AssetMap::new();
        reversed.insert("a/x.png", "images/x-a.png");
        reversed.insert("b/x.png", "images/x-b.png");
        assert_eq!(reversed.get_by_basename("x.png"), Some("images/x-a.png"));
    }

    #[test]
    fn test_asset_map_normalizes_keys() {
        let mut map = AssetMap::new();
        map.insert("/old/style.css", "css/style.css");
        assert_eq!(map.get("old/style.css"), Some("css/style.css"));
    }

    fn make_tree(root: &Path) {
        for (path, content) in [
            ("index.html", "<html></html>"),
            ("old/style.css", "body{}"),
            ("a/b/c/page.html", "<html></html>"),
            ("assets/logo.png", "png"),
            ("docs/paper.pdf", "pdf"),
        ] {
            let full = root.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
    }

    #[test]
    fn test_build_asset_map_relocates_and_records() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw");
        let staging = dir.path().join("staging");
        make_tree(&raw);

        let map = build_asset_map(&raw, &staging).unwrap();

        assert_eq!(map.len(), 5);
        assert_eq!(map.get("old/style.css"), Some("css/style.css"));
        assert_eq!(map.get("assets/logo.png"), Some("images/logo.png"));
        assert_eq!(map.get("a/b/c/page.html"), Some("page.html"));
        assert_eq!(map.get("index.html"), Some("index.html"));
        assert_eq!(map.get("docs/paper.pdf"), Some("docs/paper.pdf"));

        assert!(staging.join("css/style.css").exists());
        assert!(staging.join("images/logo.png").exists());
        assert!(staging.join("page.html").exists());
        assert!(staging.join("docs/paper.pdf").exists());
    }

    #[test]
    fn test_build_asset_map_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = build_asset_map(&dir.path().join("nope"), &dir.path().join("out"));
        assert!(result.is_err());
    }

    #[test]
    fn test_build_asset_map_idempotent() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw");
        let staging = dir.path().join("staging");
        make_tree(&raw);

        let first = build_asset_map(&raw, &staging).unwrap();
        let second = build_asset_map(&raw, &staging).unwrap();
        assert_eq!(first.sorted_entries(), second.sorted_entries());
    }

    #[test]
    fn test_manifest_written() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw");
        let staging = dir.path().join("staging");
        make_tree(&raw);

        let map = build_asset_map(&raw, &staging).unwrap();
        let path = write_asset_map_manifest(&map, &raw, &staging).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["file_count"], 5);
        assert_eq!(json["files"]["old/style.css"], "css/style.css");
    }
}

//! Image reorganization: move imported images into categorized folders
//! with descriptive names and write the image manifest.
//!
//! Files are validated by content (the legacy host serves HTML error
//! pages under image names), the shared hero banner is deduplicated to a
//! single copy, and opaque generated filenames become sequential
//! per-category names.

pub mod manifest;

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageFormat;

use crate::config::SiteProfile;
use crate::error::MigrateError;
use crate::utils::copy_preserving_mtime;
use manifest::{ImageManifest, ImageRecord, InvalidFile};

/// Sniff a file's image format from its magic bytes.
///
/// Returns `None` for anything that is not an image the manifest should
/// carry.
fn sniff_format(path: &Path) -> Option<ImageFormat> {
    let mut header = [0u8; 64];
    let mut file = std::fs::File::open(path).ok()?;
    let read = file.read(&mut header).ok()?;
    image::guess_format(&header[..read]).ok()
}

/// Correct extension for a sniffed format, falling back to the file's own
/// extension, then to `.jpg`.
fn proper_extension(format: ImageFormat, path: &Path) -> String {
    match format {
        ImageFormat::Png => ".png".to_string(),
        ImageFormat::Jpeg => ".jpg".to_string(),
        ImageFormat::Gif => ".gif".to_string(),
        _ => path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_else(|| ".jpg".to_string()),
    }
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Reorganize images from `imported_dir` into category folders under
/// `output_dir`, returning the manifest that was written there.
pub fn run(profile: &SiteProfile, imported_dir: &Path, output_dir: &Path) -> Result<ImageManifest> {
    if !imported_dir.exists() {
        return Err(MigrateError::NotFound(imported_dir.to_path_buf()).into());
    }

    // Category directories start clean so re-runs never accumulate stale
    // copies.
    for category in profile.categories() {
        let dir = output_dir.join(&category.name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("failed to clear {}", dir.display()))?;
        }
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let imported_name = imported_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "imported".to_string());

    let mut manifest = ImageManifest::new(profile);
    let mut name_counters: HashMap<String, u32> = HashMap::new();
    let mut hero_copied = false;

    for source_folder in profile.source_folders() {
        let source_path = imported_dir.join(source_folder);
        if !source_path.exists() {
            continue;
        }

        let base_category = profile.category_for_folder(source_folder);

        for file_path in sorted_files(&source_path)? {
            let file_name = file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if file_name.starts_with('.') {
                continue;
            }

            let original_name = file_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| file_name.clone());
            let original_path = format!("{imported_name}/{source_folder}/{file_name}");

            let Some(format) = sniff_format(&file_path) else {
                log::warn!("not an image, skipping: {original_path}");
                manifest.invalid_files.push(InvalidFile {
                    original_path,
                    source_page: source_folder.to_string(),
                    reason: "HTML error page (not an actual image)".to_string(),
                });
                continue;
            };

            // Category and target name for this particular image.
            let (category, new_name) = if profile.is_hero_filename(&original_name) {
                if hero_copied {
                    // The hero banner repeats on every page; one copy is
                    // enough.
                    continue;
                }
                hero_copied = true;
                (profile.default_category().to_string(), "hero-banner".to_string())
            } else if profile.is_opaque_name(&original_name) {
                let counter = name_counters.entry(base_category.to_string()).or_insert(0);
                *counter += 1;
                let prefix = profile.prefix_for_category(base_category);
                (base_category.to_string(), format!("{prefix}-{counter:02}"))
            } else {
                (base_category.to_string(), original_name.clone())
            };

            let extension = proper_extension(format, &file_path);
            let mut new_filename = format!("{new_name}{extension}");
            let mut target_path = output_dir.join(&category).join(&new_filename);

            if target_path.exists() {
                let same_size = std::fs::metadata(&file_path)?.len()
                    == std::fs::metadata(&target_path)?.len();
                if same_size {
                    continue;
                }
                let mut counter = 2u32;
                while target_path.exists() {
                    new_filename = format!("{new_name}-{counter}{extension}");
                    target_path = output_dir.join(&category).join(&new_filename);
                    counter += 1;
                }
            }

            if let Some(parent) = target_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            copy_preserving_mtime(&file_path, &target_path)?;

            let file_size = std::fs::metadata(&target_path)?.len();
            manifest.images.push(ImageRecord {
                original_path,
                new_path: format!("{category}/{new_filename}"),
                category,
                source_page: source_folder.to_string(),
                original_filename: file_name,
                new_filename,
                file_size,
            });
        }
    }

    manifest.finalize(profile);

    let manifest_path = output_dir.join("image-manifest.json");
    manifest.write(&manifest_path)?;

    log::info!(
        "image reorganization complete: {} copied, {} invalid, manifest at {}",
        manifest.summary.total_images,
        manifest.summary.invalid_files,
        manifest_path.display()
    );
    for (category, count) in &manifest.summary.by_category {
        log::info!("  {category}: {count}");
    }

    Ok(manifest)
}

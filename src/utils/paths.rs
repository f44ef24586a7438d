//! Path helpers for reference normalization and file copying.
//!
//! Asset-map keys are always POSIX-style relative paths: no leading slash,
//! no `./` prefix, forward slashes only. Every lookup path goes through
//! [`normalize_ref`] so HTML can spell a reference however it likes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Normalize a reference path into asset-map key form.
///
/// Strips any leading `/`, collapses leading `./` segments, and converts
/// backslashes to forward slashes.
#[must_use]
pub fn normalize_ref(path: &str) -> String {
    let mut p = path.replace('\\', "/");
    loop {
        if let Some(rest) = p.strip_prefix('/') {
            p = rest.to_string();
        } else if let Some(rest) = p.strip_prefix("./") {
            p = rest.to_string();
        } else {
            break;
        }
    }
    p
}

/// Final segment of a POSIX-style path (empty input yields empty output).
#[must_use]
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Render a filesystem path as a POSIX-style relative string.
#[must_use]
pub fn posix_rel(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Copy `src` to `dest`, preserving the source's modification time.
///
/// Parent directories must already exist. Last write wins on re-runs; the
/// copy is not content-compared.
pub fn copy_preserving_mtime(src: &Path, dest: &Path) -> Result<()> {
    fs::copy(src, dest)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dest.display()))?;

    let mtime = fs::metadata(src)
        .and_then(|m| m.modified())
        .with_context(|| format!("failed to read mtime of {}", src.display()))?;
    let dest_file = fs::File::options()
        .write(true)
        .open(dest)
        .with_context(|| format!("failed to reopen {}", dest.display()))?;
    dest_file
        .set_modified(mtime)
        .with_context(|| format!("failed to set mtime on {}", dest.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ref_strips_leading_slash() {
        assert_eq!(normalize_ref("/images/a.png"), "images/a.png");
        assert_eq!(normalize_ref("//images/a.png"), "images/a.png");
    }

    #[test]
    fn test_normalize_ref_strips_dot_segments() {
        assert_eq!(normalize_ref("./a/b.css"), "a/b.css");
        assert_eq!(normalize_ref("././a.js"), "a.js");
        assert_eq!(normalize_ref("/./a.js"), "a.js");
    }

    #[test]
    fn test_normalize_ref_converts_backslashes() {
        assert_eq!(normalize_ref("a\\b\\c.png"), "a/b/c.png");
    }

    #[test]
    fn test_normalize_ref_leaves_clean_paths_alone() {
        assert_eq!(normalize_ref("a/b/c.png"), "a/b/c.png");
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("a/b/c.png"), "c.png");
        assert_eq!(basename("c.png"), "c.png");
        assert_eq!(basename(""), "");
    }

    #[test]
    fn test_copy_preserving_mtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dest = dir.path().join("dest.txt");
        fs::write(&src, "content").unwrap();

        copy_preserving_mtime(&src, &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "content");
        let src_mtime = fs::metadata(&src).unwrap().modified().unwrap();
        let dest_mtime = fs::metadata(&dest).unwrap().modified().unwrap();
        assert_eq!(src_mtime, dest_mtime);
    }
}

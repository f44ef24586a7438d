//! Error types shared by the migration tools.
//!
//! Per-item failures (one page, one image, one document) are logged and
//! skipped by their callers; the variants here are the conditions that
//! surface at a tool boundary.

use std::path::PathBuf;

/// Error taxonomy for migration runs
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Required source directory or file is missing; fatal for the run
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Network request failed or returned a non-success status
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A document could not be parsed as HTML
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// Images remained missing after the download pass
    #[error("{0} image(s) still missing after download pass")]
    MissingImages(usize),

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias for Result with `MigrateError`
pub type MigrateResult<T> = Result<T, MigrateError>;

//! Small shared helpers: path normalization, slugs, text truncation.

pub mod constants;
pub mod paths;
pub mod slug;
pub mod text;

pub use constants::{DEFAULT_DELAY_SECS, DEFAULT_MAX_RETRIES, DEFAULT_USER_AGENT};
pub use paths::{basename, copy_preserving_mtime, normalize_ref, posix_rel};
pub use slug::slugify;
pub use text::excerpt;

//! Reference resolution against the asset map.

use crate::asset_relocator::AssetMap;
use crate::utils::{basename, normalize_ref};

/// Resolve an original reference path to its staged destination.
///
/// Lookup order:
/// 1. exact match on the normalized path;
/// 2. basename fallback (deterministic: the map indexes each basename by
///    its lexicographically smallest original path);
/// 3. the input itself, unchanged.
///
/// Never fails: an absent mapping degrades to a no-op rewrite, since the
/// source site may reference assets that were never part of the captured
/// tree.
#[must_use]
pub fn resolve<'a>(original: &'a str, map: &'a AssetMap) -> &'a str {
    let normalized = normalize_ref(original);

    if let Some(dest) = map.get(&normalized) {
        return dest;
    }

    let name = basename(&normalized);
    if !name.is_empty() {
        if let Some(dest) = map.get_by_basename(name) {
            log::debug!("resolved '{original}' by filename to '{dest}'");
            return dest;
        }
    }

    log::debug!("no mapping for reference '{original}', leaving as-is");
    original
}

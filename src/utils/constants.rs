//! Shared default values for the migration tools.

/// Default politeness delay between outbound requests, in seconds.
///
/// The legacy host throttles aggressive clients; two seconds keeps a full
/// import of a small site under a minute while staying well clear of rate
/// limits. Operators can adjust via `--delay`.
pub const DEFAULT_DELAY_SECS: f64 = 2.0;

/// Default download attempts per image (first try + retries).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// User agent sent with every outbound request.
pub const DEFAULT_USER_AGENT: &str =
    concat!("siteport/", env!("CARGO_PKG_VERSION"), " (site migration)");

/// Maximum characters kept from a page's section text in inventory excerpts.
pub const EXCERPT_MAX_CHARS: usize = 400;

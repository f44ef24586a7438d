//! Site profile configuration.
//!
//! Every site-specific table the tools need (page slugs, image URL
//! patterns, category rules, directories) lives in an explicit
//! [`SiteProfile`] value passed into the component that needs it. There is
//! no process-wide mutable state.

mod builder;
mod profile;

pub use builder::{SiteProfileBuilder, WithBaseUrl};
pub use profile::{CategoryRule, FolderRule, SiteProfile};

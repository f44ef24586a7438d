//! YAML front matter for imported pages.

use chrono::{DateTime, Utc};

/// Render the front matter block for an imported page.
#[must_use]
pub fn render(title: &str, permalink: &str, source_url: &str) -> String {
    render_at(title, permalink, source_url, Utc::now())
}

fn render_at(title: &str, permalink: &str, source_url: &str, when: DateTime<Utc>) -> String {
    let timestamp = when.format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        "---\ntitle: \"{}\"\npermalink: {permalink}\nsource_url: {source_url}\nlast_imported: {timestamp}\n---\n\n",
        title.replace('"', "\\\"")
    )
}

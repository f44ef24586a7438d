//! Shared fixtures for the siteport integration tests.

use std::path::Path;

/// Minimal HTML document with the given title and body.
#[allow(dead_code)]
pub fn test_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body>
    {body}
</body>
</html>"#
    )
}

/// Lay down a small raw mirror tree covering every classification rule:
/// shallow and deep HTML, stylesheet, script, image, font, and an
/// unclassified file.
#[allow(dead_code)]
pub fn create_raw_mirror_tree(root: &Path) {
    let files: &[(&str, &str)] = &[
        (
            "index.html",
            r#"<html><head><link rel="stylesheet" href="old/style.css"></head>
<body>
<a href="a/b/c/page.html">deep page</a>
<a href="https://external.example.com/">external</a>
<a href="mailto:lab@example.com">mail</a>
<img src="/assets/logo.png?v=2#frag">
<script src="scripts/app.js"></script>
<style>body { background: url('assets/logo.png?v=2'); }</style>
</body></html>"#,
        ),
        ("old/style.css", "body { color: black; }"),
        ("scripts/app.js", "console.log('hi');"),
        ("assets/logo.png", "fake png bytes"),
        ("fonts/deep/inter.woff2", "fake font bytes"),
        (
            "a/b/c/page.html",
            r#"<html><body><a href="../../../index.html">home</a></body></html>"#,
        ),
        ("downloads/paper.pdf", "fake pdf"),
    ];

    for (rel, content) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

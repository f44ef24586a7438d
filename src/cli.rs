//! Command-line surface: one subcommand per migration tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "siteport", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a JSON site profile describing the site being migrated.
    #[arg(long, global = true, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl the site breadth-first and write site-map.json + inventory.md.
    Inventory {
        /// Output directory for the inventory files.
        #[arg(long, default_value = "docs")]
        output: PathBuf,
    },

    /// Import pages to Markdown files with YAML front matter.
    Import {
        /// Filter to specific page slugs (e.g. home about contact).
        #[arg(long, num_args = 1.., value_name = "SLUG")]
        pages: Vec<String>,

        /// Force re-fetch and re-write even if cached/unchanged.
        #[arg(long)]
        force: bool,

        /// Delay between requests in seconds.
        #[arg(long, value_name = "SECONDS")]
        delay: Option<f64>,
    },

    /// Download hosted images referenced by the cached pages.
    ExtractImages {
        /// Re-download even when a cached copy exists.
        #[arg(long)]
        force: bool,
    },

    /// Reorganize imported images into categorized folders with a manifest.
    Reorganize {
        /// Directory holding the per-page imported image folders.
        imported_dir: PathBuf,

        /// Output root for the categorized folders and image-manifest.json.
        output_dir: PathBuf,
    },

    /// Relocate a raw mirror into a staging tree and rewrite its links.
    Postprocess {
        /// Directory containing raw mirror output.
        raw_dir: PathBuf,

        /// Staging output directory.
        staging_dir: PathBuf,
    },
}

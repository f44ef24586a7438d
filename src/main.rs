// siteport: one-shot migration tools for moving a legacy hosted site
// into a clean static tree. Each subcommand is a single sequential pass;
// re-running is safe for already-fetched or already-copied content.

use anyhow::{Context, Result};
use clap::Parser;

use siteport::cli::{Cli, Command};
use siteport::config::SiteProfile;
use siteport::fetch_cache::Fetcher;
use siteport::{asset_relocator, image_extractor, image_organizer, link_rewriter};
use siteport::{page_importer, site_inventory};

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn load_profile(cli: &Cli) -> Result<SiteProfile> {
    match &cli.profile {
        Some(path) => SiteProfile::from_json_file(path),
        None => Ok(SiteProfile::default()),
    }
}

/// Profile check for the network-facing commands.
fn require_site(profile: SiteProfile) -> Result<SiteProfile> {
    profile
        .validate()
        .context("a site profile with base_url is required (pass --profile FILE)")?;
    Ok(profile)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let profile = load_profile(&cli)?;

    match cli.command {
        Command::Inventory { output } => {
            let profile = require_site(profile)?;
            let fetcher = Fetcher::new(&profile)?;
            let inventory = site_inventory::crawl(&profile, &fetcher).await?;
            site_inventory::write_outputs(&inventory, &profile, &output)?;
        }

        Command::Import {
            pages,
            force,
            delay,
        } => {
            let mut profile = profile.with_force(force);
            if let Some(delay) = delay {
                profile = profile.with_delay_secs(delay);
            }
            let profile = require_site(profile)?;
            let fetcher = Fetcher::new(&profile)?;
            page_importer::run(&profile, &fetcher, &pages).await?;
        }

        Command::ExtractImages { force } => {
            let profile = require_site(profile.with_force(force))?;
            let fetcher = Fetcher::new(&profile)?;
            image_extractor::run(&profile, &fetcher).await?;
        }

        Command::Reorganize {
            imported_dir,
            output_dir,
        } => {
            image_organizer::run(&profile, &imported_dir, &output_dir)?;
        }

        Command::Postprocess {
            raw_dir,
            staging_dir,
        } => {
            log::info!("processing mirror from {}", raw_dir.display());
            let map = asset_relocator::build_asset_map(&raw_dir, &staging_dir)?;
            asset_relocator::write_asset_map_manifest(&map, &raw_dir, &staging_dir)?;
            link_rewriter::rewrite_tree(&staging_dir, &map)?;
            log::info!("postprocessing complete");
        }
    }

    Ok(())
}

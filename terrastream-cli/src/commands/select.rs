//! `select` command: print the wishlist for a camera.

use clap::Args;
use std::path::Path;
use terrastream::config::StreamingConfig;
use terrastream::coord::MAX_ZOOM;
use terrastream::lod::{LodConfig, LodSelector, Wishlist};

use super::{load_config, CameraArgs};
use crate::error::CliError;

/// Arguments for the select command.
#[derive(Debug, Args)]
pub struct SelectArgs {
    #[command(flatten)]
    pub camera: CameraArgs,

    /// Coarsest level to emit (overrides [lod] min_level)
    #[arg(long)]
    pub min_level: Option<u8>,

    /// Finest level to emit (overrides [lod] max_level)
    #[arg(long)]
    pub max_level: Option<u8>,

    /// Screen-space error threshold (overrides [lod] error_threshold)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Print at most this many tiles
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Run the select command.
pub fn run(args: SelectArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let camera = args.camera.camera()?;
    let lod = lod_config(&args, &config)?;

    let mut selector = LodSelector::new(lod);
    let mut wishlist = selector.select(&camera);
    let stats = selector.last_stats();

    println!(
        "Camera: {:.5}, {:.5} at {:.0} m",
        args.camera.lat, args.camera.lon, args.camera.height
    );
    println!(
        "Visited {} tiles, culled {}, selected {}",
        stats.visited, stats.culled, stats.emitted
    );
    println!();
    print!("{}", format_wishlist(&mut wishlist, args.limit));
    Ok(())
}

/// Combines the `[lod]` section with command-line overrides.
pub fn lod_config(args: &SelectArgs, config: &StreamingConfig) -> Result<LodConfig, CliError> {
    let base = config.lod_config();
    let min_level = args.min_level.unwrap_or(base.min_level);
    let max_level = args.max_level.unwrap_or(base.max_level).min(MAX_ZOOM);
    if min_level > max_level {
        return Err(CliError::Usage(format!(
            "--min-level {} is above --max-level {}",
            min_level, max_level
        )));
    }

    let threshold = args.threshold.unwrap_or(base.error_threshold);
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(CliError::Usage(format!(
            "--threshold must be positive, got {}",
            threshold
        )));
    }

    Ok(base
        .with_levels(min_level, max_level)
        .with_error_threshold(threshold))
}

/// Renders the wishlist as a table, highest priority first.
pub fn format_wishlist(wishlist: &mut Wishlist, limit: Option<usize>) -> String {
    wishlist.sort_by_priority();
    let shown = limit.unwrap_or(wishlist.len()).min(wishlist.len());

    let mut out = format!("{:<16} {:<24} {:>10}\n", "TILE", "QUADKEY", "PRIORITY");
    for entry in wishlist.iter().take(shown) {
        out.push_str(&format!(
            "{:<16} {:<24} {:>10.3}\n",
            entry.address.to_string(),
            entry.address.quadkey(),
            entry.priority
        ));
    }
    if shown < wishlist.len() {
        out.push_str(&format!("... {} more\n", wishlist.len() - shown));
    }
    out
}

//! Terrastream CLI - Command-line interface
//!
//! This binary drives the terrastream library from the command line: tile
//! address conversions, LOD selection for a camera, and streaming one layer
//! until it settles.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use terrastream::logging::init_stdout_logging;

use commands::config::ConfigCommands;
use commands::select::SelectArgs;
use commands::stream::StreamArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "terrastream")]
#[command(version = terrastream::VERSION)]
#[command(about = "Quadtree tile streaming for virtual globes", long_about = None)]
struct Cli {
    /// Path to config.ini (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the quadkey and bounds of a tile
    Quadkey {
        /// Column
        x: u32,
        /// Row
        y: u32,
        /// Zoom level
        z: u8,
    },

    /// Print the tile address of a quadkey
    Address {
        /// Base-4 quadkey, most significant level first
        quadkey: String,
    },

    /// Print the tiles a camera looking straight down would request
    Select(SelectArgs),

    /// Download the selected tiles through one layer and print statistics
    Stream(StreamArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    init_stdout_logging(cli.verbose);

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Quadkey { x, y, z } => commands::quadkey::run_quadkey(x, y, z),
        Commands::Address { quadkey } => commands::quadkey::run_address(&quadkey),
        Commands::Select(args) => commands::select::run(args, config),
        Commands::Stream(args) => commands::stream::run(args, config),
        Commands::Config { command } => commands::config::run(command, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_select_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "terrastream",
            "select",
            "--lat",
            "-33.87",
            "--lon",
            "151.2",
            "--max-level",
            "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Select(args) => {
                assert_eq!(args.camera.lat, -33.87);
                assert_eq!(args.max_level, Some(10));
            }
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn test_stream_layer_conflicts_with_template() {
        let result = Cli::try_parse_from([
            "terrastream",
            "stream",
            "--lat",
            "0",
            "--lon",
            "0",
            "--layer",
            "osm",
            "--template",
            "https://t/{z}/{x}/{y}",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_stream_kind() {
        let cli = Cli::try_parse_from([
            "terrastream",
            "stream",
            "--lat",
            "10",
            "--lon",
            "20",
            "--template",
            "https://t/{z}/{x}/{y}",
            "--kind",
            "elevation",
        ])
        .unwrap();
        match cli.command {
            Commands::Stream(args) => assert_eq!(args.kind.as_str(), "elevation"),
            _ => panic!("expected stream"),
        }
    }
}

//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show` and `config path`.

use clap::Subcommand;
use std::path::Path;
use terrastream::config::{LayerSettings, StreamingConfig};
use terrastream::decode::ResourceKind;

use super::{config_path, load_config};
use crate::error::CliError;

/// Template for the example layer written by `config init`.
const EXAMPLE_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, explicit: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force } => run_init(explicit, force),
        ConfigCommands::Show => run_show(explicit),
        ConfigCommands::Path => {
            println!("{}", config_path(explicit).display());
            Ok(())
        }
    }
}

/// Default settings plus one example imagery layer.
pub fn starter_config() -> StreamingConfig {
    let mut config = StreamingConfig::default();
    config
        .layers
        .push(LayerSettings::new("osm", ResourceKind::Imagery, EXAMPLE_TEMPLATE));
    config
}

fn run_init(explicit: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = config_path(explicit);
    if path.exists() && !force {
        return Err(CliError::ConfigExists(path));
    }

    starter_config().save(&path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to add layers and tune caching.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

fn run_show(explicit: Option<&Path>) -> Result<(), CliError> {
    let path = config_path(explicit);
    let config = load_config(explicit)?;

    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not found, showing defaults)", path.display());
    }
    print!("{}", config.to_ini_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");

        run(ConfigCommands::Init { force: false }, Some(path.as_path())).unwrap();
        let loaded = StreamingConfig::load(&path).unwrap();
        assert_eq!(loaded, starter_config());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[cache]\ncapacity = 64\n").unwrap();

        let err = run(ConfigCommands::Init { force: false }, Some(path.as_path())).unwrap_err();
        assert!(matches!(err, CliError::ConfigExists(_)));

        run(ConfigCommands::Init { force: true }, Some(path.as_path())).unwrap();
        assert_eq!(StreamingConfig::load(&path).unwrap().layers.len(), 1);
    }

    #[test]
    fn test_starter_config_is_valid() {
        assert!(starter_config().validate().is_ok());
    }
}

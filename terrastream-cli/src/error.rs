//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;
use terrastream::config::ConfigFileError;
use terrastream::coord::CoordError;
use terrastream::layer::LayerError;
use terrastream::provider::ProviderError;

/// Exit code for bad input: unknown tiles, invalid settings.
pub const EXIT_USAGE: i32 = 2;

/// Exit code for runtime failures: network, daemon, I/O.
pub const EXIT_FAILURE: i32 = 1;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Invalid argument combination or value
    Usage(String),
    /// Tile address or quadkey could not be parsed
    Coord(CoordError),
    /// Configuration file could not be read, validated or written
    Config(ConfigFileError),
    /// Config file already exists and `--force` was not given
    ConfigExists(PathBuf),
    /// HTTP client could not be created
    Provider(ProviderError),
    /// Layer rejected its configuration or its daemon stopped
    Layer(LayerError),
    /// Tokio runtime could not be started
    Runtime(std::io::Error),
    /// Streaming did not settle in time
    Timeout { secs: u64 },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_)
            | CliError::Coord(_)
            | CliError::Config(_)
            | CliError::ConfigExists(_) => EXIT_USAGE,
            CliError::Layer(LayerError::InvalidLevels { .. })
            | CliError::Layer(LayerError::Template { .. })
            | CliError::Layer(LayerError::KindMismatch { .. }) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::ConfigExists(_) => {
                eprintln!();
                eprintln!("Use 'terrastream config init --force' to overwrite it.");
            }
            CliError::Timeout { .. } => {
                eprintln!();
                eprintln!("Tiles were still downloading. Try a larger --timeout,");
                eprintln!("or check that the tile server is reachable.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Coord(e) => write!(f, "Invalid tile: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::ConfigExists(path) => {
                write!(f, "Config file already exists: {}", path.display())
            }
            CliError::Provider(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Layer(e) => write!(f, "Layer error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Timeout { secs } => {
                write!(f, "Streaming did not settle within {} seconds", secs)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Coord(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Provider(e) => Some(e),
            CliError::Layer(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Coord(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}

impl From<LayerError> for CliError {
    fn from(e: LayerError) -> Self {
        CliError::Layer(e)
    }
}

//! CLI subcommands.

pub mod config;
pub mod quadkey;
pub mod select;
pub mod stream;

use clap::Args;
use std::path::{Path, PathBuf};
use terrastream::config::{default_config_path, StreamingConfig};
use terrastream::geodesy::{Cartographic, Ellipsoid};
use terrastream::lod::{Camera, DEFAULT_FOV_Y_DEGREES};

use crate::error::CliError;

/// Where the camera is and how wide it sees, shared by `select` and `stream`.
#[derive(Debug, Clone, Args)]
pub struct CameraArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Camera height above the ellipsoid in meters
    #[arg(long, default_value = "10000")]
    pub height: f64,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = DEFAULT_FOV_Y_DEGREES)]
    pub fov: f64,

    /// Viewport width divided by height
    #[arg(long, default_value = "1.5")]
    pub aspect: f64,
}

impl CameraArgs {
    /// A camera at the given position looking straight down.
    pub fn camera(&self) -> Result<Camera, CliError> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(CliError::Usage(format!(
                "Position {}, {} is not a valid latitude/longitude",
                self.lat, self.lon
            )));
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(CliError::Usage(format!(
                "Height must be above the ellipsoid, got {}",
                self.height
            )));
        }
        if !(1.0..179.0).contains(&self.fov) || !self.aspect.is_finite() || self.aspect <= 0.0 {
            return Err(CliError::Usage(format!(
                "Invalid field of view {} degrees at aspect {}",
                self.fov, self.aspect
            )));
        }

        Ok(Camera::nadir(
            &Ellipsoid::WGS84,
            &Cartographic::from_degrees(self.lon, self.lat, self.height),
            self.fov.to_radians(),
            self.aspect,
        ))
    }
}

/// Resolves `--config`, falling back to the platform config directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path)
}

/// Loads the config file; a missing file yields defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<StreamingConfig, CliError> {
    let path = config_path(explicit);
    Ok(StreamingConfig::load(&path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(lat: f64, lon: f64, height: f64) -> CameraArgs {
        CameraArgs {
            lat,
            lon,
            height,
            fov: DEFAULT_FOV_Y_DEGREES,
            aspect: 1.5,
        }
    }

    #[test]
    fn test_camera_from_valid_args() {
        assert!(args(53.55, 9.99, 5_000.0).camera().is_ok());
    }

    #[test]
    fn test_camera_rejects_bad_position() {
        assert!(matches!(
            args(95.0, 0.0, 5_000.0).camera(),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            args(0.0, 0.0, -10.0).camera(),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn test_load_missing_config_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing.ini");
        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config, StreamingConfig::default());
    }
}

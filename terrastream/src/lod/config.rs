//! Configuration for level-of-detail selection.

use crate::coord::MAX_ZOOM;
use crate::geodesy::{Ellipsoid, TilingScheme};

// ==================== Selection Defaults ====================

/// Default coarsest level the selector may emit.
pub const DEFAULT_MIN_LEVEL: u8 = 0;

/// Default finest level the selector may emit.
pub const DEFAULT_MAX_LEVEL: u8 = 18;

/// Default screen-size threshold below which a tile is fine enough.
///
/// Measured in clip-space units, where the full viewport height is 2.0.
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.5;

/// Default lowest terrain height assumed when bounding a tile (meters).
pub const DEFAULT_MIN_HEIGHT: f64 = -500.0;

/// Default highest terrain height assumed when bounding a tile (meters).
pub const DEFAULT_MAX_HEIGHT: f64 = 9_000.0;

/// Default number of bounding spheres kept between frames.
pub const DEFAULT_VOLUME_CACHE_LIMIT: usize = 16_384;

/// Floor applied to camera-to-tile distances before dividing.
pub const DISTANCE_EPSILON: f64 = 1e-3;

/// Configuration for [`LodSelector`](super::LodSelector).
#[derive(Debug, Clone, PartialEq)]
pub struct LodConfig {
    /// Coarsest level that may be emitted.
    ///
    /// Tiles above it are always refined. Default: 0.
    pub min_level: u8,

    /// Finest level that may be emitted.
    ///
    /// Tiles at this level are emitted regardless of screen size. Default: 18.
    pub max_level: u8,

    /// Logical screen size below which a tile stops refining.
    ///
    /// Smaller values select finer tiles. Default: 0.5.
    pub error_threshold: f64,

    /// How addresses map onto the globe. Default: Web Mercator.
    pub scheme: TilingScheme,

    /// Datum for bounding volumes and tile widths. Default: WGS84.
    pub ellipsoid: Ellipsoid,

    /// Lowest height a tile's bounding sphere must enclose.
    pub min_height: f64,

    /// Highest height a tile's bounding sphere must enclose.
    pub max_height: f64,

    /// Bounding spheres cached before the cache is reset.
    pub volume_cache_limit: usize,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            min_level: DEFAULT_MIN_LEVEL,
            max_level: DEFAULT_MAX_LEVEL,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            scheme: TilingScheme::default(),
            ellipsoid: Ellipsoid::default(),
            min_height: DEFAULT_MIN_HEIGHT,
            max_height: DEFAULT_MAX_HEIGHT,
            volume_cache_limit: DEFAULT_VOLUME_CACHE_LIMIT,
        }
    }
}

impl LodConfig {
    /// Sets the level range. `max_level` is capped at [`MAX_ZOOM`] and
    /// `min_level` at the capped `max_level`.
    pub fn with_levels(mut self, min_level: u8, max_level: u8) -> Self {
        let max_level = max_level.min(MAX_ZOOM);
        self.min_level = min_level.min(max_level);
        self.max_level = max_level;
        self
    }

    pub fn with_error_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = threshold;
        self
    }

    pub fn with_scheme(mut self, scheme: TilingScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_ellipsoid(mut self, ellipsoid: Ellipsoid) -> Self {
        self.ellipsoid = ellipsoid;
        self
    }

    pub fn with_height_range(mut self, min_height: f64, max_height: f64) -> Self {
        self.min_height = min_height;
        self.max_height = max_height;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_levels_caps_at_max_zoom() {
        let config = LodConfig::default().with_levels(4, 40);
        assert_eq!(config.min_level, 4);
        assert_eq!(config.max_level, MAX_ZOOM);
    }

    #[test]
    fn test_with_levels_keeps_min_below_max() {
        let config = LodConfig::default().with_levels(5, 2);
        assert_eq!(config.min_level, 2);
        assert_eq!(config.max_level, 2);

        let config = LodConfig::default().with_levels(31, 31);
        assert_eq!(config.min_level, MAX_ZOOM);
        assert_eq!(config.max_level, MAX_ZOOM);
    }
}

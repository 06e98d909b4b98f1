//! Tiling schemes: how a [`TileAddress`] maps onto the globe.

use crate::coord::TileAddress;
use std::f64::consts::{FRAC_PI_2, PI};

/// Latitude limit of the Web Mercator square, in radians.
pub const WEB_MERCATOR_MAX_LATITUDE: f64 = 1.484_422_229_745_332_2;

/// Geographic rectangle in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRect {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoRect {
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center as `(longitude, latitude)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.west + self.east) * 0.5,
            (self.south + self.north) * 0.5,
        )
    }

    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        (self.west..=self.east).contains(&longitude) && (self.south..=self.north).contains(&latitude)
    }
}

/// Projection used to lay the quadtree over the globe.
///
/// Both schemes put a single tile at zoom 0 and number rows from the north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TilingScheme {
    /// Equirectangular: every level halves longitude and latitude spans.
    Geographic,
    /// Spherical Web Mercator, clipped at about ±85.05°.
    #[default]
    WebMercator,
}

impl TilingScheme {
    /// Returns the rectangle covered by `address`.
    pub fn tile_rect(&self, address: &TileAddress) -> GeoRect {
        let n = f64::from(address.tile_stride());
        let x = f64::from(address.x);
        let y = f64::from(address.y);

        let west = x / n * 2.0 * PI - PI;
        let east = (x + 1.0) / n * 2.0 * PI - PI;

        match self {
            TilingScheme::Geographic => {
                let north = FRAC_PI_2 - y / n * PI;
                let south = FRAC_PI_2 - (y + 1.0) / n * PI;
                GeoRect::new(west, south, east, north)
            }
            TilingScheme::WebMercator => {
                let north = mercator_row_to_latitude(y / n);
                let south = mercator_row_to_latitude((y + 1.0) / n);
                GeoRect::new(west, south, east, north)
            }
        }
    }

    /// Full extent of the scheme.
    pub fn extent(&self) -> GeoRect {
        self.tile_rect(&TileAddress::ROOT)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TilingScheme::Geographic => "geographic",
            TilingScheme::WebMercator => "webmercator",
        }
    }
}

impl std::str::FromStr for TilingScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "geographic" | "wgs84" => Ok(TilingScheme::Geographic),
            "webmercator" | "web_mercator" | "mercator" => Ok(TilingScheme::WebMercator),
            other => Err(format!("unknown tiling scheme '{}'", other)),
        }
    }
}

/// Converts a normalized row position (0 at the top, 1 at the bottom) to a
/// latitude in radians.
fn mercator_row_to_latitude(row_fraction: f64) -> f64 {
    (PI * (1.0 - 2.0 * row_fraction)).sinh().atan()
}

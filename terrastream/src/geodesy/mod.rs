//! Geodetic helpers
//!
//! Pure functions the level-of-detail selector needs from the globe model:
//! ellipsoid to Cartesian conversion, the rectangle a tile covers under a
//! tiling scheme, and bounding spheres fitted around those rectangles.

mod bounds;
mod ellipsoid;
mod tiling;

pub use bounds::BoundingSphere;
pub use ellipsoid::{Cartographic, Ellipsoid};
pub use tiling::{GeoRect, TilingScheme, WEB_MERCATOR_MAX_LATITUDE};

use crate::coord::TileAddress;

/// Builds the bounding sphere of a tile's surface patch.
pub fn tile_bounding_sphere(
    ellipsoid: &Ellipsoid,
    scheme: TilingScheme,
    address: &TileAddress,
    min_height: f64,
    max_height: f64,
) -> BoundingSphere {
    BoundingSphere::from_rect(ellipsoid, &scheme.tile_rect(address), min_height, max_height)
}

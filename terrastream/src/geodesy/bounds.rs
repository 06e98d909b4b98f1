//! Bounding volumes for tiles.

use super::ellipsoid::{Cartographic, Ellipsoid};
use super::tiling::GeoRect;
use glam::DVec3;

/// Samples taken along each axis of a rectangle when fitting a sphere.
const SAMPLES_PER_AXIS: usize = 5;

/// A sphere in Earth-centered Cartesian meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub const fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Fits a sphere around a set of points: center at the midpoint of their
    /// axis-aligned box, radius reaching the farthest point.
    ///
    /// Returns a zero sphere at the origin for an empty slice.
    pub fn from_points(points: &[DVec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::new(DVec3::ZERO, 0.0);
        };

        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f64, f64::max);

        Self { center, radius }
    }

    /// Bounds the part of `ellipsoid` under `rect`, between `min_height` and
    /// `max_height`.
    ///
    /// The surface is sampled on a grid at both heights. The radius is then
    /// padded by the sagitta of one grid step so curvature between samples
    /// stays inside.
    pub fn from_rect(ellipsoid: &Ellipsoid, rect: &GeoRect, min_height: f64, max_height: f64) -> Self {
        let steps = (SAMPLES_PER_AXIS - 1) as f64;
        let mut points = Vec::with_capacity(SAMPLES_PER_AXIS * SAMPLES_PER_AXIS * 2);

        for row in 0..SAMPLES_PER_AXIS {
            let latitude = rect.south + rect.height() * row as f64 / steps;
            for col in 0..SAMPLES_PER_AXIS {
                let longitude = rect.west + rect.width() * col as f64 / steps;
                for height in [min_height, max_height] {
                    let position = Cartographic::new(longitude, latitude, height);
                    points.push(ellipsoid.cartographic_to_cartesian(&position));
                }
            }
        }

        let mut sphere = Self::from_points(&points);

        let step_angle = rect.width().max(rect.height()) / steps;
        let outer_radius = ellipsoid.maximum_radius() + max_height.max(0.0);
        sphere.radius += outer_radius * (1.0 - (step_angle * 0.5).cos());
        sphere
    }

    /// Distance from `point` to the sphere center.
    pub fn distance_to_center(&self, point: DVec3) -> f64 {
        self.center.distance(point)
    }

    /// Distance from `point` to the sphere surface, zero inside.
    pub fn distance_to(&self, point: DVec3) -> f64 {
        (self.distance_to_center(point) - self.radius).max(0.0)
    }

    pub fn contains(&self, point: DVec3) -> bool {
        self.distance_to_center(point) <= self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileAddress;
    use crate::geodesy::TilingScheme;

    #[test]
    fn test_from_points() {
        let sphere = BoundingSphere::from_points(&[
            DVec3::new(-1.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ]);
        assert!((sphere.center - DVec3::new(0.0, 0.5, 0.0)).length() < 1e-12);
        assert!(sphere.contains(DVec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_empty_points() {
        let sphere = BoundingSphere::from_points(&[]);
        assert_eq!(sphere.radius, 0.0);
    }

    #[test]
    fn test_root_tile_contains_globe_axes() {
        let ellipsoid = Ellipsoid::WGS84;
        let rect = TilingScheme::Geographic.extent();
        let sphere = BoundingSphere::from_rect(&ellipsoid, &rect, 0.0, 0.0);
        for axis in [DVec3::X, DVec3::Y, DVec3::NEG_X, DVec3::NEG_Y] {
            assert!(sphere.contains(axis * ellipsoid.maximum_radius()));
        }
        assert!(sphere.contains(DVec3::Z * ellipsoid.minimum_radius()));
    }

    #[test]
    fn test_child_spheres_shrink() {
        let ellipsoid = Ellipsoid::WGS84;
        let scheme = TilingScheme::WebMercator;
        let parent = TileAddress::new(2, 1, 2);
        let parent_sphere = BoundingSphere::from_rect(&ellipsoid, &scheme.tile_rect(&parent), 0.0, 0.0);
        for child in parent.children() {
            let child_sphere =
                BoundingSphere::from_rect(&ellipsoid, &scheme.tile_rect(&child), 0.0, 0.0);
            assert!(child_sphere.radius < parent_sphere.radius);
        }
    }

    #[test]
    fn test_tile_center_inside_sphere() {
        let ellipsoid = Ellipsoid::WGS84;
        let rect = TilingScheme::Geographic.tile_rect(&TileAddress::new(5, 3, 3));
        let sphere = BoundingSphere::from_rect(&ellipsoid, &rect, 0.0, 1000.0);
        let (lon, lat) = rect.center();
        let center = ellipsoid.cartographic_to_cartesian(&Cartographic::new(lon, lat, 500.0));
        assert!(sphere.contains(center));
    }
}

//! Reference ellipsoid and geodetic/Cartesian conversion.

use glam::DVec3;
use std::f64::consts::PI;

/// Geodetic position in radians plus height above the ellipsoid in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl Cartographic {
    pub const fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    /// Builds a position from degrees.
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::new(longitude.to_radians(), latitude.to_radians(), height)
    }
}

/// A triaxial ellipsoid centered at the origin, z pointing north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    radii: DVec3,
}

impl Ellipsoid {
    /// WGS84 datum.
    pub const WGS84: Ellipsoid = Ellipsoid::new(6_378_137.0, 6_378_137.0, 6_356_752.314_245_179);

    /// Sphere with the WGS84 semi-major axis.
    pub const EARTH_SPHERE: Ellipsoid = Ellipsoid::new(6_378_137.0, 6_378_137.0, 6_378_137.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            radii: DVec3::new(x, y, z),
        }
    }

    pub fn sphere(radius: f64) -> Self {
        Self::new(radius, radius, radius)
    }

    pub fn radii(&self) -> DVec3 {
        self.radii
    }

    pub fn maximum_radius(&self) -> f64 {
        self.radii.max_element()
    }

    pub fn minimum_radius(&self) -> f64 {
        self.radii.min_element()
    }

    /// Equatorial circumference, used as the characteristic length of a
    /// zoom-0 tile.
    pub fn circumference(&self) -> f64 {
        2.0 * PI * self.maximum_radius()
    }

    /// Unit normal of the ellipsoid surface below `position`.
    pub fn geodetic_surface_normal(&self, position: &Cartographic) -> DVec3 {
        let cos_lat = position.latitude.cos();
        DVec3::new(
            cos_lat * position.longitude.cos(),
            cos_lat * position.longitude.sin(),
            position.latitude.sin(),
        )
        .normalize()
    }

    /// Converts a geodetic position to Earth-centered Cartesian meters.
    pub fn cartographic_to_cartesian(&self, position: &Cartographic) -> DVec3 {
        let n = self.geodetic_surface_normal(position);
        let k = self.radii * self.radii * n;
        let gamma = n.dot(k).sqrt();
        k / gamma + n * position.height
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

//! Frustum visibility tests for tile bounding spheres.
//!
//! The camera's six clip planes are extracted from the combined
//! view-projection matrix (Griggs-Hartmann, OpenGL clip depth `[-w, w]`) and
//! normalized so that plane distances are in world units. A sphere is treated
//! as visible unless it lies entirely on the outside of at least one plane,
//! so partially intersecting tiles are always kept.

use crate::geodesy::BoundingSphere;
use glam::{DMat4, DVec3, DVec4};

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// A plane with a unit normal pointing into the frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlane {
    pub normal: DVec3,
    pub offset: f64,
}

impl ClipPlane {
    pub const fn new(normal: DVec3, offset: f64) -> Self {
        Self { normal, offset }
    }

    /// Normalizes `(a, b, c, d)` so `(a, b, c)` has unit length.
    fn from_coefficients(v: DVec4) -> Self {
        let normal = v.truncate();
        let len = normal.length();
        if len > 0.0 {
            Self::new(normal / len, v.w / len)
        } else {
            Self::new(normal, v.w)
        }
    }

    /// Signed distance from the plane to `point`; positive on the inside.
    #[inline]
    pub fn distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) + self.offset
    }
}

/// Result of classifying a sphere against a frustum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Outside,
    Intersecting,
    Inside,
}

/// Six clip planes: left, right, bottom, top, near, far.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    planes: [ClipPlane; 6],
}

impl Frustum {
    pub fn new(planes: [ClipPlane; 6]) -> Self {
        Self { planes }
    }

    /// Extracts the planes from a combined view-projection matrix.
    pub fn from_view_projection(vp: &DMat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut raw = [DVec4::ZERO; 6];
        raw[LEFT] = rows[3] + rows[0];
        raw[RIGHT] = rows[3] - rows[0];
        raw[BOTTOM] = rows[3] + rows[1];
        raw[TOP] = rows[3] - rows[1];
        raw[NEAR] = rows[3] + rows[2];
        raw[FAR] = rows[3] - rows[2];

        Self {
            planes: raw.map(ClipPlane::from_coefficients),
        }
    }

    pub fn planes(&self) -> &[ClipPlane; 6] {
        &self.planes
    }

    /// Returns true unless the sphere is entirely outside some plane.
    pub fn is_visible(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance(sphere.center) + sphere.radius >= 0.0)
    }

    /// Three-way classification, used for diagnostics.
    pub fn classify(&self, sphere: &BoundingSphere) -> Visibility {
        let mut intersecting = false;
        for plane in &self.planes {
            let d = plane.distance(sphere.center);
            if d + sphere.radius < 0.0 {
                return Visibility::Outside;
            }
            if d - sphere.radius < 0.0 {
                intersecting = true;
            }
        }
        if intersecting {
            Visibility::Intersecting
        } else {
            Visibility::Inside
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_neg_z() -> Frustum {
        let view = DMat4::look_at_rh(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y);
        let proj = DMat4::perspective_rh_gl(60f64.to_radians(), 1.0, 1.0, 100.0);
        Frustum::from_view_projection(&(proj * view))
    }

    #[test]
    fn test_sphere_in_front_is_visible() {
        let frustum = looking_down_neg_z();
        let sphere = BoundingSphere::new(DVec3::new(0.0, 0.0, -10.0), 1.0);
        assert!(frustum.is_visible(&sphere));
        assert_eq!(frustum.classify(&sphere), Visibility::Inside);
    }

    #[test]
    fn test_sphere_behind_is_not_visible() {
        let frustum = looking_down_neg_z();
        let sphere = BoundingSphere::new(DVec3::new(0.0, 0.0, 10.0), 1.0);
        assert!(!frustum.is_visible(&sphere));
        assert_eq!(frustum.classify(&sphere), Visibility::Outside);
    }

    #[test]
    fn test_sphere_beyond_far_plane() {
        let frustum = looking_down_neg_z();
        let sphere = BoundingSphere::new(DVec3::new(0.0, 0.0, -200.0), 1.0);
        assert!(!frustum.is_visible(&sphere));
    }

    #[test]
    fn test_straddling_sphere_counts_as_visible() {
        let frustum = looking_down_neg_z();
        // Center just outside the right plane, radius reaching back in
        let sphere = BoundingSphere::new(DVec3::new(7.0, 0.0, -10.0), 2.0);
        assert!(frustum.is_visible(&sphere));
        assert_eq!(frustum.classify(&sphere), Visibility::Intersecting);
    }

    #[test]
    fn test_planes_are_normalized() {
        let frustum = looking_down_neg_z();
        for plane in frustum.planes() {
            assert!((plane.normal.length() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_near_plane_distance_in_world_units() {
        let frustum = looking_down_neg_z();
        let near = frustum.planes()[NEAR];
        assert!((near.distance(DVec3::new(0.0, 0.0, -5.0)) - 4.0).abs() < 1e-9);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_growing_radius_never_hides(
                x in -500.0f64..500.0,
                y in -500.0f64..500.0,
                z in -500.0f64..500.0,
                r in 0.0f64..50.0,
                grow in 0.0f64..100.0
            ) {
                let frustum = looking_down_neg_z();
                let small = BoundingSphere::new(DVec3::new(x, y, z), r);
                let large = BoundingSphere::new(DVec3::new(x, y, z), r + grow);
                if frustum.is_visible(&small) {
                    prop_assert!(frustum.is_visible(&large));
                }
            }

            #[test]
            fn test_classify_agrees_with_is_visible(
                x in -200.0f64..200.0,
                y in -200.0f64..200.0,
                z in -200.0f64..200.0,
                r in 0.0f64..50.0
            ) {
                let frustum = looking_down_neg_z();
                let sphere = BoundingSphere::new(DVec3::new(x, y, z), r);
                let visible = frustum.is_visible(&sphere);
                prop_assert_eq!(visible, frustum.classify(&sphere) != Visibility::Outside);
            }
        }
    }
}

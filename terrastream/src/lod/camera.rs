//! Camera state consumed by the selector.

use crate::geodesy::{Cartographic, Ellipsoid};
use crate::visibility::Frustum;
use glam::{DMat4, DVec3};

/// Default vertical field of view in degrees.
pub const DEFAULT_FOV_Y_DEGREES: f64 = 60.0;

/// A perspective camera in Earth-centered Cartesian space.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: DVec3,
    view: DMat4,
    projection: DMat4,
}

impl Camera {
    /// Creates a camera from explicit matrices.
    ///
    /// `projection` is expected to use OpenGL clip depth (`[-w, w]`).
    pub fn new(position: DVec3, view: DMat4, projection: DMat4) -> Self {
        Self {
            position,
            view,
            projection,
        }
    }

    /// Right-handed look-at camera with a perspective projection.
    #[allow(clippy::too_many_arguments)]
    pub fn look_at(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y: f64,
        aspect: f64,
        near: f64,
        far: f64,
    ) -> Self {
        Self {
            position: eye,
            view: DMat4::look_at_rh(eye, target, up),
            projection: DMat4::perspective_rh_gl(fov_y, aspect, near, far),
        }
    }

    /// Camera above `position` looking straight down at the ellipsoid.
    ///
    /// Near and far planes are derived from the height so the whole visible
    /// hemisphere fits between them.
    pub fn nadir(ellipsoid: &Ellipsoid, position: &Cartographic, fov_y: f64, aspect: f64) -> Self {
        let eye = ellipsoid.cartographic_to_cartesian(position);
        let ground = ellipsoid.cartographic_to_cartesian(&Cartographic::new(
            position.longitude,
            position.latitude,
            0.0,
        ));
        let down = ground - eye;
        let forward = if down.length_squared() > 0.0 {
            down.normalize()
        } else {
            -eye.normalize_or_zero()
        };
        let up = if forward.cross(DVec3::Z).length_squared() < 1e-12 {
            DVec3::Y
        } else {
            DVec3::Z
        };

        let height = position.height.max(1.0);
        let near = (height * 0.1).max(1.0);
        let far = eye.length() + ellipsoid.maximum_radius();

        Self::look_at(eye, eye + forward, up, fov_y, aspect, near, far)
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn view(&self) -> &DMat4 {
        &self.view
    }

    pub fn projection(&self) -> &DMat4 {
        &self.projection
    }

    pub fn view_projection(&self) -> DMat4 {
        self.projection * self.view
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }

    /// Vertical focal length term `P[1][1]` of the projection.
    pub fn focal_length(&self) -> f64 {
        self.projection.y_axis.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::BoundingSphere;

    #[test]
    fn test_focal_length_matches_fov() {
        let camera = Camera::look_at(
            DVec3::ZERO,
            DVec3::NEG_Z,
            DVec3::Y,
            90f64.to_radians(),
            1.0,
            0.1,
            10.0,
        );
        assert!((camera.focal_length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_nadir_camera_sees_ground_below() {
        let ellipsoid = Ellipsoid::WGS84;
        let position = Cartographic::from_degrees(10.0, 45.0, 100_000.0);
        let camera = Camera::nadir(&ellipsoid, &position, 60f64.to_radians(), 1.5);
        let ground = ellipsoid.cartographic_to_cartesian(&Cartographic::from_degrees(10.0, 45.0, 0.0));
        assert!(camera.frustum().is_visible(&BoundingSphere::new(ground, 1.0)));
    }

    #[test]
    fn test_nadir_camera_at_pole() {
        let ellipsoid = Ellipsoid::WGS84;
        let position = Cartographic::from_degrees(0.0, 90.0, 50_000.0);
        let camera = Camera::nadir(&ellipsoid, &position, 60f64.to_radians(), 1.0);
        assert!(camera.view().is_finite());
    }
}

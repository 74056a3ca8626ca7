//! # Camera Module
//!
//! The camera converts normalized screen coordinates into world-space
//! perspective rays, given its position, orientation, vertical field of view,
//! aspect ratio, and focus distance.
//!
//! The viewport basis is derived state: it is only valid after `prepare` has
//! been called, and must be recomputed whenever the position, orientation, or
//! lens parameters change. The engine calls `prepare` once per frame before
//! rendering.

use cgmath::{Deg, InnerSpace, Point3, Rad, Vector3, Zero};
use log::warn;

use super::tracing::ray::Ray;

/// A perspective camera over the voxel world.
///
/// Invariant (after `prepare`): `u`, `v`, `w` form a right-handed orthonormal
/// basis with `w` pointing opposite the view direction.
pub struct Camera {
    /// The camera's position in world space.
    pub position: Point3<f32>,
    /// Distance to the focal plane; rewritten every frame by the autofocus.
    pub focus_distance: f32,
    /// Lens aperture diameter. Stored for depth-of-field sampling; unused by
    /// the single deterministic primary ray this renderer casts.
    pub aperture: f32,
    up: Vector3<f32>,
    fov: Deg<f32>,
    aspect: f32,
    // Derived viewport frame, valid only after prepare().
    lower_left_corner: Point3<f32>,
    horizontal: Vector3<f32>,
    vertical: Vector3<f32>,
    u: Vector3<f32>,
    v: Vector3<f32>,
    w: Vector3<f32>,
}

impl Camera {
    /// Creates a camera. The viewport frame starts out invalid; call
    /// `prepare` before requesting rays.
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `up` - The world-space up reference for the viewport basis
    /// * `fov` - Vertical field of view in degrees
    /// * `aspect` - Viewport width divided by height
    /// * `aperture` - Lens aperture diameter
    /// * `focus_distance` - Initial distance to the focal plane
    pub fn new(
        position: Point3<f32>,
        up: Vector3<f32>,
        fov: Deg<f32>,
        aspect: f32,
        aperture: f32,
        focus_distance: f32,
    ) -> Self {
        Camera {
            position,
            focus_distance,
            aperture,
            up,
            fov,
            aspect,
            lower_left_corner: Point3::new(0.0, 0.0, 0.0),
            horizontal: Vector3::zero(),
            vertical: Vector3::zero(),
            u: Vector3::zero(),
            v: Vector3::zero(),
            w: Vector3::zero(),
        }
    }

    /// Recomputes the viewport frame for the given view direction.
    ///
    /// `w` is the normalized opposite of the view direction, `u` the
    /// normalized cross of up and `w`, and `v` completes the right-handed
    /// basis. The viewport corner and extents are scaled by `tan(fov/2)`,
    /// the aspect ratio, and the focus distance.
    pub fn prepare(&mut self, view_direction: Vector3<f32>) {
        let view_direction = if view_direction.magnitude2() > f32::EPSILON {
            view_direction
        } else {
            warn!("View direction is zero-length, substituting -Z");
            -Vector3::unit_z()
        };

        let theta = Rad::from(self.fov).0;
        let half_height = (theta / 2.0).tan();
        let half_width = self.aspect * half_height;

        self.w = (-view_direction).normalize();
        let mut right = self.up.cross(self.w);
        if right.magnitude2() <= f32::EPSILON {
            warn!("View direction is parallel to the up vector, substituting +X for the right axis");
            right = Vector3::unit_x();
        }
        self.u = right.normalize();
        self.v = self.w.cross(self.u);

        let focus = self.focus_distance;
        self.lower_left_corner = self.position
            - self.u * (half_width * focus)
            - self.v * (half_height * focus)
            - self.w * focus;
        self.horizontal = self.u * (2.0 * half_width * focus);
        self.vertical = self.v * (2.0 * half_height * focus);
    }

    /// Updates the aspect ratio. Takes effect at the next `prepare`.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Returns the perspective ray through normalized screen position
    /// `(s, t)` in `[0, 1]²`, with `(0, 0)` the lower-left viewport corner.
    pub fn get_ray(&self, s: f32, t: f32) -> Ray {
        Ray::new(
            self.position,
            self.lower_left_corner + self.horizontal * s + self.vertical * t - self.position,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn prepared_camera(view_direction: Vector3<f32>) -> Camera {
        let mut camera = Camera::new(
            Point3::new(0.0, 1.0, 0.0),
            Vector3::unit_y(),
            Deg(50.0),
            16.0 / 9.0,
            0.1,
            10.0,
        );
        camera.prepare(view_direction);
        camera
    }

    #[test]
    fn prepare_builds_a_right_handed_orthonormal_basis() {
        let camera = prepared_camera(Vector3::new(3.0, 5.0, 8.0));

        assert_abs_diff_eq!(camera.u.magnitude(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(camera.v.magnitude(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(camera.w.magnitude(), 1.0, epsilon = 1e-6);

        assert_abs_diff_eq!(camera.u.dot(camera.v), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(camera.u.dot(camera.w), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(camera.v.dot(camera.w), 0.0, epsilon = 1e-6);

        // Right-handed: u x v = w, and w opposes the view direction.
        assert_abs_diff_eq!(camera.u.cross(camera.v), camera.w, epsilon = 1e-6);
        assert_abs_diff_eq!(
            camera.w,
            -Vector3::new(3.0, 5.0, 8.0).normalize(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn center_ray_points_along_the_view_direction() {
        let view = Vector3::new(0.0, -1.0, 0.0);
        let camera = prepared_camera(view);

        let ray = camera.get_ray(0.5, 0.5);
        assert_abs_diff_eq!(ray.direction.normalize(), view, epsilon = 1e-6);
        assert_eq!(ray.origin, camera.position);
    }

    #[test]
    fn degenerate_up_direction_still_yields_a_usable_basis() {
        // Looking straight along the up vector would make up x w vanish.
        let camera = prepared_camera(Vector3::unit_y());
        assert_abs_diff_eq!(camera.u.magnitude(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(camera.u.cross(camera.v), camera.w, epsilon = 1e-6);
    }
}

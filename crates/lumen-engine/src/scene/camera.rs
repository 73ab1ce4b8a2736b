use glam::{EulerRot, Mat4, Quat, Vec3};

/// Closest distance `magnify` lets the camera get to its pivot.
pub const MIN_PIVOT_DISTANCE: f32 = 0.1;
/// Farthest distance `magnify` lets the camera get from its pivot.
pub const MAX_PIVOT_DISTANCE: f32 = 500.0;

const Z_NEAR: f32 = 0.01;
const Z_FAR: f32 = 1000.0;

/// Perspective camera with Euler-accumulated rotation.
///
/// Everything derived from the fields (`view`, `projection`, ...) is computed
/// on demand, so edits are visible on the next frame without invalidation.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub location: Vec3,
    /// Accumulated rotation in radians around x, y and z.
    pub rotation: Vec3,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            location: Vec3::new(0.0, 0.5, 1.5),
            rotation: Vec3::ZERO,
            fovy: 45.0,
            viewport_width: 1.0,
            viewport_height: 1.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    #[inline]
    pub fn fovy_radians(&self) -> f32 {
        self.fovy.to_radians()
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.viewport_width / self.viewport_height
    }

    /// Camera-to-world rotation matching `rotation`.
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.rotation.y, self.rotation.x, self.rotation.z)
    }

    /// Direction the camera looks along (world space).
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_rotation_z(-self.rotation.z)
            * Mat4::from_rotation_x(-self.rotation.x)
            * Mat4::from_rotation_y(-self.rotation.y)
            * Mat4::from_translation(-self.location)
    }

    /// Right-handed perspective mapping depth to 0..1.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians(), self.aspect_ratio(), Z_NEAR, Z_FAR)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Orbits the camera around `around` by `x` (pitch) and `y` (yaw) radians.
    ///
    /// Pitch is applied in the camera's current yaw frame, so dragging up
    /// always tilts towards the pivot regardless of heading.
    pub fn rotate(&mut self, around: Vec3, x: f32, y: f32) {
        let transform = Mat4::from_rotation_y(self.rotation.y + y)
            * Mat4::from_rotation_x(x)
            * Mat4::from_rotation_y(-self.rotation.y);

        self.rotation.x += x;
        self.rotation.y += y;
        self.location = around + transform.transform_point3(self.location - around);
    }

    /// Moves the camera towards `around` by `factor` of the current distance.
    ///
    /// Positive factors move closer, negative ones move away. The resulting
    /// distance is clamped to `MIN_PIVOT_DISTANCE..=MAX_PIVOT_DISTANCE`. A
    /// camera sitting on its pivot backs off along its forward axis.
    pub fn magnify(&mut self, around: Vec3, factor: f32) {
        let to_pivot = around - self.location;
        let distance = to_pivot.length();

        let direction = if distance.is_normal() {
            to_pivot / distance
        } else {
            self.forward()
        };
        let direction = if direction.is_finite() && direction != Vec3::ZERO {
            direction
        } else {
            Vec3::NEG_Z
        };

        let target = match distance - distance * factor {
            t if !t.is_nan() => t,
            _ if !distance.is_nan() => distance,
            _ => MIN_PIVOT_DISTANCE,
        };

        self.location = around - direction * target.clamp(MIN_PIVOT_DISTANCE, MAX_PIVOT_DISTANCE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn distance(c: &Camera, pivot: Vec3) -> f32 {
        (c.location - pivot).length()
    }

    // ── defaults ────────────────────────────────────────────────────────

    #[test]
    fn defaults() {
        let c = Camera::default();
        assert_eq!(c.location, Vec3::new(0.0, 0.5, 1.5));
        assert_eq!(c.rotation, Vec3::ZERO);
        assert_eq!(c.fovy, 45.0);
        assert_eq!(c.aspect_ratio(), 1.0);
        assert!((c.fovy_radians() - std::f32::consts::FRAC_PI_4).abs() < EPS);
    }

    #[test]
    fn derived_values_follow_edits() {
        let mut c = Camera::default();
        let before = c.view_projection();
        c.set_viewport(1920.0, 1080.0);
        assert!((c.aspect_ratio() - 16.0 / 9.0).abs() < EPS);
        assert_ne!(c.view_projection(), before);
    }

    // ── matrices ────────────────────────────────────────────────────────

    #[test]
    fn view_moves_location_to_origin() {
        let c = Camera::default();
        let p = c.view().transform_point3(c.location);
        assert!(p.length() < EPS);
    }

    #[test]
    fn projection_depth_range_is_zero_to_one() {
        let c = Camera::default();
        let near = c.projection().project_point3(Vec3::new(0.0, 0.0, -Z_NEAR));
        let far = c.projection().project_point3(Vec3::new(0.0, 0.0, -Z_FAR));
        assert!(near.z.abs() < EPS);
        assert!((far.z - 1.0).abs() < EPS);
    }

    #[test]
    fn orientation_is_inverse_of_view_rotation() {
        let mut c = Camera::default();
        c.rotation = Vec3::new(0.3, -1.1, 0.2);
        c.location = Vec3::ZERO;
        let combined = c.view() * Mat4::from_quat(c.orientation());
        assert!(combined.abs_diff_eq(Mat4::IDENTITY, EPS));
    }

    // ── rotate ──────────────────────────────────────────────────────────

    #[test]
    fn rotate_keeps_distance_to_pivot() {
        let mut c = Camera::default();
        let pivot = Vec3::new(0.2, 0.0, -0.4);
        let d = distance(&c, pivot);
        c.rotate(pivot, 0.4, 1.2);
        assert!((distance(&c, pivot) - d).abs() < EPS);
        assert!((c.rotation.x - 0.4).abs() < EPS);
        assert!((c.rotation.y - 1.2).abs() < EPS);
    }

    #[test]
    fn yaw_quarter_turn_around_origin() {
        let mut c = Camera::default();
        c.location = Vec3::new(0.0, 0.0, 2.0);
        c.rotate(Vec3::ZERO, 0.0, std::f32::consts::FRAC_PI_2);
        assert!(c.location.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), EPS));
        // still looking at the origin
        assert!(c.forward().abs_diff_eq(Vec3::NEG_X, EPS));
    }

    // ── magnify ─────────────────────────────────────────────────────────

    #[test]
    fn magnify_moves_along_pivot_axis() {
        let mut c = Camera::default();
        c.location = Vec3::new(0.0, 0.0, 10.0);
        c.magnify(Vec3::ZERO, 0.5);
        assert!(c.location.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), EPS));
        c.magnify(Vec3::ZERO, -1.0);
        assert!(c.location.abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), EPS));
    }

    #[test]
    fn magnify_clamps_for_any_factor() {
        for factor in [0.0, 0.99, 1.0, 5.0, -5.0, -1e6, f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            let mut c = Camera::default();
            c.magnify(Vec3::ZERO, factor);
            let d = distance(&c, Vec3::ZERO);
            assert!(
                (MIN_PIVOT_DISTANCE - EPS..=MAX_PIVOT_DISTANCE + EPS).contains(&d),
                "factor {factor} left distance {d}"
            );
        }
    }

    #[test]
    fn magnify_hits_bounds() {
        let mut c = Camera::default();
        c.magnify(Vec3::ZERO, 1.0);
        assert!((distance(&c, Vec3::ZERO) - MIN_PIVOT_DISTANCE).abs() < EPS);

        c.magnify(Vec3::ZERO, -1e9);
        assert!((distance(&c, Vec3::ZERO) - MAX_PIVOT_DISTANCE).abs() < 1e-2);
    }

    #[test]
    fn magnify_from_pivot_backs_off() {
        let mut c = Camera::default();
        let pivot = c.location;
        c.magnify(pivot, 0.5);
        let d = distance(&c, pivot);
        assert!((d - MIN_PIVOT_DISTANCE).abs() < EPS);
        // behind the camera, opposite to where it looks
        assert!((c.location - pivot).dot(c.forward()) < 0.0);
    }
}

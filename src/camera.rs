#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::Deserialize;

use crate::consts::{
    CAMERA_DISTANCE_DEFAULT, CAMERA_DISTANCE_MAX, CAMERA_DISTANCE_MIN, CAMERA_FOV_DEG, CAMERA_PAN_LIMIT,
    CAMERA_TILT_DEFAULT_DEG, CAMERA_TILT_MAX_DEG, CAMERA_TILT_MIN_DEG,
};
use crate::math::{Ray, Vec3};

/// A point in screen space (CSS pixels, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Clamp ranges for camera movement.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraLimits {
    /// Pan clamp applied to both horizontal axes.
    pub pan: f64,
    pub tilt_min_deg: f64,
    pub tilt_max_deg: f64,
    pub distance_min: f64,
    pub distance_max: f64,
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self {
            pan: CAMERA_PAN_LIMIT,
            tilt_min_deg: CAMERA_TILT_MIN_DEG,
            tilt_max_deg: CAMERA_TILT_MAX_DEG,
            distance_min: CAMERA_DISTANCE_MIN,
            distance_max: CAMERA_DISTANCE_MAX,
        }
    }
}

/// Orbit camera looking down at the table.
///
/// The camera hangs off a pivot on the table plane at `(pan_x, 0, pan_z)`,
/// pitched by `tilt_deg` (negative looks down) and pulled back by
/// `distance` along its own view axis.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_z: f64,
    pub tilt_deg: f64,
    pub distance: f64,
    pub fov_deg: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub limits: CameraLimits,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_z: 0.0,
            tilt_deg: CAMERA_TILT_DEFAULT_DEG,
            distance: CAMERA_DISTANCE_DEFAULT,
            fov_deg: CAMERA_FOV_DEG,
            viewport_width: 0.0,
            viewport_height: 0.0,
            limits: CameraLimits::default(),
        }
    }
}

impl Camera {
    /// Update the viewport size in CSS pixels.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    /// Pan the pivot by a pointer movement, clamped to the pan range.
    pub fn pan(&mut self, dx_px: f64, dy_px: f64, units_per_px: f64) {
        let limit = self.limits.pan;
        self.pan_x = (self.pan_x - dx_px * units_per_px).clamp(-limit, limit);
        self.pan_z = (self.pan_z - dy_px * units_per_px).clamp(-limit, limit);
    }

    /// Tilt by a vertical pointer movement, clamped to the tilt range.
    pub fn tilt(&mut self, dy_px: f64, degrees_per_px: f64) {
        self.tilt_deg = (self.tilt_deg - dy_px * degrees_per_px).clamp(self.limits.tilt_min_deg, self.limits.tilt_max_deg);
    }

    /// Dolly in or out by one wheel notch in the direction of `delta`.
    pub fn zoom(&mut self, delta: f64) {
        let step = delta.clamp(-1.0, 1.0);
        self.distance = (self.distance - step).clamp(self.limits.distance_min, self.limits.distance_max);
    }

    /// World-space position of the pivot.
    #[must_use]
    pub fn pivot(&self) -> Vec3 {
        Vec3::new(self.pan_x, 0.0, self.pan_z)
    }

    /// World-space position of the eye.
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        let (s, c) = self.tilt_deg.to_radians().sin_cos();
        self.pivot() + Vec3::new(0.0, -self.distance * s, self.distance * c)
    }

    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let (s, c) = self.tilt_deg.to_radians().sin_cos();
        let forward = Vec3::new(0.0, s, -c);
        let up = Vec3::new(0.0, c, s);
        let right = Vec3::new(1.0, 0.0, 0.0);
        (forward, up, right)
    }

    fn frustum_scale(&self) -> (f64, f64) {
        let (w, h) = self.viewport();
        let half = (self.fov_deg.to_radians() / 2.0).tan();
        (half * w / h, half)
    }

    fn viewport(&self) -> (f64, f64) {
        (self.viewport_width.max(1.0), self.viewport_height.max(1.0))
    }

    /// Ray from the eye through a screen-space point.
    #[must_use]
    pub fn screen_ray(&self, screen: Point) -> Ray {
        let (w, h) = self.viewport();
        let nx = 2.0 * screen.x / w - 1.0;
        let ny = 1.0 - 2.0 * screen.y / h;
        let (forward, up, right) = self.basis();
        let (sx, sy) = self.frustum_scale();
        Ray::new(self.eye(), forward + right * (nx * sx) + up * (ny * sy))
    }

    /// Project a world-space point to screen space. `None` if behind the eye.
    #[must_use]
    pub fn world_to_screen(&self, world: Vec3) -> Option<Point> {
        let (forward, up, right) = self.basis();
        let v = world - self.eye();
        let depth = v.dot(forward);
        if depth <= f64::EPSILON {
            return None;
        }
        let (sx, sy) = self.frustum_scale();
        let nx = v.dot(right) / (depth * sx);
        let ny = v.dot(up) / (depth * sy);
        let (w, h) = self.viewport();
        Some(Point::new((nx + 1.0) / 2.0 * w, (1.0 - ny) / 2.0 * h))
    }
}

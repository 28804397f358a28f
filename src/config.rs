//! Session tuning knobs.
//!
//! Every field defaults to the matching constant in [`crate::consts`]; a host
//! overrides only what it needs, from JSON with camelCase keys.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::Deserialize;

use crate::camera::CameraLimits;
use crate::consts::{
    BOUNCE_HALF_PERIOD_MS, BOUNCE_HIGH, BOUNCE_LOW, CAMERA_PAN_PER_PX, CAMERA_TILT_PER_PX, DEFAULT_ACCEPTANCE_RADIUS,
    DRAG_DEGREES_PER_PX, DRAG_UNITS_PER_PX, LAYOUT_TWEEN_MS, PHYSICS_GRAVITY, PHYSICS_STEP_SECS, REPARENT_TWEEN_MS,
    STACK_TWEEN_MS, TURN_TWEEN_MS,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Duration of the animated re-parent onto a new slot, in ms.
    pub reparent_tween_ms: f64,
    /// Duration of grid and table layout adjustments, in ms.
    pub layout_tween_ms: f64,
    /// Duration of stack place rearrangements, in ms.
    pub stack_tween_ms: f64,
    /// Duration of token rotations and flips, in ms.
    pub turn_tween_ms: f64,
    pub bounce_low: f64,
    pub bounce_high: f64,
    pub bounce_half_period_ms: f64,
    /// World units a dragged element travels per pixel.
    pub drag_units_per_px: f64,
    /// Degrees a drag-rotated tile turns per pixel.
    pub drag_degrees_per_px: f64,
    pub camera_pan_per_px: f64,
    pub camera_tilt_per_px: f64,
    pub camera_limits: CameraLimits,
    /// Fixed physics timestep, in seconds.
    pub physics_step_secs: f64,
    pub gravity: f64,
    /// Acceptance radius for containers that do not configure one.
    pub default_acceptance_radius: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reparent_tween_ms: REPARENT_TWEEN_MS,
            layout_tween_ms: LAYOUT_TWEEN_MS,
            stack_tween_ms: STACK_TWEEN_MS,
            turn_tween_ms: TURN_TWEEN_MS,
            bounce_low: BOUNCE_LOW,
            bounce_high: BOUNCE_HIGH,
            bounce_half_period_ms: BOUNCE_HALF_PERIOD_MS,
            drag_units_per_px: DRAG_UNITS_PER_PX,
            drag_degrees_per_px: DRAG_DEGREES_PER_PX,
            camera_pan_per_px: CAMERA_PAN_PER_PX,
            camera_tilt_per_px: CAMERA_TILT_PER_PX,
            camera_limits: CameraLimits::default(),
            physics_step_secs: PHYSICS_STEP_SECS,
            gravity: PHYSICS_GRAVITY,
            default_acceptance_radius: DEFAULT_ACCEPTANCE_RADIUS,
        }
    }
}

impl SessionConfig {
    /// Build a config from a (possibly partial) JSON object.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error if a present field has the wrong type.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

//! Shared numeric constants for the tabletop crate.

// ── Tweens ──────────────────────────────────────────────────────

/// Duration of the animated re-parent of an element onto a new slot, in ms.
pub const REPARENT_TWEEN_MS: f64 = 1000.0;

/// Duration of a grid or table layout adjustment, in ms.
pub const LAYOUT_TWEEN_MS: f64 = 500.0;

/// Duration of a row-balanced stack rearrangement, in ms.
pub const STACK_TWEEN_MS: f64 = 250.0;

/// Duration of a token rotation or flip, in ms.
pub const TURN_TWEEN_MS: f64 = 1000.0;

// ── Selection ───────────────────────────────────────────────────

/// Lower bound of the selection bounce, in world units above the slot.
pub const BOUNCE_LOW: f64 = 1.0;

/// Upper bound of the selection bounce.
pub const BOUNCE_HIGH: f64 = 1.5;

/// Half period of the selection bounce, in ms.
pub const BOUNCE_HALF_PERIOD_MS: f64 = 250.0;

// ── Dragging ────────────────────────────────────────────────────

/// World units an element travels per pixel of pointer movement.
pub const DRAG_UNITS_PER_PX: f64 = 0.05;

/// Degrees a tile turns per pixel of horizontal pointer movement.
pub const DRAG_DEGREES_PER_PX: f64 = 0.25;

/// A tile grab this far from the centre (as a fraction of its radius) rotates.
pub const ROTATE_GRAB_DIVISOR: f64 = 2.5;

/// Acceptance radius used by containers that do not configure one.
pub const DEFAULT_ACCEPTANCE_RADIUS: f64 = 1.0;

// ── Camera ──────────────────────────────────────────────────────

/// Pan clamp applied to both horizontal axes.
pub const CAMERA_PAN_LIMIT: f64 = 100.0;

/// World units panned per pixel of pointer movement.
pub const CAMERA_PAN_PER_PX: f64 = 0.1;

/// Degrees tilted per pixel of vertical pointer movement.
pub const CAMERA_TILT_PER_PX: f64 = 0.3;

/// Steepest camera tilt (looking straight down), in degrees.
pub const CAMERA_TILT_MIN_DEG: f64 = -90.0;

/// Shallowest camera tilt, in degrees.
pub const CAMERA_TILT_MAX_DEG: f64 = -5.0;

/// Default camera tilt, in degrees.
pub const CAMERA_TILT_DEFAULT_DEG: f64 = -45.0;

/// Closest camera distance from the pivot.
pub const CAMERA_DISTANCE_MIN: f64 = 5.0;

/// Farthest camera distance from the pivot.
pub const CAMERA_DISTANCE_MAX: f64 = 100.0;

/// Default camera distance from the pivot.
pub const CAMERA_DISTANCE_DEFAULT: f64 = 30.0;

/// Vertical field of view, in degrees.
pub const CAMERA_FOV_DEG: f64 = 75.0;

// ── Table ───────────────────────────────────────────────────────

/// Smallest radius of the circular table.
pub const TABLE_MIN_RADIUS: f64 = 15.0;

/// Smallest radius of the table's centre region.
pub const TABLE_MIN_CENTER_RADIUS: f64 = 5.0;

/// Margin between the centre region and player regions, and at the rim.
pub const TABLE_MARGIN: f64 = 5.0;

/// Vertical offset used to park empty player regions under the table.
pub const TABLE_PARK_DEPTH: f64 = -200.0;

// ── Physics ─────────────────────────────────────────────────────

/// Fixed physics timestep, in seconds.
pub const PHYSICS_STEP_SECS: f64 = 1.0 / 60.0;

/// Gravity along the vertical axis, scaled to table units.
pub const PHYSICS_GRAVITY: f64 = -9.82 * 20.0;

/// Bounce energy kept when a body hits the table surface.
pub const PHYSICS_RESTITUTION: f64 = 0.5;

/// Most fixed steps run in one tick; a longer stall drops the backlog.
pub const PHYSICS_MAX_SUBSTEPS: u32 = 10;

/// Most fixed steps simulated when predicting where a thrown body rests.
pub const PHYSICS_PREDICT_MAX_STEPS: u32 = 3_600;

/// Upward velocity given to a die when it is thrown.
pub const DICE_THROW_VELOCITY: f64 = 70.0;

/// Spread of the random spin given to a thrown die.
pub const DICE_SPIN_FACTOR: f64 = 100.0;

/// Edge length of a die.
pub const DICE_SIZE: f64 = 1.5;

// ── Layout ──────────────────────────────────────────────────────

/// Height of a highlight disc above its slot, to avoid z-fighting.
pub const HIGHLIGHT_LIFT: f64 = 0.01;

/// Height of a board plate.
pub const BOARD_THICKNESS: f64 = 0.2;

/// Hexagonal row pitch as a fraction of the tile step (√3 / 2).
pub const HEX_ROW_PITCH: f64 = 0.8662;

/// Upper bound on selection changes settled per handler, guarding re-entrancy.
pub const MAX_SELECTION_PASSES: usize = 16;

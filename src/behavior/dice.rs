//! `dice_v1`: a physics-backed six-sided die.
//!
//! The authority decides every roll. `dice.rolled` only replays a throw in
//! the physics world for show and records the value it announced. The pip
//! layout is turned inside the cube so the announced face ends up on top
//! once the throw comes to rest.

#[cfg(test)]
#[path = "dice_test.rs"]
mod dice_test;

use std::f64::consts::FRAC_PI_2;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{Stage, parse_init};
use crate::consts::{DICE_SIZE, DICE_SPIN_FACTOR, DICE_THROW_VELOCITY};
use crate::error::ElementError;
use crate::event::Intent;
use crate::math::{Aabb, Mat3, Vec3};
use crate::physics::BodyPose;
use crate::scene::HandleId;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DiceInit {
    value: Option<i64>,
    can_be_rolled: bool,
}

#[derive(Debug, Deserialize)]
struct Rolled {
    value: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RollPermission {
    can_be_rolled: bool,
}

#[derive(Debug)]
pub struct Dice {
    handle: HandleId,
    body: HandleId,
    faces: HandleId,
    value: Option<i64>,
    can_be_rolled: bool,
}

impl Dice {
    /// # Errors
    ///
    /// `InvalidInitData` if `value` or `canBeRolled` has the wrong type.
    pub fn new(id: &str, init: &Value, stage: &mut Stage) -> Result<Self, ElementError> {
        let init: DiceInit = parse_init(id, init)?;
        let handle = stage.scene.create_under("dice_v1", stage.scene.root());
        let body = stage.scene.create_under("dice_v1_body", handle);
        let half = DICE_SIZE / 2.0;
        let resting = Vec3::new(0.0, half, 0.0);
        stage.scene.set_position(body, resting);
        stage.scene.set_bounds(body, Aabb::new(Vec3::new(-half, -half, -half), Vec3::new(half, half, half)));
        stage.physics.attach_body(body, BodyPose { position: resting, rotation: Vec3::ZERO }, DICE_SIZE);
        let faces = stage.scene.create_under("dice_v1_faces", body);

        let mut dice = Self { handle, body, faces, value: init.value, can_be_rolled: false };
        dice.set_can_be_rolled(init.can_be_rolled, stage);
        dice.turn_faces(stage.scene.world_rotation(body), stage);
        Ok(dice)
    }

    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// The cube the physics world moves.
    #[must_use]
    pub fn body(&self) -> HandleId {
        self.body
    }

    /// Pip layout carried by the cube.
    #[must_use]
    pub fn faces(&self) -> HandleId {
        self.faces
    }

    /// Last value announced by the authority.
    #[must_use]
    pub fn value(&self) -> Option<i64> {
        self.value
    }

    #[must_use]
    pub fn can_be_rolled(&self) -> bool {
        self.can_be_rolled
    }

    /// Whether the die is still tumbling.
    #[must_use]
    pub fn is_rolling(&self, stage: &Stage) -> bool {
        !stage.physics.is_settled(self.body)
    }

    #[must_use]
    pub fn dimensions(&self) -> Aabb {
        Aabb::footprint(DICE_SIZE, DICE_SIZE, DICE_SIZE)
    }

    fn set_can_be_rolled(&mut self, can_be_rolled: bool, stage: &mut Stage) {
        self.can_be_rolled = can_be_rolled;
        if can_be_rolled {
            stage.targets.add_clickable(self.body, None, true);
        } else {
            stage.targets.remove_clickable(self.body, None);
        }
    }

    pub fn on_event(&mut self, event: &str, data: &Value, stage: &mut Stage) {
        let result = match event {
            "dice.rolled" => serde_json::from_value::<Rolled>(data.clone()).map(|rolled| {
                self.value = Some(rolled.value);
                stage.physics.throw_body(self.body, DICE_THROW_VELOCITY, DICE_SPIN_FACTOR);
                if let Some(rest) = stage.physics.predict_rest(self.body, stage.config.physics_step_secs) {
                    let parent = stage.scene.world_rotation(self.handle);
                    self.turn_faces(parent.compose(&Mat3::from_euler(rest.rotation)), stage);
                }
            }),
            "dice.permissionChanged" => serde_json::from_value::<RollPermission>(data.clone())
                .map(|permission| self.set_can_be_rolled(permission.can_be_rolled, stage)),
            _ => Ok(()),
        };
        if let Err(err) = result {
            warn!(event, error = %err, "ignoring malformed dice event");
        }
    }

    pub fn on_click(&self, id: &str, stage: &mut Stage) {
        if self.can_be_rolled {
            stage.emit(Intent::new("dice.roll", id, json!({ "intensity": 1 })));
        }
    }

    /// Copy the simulated pose onto the cube. A resting cube gets its pips
    /// turned so the announced value faces up.
    pub fn on_rendered(&self, stage: &mut Stage) {
        if let Some(pose) = stage.physics.body_pose(self.body) {
            stage.scene.set_position(self.body, pose.position);
            stage.scene.set_rotation(self.body, pose.rotation);
        }
        if stage.physics.is_settled(self.body) {
            self.turn_faces(stage.scene.world_rotation(self.body), stage);
        }
    }

    /// Point the current value's face up for a cube turned by `body_world`.
    /// Leaves the layout alone when the cube is not square to the table.
    fn turn_faces(&self, body_world: Mat3, stage: &mut Stage) {
        let Some(value) = self.value else {
            return;
        };
        match layout_rotation(body_world, value) {
            Some(rotation) => stage.scene.set_rotation(self.faces, rotation),
            None => debug!(value, "no quarter turn puts this value on top"),
        }
    }

    pub fn teardown(&self, stage: &mut Stage) {
        stage.physics.detach_body(self.body);
        stage.targets.forget(self.body);
    }
}

/// Outward normal of the face showing `value`, in the pip layout's frame.
/// Opposite faces add up to seven.
#[must_use]
pub fn face_normal(value: i64) -> Option<Vec3> {
    match value {
        1 => Some(Vec3::new(0.0, 1.0, 0.0)),
        6 => Some(Vec3::new(0.0, -1.0, 0.0)),
        2 => Some(Vec3::new(1.0, 0.0, 0.0)),
        5 => Some(Vec3::new(-1.0, 0.0, 0.0)),
        3 => Some(Vec3::new(0.0, 0.0, 1.0)),
        4 => Some(Vec3::new(0.0, 0.0, -1.0)),
        _ => None,
    }
}

/// Quarter-turn layout rotation that carries `value`'s face to world up
/// inside a cube turned by `body_world`.
fn layout_rotation(body_world: Mat3, value: i64) -> Option<Vec3> {
    let normal = face_normal(value)?;
    let up = body_world.transpose().apply(Vec3::new(0.0, 1.0, 0.0));
    let quarter = |turns: u8| f64::from(turns) * FRAC_PI_2;
    for x in 0..4 {
        for y in 0..4 {
            for z in 0..4 {
                let angles = Vec3::new(quarter(x), quarter(y), quarter(z));
                if Mat3::from_euler(angles).apply(normal).approx_eq(up, 1e-6) {
                    return Some(angles);
                }
            }
        }
    }
    None
}

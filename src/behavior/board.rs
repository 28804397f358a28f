//! `board_v1`: a printed board. Everything on it shares one target handle
//! resting on the board's top face.

#[cfg(test)]
#[path = "board_test.rs"]
mod board_test;

use serde::Deserialize;
use serde_json::Value;

use super::{Stage, parse_init};
use crate::consts::BOARD_THICKNESS;
use crate::error::ElementError;
use crate::math::{Aabb, Vec3};
use crate::scene::HandleId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardInit {
    width: f64,
    /// Extent along `z`.
    height: f64,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug)]
pub struct Board {
    handle: HandleId,
    target: HandleId,
    width: f64,
    depth: f64,
    image: Option<String>,
}

impl Board {
    /// # Errors
    ///
    /// `InvalidInitData` if `width` or `height` is missing.
    pub fn new(id: &str, init: &Value, stage: &mut Stage) -> Result<Self, ElementError> {
        let init: BoardInit = parse_init(id, init)?;
        let handle = stage.scene.create_under("board_v1", stage.scene.root());
        let plate = stage.scene.create_under("board_v1_plate", handle);
        stage.scene.set_bounds(plate, Aabb::footprint(init.width, BOARD_THICKNESS, init.height));
        let target = stage.scene.create_under("board_v1_target", handle);
        stage.scene.set_position(target, Vec3::new(0.0, BOARD_THICKNESS, 0.0));
        Ok(Self {
            handle,
            target,
            width: init.width,
            depth: init.height,
            image: init.image,
        })
    }

    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Every slot on a board resolves to the same target.
    #[must_use]
    pub fn target(&self) -> HandleId {
        self.target
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    #[must_use]
    pub fn dimensions(&self) -> Aabb {
        Aabb::footprint(self.width, BOARD_THICKNESS, self.depth)
    }
}

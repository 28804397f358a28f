//! `cardContainer_v1`: a row of card positions, each stacking cards
//! upwards by index.

#[cfg(test)]
#[path = "card_container_test.rs"]
mod card_container_test;

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{ChildInfo, Stage, parse_init};
use crate::consts::HIGHLIGHT_LIFT;
use crate::error::ElementError;
use crate::math::{Aabb, Vec3};
use crate::scene::HandleId;
use crate::slot::SlotData;

/// Slot key: `(position, index)`.
type SlotKey = (i64, i64);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardContainerInit {
    card_width: f64,
    card_height: f64,
    card_depth: f64,
    #[serde(default)]
    spacing: f64,
    #[serde(default)]
    acceptance_radius: Option<f64>,
}

#[derive(Debug)]
struct Slot {
    handle: HandleId,
    highlight: HandleId,
}

#[derive(Debug)]
pub struct CardContainer {
    handle: HandleId,
    card_width: f64,
    card_height: f64,
    card_depth: f64,
    spacing: f64,
    slots: BTreeMap<SlotKey, Slot>,
    bounds: Aabb,
    acceptance_radius: Option<f64>,
}

fn slot_key(data: SlotData<'_>) -> Option<SlotKey> {
    Some((data.position()?, data.index()?))
}

impl CardContainer {
    /// # Errors
    ///
    /// `InvalidInitData` unless the card dimensions are given.
    pub fn new(id: &str, init: &Value, stage: &mut Stage) -> Result<Self, ElementError> {
        let init: CardContainerInit = parse_init(id, init)?;
        let handle = stage.scene.create_under("cardContainer_v1", stage.scene.root());
        Ok(Self {
            handle,
            card_width: init.card_width,
            card_height: init.card_height,
            card_depth: init.card_depth,
            spacing: init.spacing,
            slots: BTreeMap::new(),
            bounds: Aabb::new(Vec3::ZERO, Vec3::new(0.0, init.card_depth, 0.0)),
            acceptance_radius: init.acceptance_radius,
        })
    }

    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Half the card's shorter side unless configured.
    #[must_use]
    pub fn acceptance_radius(&self) -> f64 {
        self.acceptance_radius.unwrap_or(self.card_width.min(self.card_height) / 2.0)
    }

    #[must_use]
    pub fn dimensions(&self) -> Aabb {
        self.bounds
    }

    #[allow(clippy::cast_precision_loss)]
    fn anchor(&self, (position, index): SlotKey) -> Vec3 {
        Vec3::new(position as f64 * (self.card_width + self.spacing), index as f64 * self.card_depth, 0.0)
    }

    fn slot(&mut self, data: SlotData<'_>, stage: &mut Stage) -> &Slot {
        let key = slot_key(data).unwrap_or_else(|| {
            warn!(slot = %data.raw(), "card slot data has no integer position/index; using (0, 0)");
            (0, 0)
        });
        let anchor = self.anchor(key);
        let (parent, width, height) = (self.handle, self.card_width, self.card_height);
        self.slots.entry(key).or_insert_with(|| {
            let handle = stage.scene.create_under("cardContainer_v1_slot", parent);
            stage.scene.set_position(handle, anchor);
            let highlight = stage.scene.create_under("cardContainer_v1_highlight", handle);
            stage.scene.set_position(highlight, Vec3::new(0.0, HIGHLIGHT_LIFT, 0.0));
            stage.scene.set_bounds(highlight, Aabb::footprint(width, 0.0, height));
            if let Some(node) = stage.scene.get_mut(highlight) {
                node.opacity = 0.0;
            }
            Slot { handle, highlight }
        })
    }

    pub fn resolve_slot(&mut self, data: SlotData<'_>, stage: &mut Stage) -> HandleId {
        self.slot(data, stage).handle
    }

    pub fn resolve_highlight(&mut self, data: SlotData<'_>, stage: &mut Stage) -> HandleId {
        self.slot(data, stage).highlight
    }

    /// Bounds cover every occupied slot.
    pub fn on_bounds_invalidated(&mut self, children: &[ChildInfo]) {
        let occupied: BTreeSet<SlotKey> = children.iter().map(|c| slot_key(c.slot()).unwrap_or((0, 0))).collect();
        let half = Vec3::new(self.card_width / 2.0, 0.0, self.card_height / 2.0);
        let mut bounds = Aabb::new(Vec3::ZERO, Vec3::new(0.0, self.card_depth, 0.0));
        for key in occupied {
            let anchor = self.anchor(key);
            let centre = Vec3::new(anchor.x, 0.0, anchor.z);
            bounds = bounds.union(&Aabb::new(centre - half, centre + half));
        }
        self.bounds = bounds;
    }
}

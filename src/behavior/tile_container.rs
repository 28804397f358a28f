//! `tileContainer_v1`: a square or hexagonal lattice of tile slots, each
//! stacking tiles upwards by index.

#[cfg(test)]
#[path = "tile_container_test.rs"]
mod tile_container_test;

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{ChildInfo, Stage, parse_init};
use crate::consts::{HEX_ROW_PITCH, HIGHLIGHT_LIFT};
use crate::error::ElementError;
use crate::math::{Aabb, Vec3};
use crate::scene::HandleId;
use crate::slot::SlotData;

/// Slot key: `(x, y, index)`.
type SlotKey = (i64, i64, i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileForm {
    #[default]
    Square,
    Hexagonal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TileContainerInit {
    stack_element_radius: f64,
    stack_element_height: f64,
    #[serde(default)]
    stack_element_spacing: f64,
    #[serde(default)]
    tile_form: TileForm,
    #[serde(default)]
    acceptance_radius: Option<f64>,
}

#[derive(Debug)]
struct Slot {
    handle: HandleId,
    highlight: HandleId,
}

/// Local anchor of lattice cell `(x, y)` at stack height `index`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn lattice_anchor(form: TileForm, (x, y, index): SlotKey, radius: f64, height: f64, spacing: f64) -> Vec3 {
    let step = radius + spacing;
    let lift = index as f64 * height;
    match form {
        TileForm::Square => Vec3::new(x as f64 * step, lift, y as f64 * step),
        TileForm::Hexagonal => {
            let shift = if y.rem_euclid(2) == 1 { 0.5 } else { 0.0 };
            Vec3::new((x as f64 + shift) * step, lift, y as f64 * HEX_ROW_PITCH * step)
        }
    }
}

#[derive(Debug)]
pub struct TileContainer {
    handle: HandleId,
    radius: f64,
    height: f64,
    spacing: f64,
    form: TileForm,
    slots: BTreeMap<SlotKey, Slot>,
    bounds: Aabb,
    acceptance_radius: Option<f64>,
}

fn slot_key(data: SlotData<'_>) -> Option<SlotKey> {
    Some((data.x()?, data.y()?, data.index()?))
}

impl TileContainer {
    /// # Errors
    ///
    /// `InvalidInitData` unless the tile radius and height are given.
    pub fn new(id: &str, init: &Value, stage: &mut Stage) -> Result<Self, ElementError> {
        let init: TileContainerInit = parse_init(id, init)?;
        let handle = stage.scene.create_under("tileContainer_v1", stage.scene.root());
        Ok(Self {
            handle,
            radius: init.stack_element_radius,
            height: init.stack_element_height,
            spacing: init.stack_element_spacing,
            form: init.tile_form,
            slots: BTreeMap::new(),
            bounds: Aabb::ZERO,
            acceptance_radius: init.acceptance_radius,
        })
    }

    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    #[must_use]
    pub fn form(&self) -> TileForm {
        self.form
    }

    #[must_use]
    pub fn acceptance_radius(&self) -> f64 {
        self.acceptance_radius.unwrap_or(self.radius / 2.0)
    }

    #[must_use]
    pub fn dimensions(&self) -> Aabb {
        self.bounds
    }

    fn anchor(&self, key: SlotKey) -> Vec3 {
        lattice_anchor(self.form, key, self.radius, self.height, self.spacing)
    }

    fn slot(&mut self, data: SlotData<'_>, stage: &mut Stage) -> &Slot {
        let key = slot_key(data).unwrap_or_else(|| {
            warn!(slot = %data.raw(), "tile slot data has no integer x/y/index; using (0, 0, 0)");
            (0, 0, 0)
        });
        let anchor = self.anchor(key);
        let (parent, radius) = (self.handle, self.radius);
        self.slots.entry(key).or_insert_with(|| {
            let handle = stage.scene.create_under("tileContainer_v1_slot", parent);
            stage.scene.set_position(handle, anchor);
            let highlight = stage.scene.create_under("tileContainer_v1_highlight", handle);
            stage.scene.set_position(highlight, Vec3::new(0.0, HIGHLIGHT_LIFT, 0.0));
            stage.scene.set_bounds(highlight, Aabb::footprint(radius, 0.0, radius));
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

    /// Bounds cover every occupied slot, stack height included.
    pub fn on_bounds_invalidated(&mut self, children: &[ChildInfo]) {
        let occupied: BTreeSet<SlotKey> = children.iter().map(|c| slot_key(c.slot()).unwrap_or((0, 0, 0))).collect();
        let tile = Aabb::footprint(self.radius, self.height, self.radius);
        self.bounds = occupied.into_iter().fold(Aabb::ZERO, |acc, key| acc.union(&tile.translated(self.anchor(key))));
    }
}

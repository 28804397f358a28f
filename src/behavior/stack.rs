//! `pieceContainer_v1`: named piles of pieces, each pile arranged in
//! balanced rows.
//!
//! DESIGN
//! ======
//! A pile owns one *place* handle per piece sitting on it. Places are
//! handed out by `resolve_slot` (reusing a vacant one first) and pruned
//! once vacated. Whenever the place count changes the pile is rearranged:
//! `ceil(sqrt(n))` rows, filled round-robin, sorted largest first and
//! folded outwards from the middle, so the longest row sits in the centre
//! and the rows taper towards both edges.

#[cfg(test)]
#[path = "stack_test.rs"]
mod stack_test;

use std::collections::VecDeque;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{Stage, parse_init};
use crate::animation::{Easing, Target};
use crate::consts::HIGHLIGHT_LIFT;
use crate::error::ElementError;
use crate::math::{Aabb, Vec3};
use crate::scene::HandleId;
use crate::slot::SlotData;

#[derive(Debug, Deserialize)]
struct PileInit {
    index: i64,
    x: f64,
    /// Table-plane `z` of the pile.
    y: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StackInit {
    stack_element_radius: f64,
    positions: Vec<PileInit>,
    #[serde(default)]
    acceptance_radius: Option<f64>,
}

#[derive(Debug)]
struct Place {
    handle: HandleId,
    anchor: Option<Vec3>,
}

#[derive(Debug)]
struct Pile {
    index: i64,
    centre: Vec3,
    handle: HandleId,
    highlight: HandleId,
    places: Vec<Place>,
}

/// Row sizes for `count` places: non-decreasing then non-increasing.
#[must_use]
pub fn balanced_rows(count: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    let mut rows = 1;
    while rows * rows < count {
        rows += 1;
    }
    let mut sizes = vec![0; rows];
    for i in 0..count {
        sizes[i % rows] += 1;
    }
    sizes.sort_unstable_by(|a, b| b.cmp(a));

    let mut folded = VecDeque::with_capacity(rows);
    for (i, size) in sizes.into_iter().enumerate() {
        if i % 2 == 0 {
            folded.push_front(size);
        } else {
            folded.push_back(size);
        }
    }
    folded.into()
}

/// Row-major anchors for `count` places laid out `spacing` apart.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn place_anchors(count: usize, spacing: f64) -> Vec<Vec3> {
    let rows = balanced_rows(count);
    let row_count = rows.len() as f64;
    rows.iter()
        .enumerate()
        .flat_map(|(row, &size)| {
            (0..size).map(move |col| {
                Vec3::new(
                    (col as f64 - (size as f64 - 1.0) / 2.0) * spacing,
                    0.0,
                    (row as f64 - (row_count - 1.0) / 2.0) * spacing,
                )
            })
        })
        .collect()
}

#[derive(Debug)]
pub struct Stack {
    handle: HandleId,
    radius: f64,
    piles: Vec<Pile>,
    acceptance_radius: Option<f64>,
}

impl Stack {
    /// # Errors
    ///
    /// `InvalidInitData` unless `stackElementRadius` and `positions` are given.
    pub fn new(id: &str, init: &Value, stage: &mut Stage) -> Result<Self, ElementError> {
        let init: StackInit = parse_init(id, init)?;
        let handle = stage.scene.create_under("pieceContainer_v1", stage.scene.root());
        let radius = init.stack_element_radius;
        let piles = init
            .positions
            .into_iter()
            .map(|pile| {
                let centre = Vec3::new(pile.x, 0.0, pile.y);
                let pile_handle = stage.scene.create_under("pieceContainer_v1_pile", handle);
                stage.scene.set_position(pile_handle, centre);
                let highlight = stage.scene.create_under("pieceContainer_v1_highlight", pile_handle);
                stage.scene.set_position(highlight, Vec3::new(0.0, HIGHLIGHT_LIFT, 0.0));
                stage.scene.set_bounds(highlight, Aabb::footprint(radius * 2.0, 0.0, radius * 2.0));
                if let Some(node) = stage.scene.get_mut(highlight) {
                    node.opacity = 0.0;
                }
                Pile { index: pile.index, centre, handle: pile_handle, highlight, places: Vec::new() }
            })
            .collect();
        Ok(Self { handle, radius, piles, acceptance_radius: init.acceptance_radius })
    }

    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Half the pile spacing unless configured.
    #[must_use]
    pub fn acceptance_radius(&self) -> f64 {
        self.acceptance_radius.unwrap_or(self.radius / 2.0)
    }

    /// Number of places currently allocated on pile `index`.
    #[must_use]
    pub fn place_count(&self, index: i64) -> usize {
        self.pile(index).map_or(0, |p| p.places.len())
    }

    /// Place handles of pile `index`, in creation order.
    #[must_use]
    pub fn places(&self, index: i64) -> Vec<HandleId> {
        self.pile(index).map(|p| p.places.iter().map(|place| place.handle).collect()).unwrap_or_default()
    }

    fn pile(&self, index: i64) -> Option<&Pile> {
        self.piles.iter().find(|p| p.index == index)
    }

    /// A vacant place on the addressed pile, created if every place is taken.
    ///
    /// Returns `None` if the slot names no pile.
    pub fn resolve_slot(&mut self, data: SlotData<'_>, stage: &mut Stage) -> Option<HandleId> {
        let Some(index) = data.index() else {
            warn!(slot = %data.raw(), "stack slot data has no pile index");
            return None;
        };
        let spacing = self.radius;
        let Some(pile) = self.piles.iter_mut().find(|p| p.index == index) else {
            warn!(index, "stack has no such pile");
            return None;
        };
        if let Some(vacant) = pile.places.iter().find(|p| stage.scene.children(p.handle).is_empty()) {
            return Some(vacant.handle);
        }
        let handle = stage.scene.create_under("pieceContainer_v1_place", pile.handle);
        pile.places.push(Place { handle, anchor: None });
        rearrange(pile, spacing, stage);
        Some(handle)
    }

    /// The drop-target disc of the addressed pile.
    #[must_use]
    pub fn resolve_highlight(&self, data: SlotData<'_>) -> Option<HandleId> {
        data.index().and_then(|index| self.pile(index)).map(|p| p.highlight)
    }

    /// Prune places left empty by a departing piece and close the gaps.
    pub fn on_child_detached(&mut self, stage: &mut Stage) {
        let spacing = self.radius;
        for pile in &mut self.piles {
            let before = pile.places.len();
            pile.places.retain(|place| {
                if stage.scene.children(place.handle).is_empty() {
                    stage.scene.remove(place.handle);
                    return false;
                }
                true
            });
            if pile.places.len() != before {
                rearrange(pile, spacing, stage);
            }
        }
    }

    /// Piles are fixed, so the extent only depends on their positions.
    #[must_use]
    pub fn dimensions(&self) -> Aabb {
        let reach = Vec3::new(self.radius, 0.0, self.radius);
        self.piles.iter().fold(Aabb::ZERO, |acc, pile| acc.union(&Aabb::new(pile.centre - reach, pile.centre + reach)))
    }
}

fn rearrange(pile: &mut Pile, spacing: f64, stage: &mut Stage) {
    let anchors = place_anchors(pile.places.len(), spacing);
    for (place, anchor) in pile.places.iter_mut().zip(anchors) {
        if place.anchor == Some(anchor) {
            continue;
        }
        place.anchor = Some(anchor);
        let duration = stage.config.stack_tween_ms;
        stage.animator.start(&stage.scene, place.handle, Target::Position(anchor), duration, Easing::QuinticOut);
    }
}

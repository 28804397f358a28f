//! `autoResizeContainer_v1`: a grid of `(x, y)` cells that grows to fit its
//! content.
//!
//! DESIGN
//! ======
//! Cells are created the first time a slot resolves to them and pruned once
//! nothing is addressed to them any more. Every invalidation recomputes the
//! whole layout from the registry's view of membership:
//!
//! - each occupied cell measures the union of its members' boxes (grown
//!   from the cell origin);
//! - a column is as wide as its widest cell, a row as deep as its deepest;
//! - the grid is centred on its own origin with `spacing` between bands;
//! - each cell is centred inside its column/row band.
//!
//! A cell only animates when its anchor actually changes, so repeated
//! invalidations with unchanged membership are free.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ChildInfo, Stage, parse_init};
use crate::animation::{Easing, Target};
use crate::error::ElementError;
use crate::math::{Aabb, Vec3};
use crate::scene::HandleId;
use crate::slot::SlotData;

/// Cell key: `(x, y)`.
pub type CellKey = (i64, i64);

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GridInit {
    spacing: f64,
}

#[derive(Debug)]
struct Cell {
    handle: HandleId,
    anchor: Option<Vec3>,
}

/// Computed placement of every occupied cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridLayout {
    pub width: f64,
    pub depth: f64,
    pub anchors: BTreeMap<CellKey, Vec3>,
}

/// Lay out occupied cells, each given as the box of its content.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn layout(cells: &BTreeMap<CellKey, Aabb>, spacing: f64) -> GridLayout {
    let mut columns: BTreeMap<i64, f64> = BTreeMap::new();
    let mut rows: BTreeMap<i64, f64> = BTreeMap::new();
    for (&(x, y), bounds) in cells {
        let width = columns.entry(x).or_insert(0.0);
        *width = width.max(bounds.width());
        let depth = rows.entry(y).or_insert(0.0);
        *depth = depth.max(bounds.depth());
    }

    let band_total = |bands: &BTreeMap<i64, f64>| {
        if bands.is_empty() { 0.0 } else { bands.values().sum::<f64>() + spacing * (bands.len() - 1) as f64 }
    };
    let width = band_total(&columns);
    let depth = band_total(&rows);

    let band_starts = |bands: &BTreeMap<i64, f64>, total: f64| {
        let mut cursor = -total / 2.0;
        bands
            .iter()
            .map(|(&key, &size)| {
                let start = cursor;
                cursor += size + spacing;
                (key, start)
            })
            .collect::<BTreeMap<i64, f64>>()
    };
    let lefts = band_starts(&columns, width);
    let tops = band_starts(&rows, depth);

    let anchors = cells
        .iter()
        .map(|(&(x, y), bounds)| {
            let left = lefts.get(&x).copied().unwrap_or(0.0);
            let top = tops.get(&y).copied().unwrap_or(0.0);
            let column = columns.get(&x).copied().unwrap_or(0.0);
            let row = rows.get(&y).copied().unwrap_or(0.0);
            let anchor = Vec3::new(
                left + (column - bounds.width()) / 2.0 - bounds.min.x,
                0.0,
                top + (row - bounds.depth()) / 2.0 - bounds.min.z,
            );
            ((x, y), anchor)
        })
        .collect();

    GridLayout { width, depth, anchors }
}

#[derive(Debug)]
pub struct Grid {
    handle: HandleId,
    spacing: f64,
    cells: BTreeMap<CellKey, Cell>,
    width: f64,
    depth: f64,
}

fn cell_key(data: SlotData<'_>) -> Option<CellKey> {
    Some((data.x()?, data.y()?))
}

impl Grid {
    /// # Errors
    ///
    /// `InvalidInitData` if `spacing` is not a number.
    pub fn new(id: &str, init: &Value, stage: &mut Stage) -> Result<Self, ElementError> {
        let init: GridInit = parse_init(id, init)?;
        let handle = stage.scene.create_under("autoResizeContainer_v1", stage.scene.root());
        Ok(Self {
            handle,
            spacing: init.spacing,
            cells: BTreeMap::new(),
            width: 0.0,
            depth: 0.0,
        })
    }

    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Handle of the cell at `(x, y)`, created on first use.
    ///
    /// Slot data without integer `x`/`y` lands in cell `(0, 0)`.
    pub fn resolve_slot(&mut self, data: SlotData<'_>, stage: &mut Stage) -> HandleId {
        let key = cell_key(data).unwrap_or_else(|| {
            warn!(slot = %data.raw(), "grid slot data has no integer x/y; using cell (0, 0)");
            (0, 0)
        });
        let parent = self.handle;
        self.cells
            .entry(key)
            .or_insert_with(|| Cell { handle: stage.scene.create_under("autoResizeContainer_v1_cell", parent), anchor: None })
            .handle
    }

    #[must_use]
    pub fn cell(&self, x: i64, y: i64) -> Option<HandleId> {
        self.cells.get(&(x, y)).map(|c| c.handle)
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn dimensions(&self) -> Aabb {
        Aabb::new(Vec3::new(-self.width / 2.0, 0.0, -self.depth / 2.0), Vec3::new(self.width / 2.0, 0.0, self.depth / 2.0))
    }

    /// Prune vacated cells and re-centre the rest.
    pub fn on_bounds_invalidated(&mut self, children: &[ChildInfo], stage: &mut Stage) {
        let mut occupied: BTreeMap<CellKey, Aabb> = BTreeMap::new();
        for child in children {
            let key = cell_key(child.slot()).unwrap_or((0, 0));
            let bounds = occupied.entry(key).or_insert(Aabb::ZERO);
            *bounds = bounds.union(&child.dimensions);
        }

        self.cells.retain(|key, cell| {
            if occupied.contains_key(key) || !stage.scene.children(cell.handle).is_empty() {
                return true;
            }
            debug!(x = key.0, y = key.1, "pruning empty grid cell");
            stage.scene.remove(cell.handle);
            false
        });

        let computed = layout(&occupied, self.spacing);
        self.width = computed.width;
        self.depth = computed.depth;
        for (key, anchor) in computed.anchors {
            let Some(cell) = self.cells.get_mut(&key) else {
                continue;
            };
            if cell.anchor == Some(anchor) {
                continue;
            }
            cell.anchor = Some(anchor);
            let duration = stage.config.layout_tween_ms;
            stage.animator.start(&stage.scene, cell.handle, Target::Position(anchor), duration, Easing::QuinticOut);
        }
    }
}

//! `tableContainer`: the round table with a shared centre and one region
//! per player seat.
//!
//! DESIGN
//! ======
//! Children addressed `{type: "player", index}` sit in that seat's region;
//! everything else sits in the centre. Seat regions hang off a per-seat
//! rotation handle so a region only needs to be pushed out along `+z` and
//! then turned into place.
//!
//! Sizing, on every invalidation:
//!
//! 1. The centre box is re-centred on the table origin. Its half diagonal
//!    (at least `TABLE_MIN_CENTER_RADIUS`) is the first guess of the centre
//!    radius.
//! 2. With three or more filled seats, the centre radius grows until the
//!    widest region fits its arc: `max_width / (2 * tan(pi / filled))`.
//!    A margin is then added.
//! 3. The table radius is the centre radius plus the deepest region plus a
//!    margin, and never below `TABLE_MIN_RADIUS`.
//!
//! Filled seats are spread evenly around the table relative to the viewing
//! user so their own region always faces the camera. Empty seats are parked
//! below the table. Every adjustment animates, and only when its target
//! changed.

#[cfg(test)]
#[path = "table_test.rs"]
mod table_test;

use std::f64::consts::PI;

use tracing::{debug, warn};

use super::{ChildInfo, Stage};
use crate::animation::{Easing, Target};
use crate::consts::{TABLE_MARGIN, TABLE_MIN_CENTER_RADIUS, TABLE_MIN_RADIUS, TABLE_PARK_DEPTH};
use crate::math::{Aabb, Vec3};
use crate::scene::HandleId;
use crate::seating::seat_rotation_deg;
use crate::slot::SlotData;

#[derive(Debug)]
struct SeatRegion {
    /// Turns the region around the table's vertical axis.
    turn: HandleId,
    /// The region children are attached to.
    region: HandleId,
    anchor: Option<Vec3>,
    yaw: Option<f64>,
}

/// Result of sizing the table around its content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSize {
    pub center_radius: f64,
    pub table_radius: f64,
}

/// Size the table for a centre box and the boxes of the filled seats.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn table_size(center: &Aabb, seats: &[Aabb]) -> TableSize {
    let mut center_radius = TABLE_MIN_CENTER_RADIUS.max(center.half_diagonal_xz());
    let max_width = seats.iter().map(Aabb::width).fold(0.0, f64::max);
    let max_depth = seats
        .iter()
        .map(|b| (b.depth() + center_radius).hypot(b.width() / 2.0) - center_radius)
        .fold(0.0, f64::max);
    let filled = seats.len();
    if filled >= 3 {
        center_radius = center_radius.max(max_width / (2.0 * (PI / filled as f64).tan()));
    }
    center_radius += TABLE_MARGIN;
    let table_radius = TABLE_MIN_RADIUS.max(center_radius + max_depth + TABLE_MARGIN);
    TableSize { center_radius, table_radius }
}

#[derive(Debug)]
pub struct Table {
    handle: HandleId,
    plate: HandleId,
    center: HandleId,
    center_anchor: Option<Vec3>,
    seats: Vec<SeatRegion>,
    radius: f64,
    plate_radius: Option<f64>,
}

impl Table {
    pub fn new(stage: &mut Stage) -> Self {
        let handle = stage.scene.create_under("tableContainer", stage.scene.root());
        let plate = stage.scene.create_under("tablePlate", handle);
        // Unit disc scaled out to the table radius.
        stage.scene.set_bounds(plate, Aabb::new(Vec3::new(-1.0, -2.0, -1.0), Vec3::new(1.0, 0.0, 1.0)));
        stage.scene.set_scale(plate, Vec3::new(TABLE_MIN_RADIUS, 1.0, TABLE_MIN_RADIUS));
        let center = stage.scene.create_under("tableCenter", handle);
        let mut table = Self {
            handle,
            plate,
            center,
            center_anchor: None,
            seats: Vec::new(),
            radius: TABLE_MIN_RADIUS,
            plate_radius: Some(TABLE_MIN_RADIUS),
        };
        table.ensure_seats(stage);
        table
    }

    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    #[must_use]
    pub fn center(&self) -> HandleId {
        self.center
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Region handle of seat `index`, if the seat exists.
    #[must_use]
    pub fn seat_region(&self, index: usize) -> Option<HandleId> {
        self.seats.get(index).map(|s| s.region)
    }

    /// Rotation handle of seat `index`, if the seat exists.
    #[must_use]
    pub fn seat_turn(&self, index: usize) -> Option<HandleId> {
        self.seats.get(index).map(|s| s.turn)
    }

    #[must_use]
    pub fn dimensions(&self) -> Aabb {
        Aabb::footprint(self.radius * 2.0, 0.0, self.radius * 2.0)
    }

    /// Create region handles for seats that appeared since the last call.
    pub fn ensure_seats(&mut self, stage: &mut Stage) {
        while self.seats.len() < stage.seating.len() {
            let turn = stage.scene.create_under("playerRotationContainer", self.handle);
            let region = stage.scene.create_under("playerContainer", turn);
            stage.scene.set_position(region, Vec3::new(0.0, TABLE_PARK_DEPTH, self.radius));
            self.seats.push(SeatRegion { turn, region, anchor: None, yaw: None });
        }
    }

    /// The seat region for a player slot, the centre for anything else.
    pub fn resolve_slot(&mut self, data: SlotData<'_>, stage: &mut Stage) -> HandleId {
        self.ensure_seats(stage);
        match data.player_index() {
            Some(index) => self.seat_region(index).unwrap_or_else(|| {
                warn!(index, "table has no such seat; using the centre");
                self.center
            }),
            None => self.center,
        }
    }

    fn seat_of(&self, child: &ChildInfo) -> Option<usize> {
        child.slot().player_index().filter(|i| *i < self.seats.len())
    }

    pub fn on_bounds_invalidated(&mut self, children: &[ChildInfo], stage: &mut Stage) {
        self.ensure_seats(stage);

        let center_box = children
            .iter()
            .filter(|c| self.seat_of(c).is_none())
            .fold(Aabb::ZERO, |acc, c| acc.union(&c.dimensions));
        let center_anchor = Vec3::new(
            -center_box.width() / 2.0 - center_box.min.x,
            0.0,
            -center_box.depth() / 2.0 - center_box.min.z,
        );
        if self.center_anchor != Some(center_anchor) {
            self.center_anchor = Some(center_anchor);
            let duration = stage.config.layout_tween_ms;
            stage.animator.start(&stage.scene, self.center, Target::Position(center_anchor), duration, Easing::QuinticOut);
        }

        let seat_boxes: Vec<Option<Aabb>> = (0..self.seats.len())
            .map(|seat| {
                stage.seating.is_filled(seat).then(|| {
                    children
                        .iter()
                        .filter(|c| self.seat_of(c) == Some(seat))
                        .fold(Aabb::ZERO, |acc, c| acc.union(&c.dimensions))
                })
            })
            .collect();
        let filled_boxes: Vec<Aabb> = seat_boxes.iter().flatten().copied().collect();
        let size = table_size(&center_box, &filled_boxes);
        self.radius = size.table_radius;
        debug!(radius = self.radius, center_radius = size.center_radius, "table re-sized");

        let own_rank = stage.seating.own_rank();
        let filled = stage.seating.filled_count();
        let duration = stage.config.layout_tween_ms;
        for (index, (seat, seat_box)) in self.seats.iter_mut().zip(&seat_boxes).enumerate() {
            let anchor = match seat_box {
                None => Vec3::new(0.0, TABLE_PARK_DEPTH, self.radius),
                Some(b) => {
                    let half_width = b.width() / 2.0;
                    let reach = ((self.radius - TABLE_MARGIN).powi(2) - half_width.powi(2)).max(0.0).sqrt();
                    Vec3::new(-half_width - b.min.x, 0.0, reach - b.max.z)
                }
            };
            if seat.anchor != Some(anchor) {
                seat.anchor = Some(anchor);
                stage.animator.start(&stage.scene, seat.region, Target::Position(anchor), duration, Easing::QuinticOut);
            }

            let Some(rank) = stage.seating.rank(index) else {
                continue;
            };
            let yaw = -seat_rotation_deg(rank, own_rank, filled).to_radians();
            if seat.yaw != Some(yaw) {
                seat.yaw = Some(yaw);
                stage.animator.start(&stage.scene, seat.turn, Target::Yaw(yaw), duration, Easing::QuinticOut);
            }
        }

        if self.plate_radius != Some(self.radius) {
            self.plate_radius = Some(self.radius);
            let scale = Vec3::new(self.radius, 1.0, self.radius);
            stage.animator.start(&stage.scene, self.plate, Target::Scale(scale), duration, Easing::QuinticOut);
        }
    }
}

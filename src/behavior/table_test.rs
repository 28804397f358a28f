#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::behavior::test_stage;
use crate::seating::{Seat, Seating};

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn seated(stage: &mut Stage, seats: Vec<Seat>, own: &str) {
    stage.seating = Seating::new(seats, Some(own.into()));
}

fn settle(stage: &mut Stage) {
    stage.animator.advance(10_000.0, &mut stage.scene);
}

// =============================================================================
// table_size
// =============================================================================

#[test]
fn empty_table_keeps_minimum_radius() {
    let size = table_size(&Aabb::ZERO, &[]);
    assert_eq!(size.center_radius, TABLE_MIN_CENTER_RADIUS + TABLE_MARGIN);
    assert_eq!(size.table_radius, TABLE_MIN_RADIUS);
}

#[test]
fn seat_depth_pushes_the_rim_out() {
    let seat = Aabb::footprint(12.0, 1.0, 2.0);
    let size = table_size(&Aabb::ZERO, &[seat, seat, seat]);
    // The arc term (12 / (2 tan 60°) ~ 3.46) stays under the minimum centre radius.
    assert_eq!(size.center_radius, 10.0);
    let depth = 7.0_f64.hypot(6.0) - 5.0;
    assert!(approx_eq(size.table_radius, 10.0 + depth + TABLE_MARGIN));
}

#[test]
fn arc_term_needs_three_seats() {
    let wide = Aabb::footprint(30.0, 1.0, 1.0);
    assert_eq!(table_size(&Aabb::ZERO, &[wide, wide]).center_radius, 10.0);
    let three = table_size(&Aabb::ZERO, &[wide, wide, wide]);
    assert!(approx_eq(three.center_radius, 30.0 / (2.0 * (PI / 3.0).tan()) + TABLE_MARGIN));
}

#[test]
fn large_centre_grows_centre_radius() {
    let centre = Aabb::footprint(30.0, 1.0, 40.0);
    assert_eq!(table_size(&centre, &[]).center_radius, 25.0 + TABLE_MARGIN);
}

// =============================================================================
// Table behavior
// =============================================================================

#[test]
fn player_slots_resolve_to_seat_regions() {
    let mut stage = test_stage();
    seated(&mut stage, vec![Seat::taken_by("a"), Seat::taken_by("b")], "a");
    let mut table = Table::new(&mut stage);

    let seat = json!({"type": "player", "index": 1});
    assert_eq!(table.resolve_slot(SlotData::new(&seat), &mut stage), table.seat_region(1).unwrap());
    let missing = json!({"type": "player", "index": 5});
    assert_eq!(table.resolve_slot(SlotData::new(&missing), &mut stage), table.center());
    let centre = json!({"x": 1});
    assert_eq!(table.resolve_slot(SlotData::new(&centre), &mut stage), table.center());
}

#[test]
fn three_seats_turn_relative_to_viewer() {
    let mut stage = test_stage();
    seated(&mut stage, vec![Seat::taken_by("a"), Seat::taken_by("b"), Seat::taken_by("c")], "a");
    let mut table = Table::new(&mut stage);
    table.on_bounds_invalidated(&[], &mut stage);
    settle(&mut stage);

    for (seat, degrees) in [(0, 0.0_f64), (1, 120.0), (2, 240.0)] {
        let yaw = stage.scene.rotation(table.seat_turn(seat).unwrap()).unwrap().y;
        assert!(approx_eq(yaw, -degrees.to_radians()), "seat {seat}: {yaw}");
    }
}

#[test]
fn empty_seats_are_parked_below() {
    let mut stage = test_stage();
    seated(&mut stage, vec![Seat::taken_by("a"), Seat::default(), Seat::taken_by("b")], "b");
    let mut table = Table::new(&mut stage);
    table.on_bounds_invalidated(&[], &mut stage);
    settle(&mut stage);

    let parked = stage.scene.position(table.seat_region(1).unwrap()).unwrap();
    assert_eq!(parked.y, TABLE_PARK_DEPTH);
    let filled = stage.scene.position(table.seat_region(0).unwrap()).unwrap();
    assert_eq!(filled.y, 0.0);
    assert!(approx_eq(filled.z, table.radius() - TABLE_MARGIN));
    // Viewer sits in seat 2, so seat 0 is the other half of a two-seat table.
    let yaw = stage.scene.rotation(table.seat_turn(0).unwrap()).unwrap().y;
    assert!(approx_eq(yaw, -PI));
}

#[test]
fn centre_content_is_recentred() {
    let mut stage = test_stage();
    let mut table = Table::new(&mut stage);
    let child = ChildInfo::new(json!({}), Aabb::new(Vec3::ZERO, Vec3::new(4.0, 1.0, 2.0)));
    table.on_bounds_invalidated(&[child], &mut stage);
    settle(&mut stage);
    assert_eq!(stage.scene.position(table.center()), Some(Vec3::new(-2.0, 0.0, -1.0)));
}

#[test]
fn repeated_invalidation_is_quiet() {
    let mut stage = test_stage();
    seated(&mut stage, vec![Seat::taken_by("a"), Seat::taken_by("b")], "a");
    let mut table = Table::new(&mut stage);
    table.on_bounds_invalidated(&[], &mut stage);
    settle(&mut stage);
    assert!(stage.animator.is_empty());
    table.on_bounds_invalidated(&[], &mut stage);
    assert!(stage.animator.is_empty());
}

#[test]
fn seats_appear_with_seating() {
    let mut stage = test_stage();
    let mut table = Table::new(&mut stage);
    assert_eq!(table.seat_region(0), None);
    seated(&mut stage, vec![Seat::taken_by("a")], "a");
    table.ensure_seats(&mut stage);
    assert!(table.seat_region(0).is_some());
}

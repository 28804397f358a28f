#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::behavior::test_stage;

fn two_piles(stage: &mut Stage) -> Stack {
    Stack::new(
        "s",
        &json!({"stackElementRadius": 2, "positions": [{"index": 0, "x": 0, "y": 0}, {"index": 1, "x": 10, "y": -4}]}),
        stage,
    )
    .unwrap()
}

// =============================================================================
// balanced_rows
// =============================================================================

#[test]
fn three_places_make_two_rows() {
    assert_eq!(balanced_rows(3), vec![2, 1]);
}

#[test]
fn no_places_no_rows() {
    assert!(balanced_rows(0).is_empty());
    assert!(place_anchors(0, 1.0).is_empty());
}

#[test]
fn rows_form_a_single_peak() {
    for n in 1..=60 {
        let rows = balanced_rows(n);
        assert_eq!(rows.iter().sum::<usize>(), n, "sum for n={n}");
        let peak = rows.iter().enumerate().max_by_key(|(_, size)| **size).map_or(0, |(i, _)| i);
        assert!(rows[..=peak].windows(2).all(|w| w[0] <= w[1]), "rising edge for n={n}: {rows:?}");
        assert!(rows[peak..].windows(2).all(|w| w[0] >= w[1]), "falling edge for n={n}: {rows:?}");
        let spread = rows.iter().max().unwrap() - rows.iter().min().unwrap();
        assert!(spread <= 1, "bucket spread for n={n}: {rows:?}");
    }
}

#[test]
fn anchors_never_collide() {
    for n in 1..=40 {
        let anchors = place_anchors(n, 1.5);
        assert_eq!(anchors.len(), n);
        for (i, a) in anchors.iter().enumerate() {
            for b in &anchors[i + 1..] {
                assert!(!a.approx_eq(*b, 1e-9), "n={n} duplicates {a:?}");
            }
        }
    }
}

#[test]
fn three_anchors_are_centred() {
    let anchors = place_anchors(3, 2.0);
    assert_eq!(anchors, vec![Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0)]);
}

// =============================================================================
// Stack behavior
// =============================================================================

#[test]
fn resolve_reuses_a_vacant_place() {
    let mut stage = test_stage();
    let mut stack = two_piles(&mut stage);
    let slot = json!({"index": 0});
    let first = stack.resolve_slot(SlotData::new(&slot), &mut stage).unwrap();
    let again = stack.resolve_slot(SlotData::new(&slot), &mut stage).unwrap();
    assert_eq!(first, again);
    assert_eq!(stack.place_count(0), 1);

    let piece = stage.scene.create("piece");
    stage.scene.attach(piece, first);
    let second = stack.resolve_slot(SlotData::new(&slot), &mut stage).unwrap();
    assert_ne!(first, second);
    assert_eq!(stack.places(0), vec![first, second]);
}

#[test]
fn unknown_pile_is_unresolved() {
    let mut stage = test_stage();
    let mut stack = two_piles(&mut stage);
    let slot = json!({"index": 7});
    assert_eq!(stack.resolve_slot(SlotData::new(&slot), &mut stage), None);
    assert_eq!(stack.resolve_highlight(SlotData::new(&slot)), None);
    assert_eq!(stack.resolve_slot(SlotData::new(&json!({})), &mut stage), None);
}

#[test]
fn detach_prunes_and_rearranges() {
    let mut stage = test_stage();
    let mut stack = two_piles(&mut stage);
    let slot = json!({"index": 0});
    let mut places = Vec::new();
    for _ in 0..3 {
        let place = stack.resolve_slot(SlotData::new(&slot), &mut stage).unwrap();
        let piece = stage.scene.create("piece");
        stage.scene.attach(piece, place);
        places.push((place, piece));
    }
    stage.animator.advance(1_000.0, &mut stage.scene);
    assert_eq!(stage.scene.position(places[2].0), Some(Vec3::new(0.0, 0.0, 1.0)));

    stage.scene.remove(places[1].1);
    stack.on_child_detached(&mut stage);
    assert_eq!(stack.places(0), vec![places[0].0, places[2].0]);
    assert!(!stage.scene.contains(places[1].0));

    stage.animator.advance(1_000.0, &mut stage.scene);
    // Two places make two rows of one.
    assert_eq!(stage.scene.position(places[0].0), Some(Vec3::new(0.0, 0.0, -1.0)));
    assert_eq!(stage.scene.position(places[2].0), Some(Vec3::new(0.0, 0.0, 1.0)));
}

#[test]
fn highlight_sits_just_above_the_pile() {
    let mut stage = test_stage();
    let stack = two_piles(&mut stage);
    let highlight = stack.resolve_highlight(SlotData::new(&json!({"index": 1}))).unwrap();
    assert_eq!(stage.scene.world_position(highlight), Some(Vec3::new(10.0, HIGHLIGHT_LIFT, -4.0)));
    assert_eq!(stack.acceptance_radius(), 1.0);
}

#[test]
fn dimensions_cover_every_pile() {
    let mut stage = test_stage();
    let stack = two_piles(&mut stage);
    let dims = stack.dimensions();
    assert_eq!(dims.min, Vec3::new(-2.0, 0.0, -6.0));
    assert_eq!(dims.max, Vec3::new(12.0, 0.0, 2.0));
}

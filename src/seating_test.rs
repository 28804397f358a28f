#![allow(clippy::float_cmp)]

use super::*;

fn three_of_four() -> Seating {
    Seating::new(
        vec![Seat::taken_by("ann"), Seat::default(), Seat::taken_by("bob"), Seat::taken_by("cyd")],
        Some("bob".into()),
    )
}

#[test]
fn ranks_skip_empty_seats() {
    let seating = three_of_four();
    assert_eq!(seating.filled_count(), 3);
    assert_eq!(seating.rank(0), Some(0));
    assert_eq!(seating.rank(1), None);
    assert_eq!(seating.rank(2), Some(1));
    assert_eq!(seating.rank(3), Some(2));
    assert_eq!(seating.rank(9), None);
}

#[test]
fn own_rank_follows_user() {
    assert_eq!(three_of_four().own_rank(), 1);
}

#[test]
fn spectators_view_from_rank_zero() {
    let seating = Seating::new(vec![Seat::taken_by("ann")], Some("zed".into()));
    assert_eq!(seating.own_rank(), 0);
    assert_eq!(Seating::default().own_rank(), 0);
}

#[test]
fn three_players_seen_from_rank_zero() {
    let rotations: Vec<f64> = (0..3).map(|rank| seat_rotation_deg(rank, 0, 3)).collect();
    assert_eq!(rotations, vec![0.0, 120.0, 240.0]);
}

#[test]
fn viewer_seat_is_always_zero() {
    for own in 0..4 {
        assert_eq!(seat_rotation_deg(own, own, 4), 0.0);
    }
    assert_eq!(seat_rotation_deg(0, 1, 3), 240.0);
}

#[test]
fn no_filled_seats_means_no_rotation() {
    assert_eq!(seat_rotation_deg(0, 0, 0), 0.0);
}

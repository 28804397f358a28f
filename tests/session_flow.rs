//! End-to-end flows through the public session API: authority events in,
//! pointer input in, intents and scene state out.
#![allow(clippy::float_cmp)]

use std::collections::BTreeMap;

use serde_json::{Value, json};
use tabletop::behavior::ElementBehavior;
use tabletop::camera::Point;
use tabletop::consts::TABLE_PARK_DEPTH;
use tabletop::event::{Action, GameEvent, Intent};
use tabletop::interaction::{Button, InteractionState};
use tabletop::math::Vec3;
use tabletop::scene::HandleId;
use tabletop::seating::Seat;
use tabletop::{Session, SessionConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn session() -> Session {
    init_tracing();
    let mut session = Session::new(SessionConfig::default());
    session.set_viewport(1280.0, 720.0);
    session
}

fn add(session: &mut Session, id: &str, type_tag: &str, parent: Value, element: Value) -> HandleId {
    session
        .handle_event(&GameEvent::new("element.added", json!({"id": id, "type": type_tag, "parent": parent, "element": element})))
        .unwrap();
    session.element(id).unwrap().behavior.handle()
}

fn remove(session: &mut Session, id: &str) {
    session.handle_event(&GameEvent::new("element.removed", json!({"id": id}))).unwrap();
}

fn screen_point(session: &Session, handle: HandleId) -> Point {
    session.camera().world_to_screen(session.scene().world_bounds(handle).center()).unwrap()
}

fn angle_eq(a: f64, b: f64) -> bool {
    let d = (a - b).rem_euclid(std::f64::consts::TAU);
    d < 1e-9 || (std::f64::consts::TAU - d) < 1e-9
}

// =============================================================================
// Table seating
// =============================================================================

#[test]
fn three_players_are_spread_around_the_viewer() {
    let mut session = session();
    add(&mut session, "t", "tableContainer", Value::Null, json!({}));

    session.set_seating(
        vec![Seat::taken_by("ann"), Seat::taken_by("bo"), Seat::default(), Seat::taken_by("cy")],
        Some("bo".to_owned()),
    );
    session.tick(5_000.0);

    let table = session.element("t").unwrap().behavior.as_table().unwrap();
    let yaw = |seat: usize| session.scene().rotation(table.seat_turn(seat).unwrap()).unwrap().y;
    // bo is rank 1 of 3 filled seats: bo faces the camera, cy and ann follow.
    assert!(angle_eq(yaw(1), 0.0));
    assert!(angle_eq(yaw(3), -120f64.to_radians()));
    assert!(angle_eq(yaw(0), -240f64.to_radians()));
    // The empty seat is parked under the table.
    assert_eq!(session.scene().position(table.seat_region(2).unwrap()).unwrap().y, TABLE_PARK_DEPTH);
}

#[test]
fn player_content_lands_in_the_seat_region() {
    let mut session = session();
    add(&mut session, "t", "tableContainer", Value::Null, json!({}));
    session.set_seating(vec![Seat::taken_by("ann"), Seat::taken_by("bo")], Some("ann".to_owned()));

    let board = add(
        &mut session,
        "b",
        "board_v1",
        json!({"id": "t", "data": {"type": "player", "index": 1}}),
        json!({"width": 4, "height": 2}),
    );
    let centre = add(&mut session, "b0", "board_v1", json!({"id": "t", "data": {}}), json!({"width": 2, "height": 2}));

    let table = session.element("t").unwrap().behavior.as_table().unwrap();
    assert_eq!(session.scene().parent(board), table.seat_region(1));
    assert_eq!(session.scene().parent(centre), Some(table.center()));
    assert!(table.radius() >= 15.0);
}

// =============================================================================
// Stack arrangement
// =============================================================================

#[test]
fn stack_rows_peak_in_the_middle() {
    let mut session = session();
    add(
        &mut session,
        "s",
        "pieceContainer_v1",
        Value::Null,
        json!({"stackElementRadius": 1, "positions": [{"index": 0, "x": 0, "y": 0}]}),
    );
    for n in 0..7 {
        add(&mut session, &format!("p{n}"), "piece_v1", json!({"id": "s", "data": {"index": 0}}), json!({}));
    }
    session.tick(5_000.0);

    let ElementBehavior::Stack(stack) = &session.element("s").unwrap().behavior else {
        panic!("s is not a stack");
    };
    let places = stack.places(0);
    assert_eq!(places.len(), 7);
    let mut rows: BTreeMap<i64, usize> = BTreeMap::new();
    for place in places {
        #[allow(clippy::cast_possible_truncation)]
        let key = (session.scene().position(place).unwrap().z * 1000.0).round() as i64;
        *rows.entry(key).or_default() += 1;
    }
    let lengths: Vec<usize> = rows.into_values().collect();
    assert_eq!(lengths.iter().sum::<usize>(), 7);
    let peak = lengths.iter().enumerate().max_by_key(|(_, n)| **n).map(|(i, _)| i).unwrap();
    assert!(lengths[..=peak].windows(2).all(|w| w[0] <= w[1]), "{lengths:?}");
    assert!(lengths[peak..].windows(2).all(|w| w[0] >= w[1]), "{lengths:?}");

    remove(&mut session, "p3");
    let ElementBehavior::Stack(stack) = &session.element("s").unwrap().behavior else {
        panic!("s is not a stack");
    };
    assert_eq!(stack.place_count(0), 6);
}

// =============================================================================
// Grid layout
// =============================================================================

#[test]
fn grid_returns_to_its_size_after_add_and_remove() {
    let mut session = session();
    add(&mut session, "g", "autoResizeContainer_v1", Value::Null, json!({"spacing": 2}));
    add(&mut session, "b", "board_v1", json!({"id": "g", "data": {"x": 0, "y": 0}}), json!({"width": 4, "height": 2}));
    let before = session.element("g").unwrap().behavior.dimensions();

    add(&mut session, "b2", "board_v1", json!({"id": "g", "data": {"x": 1, "y": 0}}), json!({"width": 6, "height": 3}));
    let grown = session.element("g").unwrap().behavior.dimensions();
    assert_eq!(grown.width(), 4.0 + 2.0 + 6.0);
    assert_eq!(grown.depth(), 3.0);

    remove(&mut session, "b2");
    assert_eq!(session.element("g").unwrap().behavior.dimensions(), before);
}

// =============================================================================
// Selection, dragging and confirmation
// =============================================================================

/// A grid holding a deck in cell (0, 0) and a board in cell (1, 0), with a
/// card on the board that may move onto the deck's first slot.
fn deck_and_board() -> (Session, HandleId) {
    let mut session = session();
    add(&mut session, "g", "autoResizeContainer_v1", Value::Null, json!({"spacing": 2}));
    add(
        &mut session,
        "deck",
        "cardContainer_v1",
        json!({"id": "g", "data": {"x": 0, "y": 0}}),
        json!({"cardWidth": 2, "cardHeight": 3, "cardDepth": 0.02}),
    );
    add(&mut session, "b", "board_v1", json!({"id": "g", "data": {"x": 1, "y": 0}}), json!({"width": 4, "height": 4}));
    let card = add(
        &mut session,
        "c1",
        "card_v1",
        json!({"id": "b"}),
        json!({
            "width": 2, "height": 3, "depth": 0.02,
            "canBeMovedTo": [{"target": {"id": "deck", "data": {"position": 0, "index": 0}}, "rotations": [0]}],
        }),
    );
    session.tick(2_000.0);
    (session, card)
}

/// Drag `card` by whole world units along the table plane.
fn drag(session: &mut Session, card: HandleId, dx: f64, dz: f64) -> Vec<Action> {
    let step = session.config().drag_units_per_px;
    let mut actions = session.pointer_down(screen_point(session, card), Button::Primary);
    assert_eq!(session.state(), &InteractionState::ElementDrag { element: "c1".into(), moved: false });
    actions.extend(session.pointer_move(dx / step, dz / step));
    actions.extend(session.pointer_up());
    actions
}

fn deck_offset(session: &Session, card: HandleId) -> (f64, f64) {
    let deck = session.element("deck").unwrap().behavior.handle();
    let deck_at = session.scene().world_position(deck).unwrap();
    let slot = session.scene().parent(card).unwrap();
    let card_at = session.scene().world_position(slot).unwrap();
    (deck_at.x - card_at.x, deck_at.z - card_at.z)
}

#[test]
fn only_one_element_is_ever_selected() {
    let (mut session, card) = deck_and_board();
    assert_eq!(session.selected(), Some("c1"));

    let other = add(
        &mut session,
        "c2",
        "card_v1",
        json!({"id": "b"}),
        json!({"width": 2, "height": 3, "depth": 0.02, "canBeMovedTo": [{"target": {"id": "deck"}}]}),
    );
    assert_eq!(session.selected(), None);
    session.handle_event(&GameEvent::new("element.moved", json!({"id": "c2", "parent": {"id": "g", "data": {"x": 2, "y": 0}}})))
        .unwrap();
    session.tick(2_000.0);

    session.pointer_down(screen_point(&session, other), Button::Primary);
    session.pointer_up();
    assert_eq!(session.selected(), Some("c2"));
    assert!(session.highlighted().contains(&card));

    session.pointer_down(screen_point(&session, card), Button::Primary);
    session.pointer_up();
    assert_eq!(session.selected(), Some("c1"));
}

#[test]
fn a_missed_drop_keeps_the_parent() {
    let (mut session, card) = deck_and_board();

    let actions = drag(&mut session, card, 0.2, 0.0);

    assert_eq!(actions, vec![Action::CapturePointer, Action::ReleasePointer]);
    assert!(session.element("c1").unwrap().parent.is_in("b"));
    assert_eq!(session.state(), &InteractionState::Idle);
    session.tick(2_000.0);
    let position = session.scene().position(card).unwrap();
    assert!(Vec3::new(position.x, 0.0, position.z).length() < 1e-9);
}

#[test]
fn accepting_a_drop_sends_the_move() {
    let (mut session, card) = deck_and_board();
    let (dx, dz) = deck_offset(&session, card);

    let actions = drag(&mut session, card, dx, dz);

    assert_eq!(actions, vec![Action::CapturePointer, Action::ReleasePointer]);
    assert!(session.element("c1").unwrap().parent.is_in("deck"));
    let accept = session.element("c1").unwrap().behavior.as_token().unwrap().accept_handle();
    assert!(session.scene().is_shown(accept));

    session.tick(2_000.0);
    let actions = session.pointer_down(screen_point(&session, accept), Button::Primary);

    assert_eq!(
        actions,
        vec![Action::Intent(Intent::new("card.move", "c1", json!({"containerId": "deck", "position": 0, "index": 0})))]
    );
    assert!(!session.scene().is_shown(accept));

    // The authority confirms.
    session
        .handle_event(&GameEvent::new(
            "element.moved",
            json!({"id": "c1", "parent": {"id": "deck", "data": {"position": 0, "index": 0}}}),
        ))
        .unwrap();
    assert!(session.element("c1").unwrap().parent.is_in("deck"));
    assert_eq!(session.element("deck").unwrap().behavior.dimensions().width(), 2.0);
}

#[test]
fn declining_a_drop_returns_the_card() {
    let (mut session, card) = deck_and_board();
    let (dx, dz) = deck_offset(&session, card);
    drag(&mut session, card, dx, dz);
    session.tick(2_000.0);
    let decline = session.element("c1").unwrap().behavior.as_token().unwrap().decline_handle();

    let actions = session.pointer_down(screen_point(&session, decline), Button::Primary);

    assert!(actions.is_empty());
    assert!(session.element("c1").unwrap().parent.is_in("b"));
    assert!(session.element("c1").unwrap().behavior.as_token().unwrap().pending().is_none());
}

#[test]
fn destroy_ends_the_session() {
    let (mut session, card) = deck_and_board();
    session.pointer_down(screen_point(&session, card), Button::Primary);

    assert_eq!(session.destroy(), vec![Action::ReleasePointer]);
    assert!(session.handle_event(&GameEvent::new("element.removed", json!({"id": "c1"}))).is_err());
}

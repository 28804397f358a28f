#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::animation::Channel;
use crate::behavior::test_stage;
use crate::consts::BOARD_THICKNESS;
use crate::math::Aabb;

fn close(a: Vec3, b: Vec3) -> bool {
    a.distance(b) < 1e-9
}

fn card_init() -> Value {
    json!({"width": 2, "height": 3, "depth": 0.02})
}

fn deck_init() -> Value {
    json!({"cardWidth": 2, "cardHeight": 3, "cardDepth": 0.02})
}

fn board_target(registry: &ElementRegistry, id: &str) -> HandleId {
    match &registry.find_by_id(id).unwrap().behavior {
        ElementBehavior::Board(board) => board.target(),
        other => panic!("{id} is not a board: {other:?}"),
    }
}

fn handle_of(registry: &ElementRegistry, id: &str) -> HandleId {
    registry.find_by_id(id).unwrap().behavior.handle()
}

fn width_of(registry: &ElementRegistry, id: &str) -> f64 {
    registry.find_by_id(id).unwrap().behavior.dimensions().width()
}

// =============================================================================
// Factory
// =============================================================================

#[test]
fn default_factory_knows_every_builtin_type() {
    let factory = ElementFactory::with_defaults();
    for tag in [
        "board_v1",
        "autoResizeContainer_v1",
        "pieceContainer_v1",
        "tableContainer",
        "cardContainer_v1",
        "tileContainer_v1",
        "card_v1",
        "tile_v1",
        "piece_v1",
        "dice_v1",
        "button_v1",
    ] {
        assert!(factory.contains(tag), "{tag}");
    }
    assert!(!ElementFactory::new().contains("card_v1"));
}

#[test]
fn registered_constructor_is_used() {
    let mut factory = ElementFactory::new();
    factory.register("plate", |id, init, stage| Board::new(id, init, stage).map(ElementBehavior::Board));
    let mut stage = test_stage();
    let mut registry = ElementRegistry::new(factory);

    registry.add("p", "plate", SlotRef::root(), &json!({"width": 1, "height": 1}), &mut stage).unwrap();

    assert_eq!(registry.find_by_id("p").unwrap().type_tag, "plate");
    assert!(format!("{:?}", registry.factory()).contains("plate"));
}

// =============================================================================
// add
// =============================================================================

#[test]
fn unknown_type_is_rejected_and_nothing_is_added() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    let nodes = stage.scene.len();

    let err = registry.add("x", "hologram_v9", SlotRef::root(), &json!({}), &mut stage).unwrap_err();

    assert_eq!(err, ElementError::UnknownElementType { type_tag: "hologram_v9".into(), id: "x".into() });
    assert!(registry.is_empty());
    assert_eq!(stage.scene.len(), nodes);
}

#[test]
fn invalid_init_data_is_rejected() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();

    let err = registry.add("b", "board_v1", SlotRef::root(), &json!({"width": 4}), &mut stage).unwrap_err();

    assert!(matches!(err, ElementError::InvalidInitData { ref id, .. } if id == "b"));
    assert!(registry.is_empty());
}

#[test]
fn duplicate_id_is_rejected() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    registry.add("c1", "card_v1", SlotRef::root(), &card_init(), &mut stage).unwrap();

    let err = registry.add("c1", "card_v1", SlotRef::root(), &card_init(), &mut stage).unwrap_err();

    assert_eq!(err, ElementError::DuplicateElement { id: "c1".into() });
    assert_eq!(registry.len(), 1);
}

#[test]
fn removed_ids_are_never_reused() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    registry.add("c1", "card_v1", SlotRef::root(), &card_init(), &mut stage).unwrap();
    registry.remove("c1", &mut stage).unwrap();

    let err = registry.add("c1", "card_v1", SlotRef::root(), &card_init(), &mut stage).unwrap_err();

    assert_eq!(err, ElementError::DuplicateElement { id: "c1".into() });
    assert!(registry.is_empty());
}

#[test]
fn added_element_sits_at_its_slot_origin() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    registry.add("b", "board_v1", SlotRef::root(), &json!({"width": 4, "height": 4}), &mut stage).unwrap();

    let handle =
        registry.add("c1", "card_v1", SlotRef::new("b", json!({})), &card_init(), &mut stage).unwrap();

    assert_eq!(stage.scene.parent(handle), Some(board_target(&registry, "b")));
    assert_eq!(stage.scene.position(handle), Some(Vec3::ZERO));
    assert!(!stage.animator.is_animating(handle, Channel::Position));
}

#[test]
fn dangling_parent_falls_back_to_root() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();

    let handle =
        registry.add("c1", "card_v1", SlotRef::new("ghost", json!({})), &card_init(), &mut stage).unwrap();

    assert_eq!(stage.scene.parent(handle), Some(stage.scene.root()));
    assert_eq!(registry.find_by_id("c1").unwrap().parent.container(), Some("ghost"));
}

#[test]
fn element_addressed_to_itself_falls_back_to_root() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();

    let handle =
        registry.add("c1", "card_v1", SlotRef::new("c1", json!({})), &card_init(), &mut stage).unwrap();

    assert_eq!(stage.scene.parent(handle), Some(stage.scene.root()));
}

#[test]
fn slot_a_container_cannot_host_falls_back_to_root() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    registry.add("d", "dice_v1", SlotRef::root(), &json!({}), &mut stage).unwrap();

    let handle = registry.add("c1", "card_v1", SlotRef::new("d", json!({})), &card_init(), &mut stage).unwrap();

    assert_eq!(stage.scene.parent(handle), Some(stage.scene.root()));
}

#[test]
fn late_container_adopts_its_waiting_children() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    let card = registry.add("c1", "card_v1", SlotRef::new("b", json!({})), &card_init(), &mut stage).unwrap();
    assert_eq!(stage.scene.parent(card), Some(stage.scene.root()));

    registry.add("b", "board_v1", SlotRef::root(), &json!({"width": 4, "height": 4}), &mut stage).unwrap();

    assert_eq!(stage.scene.parent(card), Some(board_target(&registry, "b")));
    stage.animator.advance(10_000.0, &mut stage.scene);
    assert!(close(stage.scene.position(card).unwrap(), Vec3::ZERO));
}

// =============================================================================
// Lookup
// =============================================================================

#[test]
fn find_by_handle_walks_up_to_the_owning_element() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    registry.add("c1", "card_v1", SlotRef::root(), &card_init(), &mut stage).unwrap();
    let body = registry.find_by_id("c1").unwrap().behavior.as_token().unwrap().body();

    assert_eq!(registry.find_by_handle(&stage.scene, body).map(|e| e.id.as_str()), Some("c1"));
    assert!(registry.find_by_handle(&stage.scene, stage.scene.root()).is_none());
}

#[test]
fn children_are_derived_from_parent_fields() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    registry.add("deck", "cardContainer_v1", SlotRef::root(), &deck_init(), &mut stage).unwrap();
    registry
        .add("c1", "card_v1", SlotRef::new("deck", json!({"position": 0, "index": 0})), &card_init(), &mut stage)
        .unwrap();
    registry
        .add("c2", "card_v1", SlotRef::new("deck", json!({"position": 1, "index": 0})), &card_init(), &mut stage)
        .unwrap();
    registry.add("c3", "card_v1", SlotRef::root(), &card_init(), &mut stage).unwrap();

    let children = registry.children_of("deck");

    assert_eq!(children.len(), 2);
    assert_eq!(children[1].slot().position(), Some(1));
    assert_eq!(children[0].dimensions, Aabb::footprint(2.0, 0.02, 3.0));
    assert!(registry.children_of("c3").is_empty());
}

// =============================================================================
// move_element
// =============================================================================

#[test]
fn move_keeps_world_position_then_tweens_home() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    let board =
        registry.add("b", "board_v1", SlotRef::root(), &json!({"width": 4, "height": 4}), &mut stage).unwrap();
    stage.scene.set_position(board, Vec3::new(5.0, 0.0, 0.0));
    let card = registry.add("c1", "card_v1", SlotRef::root(), &card_init(), &mut stage).unwrap();

    assert!(registry.move_element("c1", SlotRef::new("b", json!({})), &mut stage));

    assert_eq!(stage.scene.parent(card), Some(board_target(&registry, "b")));
    assert!(close(stage.scene.world_position(card).unwrap(), Vec3::ZERO));
    assert!(stage.animator.is_animating(card, Channel::Position));
    assert!(registry.find_by_id("c1").unwrap().parent.is_in("b"));

    stage.animator.advance(10_000.0, &mut stage.scene);
    assert!(close(stage.scene.world_position(card).unwrap(), Vec3::new(5.0, BOARD_THICKNESS, 0.0)));
}

#[test]
fn move_to_the_current_slot_only_animates_back() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    let card = registry.add("c1", "card_v1", SlotRef::root(), &card_init(), &mut stage).unwrap();
    stage.scene.set_position(card, Vec3::new(3.0, 0.0, 1.0));

    assert!(registry.move_element("c1", SlotRef::root(), &mut stage));

    assert_eq!(stage.scene.parent(card), Some(stage.scene.root()));
    assert!(stage.animator.is_animating(card, Channel::Position));
    stage.animator.advance(10_000.0, &mut stage.scene);
    assert_eq!(stage.scene.position(card), Some(Vec3::ZERO));
}

#[test]
fn move_of_unknown_element_is_ignored() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    assert!(!registry.move_element("nobody", SlotRef::root(), &mut stage));
}

#[test]
fn leaving_a_stack_prunes_its_place() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    let init = json!({"stackElementRadius": 1, "positions": [{"index": 0, "x": 0, "y": 0}]});
    registry.add("s", "pieceContainer_v1", SlotRef::root(), &init, &mut stage).unwrap();
    registry.add("p1", "piece_v1", SlotRef::new("s", json!({"index": 0})), &json!({}), &mut stage).unwrap();
    let places = |registry: &ElementRegistry| match &registry.find_by_id("s").unwrap().behavior {
        ElementBehavior::Stack(stack) => stack.place_count(0),
        other => panic!("not a stack: {other:?}"),
    };
    assert_eq!(places(&registry), 1);

    registry.move_element("p1", SlotRef::root(), &mut stage);

    assert_eq!(places(&registry), 0);
}

// =============================================================================
// remove
// =============================================================================

#[test]
fn remove_drops_handles_and_registrations() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    let init = json!({"width": 2, "height": 3, "depth": 0.02, "canBeMovedTo": [{"target": {"id": "x"}}]});
    let card = registry.add("c1", "card_v1", SlotRef::root(), &init, &mut stage).unwrap();
    assert!(stage.targets.is_moveable(card));

    let removed = registry.remove("c1", &mut stage).unwrap();

    assert_eq!(removed.id, "c1");
    assert!(!stage.scene.contains(card));
    assert!(!stage.targets.is_moveable(card));
    assert!(!stage.targets.is_selectable(card));
    assert!(registry.remove("c1", &mut stage).is_none());
}

#[test]
fn removing_a_container_rehomes_its_children_in_place() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    let board =
        registry.add("b", "board_v1", SlotRef::root(), &json!({"width": 4, "height": 4}), &mut stage).unwrap();
    stage.scene.set_position(board, Vec3::new(5.0, 0.0, 0.0));
    let card = registry.add("c1", "card_v1", SlotRef::new("b", json!({})), &card_init(), &mut stage).unwrap();

    registry.remove("b", &mut stage);

    assert!(!stage.scene.contains(board));
    assert_eq!(stage.scene.parent(card), Some(stage.scene.root()));
    assert!(close(stage.scene.world_position(card).unwrap(), Vec3::new(5.0, BOARD_THICKNESS, 0.0)));
    assert!(registry.find_by_id("c1").is_some());
}

// =============================================================================
// Layout cascade
// =============================================================================

#[test]
fn adding_a_card_grows_every_enclosing_container() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    registry.add("g", "autoResizeContainer_v1", SlotRef::root(), &json!({"spacing": 2}), &mut stage).unwrap();
    registry.add("deck", "cardContainer_v1", SlotRef::new("g", json!({"x": 0, "y": 0})), &deck_init(), &mut stage).unwrap();
    assert_eq!(width_of(&registry, "g"), 0.0);

    registry
        .add("c1", "card_v1", SlotRef::new("deck", json!({"position": 0, "index": 0})), &card_init(), &mut stage)
        .unwrap();

    assert_eq!(width_of(&registry, "deck"), 2.0);
    assert_eq!(width_of(&registry, "g"), 2.0);
    assert_eq!(registry.find_by_id("g").unwrap().behavior.dimensions().depth(), 3.0);
}

#[test]
fn grid_bands_include_spacing_between_cells() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    registry.add("g", "autoResizeContainer_v1", SlotRef::root(), &json!({"spacing": 2}), &mut stage).unwrap();
    registry.add("deck", "cardContainer_v1", SlotRef::new("g", json!({"x": 0, "y": 0})), &deck_init(), &mut stage).unwrap();
    registry
        .add("c1", "card_v1", SlotRef::new("deck", json!({"position": 0, "index": 0})), &card_init(), &mut stage)
        .unwrap();

    registry
        .add("b", "board_v1", SlotRef::new("g", json!({"x": 1, "y": 0})), &json!({"width": 4, "height": 2}), &mut stage)
        .unwrap();

    assert_eq!(width_of(&registry, "g"), 2.0 + 2.0 + 4.0);
}

#[test]
fn add_then_remove_restores_grid_bounds() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    registry.add("g", "autoResizeContainer_v1", SlotRef::root(), &json!({"spacing": 1}), &mut stage).unwrap();
    registry
        .add("b", "board_v1", SlotRef::new("g", json!({"x": 0, "y": 0})), &json!({"width": 4, "height": 2}), &mut stage)
        .unwrap();
    let before = registry.find_by_id("g").unwrap().behavior.dimensions();

    registry
        .add("b2", "board_v1", SlotRef::new("g", json!({"x": 1, "y": 1})), &json!({"width": 6, "height": 6}), &mut stage)
        .unwrap();
    assert_ne!(registry.find_by_id("g").unwrap().behavior.dimensions(), before);
    registry.remove("b2", &mut stage);

    assert_eq!(registry.find_by_id("g").unwrap().behavior.dimensions(), before);
}

#[test]
fn moving_between_grid_cells_relays_out_both() {
    let mut stage = test_stage();
    let mut registry = ElementRegistry::default();
    registry.add("g", "autoResizeContainer_v1", SlotRef::root(), &json!({"spacing": 1}), &mut stage).unwrap();
    registry
        .add("b", "board_v1", SlotRef::new("g", json!({"x": 0, "y": 0})), &json!({"width": 4, "height": 2}), &mut stage)
        .unwrap();
    registry
        .add("b2", "board_v1", SlotRef::new("g", json!({"x": 1, "y": 0})), &json!({"width": 2, "height": 2}), &mut stage)
        .unwrap();
    assert_eq!(width_of(&registry, "g"), 7.0);

    registry.move_element("b2", SlotRef::new("g", json!({"x": 0, "y": 0})), &mut stage);

    assert_eq!(width_of(&registry, "g"), 4.0);
}

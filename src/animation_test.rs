#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn scene_with_node() -> (SceneGraph, HandleId) {
    let mut scene = SceneGraph::new();
    let root = scene.root();
    let h = scene.create_under("node", root);
    (scene, h)
}

// =============================================================
// Easing
// =============================================================

#[test]
fn easing_endpoints_are_fixed() {
    for easing in [Easing::Linear, Easing::QuinticOut, Easing::QuadraticInOut] {
        assert!(approx_eq(easing.apply(0.0), 0.0));
        assert!(approx_eq(easing.apply(1.0), 1.0));
    }
}

#[test]
fn quintic_out_front_loads_progress() {
    assert!(Easing::QuinticOut.apply(0.5) > 0.9);
    assert!(approx_eq(Easing::QuadraticInOut.apply(0.5), 0.5));
}

// =============================================================
// Single tweens
// =============================================================

#[test]
fn linear_tween_reaches_midpoint_and_target() {
    let (mut scene, h) = scene_with_node();
    let mut animator = Animator::new();
    animator.start(&scene, h, Target::Position(Vec3::new(10.0, 0.0, 0.0)), 100.0, Easing::Linear);

    animator.advance(50.0, &mut scene);
    assert!(approx_eq(scene.position(h).unwrap().x, 5.0));
    assert!(animator.is_animating(h, Channel::Position));

    animator.advance(60.0, &mut scene);
    assert_eq!(scene.position(h).unwrap().x, 10.0);
    assert!(animator.is_empty());
}

#[test]
fn lift_touches_only_y() {
    let (mut scene, h) = scene_with_node();
    scene.set_position(h, Vec3::new(3.0, 0.0, 4.0));
    let mut animator = Animator::new();
    animator.start(&scene, h, Target::Lift(2.0), 10.0, Easing::Linear);
    animator.advance(10.0, &mut scene);
    assert_eq!(scene.position(h).unwrap(), Vec3::new(3.0, 2.0, 4.0));
}

#[test]
fn starting_again_replaces_running_tween() {
    let (mut scene, h) = scene_with_node();
    let mut animator = Animator::new();
    animator.start(&scene, h, Target::Yaw(1.0), 100.0, Easing::Linear);
    animator.start(&scene, h, Target::Yaw(2.0), 100.0, Easing::Linear);
    assert_eq!(animator.len(), 1);
    animator.advance(100.0, &mut scene);
    assert_eq!(scene.rotation(h).unwrap().y, 2.0);
}

#[test]
fn different_channels_run_side_by_side() {
    let (scene, h) = scene_with_node();
    let mut animator = Animator::new();
    animator.start(&scene, h, Target::Yaw(1.0), 100.0, Easing::Linear);
    animator.start(&scene, h, Target::Pitch(1.0), 100.0, Easing::Linear);
    assert_eq!(animator.len(), 2);
    animator.stop_all(h);
    assert!(animator.is_empty());
}

#[test]
fn zero_duration_snaps() {
    let (mut scene, h) = scene_with_node();
    let mut animator = Animator::new();
    animator.start(&scene, h, Target::Scale(Vec3::new(2.0, 1.0, 2.0)), 0.0, Easing::QuinticOut);
    animator.advance(0.0, &mut scene);
    assert_eq!(scene.get(h).unwrap().scale, Vec3::new(2.0, 1.0, 2.0));
    assert!(animator.is_empty());
}

#[test]
fn missing_handles_are_ignored_and_dropped() {
    let (mut scene, h) = scene_with_node();
    let mut animator = Animator::new();
    animator.start(&scene, Uuid::new_v4(), Target::Lift(1.0), 10.0, Easing::Linear);
    assert!(animator.is_empty());

    animator.start(&scene, h, Target::Lift(1.0), 10.0, Easing::Linear);
    scene.remove(h);
    animator.advance(5.0, &mut scene);
    assert!(animator.is_empty());
}

// =============================================================
// Yoyo
// =============================================================

#[test]
fn endless_yoyo_swings_back() {
    let (mut scene, h) = scene_with_node();
    scene.set_position(h, Vec3::new(0.0, 1.0, 0.0));
    let mut animator = Animator::new();
    animator.start_with(&scene, h, Target::Lift(1.5), 250.0, Easing::Linear, Repeat::Yoyo { legs: None });

    animator.advance(250.0, &mut scene);
    assert!(approx_eq(scene.position(h).unwrap().y, 1.5));
    animator.advance(125.0, &mut scene);
    assert!(approx_eq(scene.position(h).unwrap().y, 1.25));
    animator.advance(10_000.0, &mut scene);
    assert!(animator.is_animating(h, Channel::Lift));
}

#[test]
fn bounded_yoyo_ends_at_start() {
    let (mut scene, h) = scene_with_node();
    let mut animator = Animator::new();
    animator.start_with(&scene, h, Target::Lift(1.0), 100.0, Easing::Linear, Repeat::Yoyo { legs: Some(2) });
    animator.advance(100.0, &mut scene);
    animator.advance(100.0, &mut scene);
    assert!(animator.is_empty());
    assert_eq!(scene.position(h).unwrap().y, 0.0);
}

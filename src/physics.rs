//! Rigid-body collaborator for physics-backed elements (dice).
//!
//! The session owns one [`PhysicsWorld`] behind a trait object so a host can
//! plug a real engine in. [`SimplePhysics`] is the built-in world: cubes fall
//! onto the table plane, bounce with restitution, spin down, and settle on
//! the nearest quarter turn.

#[cfg(test)]
#[path = "physics_test.rs"]
mod physics_test;

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

use rand::Rng;

use crate::consts::{PHYSICS_GRAVITY, PHYSICS_PREDICT_MAX_STEPS, PHYSICS_RESTITUTION};
use crate::math::Vec3;
use crate::scene::HandleId;

/// Pose of a simulated body in its handle's parent frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyPose {
    pub position: Vec3,
    pub rotation: Vec3,
}

/// Simulated world stepped by the session's update loop.
pub trait PhysicsWorld {
    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f64);

    /// Start simulating a cube of edge `size` for `handle`.
    fn attach_body(&mut self, handle: HandleId, pose: BodyPose, size: f64);

    /// Stop simulating `handle`'s body.
    fn detach_body(&mut self, handle: HandleId);

    /// Current pose of `handle`'s body.
    fn body_pose(&self, handle: HandleId) -> Option<BodyPose>;

    /// Throw the body straight up with `velocity` and a random spin of up
    /// to `spin / 2` radians per second about each axis.
    fn throw_body(&mut self, handle: HandleId, velocity: f64, spin: f64);

    /// Whether the body has come to rest.
    fn is_settled(&self, handle: HandleId) -> bool;

    /// Pose the body will come to rest in when stepped by `dt`, if the
    /// world can tell ahead of time.
    fn predict_rest(&self, _handle: HandleId, _dt: f64) -> Option<BodyPose> {
        None
    }

    /// Drop every body.
    fn clear(&mut self);
}

#[derive(Debug, Clone)]
struct Body {
    pose: BodyPose,
    velocity: Vec3,
    spin: Vec3,
    half_size: f64,
    settled: bool,
}

/// Minimal world: gravity, a table plane at `y = 0`, and damping.
#[derive(Debug)]
pub struct SimplePhysics {
    bodies: HashMap<HandleId, Body>,
    gravity: f64,
    restitution: f64,
}

impl Default for SimplePhysics {
    fn default() -> Self {
        Self::new(PHYSICS_GRAVITY)
    }
}

const SETTLE_SPEED: f64 = 1.0;
const CONTACT_DAMPING: f64 = 0.8;

fn snap_quarter(angle: f64) -> f64 {
    (angle / FRAC_PI_2).round() * FRAC_PI_2
}

fn advance(body: &mut Body, gravity: f64, restitution: f64, dt: f64) {
    if body.settled {
        return;
    }
    body.velocity.y += gravity * dt;
    body.pose.position += body.velocity * dt;
    body.pose.rotation += body.spin * dt;

    if body.pose.position.y <= body.half_size {
        // A body resting on the plane still gains one step of
        // gravity per frame; impacts that small mean rest.
        let impact = body.velocity.y.abs();
        body.pose.position.y = body.half_size;
        body.velocity.y = impact * restitution;
        body.velocity.x *= CONTACT_DAMPING;
        body.velocity.z *= CONTACT_DAMPING;
        body.spin = body.spin * CONTACT_DAMPING;

        if impact < (2.0 * gravity.abs() * dt).max(SETTLE_SPEED) {
            body.velocity = Vec3::ZERO;
            body.spin = Vec3::ZERO;
            let r = body.pose.rotation;
            body.pose.rotation = Vec3::new(snap_quarter(r.x), snap_quarter(r.y), snap_quarter(r.z));
            body.settled = true;
        }
    }
}

impl SimplePhysics {
    #[must_use]
    pub fn new(gravity: f64) -> Self {
        Self { bodies: HashMap::new(), gravity, restitution: PHYSICS_RESTITUTION }
    }

    /// Number of simulated bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl PhysicsWorld for SimplePhysics {
    fn step(&mut self, dt: f64) {
        for body in self.bodies.values_mut() {
            advance(body, self.gravity, self.restitution, dt);
        }
    }

    fn attach_body(&mut self, handle: HandleId, pose: BodyPose, size: f64) {
        let half_size = size / 2.0;
        let settled = pose.position.y <= half_size;
        let mut pose = pose;
        pose.position.y = pose.position.y.max(half_size);
        self.bodies.insert(handle, Body { pose, velocity: Vec3::ZERO, spin: Vec3::ZERO, half_size, settled });
    }

    fn detach_body(&mut self, handle: HandleId) {
        self.bodies.remove(&handle);
    }

    fn body_pose(&self, handle: HandleId) -> Option<BodyPose> {
        self.bodies.get(&handle).map(|b| b.pose)
    }

    fn throw_body(&mut self, handle: HandleId, velocity: f64, spin: f64) {
        let Some(body) = self.bodies.get_mut(&handle) else {
            return;
        };
        let mut rng = rand::rng();
        let half = spin / 2.0;
        let mut axis = || if half > 0.0 { rng.random_range(-half..half) } else { 0.0 };
        body.pose.position.x = 0.0;
        body.pose.position.z = 0.0;
        body.velocity = Vec3::new(0.0, velocity, 0.0);
        body.spin = Vec3::new(axis(), axis(), axis());
        body.settled = false;
    }

    fn is_settled(&self, handle: HandleId) -> bool {
        self.bodies.get(&handle).is_some_and(|b| b.settled)
    }

    fn predict_rest(&self, handle: HandleId, dt: f64) -> Option<BodyPose> {
        let mut body = self.bodies.get(&handle)?.clone();
        if dt <= 0.0 {
            return body.settled.then_some(body.pose);
        }
        for _ in 0..PHYSICS_PREDICT_MAX_STEPS {
            if body.settled {
                return Some(body.pose);
            }
            advance(&mut body, self.gravity, self.restitution, dt);
        }
        body.settled.then_some(body.pose)
    }

    fn clear(&mut self) {
        self.bodies.clear();
    }
}

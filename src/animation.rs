//! Tween engine driving every visual transition in the scene.
//!
//! A tween animates one *channel* of one handle (its position, its lift, its
//! yaw, ...) from the value it had when the tween started to a target value.
//! At most one tween runs per `(handle, channel)` pair: starting a new one
//! replaces whatever was running there. Logical state never waits on a tween.

#[cfg(test)]
#[path = "animation_test.rs"]
mod animation_test;

use crate::math::Vec3;
use crate::scene::{HandleId, Node, SceneGraph};

/// The animated property of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Full local position.
    Position,
    /// Local `y` only.
    Lift,
    /// Rotation about the vertical axis.
    Yaw,
    /// Rotation about the `x` axis (card and tile flips).
    Pitch,
    /// Scale of the handle's own bounds.
    Scale,
}

/// Target value of a tween. The variant picks the channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Position(Vec3),
    Lift(f64),
    Yaw(f64),
    Pitch(f64),
    Scale(Vec3),
}

impl Target {
    #[must_use]
    pub fn channel(self) -> Channel {
        match self {
            Self::Position(_) => Channel::Position,
            Self::Lift(_) => Channel::Lift,
            Self::Yaw(_) => Channel::Yaw,
            Self::Pitch(_) => Channel::Pitch,
            Self::Scale(_) => Channel::Scale,
        }
    }

    fn value(self) -> Vec3 {
        match self {
            Self::Position(v) | Self::Scale(v) => v,
            Self::Lift(y) => Vec3::new(0.0, y, 0.0),
            Self::Yaw(a) => Vec3::new(0.0, a, 0.0),
            Self::Pitch(a) => Vec3::new(a, 0.0, 0.0),
        }
    }
}

/// Easing curve applied to normalized tween progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    /// Fast start, long gentle landing. Used for reparents and layout.
    #[default]
    QuinticOut,
    /// Smooth at both ends. Used for the selection bounce.
    QuadraticInOut,
}

impl Easing {
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuinticOut => 1.0 - (1.0 - t).powi(5),
            Self::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// How a tween behaves when it reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    /// Finish and disappear.
    #[default]
    Once,
    /// Swing back and forth. `None` swings until stopped.
    Yoyo { legs: Option<u32> },
}

#[derive(Debug, Clone)]
struct Tween {
    handle: HandleId,
    channel: Channel,
    from: Vec3,
    to: Vec3,
    duration_ms: f64,
    elapsed_ms: f64,
    easing: Easing,
    repeat: Repeat,
}

fn read(node: &Node, channel: Channel) -> Vec3 {
    match channel {
        Channel::Position => node.position,
        Channel::Lift => Vec3::new(0.0, node.position.y, 0.0),
        Channel::Yaw => Vec3::new(0.0, node.rotation.y, 0.0),
        Channel::Pitch => Vec3::new(node.rotation.x, 0.0, 0.0),
        Channel::Scale => node.scale,
    }
}

fn write(node: &mut Node, channel: Channel, value: Vec3) {
    match channel {
        Channel::Position => node.position = value,
        Channel::Lift => node.position.y = value.y,
        Channel::Yaw => node.rotation.y = value.y,
        Channel::Pitch => node.rotation.x = value.x,
        Channel::Scale => node.scale = value,
    }
}

/// Owns every in-flight tween of a session.
#[derive(Debug, Default)]
pub struct Animator {
    tweens: Vec<Tween>,
}

impl Animator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tween `handle` from its current value to `target` once.
    pub fn start(&mut self, scene: &SceneGraph, handle: HandleId, target: Target, duration_ms: f64, easing: Easing) {
        self.start_with(scene, handle, target, duration_ms, easing, Repeat::Once);
    }

    /// Tween `handle` from its current value to `target` with a repeat mode.
    ///
    /// Cancels any tween already running on the same handle and channel.
    /// Does nothing if the handle does not exist.
    pub fn start_with(
        &mut self,
        scene: &SceneGraph,
        handle: HandleId,
        target: Target,
        duration_ms: f64,
        easing: Easing,
        repeat: Repeat,
    ) {
        let channel = target.channel();
        self.stop(handle, channel);
        let Some(node) = scene.get(handle) else {
            return;
        };
        self.tweens.push(Tween {
            handle,
            channel,
            from: read(node, channel),
            to: target.value(),
            duration_ms: duration_ms.max(0.0),
            elapsed_ms: 0.0,
            easing,
            repeat,
        });
    }

    /// Stop the tween on `(handle, channel)`, leaving the value where it is.
    pub fn stop(&mut self, handle: HandleId, channel: Channel) {
        self.tweens.retain(|t| !(t.handle == handle && t.channel == channel));
    }

    /// Stop every tween on `handle`.
    pub fn stop_all(&mut self, handle: HandleId) {
        self.tweens.retain(|t| t.handle != handle);
    }

    /// Stop everything.
    pub fn clear(&mut self) {
        self.tweens.clear();
    }

    #[must_use]
    pub fn is_animating(&self, handle: HandleId, channel: Channel) -> bool {
        self.tweens.iter().any(|t| t.handle == handle && t.channel == channel)
    }

    /// Number of tweens in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Advance every tween by `dt_ms` and write the new values into `scene`.
    ///
    /// Tweens whose handle has disappeared are dropped silently.
    pub fn advance(&mut self, dt_ms: f64, scene: &mut SceneGraph) {
        let dt_ms = dt_ms.max(0.0);
        self.tweens.retain_mut(|tween| {
            let Some(node) = scene.get_mut(tween.handle) else {
                return false;
            };
            tween.elapsed_ms += dt_ms;
            if tween.duration_ms <= 0.0 || tween.elapsed_ms < tween.duration_ms {
                let t = if tween.duration_ms <= 0.0 { 1.0 } else { tween.elapsed_ms / tween.duration_ms };
                write(node, tween.channel, tween.from.lerp(tween.to, tween.easing.apply(t)));
                return tween.duration_ms > 0.0;
            }
            match tween.repeat {
                Repeat::Once => {
                    write(node, tween.channel, tween.to);
                    false
                }
                Repeat::Yoyo { legs } => {
                    let remaining = legs.map(|n| n.saturating_sub(1));
                    if remaining == Some(0) {
                        write(node, tween.channel, tween.to);
                        return false;
                    }
                    tween.elapsed_ms = (tween.elapsed_ms - tween.duration_ms).min(tween.duration_ms);
                    std::mem::swap(&mut tween.from, &mut tween.to);
                    tween.repeat = Repeat::Yoyo { legs: remaining };
                    let t = tween.elapsed_ms / tween.duration_ms;
                    write(node, tween.channel, tween.from.lerp(tween.to, tween.easing.apply(t)));
                    true
                }
            }
        });
    }
}

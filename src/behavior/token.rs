//! Draggable game tokens: `card_v1`, `tile_v1` and `piece_v1`.
//!
//! DESIGN
//! ======
//! All three share one behavior and differ only in footprint and in a few
//! permissions. A token is a small handle tree:
//!
//! ```text
//! root            moved between slots, lifted by the selection bounce
//! ├── turn        yaw (the token's rotation)
//! │   ├── face    pitch (the flip), carries the body bounds
//! │   └── top     slot for anything stacked on the token
//! ├── accept      confirmation affordances, hidden until a move is pending
//! ├── decline
//! ├── rotate_left rotation affordances, shown while rotations are allowed
//! └── rotate_right
//! ```
//!
//! Permissions arrive from the authority and decide which interaction sets
//! the token sits in. Everything that changes where the token logically is
//! (proposing, confirming or declining a move) is returned to the caller as
//! a [`Command`]; the token itself only animates and emits intents.

#[cfg(test)]
#[path = "token_test.rs"]
mod token_test;

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{Command, Stage, parse_init};
use crate::animation::{Channel, Easing, Repeat, Target};
use crate::candidates::MoveCandidate;
use crate::consts::ROTATE_GRAB_DIVISOR;
use crate::error::ElementError;
use crate::event::Intent;
use crate::math::{Aabb, Vec3, angular_distance, normalize_degrees};
use crate::scene::HandleId;
use crate::slot::SlotRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Card,
    Tile,
    Piece,
}

impl TokenKind {
    /// Event namespace of the kind, e.g. `card` for `card.move`.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Tile => "tile",
            Self::Piece => "piece",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Front,
    Back,
}

impl Side {
    fn pitch(self) -> f64 {
        match self {
            Self::Front => 0.0,
            Self::Back => PI,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// What the authority currently lets this user do with a token.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Permissions {
    #[serde(deserialize_with = "null_as_default")]
    pub can_be_moved_to: Vec<MoveCandidate>,
    #[serde(deserialize_with = "null_as_default")]
    pub can_be_rotated_to: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub can_be_flipped: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub can_be_selected: bool,
    pub front_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Appearance {
    back_image: Option<String>,
    side: Side,
    rotation: f64,
    model: Option<String>,
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardGeometry {
    width: f64,
    /// Extent along `z`.
    height: f64,
    /// Thickness.
    depth: f64,
}

#[derive(Debug, Deserialize)]
struct TileGeometry {
    radius: f64,
    height: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct PieceGeometry {
    #[serde(default = "one")]
    width: f64,
    #[serde(default = "one")]
    height: f64,
}

/// A provisional move awaiting the user's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
    /// Where the token sat before the first provisional move.
    pub original_parent: SlotRef,
    pub candidate: MoveCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Translate,
    Rotate { original: f64 },
}

#[derive(Debug, Deserialize)]
struct RotationChanged {
    rotation: f64,
}

#[derive(Debug, Deserialize)]
struct SideChanged {
    side: Side,
}

#[derive(Debug)]
pub struct Token {
    kind: TokenKind,
    handle: HandleId,
    turn: HandleId,
    face: HandleId,
    top: HandleId,
    accept: HandleId,
    decline: HandleId,
    rotate_left: HandleId,
    rotate_right: HandleId,
    /// Footprint along `x`.
    width: f64,
    /// Footprint along `z`.
    length: f64,
    thickness: f64,
    rotation: f64,
    side: Side,
    front_image: Option<String>,
    back_image: Option<String>,
    model: Option<String>,
    color: Option<String>,
    moves: Vec<MoveCandidate>,
    rotations: Vec<f64>,
    flippable: bool,
    selectable: bool,
    /// Candidate highlights registered while selected, by target slot.
    highlights: Vec<(SlotRef, HandleId)>,
    pending: Option<Pending>,
    drag: Option<Drag>,
}

fn sprite(stage: &mut Stage, name: &str, parent: HandleId, position: Vec3) -> HandleId {
    let handle = stage.scene.create_under(name, parent);
    stage.scene.set_position(handle, position);
    stage.scene.set_bounds(handle, Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::ONE));
    stage.scene.set_shown(handle, false);
    handle
}

impl Token {
    /// # Errors
    ///
    /// `InvalidInitData` if the kind's geometry fields are missing or the
    /// permissions are malformed.
    pub fn new(kind: TokenKind, id: &str, init: &Value, stage: &mut Stage) -> Result<Self, ElementError> {
        let (width, length, thickness) = match kind {
            TokenKind::Card => {
                let g: CardGeometry = parse_init(id, init)?;
                (g.width, g.height, g.depth)
            }
            TokenKind::Tile => {
                let g: TileGeometry = parse_init(id, init)?;
                (g.radius, g.radius, g.height)
            }
            TokenKind::Piece => {
                let g: PieceGeometry = parse_init(id, init)?;
                (g.width, g.width, g.height)
            }
        };
        let appearance: Appearance = parse_init(id, init)?;
        let permissions: Permissions = parse_init(id, init)?;
        let name = format!("{}_v1", kind.prefix());
        let rotation = normalize_degrees(appearance.rotation);

        let handle = stage.scene.create_under(&name, stage.scene.root());
        let turn = stage.scene.create_under(&format!("{name}_rotation"), handle);
        stage.scene.set_rotation(turn, Vec3::new(0.0, -rotation.to_radians(), 0.0));
        let face = stage.scene.create_under(&format!("{name}_side"), turn);
        stage.scene.set_position(face, Vec3::new(0.0, thickness / 2.0, 0.0));
        stage.scene.set_rotation(face, Vec3::new(appearance.side.pitch(), 0.0, 0.0));
        stage.scene.set_bounds(
            face,
            Aabb::new(Vec3::new(-width / 2.0, -thickness / 2.0, -length / 2.0), Vec3::new(width / 2.0, thickness / 2.0, length / 2.0)),
        );
        let top = stage.scene.create_under(&format!("{name}_target"), turn);
        stage.scene.set_position(top, Vec3::new(0.0, thickness, 0.0));

        let rotate_left = sprite(stage, "rotate_left", handle, Vec3::new(-width / 2.0, 0.5, length / 2.0 + 0.5));
        let rotate_right = sprite(stage, "rotate_right", handle, Vec3::new(width / 2.0, 0.5, length / 2.0 + 0.5));
        let accept = sprite(stage, "accept", handle, Vec3::new(1.0, 0.5, -length / 2.0));
        let decline = sprite(stage, "decline", handle, Vec3::new(-1.0, 0.5, -length / 2.0));

        let mut token = Self {
            kind,
            handle,
            turn,
            face,
            top,
            accept,
            decline,
            rotate_left,
            rotate_right,
            width,
            length,
            thickness,
            rotation,
            side: appearance.side,
            front_image: None,
            back_image: appearance.back_image,
            model: appearance.model,
            color: appearance.color,
            moves: Vec::new(),
            rotations: Vec::new(),
            flippable: false,
            selectable: false,
            highlights: Vec::new(),
            pending: None,
            drag: None,
        };
        token.apply_permissions(permissions, stage);
        Ok(token)
    }

    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Slot for anything stacked on top of the token.
    #[must_use]
    pub fn top(&self) -> HandleId {
        self.top
    }

    /// The clickable body.
    #[must_use]
    pub fn body(&self) -> HandleId {
        self.face
    }

    #[must_use]
    pub fn accept_handle(&self) -> HandleId {
        self.accept
    }

    #[must_use]
    pub fn decline_handle(&self) -> HandleId {
        self.decline
    }

    #[must_use]
    pub fn rotate_left_handle(&self) -> HandleId {
        self.rotate_left
    }

    #[must_use]
    pub fn rotate_right_handle(&self) -> HandleId {
        self.rotate_right
    }

    /// Current rotation in degrees, `[0, 360)`.
    #[must_use]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn front_image(&self) -> Option<&str> {
        self.front_image.as_deref().or(self.back_image.as_deref())
    }

    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    #[must_use]
    pub fn candidates(&self) -> &[MoveCandidate] {
        &self.moves
    }

    #[must_use]
    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn is_movable(&self) -> bool {
        !self.moves.is_empty()
    }

    #[must_use]
    pub fn is_rotatable(&self) -> bool {
        !self.rotations.is_empty()
    }

    #[must_use]
    pub fn dimensions(&self) -> Aabb {
        Aabb::footprint(self.width, self.thickness, self.length)
    }

    // --- Permissions ---

    /// Replace the token's permissions and re-register it accordingly.
    ///
    /// Highlights offered for the old candidates are withdrawn; a selected
    /// token asks for them to be offered again from the new list.
    pub fn apply_permissions(&mut self, permissions: Permissions, stage: &mut Stage) {
        if permissions.front_image.is_some() {
            self.front_image = permissions.front_image;
        }
        self.moves = permissions.can_be_moved_to;
        self.rotations = permissions.can_be_rotated_to;
        self.flippable = permissions.can_be_flipped;
        self.selectable = permissions.can_be_selected && self.kind == TokenKind::Card;
        self.withdraw_highlights(stage);
        self.sync_targets(stage);
        stage.targets.request_refresh(self.handle);
    }

    fn sync_targets(&self, stage: &mut Stage) {
        let grabbable = self.is_movable() || self.is_rotatable();
        let targets = &mut stage.targets;
        if grabbable {
            targets.add_selectable(self.handle, true);
            targets.add_moveable(self.handle, true);
        } else {
            targets.remove_selectable(self.handle);
            targets.remove_moveable(self.handle);
        }

        for arrow in [self.rotate_left, self.rotate_right] {
            if self.is_rotatable() {
                targets.add_clickable(arrow, Some(self.handle), false);
            } else {
                targets.remove_clickable(arrow, Some(self.handle));
            }
            stage.scene.set_shown(arrow, self.is_rotatable());
        }

        if self.flippable || self.selectable {
            stage.targets.add_clickable(self.face, None, true);
        } else {
            stage.targets.remove_clickable(self.face, None);
        }
    }

    /// Drop every registration the token holds.
    pub fn teardown(&mut self, stage: &mut Stage) {
        for handle in [self.handle, self.face, self.accept, self.decline, self.rotate_left, self.rotate_right] {
            stage.targets.forget(handle);
        }
        self.withdraw_highlights(stage);
    }

    // --- Authority events ---

    /// React to `<kind>.permissionChanged`, `.rotationChanged` and `.sideChanged`.
    pub fn on_event(&mut self, event: &str, data: &Value, stage: &mut Stage) {
        let Some(name) = event.strip_prefix(self.kind.prefix()).and_then(|rest| rest.strip_prefix('.')) else {
            return;
        };
        let result = match name {
            "permissionChanged" => {
                serde_json::from_value::<Permissions>(data.clone()).map(|p| self.apply_permissions(p, stage))
            }
            "rotationChanged" => {
                serde_json::from_value::<RotationChanged>(data.clone()).map(|e| self.change_rotation(e.rotation, stage))
            }
            "sideChanged" => serde_json::from_value::<SideChanged>(data.clone()).map(|e| self.change_side(e.side, stage)),
            _ => Ok(()),
        };
        if let Err(err) = result {
            warn!(event, error = %err, "ignoring malformed token event");
        }
    }

    /// Animate to `degrees` along the shorter arc.
    pub fn change_rotation(&mut self, degrees: f64, stage: &mut Stage) {
        self.rotation = normalize_degrees(degrees);
        let start = stage.scene.rotation(self.turn).map_or(0.0, |r| r.y);
        let target = -self.rotation.to_radians();
        let delta = (target - start + PI).rem_euclid(TAU) - PI;
        let duration = stage.config.turn_tween_ms;
        stage.animator.start(&stage.scene, self.turn, Target::Yaw(start + delta), duration, Easing::QuinticOut);
        if self.pending.is_some() {
            self.show_affordances(stage);
        }
    }

    /// Flip to `side`, lifting the token clear of the table on the way.
    pub fn change_side(&mut self, side: Side, stage: &mut Stage) {
        self.side = side;
        let duration = stage.config.turn_tween_ms;
        let lift = self.width.max(self.length) / 2.0;
        stage.animator.start(&stage.scene, self.face, Target::Pitch(side.pitch()), duration, Easing::QuinticOut);
        stage.animator.start_with(
            &stage.scene,
            self.turn,
            Target::Lift(lift),
            duration / 2.0,
            Easing::QuadraticInOut,
            Repeat::Yoyo { legs: Some(2) },
        );
    }

    // --- Selection ---

    /// Register the resolved highlights of the move candidates as tappable,
    /// replacing any offered earlier.
    pub fn on_select(&mut self, highlights: Vec<(SlotRef, HandleId)>, stage: &mut Stage) {
        self.withdraw_highlights(stage);
        for (_, highlight) in &highlights {
            stage.targets.add_clickable(*highlight, Some(self.handle), true);
        }
        self.highlights = highlights;
    }

    /// Unregister the highlights. A pending move is declined.
    pub fn on_deselect(&mut self, stage: &mut Stage) -> Option<Command> {
        self.withdraw_highlights(stage);
        if self.pending.is_some() {
            return Some(Command::Decline);
        }
        self.hide_affordances(stage);
        None
    }

    fn withdraw_highlights(&mut self, stage: &mut Stage) {
        for (_, highlight) in self.highlights.drain(..) {
            stage.targets.remove_clickable(highlight, Some(self.handle));
        }
    }

    // --- Clicks ---

    pub fn on_click(&mut self, id: &str, clicked: HandleId, stage: &mut Stage) -> Option<Command> {
        if clicked == self.decline {
            return Some(Command::Decline);
        }
        if clicked == self.accept {
            return Some(Command::Accept);
        }
        if let Some((target, _)) = self.highlights.iter().find(|(_, h)| *h == clicked) {
            // Resolved against the current candidate list.
            let index = self.moves.iter().position(|m| m.target == *target);
            if index.is_none() {
                debug!(%id, "tapped highlight is no longer a move candidate");
            }
            return index.map(Command::Propose);
        }
        if self.is_rotatable() && (clicked == self.rotate_left || clicked == self.rotate_right) {
            let step = if clicked == self.rotate_left { -1 } else { 1 };
            let rotation = self.step_rotation(step);
            self.rotation = rotation;
            stage.emit(Intent::new(format!("{}.rotate", self.kind.prefix()), id, json!({ "rotation": rotation })));
            return None;
        }
        if clicked == self.face {
            if self.flippable {
                stage.emit(Intent::new(format!("{}.flip", self.kind.prefix()), id, json!({})));
            }
            if self.selectable {
                stage.emit(Intent::new(format!("{}.select", self.kind.prefix()), id, json!({ "selected": true })));
            }
        }
        None
    }

    /// The allowed rotation `step` places away from the current one.
    fn step_rotation(&self, step: isize) -> f64 {
        let count = self.rotations.len();
        let current = self
            .rotations
            .iter()
            .position(|r| angular_distance(*r, self.rotation) < 1e-6)
            .unwrap_or(0);
        let next = if step < 0 { (current + count - 1) % count } else { (current + 1) % count };
        self.rotations.get(next).copied().unwrap_or(self.rotation)
    }

    // --- Dragging ---

    /// `grab_offset` runs from the pointer's hit point to the token origin.
    pub fn on_start_move(&mut self, grab_offset: Vec3) {
        self.drag = if self.kind == TokenKind::Tile
            && self.is_rotatable()
            && grab_offset.length() >= self.width / ROTATE_GRAB_DIVISOR
        {
            Some(Drag::Rotate { original: self.rotation })
        } else if self.is_movable() {
            Some(Drag::Translate)
        } else {
            None
        };
        debug!(drag = ?self.drag, "token drag started");
    }

    pub fn on_move(&mut self, dx: f64, dy: f64, stage: &mut Stage) {
        match self.drag {
            Some(Drag::Rotate { .. }) => {
                stage.animator.stop(self.turn, Channel::Yaw);
                self.rotation -= dx * stage.config.drag_degrees_per_px;
                stage.scene.set_rotation(self.turn, Vec3::new(0.0, -self.rotation.to_radians(), 0.0));
            }
            Some(Drag::Translate) => {
                if dx == 0.0 && dy == 0.0 {
                    return;
                }
                stage.animator.stop(self.handle, Channel::Position);
                let step = stage.config.drag_units_per_px;
                if let Some(mut position) = stage.scene.position(self.handle) {
                    position.x += dx * step;
                    position.z += dy * step;
                    stage.scene.set_position(self.handle, position);
                }
            }
            None => {}
        }
    }

    /// Finish a drag. A translation that moved asks for the drop to be settled.
    pub fn on_end_move(&mut self, id: &str, moved: bool, stage: &mut Stage) -> Option<Command> {
        match self.drag.take()? {
            Drag::Rotate { original } => {
                let dragged = normalize_degrees(self.rotation);
                let mut snapped = original;
                let mut best = angular_distance(dragged, original);
                for &allowed in &self.rotations {
                    let distance = angular_distance(dragged, allowed);
                    if distance < best {
                        snapped = allowed;
                        best = distance;
                    }
                }
                self.change_rotation(snapped, stage);
                if angular_distance(snapped, original) > 1e-6 {
                    stage.emit(Intent::new(format!("{}.rotate", self.kind.prefix()), id, json!({ "rotation": snapped })));
                }
                None
            }
            Drag::Translate => moved.then_some(Command::Settle),
        }
    }

    // --- Confirmation ---

    /// Offer accept/decline for a provisional move onto `candidate`.
    ///
    /// The original parent of an earlier, still pending move is kept.
    pub fn begin_pending(&mut self, original_parent: SlotRef, candidate: MoveCandidate, stage: &mut Stage) {
        let original_parent = self.pending.take().map_or(original_parent, |p| p.original_parent);
        self.pending = Some(Pending { original_parent, candidate });
        self.show_affordances(stage);
    }

    /// Clear the pending move, hiding its affordances.
    pub fn take_pending(&mut self, stage: &mut Stage) -> Option<Pending> {
        self.hide_affordances(stage);
        self.pending.take()
    }

    fn show_affordances(&self, stage: &mut Stage) {
        let Some(pending) = &self.pending else {
            return;
        };
        let acceptable = pending.candidate.accepts_rotation(self.rotation);
        stage.scene.set_shown(self.accept, acceptable);
        if acceptable {
            stage.targets.add_clickable(self.accept, Some(self.handle), false);
        } else {
            stage.targets.remove_clickable(self.accept, Some(self.handle));
        }
        stage.scene.set_shown(self.decline, true);
        stage.targets.add_clickable(self.decline, Some(self.handle), false);
    }

    fn hide_affordances(&self, stage: &mut Stage) {
        for sprite in [self.accept, self.decline] {
            stage.scene.set_shown(sprite, false);
            stage.targets.remove_clickable(sprite, Some(self.handle));
        }
    }
}

//! Pointer input: interaction target sets and the gesture state machine.
//!
//! DESIGN
//! ======
//! Elements register handles into three sets as their permissions change:
//! Selectable, Clickable and Moveable. A primary press ray-casts them in that
//! order, nearest hit first within each set:
//!
//! - a Selectable hit selects the element without consuming the press;
//! - a Clickable hit is dispatched to its element at once;
//! - a Moveable hit starts an element drag and captures the pointer.
//!
//! A primary or secondary press that hits nothing drags the camera instead.
//! Exactly one capture is active at a time; the state machine refuses a new
//! press until the current one is released or lost.
//!
//! Selection changes are queued by [`InteractionTargets`] and applied by
//! [`settle_selection`], which runs the element hooks. Hooks may queue more
//! changes, so settling loops a bounded number of passes.

#[cfg(test)]
#[path = "interaction_test.rs"]
mod interaction_test;

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::animation::{Channel, Easing, Repeat, Target};
use crate::behavior::{Command, Stage};
use crate::camera::{Camera, Point};
use crate::candidates::{self, first_in_range, resting_position};
use crate::consts::MAX_SELECTION_PASSES;
use crate::event::{Action, Intent};
use crate::math::Vec3;
use crate::registry::ElementRegistry;
use crate::scene::{HandleId, RayHit};
use crate::slot::ElementId;

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button.
    Middle,
    /// Right mouse button.
    Secondary,
}

/// The gesture currently holding the pointer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Primary pans, secondary tilts.
    CameraDrag { button: Button, moved: bool },
    ElementDrag { element: ElementId, moved: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    handle: HandleId,
    highlight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClickEntry {
    handle: HandleId,
    /// Element handle the click is reported to, when not the clicked one.
    event_target: Option<HandleId>,
    highlight: bool,
}

/// A queued selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRequest {
    Select(HandleId),
    Deselect(HandleId),
    /// Offer the selection's move highlights again.
    Refresh(HandleId),
}

/// The Selectable, Clickable and Moveable sets, plus the selection.
#[derive(Debug, Default)]
pub struct InteractionTargets {
    selectable: Vec<Entry>,
    clickable: Vec<ClickEntry>,
    moveable: Vec<Entry>,
    selected: Option<HandleId>,
    requests: VecDeque<SelectionRequest>,
}

impl InteractionTargets {
    // --- Selectable ---

    /// Register a selectable handle. Re-adding only updates its highlight.
    ///
    /// The first member is selected automatically; any later addition
    /// clears the current selection.
    pub fn add_selectable(&mut self, handle: HandleId, highlight: bool) {
        if let Some(entry) = self.selectable.iter_mut().find(|e| e.handle == handle) {
            entry.highlight = highlight;
            return;
        }
        self.selectable.push(Entry { handle, highlight });
        if self.selectable.len() == 1 {
            self.requests.push_back(SelectionRequest::Select(handle));
        } else if let Some(selected) = self.selected {
            self.requests.push_back(SelectionRequest::Deselect(selected));
        }
    }

    pub fn remove_selectable(&mut self, handle: HandleId) {
        let before = self.selectable.len();
        self.selectable.retain(|e| e.handle != handle);
        if self.selectable.len() == before {
            return;
        }
        if self.selected == Some(handle) {
            self.requests.push_back(SelectionRequest::Deselect(handle));
        }
        if let [only] = self.selectable.as_slice() {
            if self.selected != Some(only.handle) {
                self.requests.push_back(SelectionRequest::Select(only.handle));
            }
        }
    }

    #[must_use]
    pub fn is_selectable(&self, handle: HandleId) -> bool {
        self.selectable.iter().any(|e| e.handle == handle)
    }

    #[must_use]
    pub fn selectable_count(&self) -> usize {
        self.selectable.len()
    }

    #[must_use]
    pub fn selectable_handles(&self) -> Vec<HandleId> {
        self.selectable.iter().map(|e| e.handle).collect()
    }

    // --- Clickable ---

    /// Register a clickable handle. Entries are keyed on `(handle, event_target)`.
    pub fn add_clickable(&mut self, handle: HandleId, event_target: Option<HandleId>, highlight: bool) {
        if let Some(entry) = self.clickable.iter_mut().find(|e| e.handle == handle && e.event_target == event_target) {
            entry.highlight = highlight;
            return;
        }
        self.clickable.push(ClickEntry { handle, event_target, highlight });
    }

    pub fn remove_clickable(&mut self, handle: HandleId, event_target: Option<HandleId>) {
        self.clickable.retain(|e| !(e.handle == handle && e.event_target == event_target));
    }

    #[must_use]
    pub fn is_clickable(&self, handle: HandleId) -> bool {
        self.clickable.iter().any(|e| e.handle == handle)
    }

    /// Distinct clickable handles, in registration order.
    #[must_use]
    pub fn clickable_handles(&self) -> Vec<HandleId> {
        let mut handles: Vec<HandleId> = Vec::with_capacity(self.clickable.len());
        for entry in &self.clickable {
            if !handles.contains(&entry.handle) {
                handles.push(entry.handle);
            }
        }
        handles
    }

    /// Event targets registered for `handle`.
    #[must_use]
    pub fn click_targets(&self, handle: HandleId) -> Vec<Option<HandleId>> {
        self.clickable.iter().filter(|e| e.handle == handle).map(|e| e.event_target).collect()
    }

    // --- Moveable ---

    pub fn add_moveable(&mut self, handle: HandleId, highlight: bool) {
        if let Some(entry) = self.moveable.iter_mut().find(|e| e.handle == handle) {
            entry.highlight = highlight;
            return;
        }
        self.moveable.push(Entry { handle, highlight });
    }

    pub fn remove_moveable(&mut self, handle: HandleId) {
        self.moveable.retain(|e| e.handle != handle);
    }

    #[must_use]
    pub fn is_moveable(&self, handle: HandleId) -> bool {
        self.moveable.iter().any(|e| e.handle == handle)
    }

    #[must_use]
    pub fn moveable_handles(&self) -> Vec<HandleId> {
        self.moveable.iter().map(|e| e.handle).collect()
    }

    // --- Lifecycle ---

    /// Drop `handle` from every set, along with clicks reported to it.
    pub fn forget(&mut self, handle: HandleId) {
        self.remove_selectable(handle);
        self.clickable.retain(|e| e.handle != handle && e.event_target != Some(handle));
        self.remove_moveable(handle);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // --- Selection ---

    #[must_use]
    pub fn selected(&self) -> Option<HandleId> {
        self.selected
    }

    /// Every registered handle with its highlight flag set, for the host's
    /// outline pass.
    #[must_use]
    pub fn highlighted(&self) -> Vec<HandleId> {
        let flagged = self
            .selectable
            .iter()
            .chain(&self.moveable)
            .filter(|e| e.highlight)
            .map(|e| e.handle)
            .chain(self.clickable.iter().filter(|e| e.highlight).map(|e| e.handle));
        let mut out = Vec::new();
        for handle in flagged {
            if !out.contains(&handle) {
                out.push(handle);
            }
        }
        out
    }

    /// Ask for `handle` to become the selection.
    pub fn request_select(&mut self, handle: HandleId) {
        if self.is_selectable(handle) && self.selected != Some(handle) {
            self.requests.push_back(SelectionRequest::Select(handle));
        }
    }

    /// Ask for the current selection, if any, to be cleared.
    pub fn request_deselect(&mut self) {
        if let Some(selected) = self.selected {
            self.requests.push_back(SelectionRequest::Deselect(selected));
        }
    }

    /// Ask for `handle`'s highlights to be offered again if it is selected.
    pub fn request_refresh(&mut self, handle: HandleId) {
        if self.selected == Some(handle) {
            self.requests.push_back(SelectionRequest::Refresh(handle));
        }
    }

    #[must_use]
    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    fn take_requests(&mut self) -> Vec<SelectionRequest> {
        self.requests.drain(..).collect()
    }
}

/// The pointer state machine.
#[derive(Debug, Default)]
pub struct Interaction {
    state: InteractionState,
}

impl Interaction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Whether a gesture currently holds pointer capture.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.state != InteractionState::Idle
    }

    pub fn pointer_down(
        &mut self,
        registry: &mut ElementRegistry,
        stage: &mut Stage,
        camera: &Camera,
        point: Point,
        button: Button,
    ) -> Vec<Action> {
        if self.is_capturing() {
            debug!(?button, "press ignored while a gesture holds the pointer");
            return Vec::new();
        }

        let mut hit_anything = false;
        if button == Button::Primary {
            let ray = camera.screen_ray(point);
            if let Some(hit) = stage.scene.intersect(&ray, &stage.targets.selectable_handles()).into_iter().next() {
                hit_anything = true;
                stage.targets.request_select(hit.handle);
                settle_selection(registry, stage);
            }
            if let Some(hit) = stage.scene.intersect(&ray, &stage.targets.clickable_handles()).into_iter().next() {
                click(registry, stage, hit.handle);
                return Vec::new();
            }
            if let Some(hit) = stage.scene.intersect(&ray, &stage.targets.moveable_handles()).into_iter().next() {
                if let Some(element) = start_drag(registry, stage, hit) {
                    debug!(%element, "element drag started");
                    self.state = InteractionState::ElementDrag { element, moved: false };
                    return vec![Action::CapturePointer];
                }
            }
        }

        if !hit_anything && matches!(button, Button::Primary | Button::Secondary) {
            debug!(?button, "camera drag started");
            self.state = InteractionState::CameraDrag { button, moved: false };
            return vec![Action::CapturePointer];
        }
        Vec::new()
    }

    /// Forward a pointer movement, in pixels, to the active gesture.
    pub fn pointer_move(&mut self, registry: &mut ElementRegistry, stage: &mut Stage, camera: &mut Camera, dx: f64, dy: f64) {
        let nonzero = dx != 0.0 || dy != 0.0;
        match &mut self.state {
            InteractionState::Idle => {}
            InteractionState::CameraDrag { button, moved } => {
                *moved |= nonzero;
                match button {
                    Button::Primary => camera.pan(dx, dy, stage.config.camera_pan_per_px),
                    Button::Secondary => camera.tilt(dy, stage.config.camera_tilt_per_px),
                    Button::Middle => {}
                }
            }
            InteractionState::ElementDrag { element, moved } => {
                *moved |= nonzero;
                if let Some(el) = registry.find_by_id_mut(element) {
                    el.behavior.on_move(dx, dy, stage);
                }
            }
        }
    }

    /// Release the pointer. Handled exactly as capture loss.
    pub fn pointer_up(&mut self, registry: &mut ElementRegistry, stage: &mut Stage) -> Vec<Action> {
        if !self.is_capturing() {
            return Vec::new();
        }
        self.capture_lost(registry, stage);
        vec![Action::ReleasePointer]
    }

    /// The host lost pointer capture: finish whatever gesture was running.
    pub fn capture_lost(&mut self, registry: &mut ElementRegistry, stage: &mut Stage) {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => return,
            InteractionState::CameraDrag { moved, .. } => {
                if !moved && stage.targets.selectable_count() > 1 {
                    stage.targets.request_deselect();
                }
            }
            InteractionState::ElementDrag { element, moved } => {
                let command = registry.find_by_id_mut(&element).and_then(|el| el.behavior.on_end_move(&element, moved, stage));
                if let Some(command) = command {
                    apply_command(registry, stage, &element, command);
                }
            }
        }
        debug!("gesture finished");
        settle_selection(registry, stage);
    }

    pub fn wheel(&self, camera: &mut Camera, delta: f64) {
        camera.zoom(delta);
    }

    /// Forget the current gesture without running its end hooks.
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
    }
}

fn click(registry: &mut ElementRegistry, stage: &mut Stage, clicked: HandleId) {
    for target in stage.targets.click_targets(clicked) {
        let owner = target.unwrap_or(clicked);
        let Some(id) = registry.find_by_handle(&stage.scene, owner).map(|e| e.id.clone()) else {
            warn!(%owner, "clickable handle belongs to no element");
            continue;
        };
        debug!(%id, "element clicked");
        let command = registry.find_by_id_mut(&id).and_then(|el| el.behavior.on_click(&id, clicked, stage));
        if let Some(command) = command {
            apply_command(registry, stage, &id, command);
        }
    }
    settle_selection(registry, stage);
}

fn start_drag(registry: &mut ElementRegistry, stage: &mut Stage, hit: RayHit) -> Option<ElementId> {
    let id = registry.find_by_handle(&stage.scene, hit.handle)?.id.clone();
    let element = registry.find_by_id_mut(&id)?;
    let origin = stage.scene.world_position(element.behavior.handle())?;
    let offset = origin - hit.point;
    element.behavior.on_start_move(Vec3::new(offset.x, 0.0, offset.z));
    Some(id)
}

/// Apply queued selection changes until none remain.
pub fn settle_selection(registry: &mut ElementRegistry, stage: &mut Stage) {
    for _ in 0..MAX_SELECTION_PASSES {
        let requests = stage.targets.take_requests();
        if requests.is_empty() {
            return;
        }
        for request in requests {
            match request {
                SelectionRequest::Select(handle) => select(registry, stage, handle),
                SelectionRequest::Deselect(handle) => deselect(registry, stage, handle),
                SelectionRequest::Refresh(handle) => {
                    if stage.targets.selected() == Some(handle) {
                        offer_highlights(registry, stage, handle);
                    }
                }
            }
        }
    }
    if stage.targets.has_requests() {
        warn!(passes = MAX_SELECTION_PASSES, "selection did not settle; dropping queued changes");
        stage.targets.take_requests();
    }
}

fn select(registry: &mut ElementRegistry, stage: &mut Stage, handle: HandleId) {
    if !stage.targets.is_selectable(handle) || stage.targets.selected() == Some(handle) {
        return;
    }
    if let Some(previous) = stage.targets.selected() {
        deselect(registry, stage, previous);
    }
    stage.targets.selected = Some(handle);

    if let Some(mut position) = stage.scene.position(handle) {
        position.y = stage.config.bounce_low;
        stage.scene.set_position(handle, position);
    }
    let (high, half_period) = (stage.config.bounce_high, stage.config.bounce_half_period_ms);
    stage.animator.start_with(
        &stage.scene,
        handle,
        Target::Lift(high),
        half_period,
        Easing::QuadraticInOut,
        Repeat::Yoyo { legs: None },
    );
    debug!(%handle, "element selected");
    offer_highlights(registry, stage, handle);
}

/// Register the selected element's move candidates as tap targets.
fn offer_highlights(registry: &mut ElementRegistry, stage: &mut Stage, handle: HandleId) {
    let Some(id) = registry.find_by_handle(&stage.scene, handle).map(|e| e.id.clone()) else {
        return;
    };
    let Some(element) = registry.find_by_id(&id) else {
        return;
    };
    let parent = element.parent.clone();
    let moves = element.behavior.as_token().map(|t| t.candidates().to_vec()).unwrap_or_default();
    // The slot the element already sits in is not offered as a tap target.
    let highlights = candidates::resolve(registry, stage, &moves)
        .into_iter()
        .filter_map(|c| moves.get(c.index).filter(|m| m.target != parent).map(|m| (m.target.clone(), c.highlight)))
        .collect();
    if let Some(token) = registry.find_by_id_mut(&id).and_then(|e| e.behavior.as_token_mut()) {
        token.on_select(highlights, stage);
    }
    debug!(%id, "move highlights offered");
}

fn deselect(registry: &mut ElementRegistry, stage: &mut Stage, handle: HandleId) {
    if stage.targets.selected() != Some(handle) {
        return;
    }
    stage.targets.selected = None;
    stage.animator.stop(handle, Channel::Lift);
    if let Some(mut position) = stage.scene.position(handle) {
        position.y = 0.0;
        stage.scene.set_position(handle, position);
    }

    let Some(id) = registry.find_by_handle(&stage.scene, handle).map(|e| e.id.clone()) else {
        return;
    };
    let command = registry.find_by_id_mut(&id).and_then(|e| e.behavior.as_token_mut()).and_then(|t| t.on_deselect(stage));
    if let Some(command) = command {
        apply_command(registry, stage, &id, command);
    }
    debug!(%id, "element deselected");
}

/// Carry out a registry-side change requested by element `id`.
pub fn apply_command(registry: &mut ElementRegistry, stage: &mut Stage, id: &str, command: Command) {
    match command {
        Command::Settle => settle_drop(registry, stage, id),
        Command::Propose(index) => propose(registry, stage, id, index),
        Command::Accept => {
            let Some(token) = registry.find_by_id_mut(id).and_then(|e| e.behavior.as_token_mut()) else {
                return;
            };
            if !token.pending().is_some_and(|p| p.candidate.accepts_rotation(token.rotation())) {
                debug!(%id, "accept ignored; nothing acceptable is pending");
                return;
            }
            let prefix = token.kind().prefix();
            if let Some(pending) = token.take_pending(stage) {
                debug!(%id, "pending move accepted");
                stage.emit(Intent::new(format!("{prefix}.move"), id, pending.candidate.target.move_payload()));
            }
        }
        Command::Decline => {
            let pending = registry.find_by_id_mut(id).and_then(|e| e.behavior.as_token_mut()).and_then(|t| t.take_pending(stage));
            if let Some(pending) = pending {
                debug!(%id, "pending move declined");
                registry.move_element(id, pending.original_parent, stage);
            }
        }
    }
}

/// Evaluate a drop: propose the first candidate in range, otherwise send
/// the element back to its slot.
fn settle_drop(registry: &mut ElementRegistry, stage: &mut Stage, id: &str) {
    let Some(element) = registry.find_by_id(id) else {
        return;
    };
    let handle = element.behavior.handle();
    let parent = element.parent.clone();
    let moves = element.behavior.as_token().map(|t| t.candidates().to_vec()).unwrap_or_default();
    let resolved = candidates::resolve(registry, stage, &moves);
    let hit = resting_position(&stage.scene, handle).and_then(|position| first_in_range(&stage.scene, position, &resolved));
    match hit {
        Some(index) => propose(registry, stage, id, index),
        None => {
            debug!(%id, "drop out of range of every candidate");
            registry.move_element(id, parent, stage);
        }
    }
}

fn propose(registry: &mut ElementRegistry, stage: &mut Stage, id: &str, index: usize) {
    let Some(element) = registry.find_by_id(id) else {
        return;
    };
    let Some(candidate) = element.behavior.as_token().and_then(|t| t.candidates().get(index).cloned()) else {
        warn!(%id, index, "proposed move candidate no longer exists");
        return;
    };
    let original = element.parent.clone();
    debug!(%id, index, "move proposed");
    registry.move_element(id, candidate.target.clone(), stage);
    if let Some(token) = registry.find_by_id_mut(id).and_then(|e| e.behavior.as_token_mut()) {
        token.begin_pending(original, candidate, stage);
    }
}

//! Session: owns the registry, the services and the input state machine.
//!
//! DESIGN
//! ======
//! The host drives a session with three kinds of calls:
//!
//! - authority events via [`Session::handle_event`] / [`Session::handle_json`];
//! - pointer input (`pointer_down`, `pointer_move`, `pointer_up`, `wheel`,
//!   `capture_lost`) in CSS pixels;
//! - [`Session::tick`] once per animation frame.
//!
//! Each call returns the [`Action`]s the host must carry out: intents for
//! the authority and pointer capture changes. Logical state is updated
//! synchronously inside the call; tweens only play the result out visually.
//! The physics world advances in fixed steps independent of frame timing.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::behavior::Stage;
use crate::camera::{Camera, Point};
use crate::config::SessionConfig;
use crate::consts::PHYSICS_MAX_SUBSTEPS;
use crate::error::SessionError;
use crate::event::{
    Action, ELEMENT_ADDED, ELEMENT_MOVED, ELEMENT_REMOVED, ElementAdded, ElementMoved, ElementRemoved, GameEvent,
};
use crate::interaction::{self, Button, Interaction, InteractionState};
use crate::physics::{PhysicsWorld, SimplePhysics};
use crate::registry::{Element, ElementFactory, ElementRegistry};
use crate::scene::{HandleId, SceneGraph};
use crate::seating::{Seat, Seating};
use crate::slot::{ElementId, SlotRef};

/// A button the host should render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonView {
    pub id: ElementId,
    pub label: String,
}

/// Payload of a seating update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingUpdate {
    #[serde(default)]
    pub slots: Vec<Seat>,
    #[serde(default)]
    pub own_user: Option<String>,
}

pub struct Session {
    registry: ElementRegistry,
    stage: Stage,
    camera: Camera,
    interaction: Interaction,
    /// Frame time not yet consumed by fixed physics steps, in ms.
    physics_backlog_ms: f64,
    destroyed: bool,
}

impl Session {
    /// A session with the built-in element types and reference physics.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let physics = Box::new(SimplePhysics::new(config.gravity));
        Self::with_physics(config, physics)
    }

    #[must_use]
    pub fn with_physics(config: SessionConfig, physics: Box<dyn PhysicsWorld>) -> Self {
        Self::with_factory(config, physics, ElementFactory::with_defaults())
    }

    #[must_use]
    pub fn with_factory(config: SessionConfig, physics: Box<dyn PhysicsWorld>, factory: ElementFactory) -> Self {
        let camera = Camera { limits: config.camera_limits, ..Camera::default() };
        Self {
            registry: ElementRegistry::new(factory),
            stage: Stage::new(config, physics),
            camera,
            interaction: Interaction::new(),
            physics_backlog_ms: 0.0,
            destroyed: false,
        }
    }

    // --- Authority events ---

    /// Parse and handle a raw `{type, data}` event.
    ///
    /// # Errors
    ///
    /// `MalformedEvent` if the value is not an event, otherwise as
    /// [`Session::handle_event`].
    pub fn handle_json(&mut self, value: Value) -> Result<Vec<Action>, SessionError> {
        let event: GameEvent = serde_json::from_value(value)
            .map_err(|err| SessionError::MalformedEvent { event: "<unknown>".to_owned(), reason: err.to_string() })?;
        self.handle_event(&event)
    }

    /// Route an authority event to the registry and the element it names.
    ///
    /// # Errors
    ///
    /// `Destroyed` after [`Session::destroy`], `MalformedEvent` if a
    /// lifecycle payload has the wrong shape, `Element` if the registry
    /// rejected an `element.added`. A failed event leaves the session as it
    /// was before the event.
    pub fn handle_event(&mut self, event: &GameEvent) -> Result<Vec<Action>, SessionError> {
        if self.destroyed {
            return Err(SessionError::Destroyed);
        }
        debug!(event = %event.event, "authority event");
        match event.event.as_str() {
            ELEMENT_ADDED => {
                let added: ElementAdded = parse_payload(event)?;
                let parent = added.parent.unwrap_or_else(SlotRef::root);
                self.registry.add(&added.id, &added.type_tag, parent, &added.element, &mut self.stage)?;
            }
            ELEMENT_MOVED => {
                let moved: ElementMoved = parse_payload(event)?;
                let parent = moved.parent.unwrap_or_else(SlotRef::root);
                if let Some(token) = self.registry.find_by_id_mut(&moved.id).and_then(|e| e.behavior.as_token_mut()) {
                    token.take_pending(&mut self.stage);
                }
                self.registry.move_element(&moved.id, parent, &mut self.stage);
            }
            ELEMENT_REMOVED => {
                let removed: ElementRemoved = parse_payload(event)?;
                self.registry.remove(&removed.id, &mut self.stage);
            }
            _ => {}
        }

        if let Some(id) = event.element_id() {
            match self.registry.find_by_id_mut(id) {
                Some(element) => element.behavior.on_event(&event.event, &event.data, &mut self.stage),
                None if event.event != ELEMENT_REMOVED => warn!(%id, event = %event.event, "event for unknown element"),
                None => {}
            }
        }
        interaction::settle_selection(&mut self.registry, &mut self.stage);
        Ok(self.drain())
    }

    /// Replace the seats and the viewing user; tables re-lay out.
    pub fn set_seating(&mut self, seats: Vec<Seat>, own_user: Option<String>) {
        if self.destroyed {
            return;
        }
        self.stage.seating = Seating::new(seats, own_user);
        self.registry.notify_seating_changed(&mut self.stage);
        debug!(filled = self.stage.seating.filled_count(), "seating changed");
    }

    /// [`Session::set_seating`] from a `{slots, ownUser}` payload.
    ///
    /// # Errors
    ///
    /// `MalformedEvent` if the payload has the wrong shape.
    pub fn set_seating_json(&mut self, value: Value) -> Result<(), SessionError> {
        let update: SeatingUpdate = serde_json::from_value(value)
            .map_err(|err| SessionError::MalformedEvent { event: "seating".to_owned(), reason: err.to_string() })?;
        self.set_seating(update.slots, update.own_user);
        Ok(())
    }

    // --- Frame loop ---

    /// Advance physics in fixed steps, then tweens, then resync elements.
    pub fn tick(&mut self, dt_ms: f64) -> Vec<Action> {
        if self.destroyed {
            return Vec::new();
        }
        let step_ms = self.stage.config.physics_step_secs * 1000.0;
        if step_ms > 0.0 {
            self.physics_backlog_ms += dt_ms.max(0.0);
            let mut steps = 0;
            while self.physics_backlog_ms >= step_ms && steps < PHYSICS_MAX_SUBSTEPS {
                self.stage.physics.step(self.stage.config.physics_step_secs);
                self.physics_backlog_ms -= step_ms;
                steps += 1;
            }
            if steps == PHYSICS_MAX_SUBSTEPS {
                self.physics_backlog_ms = 0.0;
            }
        }
        self.stage.animator.advance(dt_ms, &mut self.stage.scene);
        for element in self.registry.iter() {
            element.behavior.on_rendered(&mut self.stage);
        }
        self.drain()
    }

    // --- Pointer input ---

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.camera.set_viewport(width, height);
    }

    pub fn pointer_down(&mut self, point: Point, button: Button) -> Vec<Action> {
        if self.destroyed {
            return Vec::new();
        }
        let mut actions = self.interaction.pointer_down(&mut self.registry, &mut self.stage, &self.camera, point, button);
        actions.extend(self.drain());
        actions
    }

    /// Pointer movement in pixels since the last event.
    pub fn pointer_move(&mut self, dx: f64, dy: f64) -> Vec<Action> {
        if self.destroyed {
            return Vec::new();
        }
        self.interaction.pointer_move(&mut self.registry, &mut self.stage, &mut self.camera, dx, dy);
        self.drain()
    }

    pub fn pointer_up(&mut self) -> Vec<Action> {
        if self.destroyed {
            return Vec::new();
        }
        let mut actions = self.interaction.pointer_up(&mut self.registry, &mut self.stage);
        actions.extend(self.drain());
        actions
    }

    /// The host lost pointer capture (focus change, pointer lock exit).
    pub fn capture_lost(&mut self) -> Vec<Action> {
        if self.destroyed {
            return Vec::new();
        }
        self.interaction.capture_lost(&mut self.registry, &mut self.stage);
        self.drain()
    }

    pub fn wheel(&mut self, delta: f64) {
        if !self.destroyed {
            self.interaction.wheel(&mut self.camera, delta);
        }
    }

    // --- Buttons ---

    /// Buttons currently clickable by this user, in registration order.
    #[must_use]
    pub fn buttons(&self) -> Vec<ButtonView> {
        self.registry
            .iter()
            .filter_map(|e| {
                let button = e.behavior.as_button()?;
                button.is_visible().then(|| ButtonView { id: e.id.clone(), label: button.label().to_owned() })
            })
            .collect()
    }

    pub fn click_button(&mut self, id: &str) -> Vec<Action> {
        if self.destroyed {
            return Vec::new();
        }
        match self.registry.find_by_id(id).and_then(|e| e.behavior.as_button()) {
            Some(button) => button.click(id, &mut self.stage),
            None => warn!(%id, "click on unknown button"),
        }
        self.drain()
    }

    // --- Teardown ---

    /// Tear everything down. Later events fail with `Destroyed`.
    pub fn destroy(&mut self) -> Vec<Action> {
        if self.destroyed {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if self.interaction.is_capturing() {
            actions.push(Action::ReleasePointer);
        }
        self.interaction.reset();
        self.stage.animator.clear();
        self.stage.physics.clear();
        self.stage.targets.clear();
        self.stage.take_intents();
        self.registry.clear();
        self.stage.scene.clear();
        self.destroyed = true;
        info!("session destroyed");
        actions
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // --- Queries ---

    #[must_use]
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.registry.find_by_id(id)
    }

    #[must_use]
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    #[must_use]
    pub fn scene(&self) -> &SceneGraph {
        &self.stage.scene
    }

    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.stage.config
    }

    #[must_use]
    pub fn state(&self) -> &InteractionState {
        self.interaction.state()
    }

    /// Id of the selected element.
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        let handle = self.stage.targets.selected()?;
        self.registry.find_by_handle(&self.stage.scene, handle).map(|e| e.id.as_str())
    }

    /// Handles the host should outline.
    #[must_use]
    pub fn highlighted(&self) -> Vec<HandleId> {
        self.stage.targets.highlighted()
    }

    fn drain(&mut self) -> Vec<Action> {
        self.stage.take_intents().into_iter().map(Action::Intent).collect()
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(event: &GameEvent) -> Result<T, SessionError> {
    serde_json::from_value(event.data.clone())
        .map_err(|err| SessionError::MalformedEvent { event: event.event.clone(), reason: err.to_string() })
}

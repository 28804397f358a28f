//! Per-type element behaviors behind one capability surface.
//!
//! DESIGN
//! ======
//! Each element type is a variant of [`ElementBehavior`]. The enum answers
//! the container questions (which handle does this slot live on, where is
//! its drop highlight, how big is my content) and forwards interaction
//! hooks to the variants that care. Variants that do not host children or
//! take input simply fall through.
//!
//! Behaviors never see the registry. Everything they may touch lives on
//! the [`Stage`]; anything that would change the logical parent graph is
//! returned as a [`Command`] for the caller to carry out.

pub mod board;
pub mod button;
pub mod card_container;
pub mod dice;
pub mod grid;
pub mod stack;
pub mod table;
pub mod tile_container;
pub mod token;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::animation::Animator;
use crate::config::SessionConfig;
use crate::error::ElementError;
use crate::event::Intent;
use crate::interaction::InteractionTargets;
use crate::math::{Aabb, Vec3};
use crate::physics::PhysicsWorld;
use crate::scene::{HandleId, SceneGraph};
use crate::seating::Seating;
use crate::slot::SlotData;

pub use board::Board;
pub use button::Button;
pub use card_container::CardContainer;
pub use dice::Dice;
pub use grid::Grid;
pub use stack::Stack;
pub use table::Table;
pub use tile_container::TileContainer;
pub use token::{Token, TokenKind};

/// Services element behaviors work against.
pub struct Stage {
    pub scene: SceneGraph,
    pub animator: Animator,
    pub physics: Box<dyn PhysicsWorld>,
    pub targets: InteractionTargets,
    pub seating: Seating,
    pub config: SessionConfig,
    intents: Vec<Intent>,
}

impl Stage {
    #[must_use]
    pub fn new(config: SessionConfig, physics: Box<dyn PhysicsWorld>) -> Self {
        Self {
            scene: SceneGraph::new(),
            animator: Animator::new(),
            physics,
            targets: InteractionTargets::default(),
            seating: Seating::default(),
            config,
            intents: Vec::new(),
        }
    }

    /// Queue an intent for the authority.
    pub fn emit(&mut self, intent: Intent) {
        self.intents.push(intent);
    }

    /// Drain queued intents in emission order.
    pub fn take_intents(&mut self) -> Vec<Intent> {
        std::mem::take(&mut self.intents)
    }
}

/// A registry-side change a behavior asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Evaluate the element's move candidates at its current position.
    Settle,
    /// Provisionally move onto the candidate at this index.
    Propose(usize),
    /// Confirm the pending move.
    Accept,
    /// Return to where the element was before its pending move.
    Decline,
}

/// A child as its container sees it during layout.
#[derive(Debug, Clone)]
pub struct ChildInfo {
    pub slot: Value,
    pub dimensions: Aabb,
}

impl ChildInfo {
    #[must_use]
    pub fn new(slot: Value, dimensions: Aabb) -> Self {
        Self { slot, dimensions }
    }

    #[must_use]
    pub fn slot(&self) -> SlotData<'_> {
        SlotData::new(&self.slot)
    }
}

/// Deserialize init data, reporting failures against element `id`.
pub(crate) fn parse_init<T: DeserializeOwned>(id: &str, init: &Value) -> Result<T, ElementError> {
    let value = if init.is_null() { Value::Object(serde_json::Map::new()) } else { init.clone() };
    serde_json::from_value(value).map_err(|err| ElementError::InvalidInitData { id: id.to_owned(), reason: err.to_string() })
}

#[derive(Debug)]
pub enum ElementBehavior {
    Board(Board),
    Grid(Grid),
    Stack(Stack),
    Table(Table),
    CardContainer(CardContainer),
    TileContainer(TileContainer),
    Token(Token),
    Dice(Dice),
    Button(Button),
}

impl ElementBehavior {
    /// Root handle: the one moved between slots.
    #[must_use]
    pub fn handle(&self) -> HandleId {
        match self {
            Self::Board(b) => b.handle(),
            Self::Grid(g) => g.handle(),
            Self::Stack(s) => s.handle(),
            Self::Table(t) => t.handle(),
            Self::CardContainer(c) => c.handle(),
            Self::TileContainer(t) => t.handle(),
            Self::Token(t) => t.handle(),
            Self::Dice(d) => d.handle(),
            Self::Button(b) => b.handle(),
        }
    }

    /// Local-space extent containers lay this element out with.
    #[must_use]
    pub fn dimensions(&self) -> Aabb {
        match self {
            Self::Board(b) => b.dimensions(),
            Self::Grid(g) => g.dimensions(),
            Self::Stack(s) => s.dimensions(),
            Self::Table(t) => t.dimensions(),
            Self::CardContainer(c) => c.dimensions(),
            Self::TileContainer(t) => t.dimensions(),
            Self::Token(t) => t.dimensions(),
            Self::Dice(d) => d.dimensions(),
            Self::Button(_) => Aabb::new(Vec3::ZERO, Vec3::ZERO),
        }
    }

    /// How close a dropped element must come to one of this container's
    /// highlights.
    #[must_use]
    pub fn acceptance_radius(&self, default: f64) -> f64 {
        match self {
            Self::Stack(s) => s.acceptance_radius(),
            Self::CardContainer(c) => c.acceptance_radius(),
            Self::TileContainer(t) => t.acceptance_radius(),
            _ => default,
        }
    }

    /// Handle children addressed with `data` attach to.
    ///
    /// `None` when this element cannot host the slot.
    pub fn resolve_slot(&mut self, data: SlotData<'_>, stage: &mut Stage) -> Option<HandleId> {
        match self {
            Self::Board(b) => Some(b.target()),
            Self::Grid(g) => Some(g.resolve_slot(data, stage)),
            Self::Stack(s) => s.resolve_slot(data, stage),
            Self::Table(t) => Some(t.resolve_slot(data, stage)),
            Self::CardContainer(c) => Some(c.resolve_slot(data, stage)),
            Self::TileContainer(t) => Some(t.resolve_slot(data, stage)),
            Self::Token(t) => Some(t.top()),
            Self::Dice(_) | Self::Button(_) => None,
        }
    }

    /// Drop-target handle for a slot.
    ///
    /// Only stacks and fixed-slot containers have one; moves into boards,
    /// grids and tables are never offered as drop targets.
    pub fn resolve_highlight(&mut self, data: SlotData<'_>, stage: &mut Stage) -> Option<HandleId> {
        match self {
            Self::Stack(s) => s.resolve_highlight(data),
            Self::CardContainer(c) => Some(c.resolve_highlight(data, stage)),
            Self::TileContainer(t) => Some(t.resolve_highlight(data, stage)),
            _ => None,
        }
    }

    /// Recompute layout after membership or a child's size changed.
    pub fn on_bounds_invalidated(&mut self, children: &[ChildInfo], stage: &mut Stage) {
        match self {
            Self::Grid(g) => g.on_bounds_invalidated(children, stage),
            Self::Table(t) => t.on_bounds_invalidated(children, stage),
            Self::CardContainer(c) => c.on_bounds_invalidated(children),
            Self::TileContainer(t) => t.on_bounds_invalidated(children),
            _ => {}
        }
    }

    /// A child left one of this container's slot handles.
    pub fn on_child_detached(&mut self, stage: &mut Stage) {
        if let Self::Stack(s) = self {
            s.on_child_detached(stage);
        }
    }

    /// Seats were (re)assigned.
    pub fn on_seating_changed(&mut self, stage: &mut Stage) {
        if let Self::Table(t) = self {
            t.ensure_seats(stage);
        }
    }

    /// Type-specific authority event.
    pub fn on_event(&mut self, event: &str, data: &Value, stage: &mut Stage) {
        match self {
            Self::Token(t) => t.on_event(event, data, stage),
            Self::Dice(d) => d.on_event(event, data, stage),
            Self::Button(b) => b.on_event(event, data),
            _ => {}
        }
    }

    /// One of this element's clickable handles was clicked.
    pub fn on_click(&mut self, id: &str, clicked: HandleId, stage: &mut Stage) -> Option<Command> {
        match self {
            Self::Token(t) => t.on_click(id, clicked, stage),
            Self::Dice(d) => {
                d.on_click(id, stage);
                None
            }
            _ => {
                warn!(%id, "click on an element that takes no clicks");
                None
            }
        }
    }

    pub fn on_start_move(&mut self, grab_offset: Vec3) {
        if let Self::Token(t) = self {
            t.on_start_move(grab_offset);
        }
    }

    pub fn on_move(&mut self, dx: f64, dy: f64, stage: &mut Stage) {
        if let Self::Token(t) = self {
            t.on_move(dx, dy, stage);
        }
    }

    pub fn on_end_move(&mut self, id: &str, moved: bool, stage: &mut Stage) -> Option<Command> {
        match self {
            Self::Token(t) => t.on_end_move(id, moved, stage),
            _ => None,
        }
    }

    pub fn on_rendered(&self, stage: &mut Stage) {
        if let Self::Dice(d) = self {
            d.on_rendered(stage);
        }
    }

    /// Release everything the element registered outside its own handles.
    pub fn teardown(&mut self, stage: &mut Stage) {
        match self {
            Self::Token(t) => t.teardown(stage),
            Self::Dice(d) => d.teardown(stage),
            _ => {}
        }
    }

    #[must_use]
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Self::Token(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_token_mut(&mut self) -> Option<&mut Token> {
        match self {
            Self::Token(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dice(&self) -> Option<&Dice> {
        match self {
            Self::Dice(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_button(&self) -> Option<&Button> {
        match self {
            Self::Button(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_stage() -> Stage {
    Stage::new(SessionConfig::default(), Box::new(crate::physics::SimplePhysics::default()))
}

//! Element registry: the logical forest of elements and its layout cascade.
//!
//! DESIGN
//! ======
//! Elements are addressed by their logical parent [`SlotRef`], independent
//! of where their handles physically hang in the scene. Containers never
//! keep a children list; membership is always derived by filtering the
//! registry on `parent`, so it cannot drift from the parent fields.
//!
//! After any add, move or remove, every ancestor container of the touched
//! slots is re-laid out once, closest first, by walking `parent` upward
//! through the registry. Containers only animate anchors that changed, so
//! a cascade with no real change is a no-op.
//!
//! References to missing containers, or slots a container cannot host,
//! fall back to the world root and are logged, never returned as errors.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::animation::{Easing, Target};
use crate::behavior::{
    Board, Button, CardContainer, ChildInfo, Dice, ElementBehavior, Grid, Stack, Stage, Table, TileContainer, Token,
    TokenKind,
};
use crate::error::ElementError;
use crate::math::Vec3;
use crate::scene::{HandleId, SceneGraph};
use crate::slot::{ElementId, SlotRef};

/// Builds an element behavior from its id and init data.
pub type Constructor = fn(&str, &Value, &mut Stage) -> Result<ElementBehavior, ElementError>;

/// Type tag → constructor table.
#[derive(Clone)]
pub struct ElementFactory {
    constructors: HashMap<String, Constructor>,
}

impl ElementFactory {
    /// A factory with no types registered.
    #[must_use]
    pub fn new() -> Self {
        Self { constructors: HashMap::new() }
    }

    /// A factory knowing every built-in element type.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register("board_v1", |id, init, stage| Board::new(id, init, stage).map(ElementBehavior::Board));
        factory.register("autoResizeContainer_v1", |id, init, stage| Grid::new(id, init, stage).map(ElementBehavior::Grid));
        factory.register("pieceContainer_v1", |id, init, stage| Stack::new(id, init, stage).map(ElementBehavior::Stack));
        factory.register("tableContainer", |_, _, stage| Ok(ElementBehavior::Table(Table::new(stage))));
        factory.register("cardContainer_v1", |id, init, stage| {
            CardContainer::new(id, init, stage).map(ElementBehavior::CardContainer)
        });
        factory.register("tileContainer_v1", |id, init, stage| {
            TileContainer::new(id, init, stage).map(ElementBehavior::TileContainer)
        });
        factory.register("card_v1", |id, init, stage| Token::new(TokenKind::Card, id, init, stage).map(ElementBehavior::Token));
        factory.register("tile_v1", |id, init, stage| Token::new(TokenKind::Tile, id, init, stage).map(ElementBehavior::Token));
        factory.register("piece_v1", |id, init, stage| Token::new(TokenKind::Piece, id, init, stage).map(ElementBehavior::Token));
        factory.register("dice_v1", |id, init, stage| Dice::new(id, init, stage).map(ElementBehavior::Dice));
        factory.register("button_v1", |id, init, stage| Button::new(id, init, stage).map(ElementBehavior::Button));
        factory
    }

    /// Register (or replace) the constructor for `type_tag`.
    pub fn register(&mut self, type_tag: impl Into<String>, constructor: Constructor) {
        self.constructors.insert(type_tag.into(), constructor);
    }

    #[must_use]
    pub fn contains(&self, type_tag: &str) -> bool {
        self.constructors.contains_key(type_tag)
    }

    /// # Errors
    ///
    /// `UnknownElementType` if nothing is registered for `type_tag`, or
    /// whatever the constructor reports.
    pub fn construct(&self, type_tag: &str, id: &str, init: &Value, stage: &mut Stage) -> Result<ElementBehavior, ElementError> {
        let constructor = self
            .constructors
            .get(type_tag)
            .ok_or_else(|| ElementError::UnknownElementType { type_tag: type_tag.to_owned(), id: id.to_owned() })?;
        constructor(id, init, stage)
    }
}

impl std::fmt::Debug for ElementFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("ElementFactory").field("types", &tags).finish()
    }
}

impl Default for ElementFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// A logical game object.
#[derive(Debug)]
pub struct Element {
    pub id: ElementId,
    pub type_tag: String,
    pub parent: SlotRef,
    pub behavior: ElementBehavior,
}

#[derive(Debug, Default)]
pub struct ElementRegistry {
    factory: ElementFactory,
    /// Registration order.
    elements: Vec<Element>,
    /// Ids of removed elements; never reused.
    retired: HashSet<ElementId>,
}

impl ElementRegistry {
    #[must_use]
    pub fn new(factory: ElementFactory) -> Self {
        Self { factory, elements: Vec::new(), retired: HashSet::new() }
    }

    #[must_use]
    pub fn factory(&self) -> &ElementFactory {
        &self.factory
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    // --- Lookup ---

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// The element owning `handle`: the first element whose root handle is
    /// `handle` or one of its scene ancestors.
    #[must_use]
    pub fn find_by_handle(&self, scene: &SceneGraph, handle: HandleId) -> Option<&Element> {
        scene
            .ancestors(handle)
            .into_iter()
            .find_map(|h| self.elements.iter().find(|e| e.behavior.handle() == h))
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    /// Elements whose parent addresses container `id`, as layout input.
    #[must_use]
    pub fn children_of(&self, id: &str) -> Vec<ChildInfo> {
        self.elements
            .iter()
            .filter(|e| e.parent.is_in(id))
            .map(|e| ChildInfo::new(e.parent.data.clone(), e.behavior.dimensions()))
            .collect()
    }

    // --- Mutation ---

    /// Construct an element and place it in its slot, returning its handle.
    ///
    /// # Errors
    ///
    /// `DuplicateElement` if the id is or was in use, `UnknownElementType`
    /// for an unregistered tag, `InvalidInitData` if construction failed.
    /// On error the registry is unchanged.
    pub fn add(&mut self, id: &str, type_tag: &str, parent: SlotRef, init: &Value, stage: &mut Stage) -> Result<HandleId, ElementError> {
        if self.index_of(id).is_some() || self.retired.contains(id) {
            warn!(%id, type_tag, "element id already used");
            return Err(ElementError::DuplicateElement { id: id.to_owned() });
        }
        let behavior = match self.factory.construct(type_tag, id, init, stage) {
            Ok(behavior) => behavior,
            Err(err) => {
                error!(%id, type_tag, error = %err, "element construction failed");
                return Err(err);
            }
        };

        let handle = behavior.handle();
        self.elements.push(Element { id: id.to_owned(), type_tag: type_tag.to_owned(), parent: parent.clone(), behavior });
        let slot = self.resolve_parent_handle(&parent, handle, stage);
        place(stage, handle, slot);
        self.adopt_orphans(id, stage);
        self.cascade(&[parent.container(), Some(id)], stage);
        info!(%id, type_tag, "element added");
        Ok(handle)
    }

    /// Move element `id` to `parent`, animating its handle there.
    ///
    /// Moving to the slot it already occupies only animates it back.
    /// Returns false if no such element exists.
    pub fn move_element(&mut self, id: &str, parent: SlotRef, stage: &mut Stage) -> bool {
        let Some(index) = self.index_of(id) else {
            warn!(%id, "move of unknown element");
            return false;
        };
        let handle = self.elements[index].behavior.handle();
        if self.elements[index].parent == parent {
            debug!(%id, "element returns to its slot");
            stage.animator.start(
                &stage.scene,
                handle,
                Target::Position(Vec3::ZERO),
                stage.config.reparent_tween_ms,
                Easing::QuinticOut,
            );
            return true;
        }

        let previous = std::mem::replace(&mut self.elements[index].parent, parent.clone());
        let slot = self.resolve_parent_handle(&parent, handle, stage);
        reparent(stage, handle, slot);
        self.notify_detached(&previous, stage);
        self.cascade(&[previous.container(), parent.container()], stage);
        debug!(%id, from = ?previous.container(), to = ?parent.container(), "element moved");
        true
    }

    /// Remove element `id`, its handles and its registrations.
    ///
    /// Elements still addressed to it are re-homed under the world root.
    pub fn remove(&mut self, id: &str, stage: &mut Stage) -> Option<Element> {
        let Some(index) = self.index_of(id) else {
            warn!(%id, "remove of unknown element");
            return None;
        };
        let mut element = self.elements.remove(index);
        self.retired.insert(element.id.clone());

        for orphan in self.elements.iter().filter(|e| e.parent.is_in(id)) {
            let handle = orphan.behavior.handle();
            let world = stage.scene.world_position(handle).unwrap_or(Vec3::ZERO);
            stage.scene.attach(handle, stage.scene.root());
            stage.scene.set_position(handle, world);
            warn!(id = %orphan.id, container = %id, "container removed; element falls back to the world root");
        }

        element.behavior.teardown(stage);
        for handle in stage.scene.remove(element.behavior.handle()) {
            stage.animator.stop_all(handle);
            stage.targets.forget(handle);
        }
        self.notify_detached(&element.parent, stage);
        self.cascade(&[element.parent.container()], stage);
        info!(%id, "element removed");
        Some(element)
    }

    /// Drop every element without per-element teardown.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    // --- Slot resolution ---

    /// Handle the slot `parent` resolves to. Falls back to the world root
    /// when the container is missing, cannot host the slot, or the slot lies
    /// inside `handle` itself.
    pub fn resolve_parent_handle(&mut self, parent: &SlotRef, handle: HandleId, stage: &mut Stage) -> HandleId {
        let root = stage.scene.root();
        let Some(container) = parent.container() else {
            return root;
        };
        let Some(index) = self.index_of(container) else {
            warn!(%container, "dangling parent reference; using the world root");
            return root;
        };
        let Some(slot) = self.elements[index].behavior.resolve_slot(parent.slot(), stage) else {
            warn!(%container, data = %parent.data, "container cannot host this slot; using the world root");
            return root;
        };
        if stage.scene.is_descendant(slot, handle) {
            warn!(%container, "slot lies inside the element itself; using the world root");
            return root;
        }
        slot
    }

    /// Drop-target handle for `target`, if its container still exists.
    pub fn resolve_highlight(&mut self, target: &SlotRef, stage: &mut Stage) -> Option<HandleId> {
        let container = target.container()?;
        let Some(index) = self.index_of(container) else {
            debug!(%container, "move candidate targets a missing container");
            return None;
        };
        self.elements[index].behavior.resolve_highlight(target.slot(), stage)
    }

    // --- Layout cascade ---

    /// Re-lay out container `id` and every container above it.
    pub fn invalidate(&mut self, id: &str, stage: &mut Stage) {
        self.cascade(&[Some(id)], stage);
    }

    /// Let every element react to a seating change, then re-lay out.
    pub fn notify_seating_changed(&mut self, stage: &mut Stage) {
        for element in &mut self.elements {
            element.behavior.on_seating_changed(stage);
        }
        let tables: Vec<ElementId> =
            self.elements.iter().filter(|e| e.behavior.as_table().is_some()).map(|e| e.id.clone()).collect();
        let starts: Vec<Option<&str>> = tables.iter().map(|id| Some(id.as_str())).collect();
        self.cascade(&starts, stage);
    }

    /// Containers from each start upward, closest first, each once.
    fn ancestor_chain(&self, starts: &[Option<&str>]) -> Vec<ElementId> {
        let mut chain: Vec<ElementId> = Vec::new();
        for start in starts {
            let mut current = start.map(str::to_owned);
            while let Some(id) = current.take() {
                if chain.contains(&id) {
                    break;
                }
                let Some(element) = self.find_by_id(&id) else {
                    break;
                };
                current = element.parent.container().map(str::to_owned);
                chain.push(id);
            }
        }
        chain
    }

    fn cascade(&mut self, starts: &[Option<&str>], stage: &mut Stage) {
        let chain = self.ancestor_chain(starts);
        // Inner containers must settle before their parents measure them.
        let mut ordered: Vec<(usize, ElementId)> = chain.into_iter().map(|id| (self.depth(&id), id)).collect();
        ordered.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, id) in ordered {
            let children = self.children_of(&id);
            if let Some(element) = self.find_by_id_mut(&id) {
                element.behavior.on_bounds_invalidated(&children, stage);
            }
        }
    }

    /// Number of logical ancestors of `id`.
    fn depth(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut seen: Vec<&str> = vec![id];
        let mut current = self.find_by_id(id).and_then(|e| e.parent.container());
        while let Some(parent) = current {
            if seen.contains(&parent) {
                break;
            }
            seen.push(parent);
            depth += 1;
            current = self.find_by_id(parent).and_then(|e| e.parent.container());
        }
        depth
    }

    fn notify_detached(&mut self, previous: &SlotRef, stage: &mut Stage) {
        let Some(container) = previous.container() else {
            return;
        };
        if let Some(element) = self.find_by_id_mut(container) {
            element.behavior.on_child_detached(stage);
        }
    }

    /// Place elements that arrived before their container `id`.
    fn adopt_orphans(&mut self, id: &str, stage: &mut Stage) {
        let orphans: Vec<(SlotRef, HandleId)> = self
            .elements
            .iter()
            .filter(|e| e.parent.is_in(id) && e.id != id)
            .map(|e| (e.parent.clone(), e.behavior.handle()))
            .collect();
        for (parent, handle) in orphans {
            let slot = self.resolve_parent_handle(&parent, handle, stage);
            reparent(stage, handle, slot);
        }
    }
}

/// Attach `handle` directly at the origin of `slot`.
fn place(stage: &mut Stage, handle: HandleId, slot: HandleId) {
    if !stage.scene.attach(handle, slot) {
        stage.scene.attach(handle, stage.scene.root());
    }
    stage.scene.set_position(handle, Vec3::ZERO);
}

/// Attach `handle` under `slot` without a visual jump, then tween it home.
fn reparent(stage: &mut Stage, handle: HandleId, slot: HandleId) {
    let world = stage.scene.world_position(handle).unwrap_or(Vec3::ZERO);
    let slot = if stage.scene.attach(handle, slot) {
        slot
    } else {
        let root = stage.scene.root();
        stage.scene.attach(handle, root);
        root
    };
    let local = stage.scene.world_to_local(slot, world).unwrap_or(Vec3::ZERO);
    stage.scene.set_position(handle, local);
    stage.animator.start(&stage.scene, handle, Target::Position(Vec3::ZERO), stage.config.reparent_tween_ms, Easing::QuinticOut);
}

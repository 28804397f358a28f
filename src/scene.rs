//! Retained scene model: the presentation collaborator's handle arena.
//!
//! DESIGN
//! ======
//! Every spatial object (an element's root, a container slot, a highlight
//! disc, an affordance sprite) is a *handle* in one [`SceneGraph`]. Handles
//! carry a local transform, optional own-geometry bounds, and visibility.
//! The host renderer mirrors this graph every frame; nothing here touches a
//! GPU. Physical nesting here is independent of the logical
//! parent graph kept by the element registry.
//!
//! Scale applies to a handle's own bounds only and does not propagate to
//! its children.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;

use uuid::Uuid;

use crate::math::{Aabb, Mat3, Ray, Vec3};

/// Opaque identity of a spatial object.
pub type HandleId = Uuid;

/// A single spatial object and its local transform.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parent: Option<HandleId>,
    children: Vec<HandleId>,
    /// Position relative to the parent handle.
    pub position: Vec3,
    /// Euler rotation relative to the parent handle, in radians.
    pub rotation: Vec3,
    /// Scale of this handle's own bounds.
    pub scale: Vec3,
    /// Own geometry in local space; empty for pure groups.
    pub bounds: Aabb,
    /// Rendered opacity. Zero-opacity handles are still pickable.
    pub opacity: f64,
    /// Invisible handles (and their subtrees) are neither drawn nor picked.
    pub visible: bool,
}

impl Node {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            parent: None,
            children: Vec::new(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            bounds: Aabb::empty(),
            opacity: 1.0,
            visible: true,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<HandleId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[HandleId] {
        &self.children
    }
}

/// A ray hit against a registered handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The candidate handle whose subtree was struck.
    pub handle: HandleId,
    /// Distance along the ray.
    pub distance: f64,
    /// World-space point where the ray entered the subtree bounds.
    pub point: Vec3,
}

/// Arena of handles rooted at a single scene root.
pub struct SceneGraph {
    nodes: HashMap<HandleId, Node>,
    root: HandleId,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        let root = Uuid::new_v4();
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new("scene"));
        Self { nodes, root }
    }

    /// The scene root. It is never removed.
    #[must_use]
    pub fn root(&self) -> HandleId {
        self.root
    }

    /// Create a detached handle.
    pub fn create(&mut self, name: &str) -> HandleId {
        let id = Uuid::new_v4();
        self.nodes.insert(id, Node::new(name));
        id
    }

    /// Create a handle already attached under `parent`.
    pub fn create_under(&mut self, name: &str, parent: HandleId) -> HandleId {
        let id = self.create(name);
        self.attach(id, parent);
        id
    }

    #[must_use]
    pub fn contains(&self, handle: HandleId) -> bool {
        self.nodes.contains_key(&handle)
    }

    #[must_use]
    pub fn get(&self, handle: HandleId) -> Option<&Node> {
        self.nodes.get(&handle)
    }

    pub fn get_mut(&mut self, handle: HandleId) -> Option<&mut Node> {
        self.nodes.get_mut(&handle)
    }

    #[must_use]
    pub fn parent(&self, handle: HandleId) -> Option<HandleId> {
        self.nodes.get(&handle).and_then(Node::parent)
    }

    #[must_use]
    pub fn children(&self, handle: HandleId) -> &[HandleId] {
        self.nodes.get(&handle).map_or(&[], Node::children)
    }

    /// Attach `child` under `parent`, detaching it from any previous parent.
    ///
    /// Returns false (and changes nothing) if either handle is unknown or the
    /// attachment would create a cycle.
    pub fn attach(&mut self, child: HandleId, parent: HandleId) -> bool {
        if child == self.root || !self.contains(child) || !self.contains(parent) {
            return false;
        }
        if self.is_descendant(parent, child) {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        true
    }

    /// Detach `handle` from its parent. The subtree stays alive.
    pub fn detach(&mut self, handle: HandleId) {
        let Some(parent) = self.parent(handle) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|c| *c != handle);
        }
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.parent = None;
        }
    }

    /// Destroy `handle` and its whole subtree, returning every removed handle.
    pub fn remove(&mut self, handle: HandleId) -> Vec<HandleId> {
        if handle == self.root || !self.contains(handle) {
            return Vec::new();
        }
        self.detach(handle);
        let mut removed = Vec::new();
        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.remove(&h) {
                stack.extend(node.children);
                removed.push(h);
            }
        }
        removed
    }

    /// Whether `handle` is `ancestor` or lies somewhere beneath it.
    #[must_use]
    pub fn is_descendant(&self, handle: HandleId, ancestor: HandleId) -> bool {
        self.ancestors(handle).contains(&ancestor)
    }

    /// `handle` followed by each of its ancestors up to the topmost one.
    #[must_use]
    pub fn ancestors(&self, handle: HandleId) -> Vec<HandleId> {
        let mut chain = Vec::new();
        let mut current = self.contains(handle).then_some(handle);
        while let Some(h) = current {
            if chain.contains(&h) {
                break;
            }
            chain.push(h);
            current = self.parent(h);
        }
        chain
    }

    // --- Transforms ---

    #[must_use]
    pub fn position(&self, handle: HandleId) -> Option<Vec3> {
        self.nodes.get(&handle).map(|n| n.position)
    }

    pub fn set_position(&mut self, handle: HandleId, position: Vec3) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.position = position;
        }
    }

    #[must_use]
    pub fn rotation(&self, handle: HandleId) -> Option<Vec3> {
        self.nodes.get(&handle).map(|n| n.rotation)
    }

    pub fn set_rotation(&mut self, handle: HandleId, rotation: Vec3) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.rotation = rotation;
        }
    }

    pub fn set_scale(&mut self, handle: HandleId, scale: Vec3) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.scale = scale;
        }
    }

    pub fn set_bounds(&mut self, handle: HandleId, bounds: Aabb) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.bounds = bounds;
        }
    }

    /// Show or hide a handle; hidden handles are transparent and unpickable.
    pub fn set_shown(&mut self, handle: HandleId, shown: bool) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.visible = shown;
            node.opacity = if shown { 1.0 } else { 0.0 };
        }
    }

    #[must_use]
    pub fn is_shown(&self, handle: HandleId) -> bool {
        self.nodes.get(&handle).is_some_and(|n| n.visible)
    }

    /// Accumulated rotation from the topmost ancestor down to `handle`.
    #[must_use]
    pub fn world_rotation(&self, handle: HandleId) -> Mat3 {
        self.ancestors(handle)
            .iter()
            .rev()
            .filter_map(|h| self.nodes.get(h))
            .fold(Mat3::IDENTITY, |acc, node| acc.compose(&Mat3::from_euler(node.rotation)))
    }

    /// Accumulated world-space position of `handle`'s origin.
    #[must_use]
    pub fn world_position(&self, handle: HandleId) -> Option<Vec3> {
        let node = self.nodes.get(&handle)?;
        let Some(parent) = node.parent else {
            return Some(node.position);
        };
        let parent_pos = self.world_position(parent)?;
        Some(parent_pos + self.world_rotation(parent).apply(node.position))
    }

    /// Express a world-space point in the local frame of `handle`.
    #[must_use]
    pub fn world_to_local(&self, handle: HandleId, world: Vec3) -> Option<Vec3> {
        let origin = self.world_position(handle)?;
        Some(self.world_rotation(handle).transpose().apply(world - origin))
    }

    /// World-space bounds of every visible handle in the subtree.
    #[must_use]
    pub fn world_bounds(&self, handle: HandleId) -> Aabb {
        let Some(origin) = self.world_position(handle) else {
            return Aabb::empty();
        };
        self.subtree_bounds(handle, origin, self.world_rotation(handle))
    }

    fn subtree_bounds(&self, handle: HandleId, origin: Vec3, rotation: Mat3) -> Aabb {
        let Some(node) = self.nodes.get(&handle) else {
            return Aabb::empty();
        };
        if !node.visible {
            return Aabb::empty();
        }
        let mut out = Aabb::empty();
        if !node.bounds.is_empty() {
            for corner in node.bounds.corners() {
                out.expand_by_point(origin + rotation.apply(corner.scaled_by(node.scale)));
            }
        }
        for child in &node.children {
            let Some(child_node) = self.nodes.get(child) else {
                continue;
            };
            let child_origin = origin + rotation.apply(child_node.position);
            let child_rotation = rotation.compose(&Mat3::from_euler(child_node.rotation));
            out = out.union(&self.subtree_bounds(*child, child_origin, child_rotation));
        }
        out
    }

    // --- Picking ---

    /// Intersect `ray` with the subtrees of `candidates`, nearest first.
    #[must_use]
    pub fn intersect(&self, ray: &Ray, candidates: &[HandleId]) -> Vec<RayHit> {
        let mut hits: Vec<RayHit> = candidates
            .iter()
            .filter_map(|&handle| {
                let distance = ray.intersect_aabb(&self.world_bounds(handle))?;
                Some(RayHit { handle, distance, point: ray.at(distance) })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Number of live handles, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Drop every handle except the root.
    pub fn clear(&mut self) {
        let root = self.root;
        self.nodes.retain(|h, _| *h == root);
        if let Some(node) = self.nodes.get_mut(&root) {
            node.children.clear();
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

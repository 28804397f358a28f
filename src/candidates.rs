//! Move-candidate evaluation.
//!
//! The authority hands every draggable element a list of permitted
//! destinations. On drop, each destination is resolved to its container's
//! highlight handle; the first one (in list order) whose highlight lies
//! within the container's acceptance radius of the element wins.

#[cfg(test)]
#[path = "candidates_test.rs"]
mod candidates_test;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::behavior::Stage;
use crate::math::{Vec3, normalize_degrees};
use crate::registry::ElementRegistry;
use crate::scene::{HandleId, SceneGraph};
use crate::slot::SlotRef;

/// A permitted destination for a draggable element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveCandidate {
    pub target: SlotRef,
    /// Orientations (degrees) the element may have when it lands there.
    /// `None` or empty accepts any orientation.
    #[serde(default)]
    pub rotations: Option<Vec<f64>>,
}

impl MoveCandidate {
    #[must_use]
    pub fn new(target: SlotRef) -> Self {
        Self { target, rotations: None }
    }

    /// Whether an element turned to `rotation` degrees may confirm this move.
    #[must_use]
    pub fn accepts_rotation(&self, rotation: f64) -> bool {
        match self.rotations.as_deref() {
            None | Some([]) => true,
            Some(allowed) => {
                let rotation = normalize_degrees(rotation);
                allowed.iter().any(|r| (normalize_degrees(*r) - rotation).abs() < 1e-6)
            }
        }
    }
}

/// A candidate whose highlight handle could be resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCandidate {
    /// Position of the candidate in the element's list.
    pub index: usize,
    pub highlight: HandleId,
    pub acceptance_radius: f64,
}

/// Resolve each candidate's highlight handle, skipping dangling targets.
pub fn resolve(registry: &mut ElementRegistry, stage: &mut Stage, candidates: &[MoveCandidate]) -> Vec<ResolvedCandidate> {
    let default_radius = stage.config.default_acceptance_radius;
    candidates
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let Some(container) = candidate.target.container() else {
                debug!(index, "move candidate targets the world root; skipping");
                return None;
            };
            let acceptance_radius = registry.find_by_id(container)?.behavior.acceptance_radius(default_radius);
            let highlight = registry.resolve_highlight(&candidate.target, stage)?;
            Some(ResolvedCandidate { index, highlight, acceptance_radius })
        })
        .collect()
}

/// World position of `handle` at rest, ignoring its own vertical lift.
///
/// The selection bounce lifts the element above its slot; that offset is
/// not part of where the element sits.
#[must_use]
pub fn resting_position(scene: &SceneGraph, handle: HandleId) -> Option<Vec3> {
    let local = scene.position(handle)?;
    let flat = Vec3::new(local.x, 0.0, local.z);
    match scene.parent(handle) {
        Some(parent) => Some(scene.world_position(parent)? + scene.world_rotation(parent).apply(flat)),
        None => Some(flat),
    }
}

/// First candidate, in list order, whose highlight is in range of `position`.
#[must_use]
pub fn first_in_range(scene: &SceneGraph, position: Vec3, resolved: &[ResolvedCandidate]) -> Option<usize> {
    resolved
        .iter()
        .find(|c| scene.world_position(c.highlight).is_some_and(|target| position.distance(target) <= c.acceptance_radius))
        .map(|c| c.index)
}

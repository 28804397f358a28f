//! Wire types exchanged with the game-state authority and the host.
//!
//! Inbound, the authority delivers [`GameEvent`]s: lifecycle events
//! (`element.added`, `element.moved`, `element.removed`) and type-specific
//! ones (`card.permissionChanged`, `dice.rolled`, ...). Outbound, the core
//! produces [`Intent`]s addressed to one element. Input handlers return
//! [`Action`]s for the host to carry out.

#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::slot::{ElementId, SlotRef};

pub const ELEMENT_ADDED: &str = "element.added";
pub const ELEMENT_MOVED: &str = "element.moved";
pub const ELEMENT_REMOVED: &str = "element.removed";

/// An inbound event from the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(rename = "type")]
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl GameEvent {
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { event: event.into(), data }
    }

    /// The element the event is about, if the payload names one.
    #[must_use]
    pub fn element_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }
}

/// Payload of `element.added`.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementAdded {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub parent: Option<SlotRef>,
    /// Type-specific construction data.
    #[serde(default)]
    pub element: Value,
}

/// Payload of `element.moved`.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementMoved {
    pub id: ElementId,
    #[serde(default)]
    pub parent: Option<SlotRef>,
}

/// Payload of `element.removed`.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementRemoved {
    pub id: ElementId,
}

/// An outbound request to the authority on behalf of one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    /// Event name, e.g. `card.move`.
    pub event: String,
    pub element_id: ElementId,
    pub payload: Value,
}

impl Intent {
    #[must_use]
    pub fn new(event: impl Into<String>, element_id: impl Into<ElementId>, payload: Value) -> Self {
        Self { event: event.into(), element_id: element_id.into(), payload }
    }
}

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Deliver an intent to the authority.
    Intent(Intent),
    /// Acquire exclusive pointer capture (pointer lock).
    CapturePointer,
    /// Release pointer capture.
    ReleasePointer,
}

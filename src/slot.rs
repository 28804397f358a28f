//! Slot addressing: where an element logically sits.
//!
//! A [`SlotRef`] names a container element and an opaque slot payload whose
//! shape only the container understands (`{x, y}` for a grid, `{index}` for
//! a stack, `{type: "player", index}` for a table seat, ...). [`SlotData`] is
//! the typed accessor containers use to read that payload.

#[cfg(test)]
#[path = "slot_test.rs"]
mod slot_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a logical element, as assigned by the game-state authority.
pub type ElementId = String;

/// Container id the authority uses for the bare table centre.
pub const CENTER_CONTAINER_ID: &str = "centerContainer";

/// Logical parent reference: container id plus container-specific slot data.
///
/// A missing container id denotes the world root. Equality is structural.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlotRef {
    #[serde(rename = "id", default)]
    pub container_id: Option<ElementId>,
    #[serde(default)]
    pub data: Value,
}

impl SlotRef {
    /// The world root.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(container_id: impl Into<ElementId>, data: Value) -> Self {
        Self { container_id: Some(container_id.into()), data }
    }

    /// Whether this reference addresses the world root rather than an element.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.container_id.as_deref().is_none_or(|id| id == CENTER_CONTAINER_ID)
    }

    /// Id of the addressed container element, if any.
    #[must_use]
    pub fn container(&self) -> Option<&str> {
        if self.is_root() { None } else { self.container_id.as_deref() }
    }

    /// Whether this reference points into `container_id`.
    #[must_use]
    pub fn is_in(&self, container_id: &str) -> bool {
        self.container() == Some(container_id)
    }

    #[must_use]
    pub fn slot(&self) -> SlotData<'_> {
        SlotData::new(&self.data)
    }

    /// Outbound move payload: `{containerId}` merged with the slot fields.
    #[must_use]
    pub fn move_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("containerId".into(), self.container_id.clone().map_or(Value::Null, Value::String));
        if let Value::Object(fields) = &self.data {
            for (key, value) in fields {
                payload.insert(key.clone(), value.clone());
            }
        }
        Value::Object(payload)
    }
}

/// Typed access to the fields containers read from slot data.
#[derive(Clone, Copy)]
pub struct SlotData<'a> {
    value: &'a Value,
}

impl<'a> SlotData<'a> {
    #[must_use]
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    /// The untyped payload, for logging.
    #[must_use]
    pub fn raw(&self) -> &'a Value {
        self.value
    }

    /// Integer field, accepting whole-valued floats.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    pub fn int(&self, key: &str) -> Option<i64> {
        let v = self.value.get(key)?;
        v.as_i64().or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
    }

    /// Grid column / tile column.
    #[must_use]
    pub fn x(&self) -> Option<i64> {
        self.int("x")
    }

    /// Grid row / tile row.
    #[must_use]
    pub fn y(&self) -> Option<i64> {
        self.int("y")
    }

    /// Stack pile, card depth, or seat number.
    #[must_use]
    pub fn index(&self) -> Option<i64> {
        self.int("index")
    }

    /// Card row position.
    #[must_use]
    pub fn position(&self) -> Option<i64> {
        self.int("position")
    }

    /// Seat number when the slot addresses a player region of a table.
    ///
    /// Negative seat numbers map to `usize::MAX`, which no table has.
    #[must_use]
    pub fn player_index(&self) -> Option<usize> {
        if self.value.get("type").and_then(Value::as_str) != Some("player") {
            return None;
        }
        self.index().map(|i| usize::try_from(i).unwrap_or(usize::MAX))
    }
}

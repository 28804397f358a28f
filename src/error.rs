//! Error taxonomy.
//!
//! Only faults that drop an inbound event are errors. Dangling references
//! and slot data a container cannot interpret are resolved by fallback and
//! logged, never returned.

use crate::slot::ElementId;

/// Error returned by element registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElementError {
    /// No constructor is registered for the element's type tag.
    #[error("unknown element type {type_tag:?} for element {id}")]
    UnknownElementType { type_tag: String, id: ElementId },
    /// The id is, or once was, in use by another element.
    #[error("element {id} already exists")]
    DuplicateElement { id: ElementId },
    /// The constructor could not read its required init fields.
    #[error("invalid init data for element {id}: {reason}")]
    InvalidInitData { id: ElementId, reason: String },
}

/// Error returned by [`crate::session::Session`] event handling.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The event payload did not have the shape its type requires.
    #[error("malformed {event} event: {reason}")]
    MalformedEvent { event: String, reason: String },
    /// A registry operation rejected the event.
    #[error(transparent)]
    Element(#[from] ElementError),
    /// The session has been torn down.
    #[error("session destroyed")]
    Destroyed,
}

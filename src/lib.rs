//! Layout and interaction core for a server-authoritative 3D board-game table.
//!
//! The crate turns an abstract game state (boards, containers, cards, tiles,
//! pieces, dice, buttons) into a retained scene of positioned handles, and
//! turns pointer input into game intents for the authority. It never renders
//! and never talks to the network: the host mirrors [`scene::SceneGraph`]
//! into its renderer, forwards authority events and pointer input to a
//! [`session::Session`], and delivers the returned [`event::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Top-level [`session::Session`]: event routing, frame tick, teardown |
//! | [`registry`] | Element registry, type-tag factory and the layout cascade |
//! | [`behavior`] | One behavior per element type behind [`behavior::ElementBehavior`] |
//! | [`interaction`] | Selectable/Clickable/Moveable sets and the pointer state machine |
//! | [`candidates`] | Move-candidate resolution and drop range checks |
//! | [`slot`] | Logical parent references and slot data accessors |
//! | [`event`] | Authority events, outbound intents, host actions |
//! | [`scene`] | Handle arena: transforms, bounds, ray picking |
//! | [`camera`] | Orbit camera and screen/world conversions |
//! | [`animation`] | Tweens per handle and channel |
//! | [`physics`] | Physics collaborator trait and a reference world for dice |
//! | [`seating`] | Player seats and the viewing user |
//! | [`config`] | Session tuning knobs |
//! | [`error`] | Error types |
//! | [`math`] | Vectors, boxes, rays |
//! | [`consts`] | Shared numeric constants |

pub mod animation;
pub mod behavior;
pub mod camera;
pub mod candidates;
pub mod config;
pub mod consts;
pub mod error;
pub mod event;
pub mod interaction;
pub mod math;
pub mod physics;
pub mod registry;
pub mod scene;
pub mod seating;
pub mod session;
pub mod slot;

pub use config::SessionConfig;
pub use error::{ElementError, SessionError};
pub use session::Session;

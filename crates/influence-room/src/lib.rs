//! Room state for the Influence engine.
//!
//! A [`Room`] is an immutable value: every change produces a new `Room`
//! that replaces the old one wholesale in the backend. Concurrent writers
//! are arbitrated by compare-and-swap, never by a local lock.
//!
//! # Key types
//!
//! - [`Room`] / [`Participant`] / [`Influence`]: the persisted aggregate
//! - [`rules`]: pure create/join/start transitions
//! - [`RoomStateStore`]: load, insert, and the bounded optimistic
//!   [`mutate`](RoomStateStore::mutate) loop
//! - [`ActionHandler`] / [`ActionRegistry`]: pluggable per-action rules
//! - [`project`]: viewer-scoped, redacted [`PublicRoomState`](influence_protocol::PublicRoomState)
//! - [`RoomConfig`], [`RetryPolicy`], [`StoreConfig`]: settings

mod actions;
mod config;
mod error;
mod model;
pub mod rules;
mod store;
mod view;

pub use actions::{ActionContext, ActionHandler, ActionRegistry, EndTurn, Income, StartGame};
pub use config::{RetryPolicy, RoomConfig, StoreConfig};
pub use error::RoomError;
pub use model::{Influence, Participant, Room};
pub use store::RoomStateStore;
pub use view::{project, FieldClass, Viewer, Visibility};

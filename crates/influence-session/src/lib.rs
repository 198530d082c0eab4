//! Admission control for the Influence room engine.
//!
//! Two registries, both persisted in the shared
//! [`KeyValueBackend`](influence_store::KeyValueBackend):
//!
//! 1. **Join codes** ([`JoinCodeRegistry`]): short, human-typeable codes
//!    that resolve to a room while it is accepting players
//! 2. **Sessions** ([`SessionRegistry`]): opaque bearer tokens that bind a
//!    participant to a room for a few hours
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← creates rooms, asks who is acting
//!     ↕
//! Session Layer (this crate)  ← join codes, session tokens
//!     ↕
//! Store Layer (below)  ← key-value backend with TTLs
//! ```
//!
//! Neither registry keeps local state; any number of processes can share
//! one backend.

mod error;
mod join_code;
mod registry;
mod session;

pub use error::SessionError;
pub use join_code::{normalize_code, JoinCodeRegistry, JOIN_CODE_ALPHABET};
pub use registry::SessionRegistry;
pub use session::{Session, SessionConfig};

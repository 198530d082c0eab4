//! # Influence
//!
//! Room/session state-sync engine for the Influence hidden-role card game.
//!
//! The engine keeps authoritative room state in a key-value backend,
//! admits players through join codes and session tokens, and fans every
//! committed change out to the live connections following that room.
//!
//! ```text
//! client ──► handler ──► GameService ──► RoomStateStore::mutate (CAS + retry)
//!                              │
//!                              └──► project ──► BroadcastHub::publish ──► subscribers
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use influence::prelude::*;
//!
//! # async fn run() -> Result<(), InfluenceError> {
//! let server = InfluenceServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(Arc::new(MemoryBackend::new()))
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;
mod service;
mod settings;

pub use error::InfluenceError;
pub use handler::ConnectionConfig;
pub use server::{InfluenceServer, InfluenceServerBuilder};
pub use service::{GameService, Onboarding};
pub use settings::{ServerSettings, SettingsError, DEFAULT_BIND_ADDRESS};

pub use influence_broadcast as broadcast;
pub use influence_protocol as protocol;
pub use influence_room as room;
pub use influence_session as session;
pub use influence_store as store;
pub use influence_transport as transport;

pub mod prelude {
    pub use crate::{
        ConnectionConfig, GameService, InfluenceError, InfluenceServer, InfluenceServerBuilder,
        Onboarding, ServerSettings,
    };
    pub use influence_broadcast::{BroadcastHub, HubConfig};
    pub use influence_protocol::{
        ClientMessage, ParticipantId, PublicRoomState, RoomId, ServerEvent, ServerMessage,
    };
    pub use influence_room::{ActionRegistry, RetryPolicy, RoomConfig, RoomStateStore, StoreConfig};
    pub use influence_session::{JoinCodeRegistry, SessionConfig, SessionRegistry};
    pub use influence_store::{KeyValueBackend, MemoryBackend};
}

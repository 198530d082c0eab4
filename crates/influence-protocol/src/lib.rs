//! Wire protocol for the Influence room engine.
//!
//! This crate defines the vocabulary every other crate speaks:
//!
//! - **Identifiers** ([`RoomId`], [`ParticipantId`], [`JoinCode`])
//! - **Card vocabulary** ([`Role`], [`ActionKind`], [`LifecycleState`])
//! - **Projection** ([`PublicRoomState`]): the redacted room a viewer sees
//! - **Events** ([`ServerEvent`]): the envelope fanned out to subscribers
//! - **Stream messages** ([`ClientMessage`], [`ServerMessage`])
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): values to bytes and back
//!
//! It knows nothing about storage or connections.
//!
//! ```text
//! Backend (bytes) ← Codec → Room / ServerEvent ← Codec → Connection (bytes)
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use messages::{ClientMessage, ServerMessage};
pub use types::{
    ActionKind, EventPayload, EventType, JoinCode, LifecycleState, ParticipantId,
    PublicInfluence, PublicParticipant, PublicRoomState, Role, RoomId, ServerEvent,
};

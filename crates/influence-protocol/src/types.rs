//! Core protocol types for the Influence wire format.
//!
//! Everything in this module travels "on the wire" or into the backend:
//! identifiers, the card vocabulary, the public room projection, and the
//! [`ServerEvent`] envelope pushed to subscribers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a room (one match instance).
///
/// Newtype over the UUID string so a `RoomId` can never be passed where a
/// `ParticipantId` is expected. `#[serde(transparent)]` keeps the JSON form
/// a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocates a fresh random (v4 UUID) room ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unique identifier for a participant within a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocates a fresh random (v4 UUID) participant ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A short, human-typeable code that resolves to a [`RoomId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinCode(String);

impl JoinCode {
    /// Wraps a code. Callers normalize user input before wrapping.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Card vocabulary
// ---------------------------------------------------------------------------

/// Everything a participant can declare.
///
/// Names on the wire are `snake_case` (`"foreign_aid"`, `"block_steal"`).
/// Only some of these have a handler registered in the room crate; the
/// rest parse successfully and are rejected as invalid by dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Start,
    EndTurn,
    Income,
    ForeignAid,
    Coup,
    Tax,
    Assassinate,
    Steal,
    Exchange,
    BlockForeignAid,
    BlockAssassinate,
    BlockSteal,
}

impl ActionKind {
    /// Every action, in declaration order.
    pub const ALL: [ActionKind; 12] = [
        Self::Start,
        Self::EndTurn,
        Self::Income,
        Self::ForeignAid,
        Self::Coup,
        Self::Tax,
        Self::Assassinate,
        Self::Steal,
        Self::Exchange,
        Self::BlockForeignAid,
        Self::BlockAssassinate,
        Self::BlockSteal,
    ];

    /// The wire name of this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::EndTurn => "end_turn",
            Self::Income => "income",
            Self::ForeignAid => "foreign_aid",
            Self::Coup => "coup",
            Self::Tax => "tax",
            Self::Assassinate => "assassinate",
            Self::Steal => "steal",
            Self::Exchange => "exchange",
            Self::BlockForeignAid => "block_foreign_aid",
            Self::BlockAssassinate => "block_assassinate",
            Self::BlockSteal => "block_steal",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownAction(s.to_string()))
    }
}

/// The role printed on an influence card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Duke,
    Assassin,
    Ambassador,
    Captain,
    Contessa,
}

impl Role {
    /// The five roles of the base deck.
    pub const ALL: [Role; 5] = [
        Self::Duke,
        Self::Assassin,
        Self::Ambassador,
        Self::Captain,
        Self::Contessa,
    ];

    /// Actions a holder of this role may claim.
    pub fn actions(self) -> &'static [ActionKind] {
        match self {
            Self::Duke => &[ActionKind::Tax],
            Self::Assassin => &[ActionKind::Assassinate],
            Self::Ambassador => &[ActionKind::Exchange],
            Self::Captain => &[ActionKind::Steal],
            Self::Contessa => &[ActionKind::BlockAssassinate],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// LifecycleState
// ---------------------------------------------------------------------------

/// The lifecycle of a room.
///
/// ```text
/// Lobby → Started → Finished
/// ```
///
/// Joins are only accepted in `Lobby`. There is no path back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Lobby,
    Started,
    Finished,
}

impl LifecycleState {
    /// Returns `true` if the room is accepting new participants.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` while a game is being played.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Started)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::Started => write!(f, "started"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Public projection
// ---------------------------------------------------------------------------

/// An influence card as seen by one viewer.
///
/// `role` is `None` when the viewer may not see it. The `revealed` flag is
/// always present so everyone can count face-down cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInfluence {
    pub role: Option<Role>,
    pub revealed: bool,
}

/// A participant as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicParticipant {
    pub id: ParticipantId,
    pub nickname: String,
    pub coins: u32,
    pub alive: bool,
    pub influences: Vec<PublicInfluence>,
}

/// Viewer-scoped, redacted representation of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRoomState {
    #[serde(rename = "roomID")]
    pub room_id: RoomId,
    pub join_code: JoinCode,
    #[serde(rename = "adminID")]
    pub admin_id: ParticipantId,
    pub lifecycle: LifecycleState,
    pub turn_index: usize,
    pub participants: Vec<PublicParticipant>,
    pub deck_remaining: usize,
    /// Undealt roles, top card first. Only the admin's view fills this in.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deck: Vec<Role>,
}

impl PublicRoomState {
    /// Looks up a participant in the projection.
    pub fn participant(&self, id: &ParticipantId) -> Option<&PublicParticipant> {
        self.participants.iter().find(|p| &p.id == id)
    }
}

// ---------------------------------------------------------------------------
// ServerEvent: pushed to every subscriber of a room
// ---------------------------------------------------------------------------

/// What happened in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RoomCreated,
    ParticipantJoined,
    GameStarted,
    ActionDeclared,
    ActionResolved,
    ActionCanceled,
    ActionBlocked,
    ActionContested,
    GameStateUpdated,
}

/// Free-form event details.
///
/// A `BTreeMap` keeps key order stable, so the same event always encodes
/// to the same bytes.
pub type EventPayload = BTreeMap<String, serde_json::Value>;

/// The envelope broadcast to a room's subscribers.
///
/// ```json
/// { "eventType": "game_started", "roomID": "…", "timestamp": "2026-…Z",
///   "state": { … }, "payload": { … } }
/// ```
///
/// `state` and `payload` are omitted from the JSON when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    #[serde(rename = "roomID")]
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PublicRoomState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
}

impl ServerEvent {
    /// Creates an event stamped with the current UTC time.
    pub fn new(event_type: EventType, room_id: RoomId) -> Self {
        Self {
            event_type,
            room_id,
            timestamp: Utc::now(),
            state: None,
            payload: None,
        }
    }

    /// Attaches a state snapshot.
    pub fn with_state(mut self, state: PublicRoomState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a payload.
    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = Some(payload);
        self
    }
}

// =========================================================================
// Tests
// =========================================================================

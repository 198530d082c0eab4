//! Session types: what a bearer token stands for.
//!
//! A session is created when a participant creates or joins a room and is
//! read-only afterwards. It is not tied to a connection: the same token
//! can open any number of streams until it expires.

use std::time::Duration;

use chrono::{DateTime, Utc};
use influence_protocol::{ParticipantId, RoomId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for join codes and session tokens.
///
/// Create one with `SessionConfig::default()` and override just the
/// fields you care about.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a session token stays valid.
    ///
    /// Independent of the room's own TTL. Default: 6 hours.
    pub session_ttl: Duration,

    /// How long a join code resolves to its room.
    ///
    /// Codes are never refreshed. Default: 2 hours.
    pub join_code_ttl: Duration,

    /// Number of characters in a join code. Default: 6.
    pub join_code_length: usize,

    /// How many fresh codes to try before giving up on a collision.
    /// Default: 16.
    pub max_code_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(6 * 60 * 60),
            join_code_ttl: Duration::from_secs(2 * 60 * 60),
            join_code_length: 6,
            max_code_attempts: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One participant's admission to one room.
///
/// Stored as JSON under `session:<token>`:
///
/// ```json
/// { "token": "9f…", "participantID": "…", "roomID": "…",
///   "expiresAt": "2026-…Z" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// 32 lowercase hex characters (128 bits of randomness).
    pub token: String,

    #[serde(rename = "participantID")]
    pub participant_id: ParticipantId,

    #[serde(rename = "roomID")]
    pub room_id: RoomId,

    /// Wall-clock expiry, informational. The backend TTL is what
    /// actually retires the token.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns `true` if this session admits its holder to `room_id`.
    pub fn is_for_room(&self, room_id: &RoomId) -> bool {
        &self.room_id == room_id
    }
}

//! The session registry: issues and checks bearer tokens.
//!
//! Sessions live only in the backend, under `session:<token>`, with their
//! own TTL. There is no revocation; a token dies when its key expires.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use influence_protocol::{Codec, JsonCodec, ParticipantId, RoomId};
use influence_store::{keys, KeyValueBackend};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::{Session, SessionConfig, SessionError};

/// Issues and resolves session tokens.
///
/// Cheap to clone; clones share the backend.
pub struct SessionRegistry<B> {
    backend: Arc<B>,
    config: SessionConfig,
    codec: JsonCodec,
}

impl<B> Clone for SessionRegistry<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            codec: self.codec,
        }
    }
}

impl<B: KeyValueBackend> SessionRegistry<B> {
    pub fn new(backend: Arc<B>, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            codec: JsonCodec,
        }
    }

    /// Creates a session binding `participant_id` to `room_id`.
    ///
    /// # Errors
    /// - [`SessionError::Record`] if the record could not be encoded
    /// - [`SessionError::Backend`] if the backend failed
    pub async fn issue(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<Session, SessionError> {
        let session = Session {
            token: generate_token(),
            participant_id: participant_id.clone(),
            room_id: room_id.clone(),
            expires_at: expiry_after(Utc::now(), self.config.session_ttl),
        };

        let record = self.codec.encode(&session)?;
        self.backend
            .set(
                &keys::session_key(&session.token),
                record,
                Some(self.config.session_ttl),
            )
            .await?;

        info!(%room_id, %participant_id, "session issued");
        Ok(session)
    }

    /// Looks up a token.
    ///
    /// # Errors
    /// - [`SessionError::InvalidSession`] if the token is empty, unknown,
    ///   expired, or its record cannot be decoded
    /// - [`SessionError::Backend`] if the backend failed
    pub async fn resolve(&self, token: &str) -> Result<Session, SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::InvalidSession);
        }

        let Some(record) = self.backend.get(&keys::session_key(token)).await? else {
            debug!("unknown or expired session token");
            return Err(SessionError::InvalidSession);
        };

        self.codec.decode::<Session>(&record).map_err(|e| {
            warn!(error = %e, "unreadable session record");
            SessionError::InvalidSession
        })
    }

    /// Looks up a token and requires that it belongs to `room_id`.
    ///
    /// # Errors
    /// Same as [`resolve`](Self::resolve); a session for another room is
    /// also [`SessionError::InvalidSession`].
    pub async fn resolve_for_room(
        &self,
        token: &str,
        room_id: &RoomId,
    ) -> Result<Session, SessionError> {
        let session = self.resolve(token).await?;
        if !session.is_for_room(room_id) {
            debug!(%room_id, bound_to = %session.room_id, "session used for another room");
            return Err(SessionError::InvalidSession);
        }
        Ok(session)
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================

//! Join codes: short strings players type to find a room.
//!
//! A code maps to a room ID under `joincode:<CODE>` with a fixed TTL.
//! Uniqueness comes from the backend's set-if-absent, not from a local
//! table, so two processes can never hand out the same live code.

use std::sync::Arc;

use influence_protocol::{JoinCode, RoomId};
use influence_store::{keys, KeyValueBackend};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::{SessionConfig, SessionError};

/// Characters a join code is drawn from.
///
/// No `I`, `O`, `0` or `1`: they are too easy to confuse when read aloud
/// or copied off a screen.
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Canonical form of user-typed code: surrounding whitespace removed,
/// upper-cased.
pub fn normalize_code(input: &str) -> JoinCode {
    JoinCode::new(input.trim().to_ascii_uppercase())
}

/// Draws one candidate code.
fn generate_code<R: Rng + ?Sized>(rng: &mut R, length: usize) -> JoinCode {
    let code: String = (0..length)
        .map(|_| {
            let index = rng.random_range(0..JOIN_CODE_ALPHABET.len());
            JOIN_CODE_ALPHABET[index] as char
        })
        .collect();
    JoinCode::new(code)
}

/// Reserves, resolves and releases join codes.
///
/// Cheap to clone; clones share the backend.
pub struct JoinCodeRegistry<B> {
    backend: Arc<B>,
    config: SessionConfig,
}

impl<B> Clone for JoinCodeRegistry<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
        }
    }
}

impl<B: KeyValueBackend> JoinCodeRegistry<B> {
    pub fn new(backend: Arc<B>, config: SessionConfig) -> Self {
        Self { backend, config }
    }

    /// Allocates a fresh code for `room_id`.
    ///
    /// Draws random codes until one is free, up to
    /// [`SessionConfig::max_code_attempts`].
    ///
    /// # Errors
    /// - [`SessionError::CodeSpaceExhausted`] if every attempt collided
    /// - [`SessionError::Backend`] if the backend failed
    pub async fn reserve(&self, room_id: &RoomId) -> Result<JoinCode, SessionError> {
        let attempts = self.config.max_code_attempts.max(1);

        for attempt in 1..=attempts {
            // Draw before awaiting: the thread-local RNG is not `Send`.
            let code = generate_code(&mut rand::rng(), self.config.join_code_length);
            let reserved = self
                .backend
                .set_if_absent(
                    &keys::join_code_key(&code),
                    room_id.as_str().as_bytes().to_vec(),
                    Some(self.config.join_code_ttl),
                )
                .await?;

            if reserved {
                info!(%room_id, %code, "join code reserved");
                return Ok(code);
            }
            debug!(%code, attempt, "join code collision, drawing another");
        }

        warn!(%room_id, attempts, "join code space exhausted");
        Err(SessionError::CodeSpaceExhausted { attempts })
    }

    /// Looks up the room behind a code.
    ///
    /// The input is normalized first, so `" abc234 "` finds `ABC234`.
    ///
    /// # Errors
    /// - [`SessionError::JoinCodeNotFound`] if absent, expired, or unreadable
    /// - [`SessionError::Backend`] if the backend failed
    pub async fn resolve(&self, code: &str) -> Result<RoomId, SessionError> {
        let code = normalize_code(code);
        if code.as_str().is_empty() {
            return Err(SessionError::JoinCodeNotFound);
        }

        let raw = self
            .backend
            .get(&keys::join_code_key(&code))
            .await?
            .ok_or(SessionError::JoinCodeNotFound)?;

        let room_id = String::from_utf8(raw).map_err(|_| {
            warn!(%code, "join code entry is not valid UTF-8");
            SessionError::JoinCodeNotFound
        })?;
        Ok(RoomId::new(room_id))
    }

    /// Deletes a code. Best effort: failures are logged, never returned.
    pub async fn release(&self, code: &JoinCode) {
        match self.backend.delete(&keys::join_code_key(code)).await {
            Ok(true) => info!(%code, "join code released"),
            Ok(false) => debug!(%code, "join code already gone"),
            Err(e) => warn!(%code, error = %e, "failed to release join code"),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

//! The room state store: optimistic read-modify-write over the backend.
//!
//! ```text
//! ┌──────────► GET room:<id> ──► decode ──► mutator(&room)
//! │                                              │
//! │                              Err(rule) ──────┼──► return Err (no retry)
//! │                                              ▼
//! │            CAS(expected = bytes read, value = encode(next))
//! │                 │                    │
//! │             lost race              won
//! │                 ▼                    ▼
//! └──── backoff (bounded attempts)   return Ok(next)
//! ```
//!
//! There is no local lock. Two processes sharing one backend are as safe
//! as two tasks in one process.

use std::sync::Arc;

use influence_protocol::{Codec, JsonCodec, RoomId};
use influence_store::{keys, KeyValueBackend};
use tracing::{debug, info, warn};

use crate::{Room, RoomError, StoreConfig};

/// Loads, inserts, and mutates rooms.
///
/// Cheap to clone; clones share the backend.
pub struct RoomStateStore<B> {
    backend: Arc<B>,
    config: StoreConfig,
    codec: JsonCodec,
}

impl<B> Clone for RoomStateStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            codec: self.codec,
        }
    }
}

impl<B: KeyValueBackend> RoomStateStore<B> {
    pub fn new(backend: Arc<B>, config: StoreConfig) -> Self {
        Self {
            backend,
            config,
            codec: JsonCodec,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Persists a brand-new room.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyExists`] if the key is taken
    /// - [`RoomError::Record`] / [`RoomError::Backend`]
    pub async fn insert(&self, room: &Room) -> Result<(), RoomError> {
        let encoded = self.codec.encode(room)?;
        let created = self
            .backend
            .compare_and_swap(&keys::room_key(&room.id), None, encoded, self.config.room_ttl)
            .await?;

        if !created {
            return Err(RoomError::AlreadyExists(room.id.clone()));
        }
        info!(room_id = %room.id, "room stored");
        Ok(())
    }

    /// Reads the current room.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if absent or expired
    /// - [`RoomError::Record`] if the stored bytes do not decode
    /// - [`RoomError::Backend`]
    pub async fn load(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        let (_, room) = self.fetch(room_id).await?;
        Ok(room)
    }

    async fn fetch(&self, room_id: &RoomId) -> Result<(Vec<u8>, Room), RoomError> {
        let raw = self
            .backend
            .get(&keys::room_key(room_id))
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let room = self.codec.decode::<Room>(&raw).map_err(|e| {
            warn!(%room_id, error = %e, "stored room does not decode");
            RoomError::from(e)
        })?;
        Ok((raw, room))
    }

    /// Applies `mutator` to the current room and commits the result.
    ///
    /// On a lost compare-and-swap the room is re-read and `mutator` runs
    /// again from scratch, so it must be free of side effects. An `Err`
    /// from `mutator` is returned as-is after a single attempt.
    ///
    /// # Errors
    /// - whatever `mutator` returns
    /// - [`RoomError::Conflict`] once [`RetryPolicy::max_attempts`](crate::RetryPolicy::max_attempts)
    ///   commits have all lost
    /// - [`RoomError::Timeout`] if the whole call outlives
    ///   [`StoreConfig::mutation_timeout`]
    /// - [`RoomError::NotFound`] / [`RoomError::Record`] / [`RoomError::Backend`]
    pub async fn mutate<F>(&self, room_id: &RoomId, mutator: F) -> Result<Room, RoomError>
    where
        F: FnMut(&Room) -> Result<Room, RoomError> + Send,
    {
        let deadline = self.config.mutation_timeout;
        match tokio::time::timeout(deadline, self.mutate_with_retry(room_id, mutator)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%room_id, ?deadline, "room mutation timed out");
                Err(RoomError::Timeout(deadline))
            }
        }
    }

    async fn mutate_with_retry<F>(&self, room_id: &RoomId, mut mutator: F) -> Result<Room, RoomError>
    where
        F: FnMut(&Room) -> Result<Room, RoomError> + Send,
    {
        let policy = &self.config.retry;
        let attempts = policy.attempts();
        let key = keys::room_key(room_id);

        for attempt in 1..=attempts {
            let (current, room) = self.fetch(room_id).await?;
            let next = mutator(&room)?;
            let encoded = self.codec.encode(&next)?;

            let committed = self
                .backend
                .compare_and_swap(&key, Some(current.as_slice()), encoded, self.config.room_ttl)
                .await?;
            if committed {
                debug!(%room_id, attempt, "room mutation committed");
                return Ok(next);
            }

            if attempt < attempts {
                let delay = policy.backoff(attempt, &mut rand::rng());
                debug!(%room_id, attempt, ?delay, "lost compare-and-swap, retrying");
                tokio::time::sleep(delay).await;
            }
        }

        warn!(%room_id, attempts, "room mutation gave up under contention");
        Err(RoomError::Conflict {
            room_id: room_id.clone(),
            attempts,
        })
    }
}

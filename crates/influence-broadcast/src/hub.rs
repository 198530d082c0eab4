//! The broadcast hub: room ID → subscribed connections.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use influence_protocol::{Codec, JsonCodec, ProtocolError, RoomId, ServerEvent};
use influence_transport::{Connection, ConnectionId};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// HubConfig
// ---------------------------------------------------------------------------

/// Settings for [`BroadcastHub`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// How long a single subscriber may take to accept one message before
    /// it is evicted. Default: 2 seconds.
    pub write_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(2),
        }
    }
}

// ---------------------------------------------------------------------------
// PublishReport
// ---------------------------------------------------------------------------

/// Outcome of one [`publish`](BroadcastHub::publish).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that accepted the message.
    pub delivered: usize,
    /// Subscribers removed because their write failed or timed out.
    pub evicted: Vec<ConnectionId>,
}

// ---------------------------------------------------------------------------
// BroadcastHub
// ---------------------------------------------------------------------------

type Subscribers<C> = HashMap<ConnectionId, Arc<C>>;

/// Fans messages out to every connection subscribed to a room.
///
/// The registry sits behind a synchronous `RwLock` that is only ever held
/// for map operations, never across an `.await`. That keeps
/// [`unsubscribe`](Self::unsubscribe) callable from `Drop`.
pub struct BroadcastHub<C> {
    rooms: RwLock<HashMap<RoomId, Subscribers<C>>>,
    config: HubConfig,
    codec: JsonCodec,
}

impl<C: Connection> BroadcastHub<C> {
    pub fn new(config: HubConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
            codec: JsonCodec,
        }
    }

    /// Registers `conn` for `room_id` and returns a guard that
    /// unregisters it when dropped.
    ///
    /// Subscribing the same connection twice to one room replaces the
    /// first registration.
    pub fn subscribe(self: &Arc<Self>, room_id: RoomId, conn: Arc<C>) -> Subscription<C> {
        let conn_id = conn.id();
        self.rooms
            .write()
            .entry(room_id.clone())
            .or_default()
            .insert(conn_id, conn);
        debug!(%room_id, %conn_id, "subscribed");

        Subscription {
            hub: Arc::clone(self),
            room_id,
            conn_id,
        }
    }

    /// Removes one subscription. Returns `true` if it existed.
    ///
    /// A room left without subscribers is dropped from the registry.
    pub fn unsubscribe(&self, room_id: &RoomId, conn_id: ConnectionId) -> bool {
        let mut rooms = self.rooms.write();
        let Some(subscribers) = rooms.get_mut(room_id) else {
            return false;
        };
        let removed = subscribers.remove(&conn_id).is_some();
        if subscribers.is_empty() {
            rooms.remove(room_id);
        }
        if removed {
            debug!(%room_id, %conn_id, "unsubscribed");
        }
        removed
    }

    /// Number of live subscribers for `room_id`.
    pub fn subscriber_count(&self, room_id: &RoomId) -> usize {
        self.rooms.read().get(room_id).map_or(0, HashMap::len)
    }

    /// Number of rooms with at least one subscriber.
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    /// Sends `bytes` to every subscriber of `room_id` concurrently.
    ///
    /// Subscribers whose write fails or exceeds
    /// [`HubConfig::write_timeout`] are evicted and then closed in the
    /// background. Never waits longer than one write timeout in total.
    pub async fn publish(&self, room_id: &RoomId, bytes: &[u8]) -> PublishReport {
        let subscribers = self.snapshot(room_id);
        if subscribers.is_empty() {
            return PublishReport::default();
        }

        let write_timeout = self.config.write_timeout;
        let outcomes = join_all(subscribers.iter().map(|(conn_id, conn)| async move {
            let outcome = tokio::time::timeout(write_timeout, conn.send(bytes)).await;
            (*conn_id, outcome)
        }))
        .await;

        let mut report = PublishReport::default();
        for (conn_id, outcome) in outcomes {
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!(%room_id, %conn_id, error = %e, "subscriber write failed, evicting");
                    report.evicted.push(conn_id);
                }
                Err(_) => {
                    warn!(%room_id, %conn_id, ?write_timeout, "subscriber write timed out, evicting");
                    report.evicted.push(conn_id);
                }
            }
        }

        for conn_id in &report.evicted {
            self.unsubscribe(room_id, *conn_id);
            if let Some((_, conn)) = subscribers.iter().find(|(id, _)| id == conn_id) {
                let conn = Arc::clone(conn);
                tokio::spawn(async move {
                    let _ = tokio::time::timeout(write_timeout, conn.close()).await;
                });
            }
        }

        if !report.evicted.is_empty() {
            info!(
                %room_id,
                delivered = report.delivered,
                evicted = report.evicted.len(),
                "published with evictions"
            );
        }
        report
    }

    /// Encodes `event` as JSON and publishes it to the event's room.
    pub async fn publish_event(&self, event: &ServerEvent) -> Result<PublishReport, ProtocolError> {
        let bytes = self.codec.encode(event)?;
        Ok(self.publish(&event.room_id, &bytes).await)
    }

    fn snapshot(&self, room_id: &RoomId) -> Vec<(ConnectionId, Arc<C>)> {
        self.rooms
            .read()
            .get(room_id)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .map(|(id, conn)| (*id, Arc::clone(conn)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<C: Connection> Default for BroadcastHub<C> {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Keeps a connection subscribed until dropped.
///
/// Unsubscribing on drop means every exit path of a connection's read
/// loop (clean close, error, panic unwind) deregisters exactly once.
pub struct Subscription<C: Connection> {
    hub: Arc<BroadcastHub<C>>,
    room_id: RoomId,
    conn_id: ConnectionId,
}

impl<C: Connection> Subscription<C> {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }
}

impl<C: Connection> Drop for Subscription<C> {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.room_id, self.conn_id);
    }
}

// =========================================================================
// Tests
// =========================================================================

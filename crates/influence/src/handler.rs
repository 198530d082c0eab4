//! Per-connection handler: onboarding, subscription, and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Optionally `create_room` / `join_room` → `onboarded` with a token
//!   2. `subscribe` with that token → registered with the broadcast hub
//!   3. Loop: room-scoped requests answered directly, broadcasts arrive
//!      through the hub on the same connection
//!
//! A refused `subscribe` is answered with an error and the connection is
//! closed without ever being registered. However the loop ends, the hub
//! registration is dropped exactly once and the connection is closed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use influence_broadcast::Subscription;
use influence_protocol::{ClientMessage, Codec, JsonCodec, PublicRoomState, ServerMessage};
use influence_session::{Session, SessionError};
use influence_store::KeyValueBackend;
use influence_transport::Connection;
use tracing::{debug, info, warn};

use crate::service::{GameService, Onboarding};
use crate::InfluenceError;

/// Read deadlines for one connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// How long a socket may take to finish the WebSocket upgrade, and how
    /// long an unsubscribed connection may stay silent. Default: 5 seconds.
    pub handshake_timeout: Duration,

    /// How long a subscribed connection may stay silent. Clients keep the
    /// connection alive with `heartbeat`. Default: 30 seconds.
    pub idle_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// A connection admitted to one room's broadcasts.
///
/// Dropping it drops the hub registration.
struct Subscribed<C: Connection> {
    session: Session,
    _subscription: Subscription<C>,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<B, C>(
    conn: C,
    service: Arc<GameService<B, C>>,
    config: ConnectionConfig,
) -> Result<(), InfluenceError>
where
    B: KeyValueBackend,
    C: Connection,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    debug!(%conn_id, "handling new connection");

    let mut subscribed = None;
    let result = serve(&conn, &service, config, &mut subscribed).await;

    drop(subscribed);
    if let Err(e) = conn.close().await {
        debug!(%conn_id, error = %e, "close failed");
    }
    result
}

async fn serve<B, C>(
    conn: &Arc<C>,
    service: &GameService<B, C>,
    config: ConnectionConfig,
    subscribed: &mut Option<Subscribed<C>>,
) -> Result<(), InfluenceError>
where
    B: KeyValueBackend,
    C: Connection,
{
    let conn_id = conn.id();

    loop {
        let wait = if subscribed.is_some() {
            config.idle_timeout
        } else {
            config.handshake_timeout
        };

        let data = match tokio::time::timeout(wait, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                debug!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                info!(%conn_id, ?wait, "connection timed out");
                return Ok(());
            }
        };

        let msg: ClientMessage = match JsonCodec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%conn_id, error = %e, "failed to decode client message");
                send_error(conn.as_ref(), &InfluenceError::from(e)).await?;
                continue;
            }
        };

        match msg {
            ClientMessage::CreateRoom { nickname } => {
                let outcome = service.create_room(&nickname).await;
                reply(conn.as_ref(), outcome, onboarded_reply).await?;
            }

            ClientMessage::JoinRoom { code, nickname } => {
                let outcome = service.join(code.as_str(), &nickname).await;
                reply(conn.as_ref(), outcome, onboarded_reply).await?;
            }

            ClientMessage::Subscribe { room_id, token } => {
                // A connection follows one room at a time.
                *subscribed = None;

                let session = match service.authorize(&room_id, &token).await {
                    Ok(session) => session,
                    Err(e) => {
                        warn!(%conn_id, %room_id, code = e.code(), "subscribe refused");
                        send_error(conn.as_ref(), &e).await?;
                        return Err(e);
                    }
                };

                // Register before reading the state so no commit slips
                // between the snapshot and the first broadcast.
                let subscription = service.hub().subscribe(room_id.clone(), Arc::clone(conn));
                let state = match service.view(&room_id, &session.token).await {
                    Ok(state) => state,
                    Err(e) => {
                        drop(subscription);
                        send_error(conn.as_ref(), &e).await?;
                        return Err(e);
                    }
                };

                info!(%conn_id, %room_id, participant_id = %session.participant_id, "subscribed");
                send(
                    conn.as_ref(),
                    &ServerMessage::Subscribed {
                        participant_id: session.participant_id.clone(),
                        state,
                    },
                )
                .await?;
                *subscribed = Some(Subscribed {
                    session,
                    _subscription: subscription,
                });
            }

            ClientMessage::StartGame => {
                let Some(session) = session_of(subscribed) else {
                    send_error(conn.as_ref(), &not_subscribed()).await?;
                    continue;
                };
                let outcome = service.start(&session.room_id, &session.token).await;
                reply(conn.as_ref(), outcome, state_reply).await?;
            }

            ClientMessage::DeclareAction { action, target_id } => {
                let Some(session) = session_of(subscribed) else {
                    send_error(conn.as_ref(), &not_subscribed()).await?;
                    continue;
                };
                let outcome = service
                    .declare_action(&session.room_id, &action, target_id.as_ref(), &session.token)
                    .await;
                reply(conn.as_ref(), outcome, state_reply).await?;
            }

            ClientMessage::FetchState => {
                let Some(session) = session_of(subscribed) else {
                    send_error(conn.as_ref(), &not_subscribed()).await?;
                    continue;
                };
                let outcome = service.view(&session.room_id, &session.token).await;
                reply(conn.as_ref(), outcome, state_reply).await?;
            }

            ClientMessage::Heartbeat { client_time } => {
                send(
                    conn.as_ref(),
                    &ServerMessage::HeartbeatAck {
                        client_time,
                        server_time: Utc::now().timestamp_millis(),
                    },
                )
                .await?;
            }

            ClientMessage::Disconnect { reason } => {
                info!(%conn_id, %reason, "client disconnected");
                return Ok(());
            }
        }
    }
}

fn session_of<C: Connection>(subscribed: &Option<Subscribed<C>>) -> Option<&Session> {
    subscribed.as_ref().map(|s| &s.session)
}

fn not_subscribed() -> InfluenceError {
    SessionError::InvalidSession.into()
}

fn onboarded_reply(onboarding: Onboarding) -> ServerMessage {
    ServerMessage::Onboarded {
        participant_id: onboarding.participant,
        token: onboarding.token,
        state: onboarding.state,
    }
}

fn state_reply(state: PublicRoomState) -> ServerMessage {
    ServerMessage::State { state }
}

/// Sends the success message or the error. Only a failed send is an
/// error for the connection.
async fn reply<C, T>(
    conn: &C,
    outcome: Result<T, InfluenceError>,
    to_message: impl FnOnce(T) -> ServerMessage,
) -> Result<(), InfluenceError>
where
    C: Connection,
{
    match outcome {
        Ok(value) => send(conn, &to_message(value)).await,
        Err(e) => {
            debug!(conn_id = %conn.id(), error = %e, "request refused");
            send_error(conn, &e).await
        }
    }
}

async fn send<C: Connection>(conn: &C, msg: &ServerMessage) -> Result<(), InfluenceError> {
    let bytes = JsonCodec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

async fn send_error<C: Connection>(conn: &C, err: &InfluenceError) -> Result<(), InfluenceError> {
    send(
        conn,
        &ServerMessage::Error {
            status: err.status(),
            code: err.code().to_string(),
        },
    )
    .await
}

//! `GameService`: the typed entry points every surface calls.
//!
//! Each mutating call follows the same path:
//!
//! ```text
//! admission (join code / session) ──► RoomStateStore::mutate ──► project ──► publish
//! ```
//!
//! Publishing happens after the commit and before the call returns. A
//! failed publish is logged and never undoes the commit.

use std::sync::Arc;

use influence_broadcast::BroadcastHub;
use influence_protocol::{
    ActionKind, EventPayload, EventType, ParticipantId, PublicRoomState, RoomId, ServerEvent,
};
use influence_room::{project, rules, ActionContext, ActionRegistry, Participant, Room, RoomConfig, RoomStateStore};
use influence_session::{JoinCodeRegistry, Session, SessionRegistry};
use influence_store::KeyValueBackend;
use influence_transport::Connection;
use serde_json::Value;
use tracing::{info, warn};

use crate::InfluenceError;

/// What a newly admitted participant gets back.
#[derive(Debug, Clone)]
pub struct Onboarding {
    /// The room as this participant sees it.
    pub state: PublicRoomState,
    pub participant: ParticipantId,
    /// Bearer token for every later call.
    pub token: String,
}

/// Orchestrates admission, room mutation, projection, and fanout.
///
/// All fields are cheap handles, so the service is shared behind one
/// `Arc` by every connection task.
pub struct GameService<B, C> {
    rooms: RoomStateStore<B>,
    codes: JoinCodeRegistry<B>,
    sessions: SessionRegistry<B>,
    actions: ActionRegistry,
    room_config: RoomConfig,
    hub: Arc<BroadcastHub<C>>,
}

impl<B: KeyValueBackend, C: Connection> GameService<B, C> {
    pub fn new(
        rooms: RoomStateStore<B>,
        codes: JoinCodeRegistry<B>,
        sessions: SessionRegistry<B>,
        hub: Arc<BroadcastHub<C>>,
    ) -> Self {
        Self {
            rooms,
            codes,
            sessions,
            actions: ActionRegistry::default(),
            room_config: RoomConfig::default(),
            hub,
        }
    }

    /// Replaces the action handlers.
    pub fn with_actions(mut self, actions: ActionRegistry) -> Self {
        self.actions = actions;
        self
    }

    /// Replaces the participant limits.
    pub fn with_room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// The hub this service publishes to.
    pub fn hub(&self) -> &Arc<BroadcastHub<C>> {
        &self.hub
    }

    /// Creates a room with `nickname` as its admin.
    ///
    /// If the room cannot be stored, the join code reserved for it is
    /// released again.
    pub async fn create_room(&self, nickname: &str) -> Result<Onboarding, InfluenceError> {
        let nickname = require("nickname", nickname)?;

        let room_id = RoomId::generate();
        let code = self.codes.reserve(&room_id).await?;
        let room = Room::new(room_id, code.clone(), Participant::new(nickname));

        if let Err(e) = self.rooms.insert(&room).await {
            warn!(room_id = %room.id, error = %e, "room not stored, releasing join code");
            self.codes.release(&code).await;
            return Err(e.into());
        }

        let admin = room.admin_id.clone();
        let session = self.sessions.issue(&room.id, &admin).await?;
        info!(room_id = %room.id, join_code = %code, participant_id = %admin, "room created");

        self.publish(EventType::RoomCreated, &room, None).await;
        Ok(Onboarding {
            state: project(&room, Some(&admin)),
            participant: admin,
            token: session.token,
        })
    }

    /// Adds `nickname` to the lobby of the room behind `code`.
    pub async fn join(&self, code: &str, nickname: &str) -> Result<Onboarding, InfluenceError> {
        let code = require("code", code)?;
        let nickname = require("nickname", nickname)?;

        let room_id = self.codes.resolve(code).await?;
        let newcomer = Participant::new(nickname);
        let room = self
            .rooms
            .mutate(&room_id, |room| rules::join(room, &newcomer, &self.room_config))
            .await?;

        let session = self.sessions.issue(&room.id, &newcomer.id).await?;
        info!(%room_id, participant_id = %newcomer.id, "participant joined");

        let mut payload = EventPayload::new();
        payload.insert("participantID".into(), Value::from(newcomer.id.as_str()));
        payload.insert("nickname".into(), Value::from(newcomer.nickname.as_str()));
        self.publish(EventType::ParticipantJoined, &room, Some(payload)).await;

        Ok(Onboarding {
            state: project(&room, Some(&newcomer.id)),
            participant: newcomer.id,
            token: session.token,
        })
    }

    /// Starts the game. Only the admin may call this.
    pub async fn start(&self, room_id: &RoomId, token: &str) -> Result<PublicRoomState, InfluenceError> {
        let session = self.authorize(room_id, token).await?;
        let caller = &session.participant_id;

        let room = self
            .rooms
            .mutate(room_id, |room| rules::start(room, caller, &self.room_config))
            .await?;
        info!(%room_id, participants = room.participants.len(), "game started");

        self.publish(EventType::GameStarted, &room, None).await;
        Ok(project(&room, Some(caller)))
    }

    /// Applies the handler registered for `action` on behalf of the
    /// token's participant.
    pub async fn declare_action(
        &self,
        room_id: &RoomId,
        action: &str,
        target_id: Option<&ParticipantId>,
        token: &str,
    ) -> Result<PublicRoomState, InfluenceError> {
        let action = require("action", action)?;
        let session = self.authorize(room_id, token).await?;
        let actor = &session.participant_id;

        let handler = self.actions.lookup(action)?;
        let ctx = ActionContext {
            actor,
            target: target_id,
            config: &self.room_config,
        };
        let room = self.rooms.mutate(room_id, |room| handler.apply(room, ctx)).await?;
        info!(%room_id, participant_id = %actor, action, "action resolved");

        let event_type = if action == ActionKind::Start.as_str() {
            EventType::GameStarted
        } else {
            EventType::ActionResolved
        };
        let mut payload = EventPayload::new();
        payload.insert("action".into(), Value::from(action));
        payload.insert("actorID".into(), Value::from(actor.as_str()));
        if let Some(target) = target_id {
            payload.insert("targetID".into(), Value::from(target.as_str()));
        }
        self.publish(event_type, &room, Some(payload)).await;

        Ok(project(&room, Some(actor)))
    }

    /// The room as the token's participant sees it.
    pub async fn view(&self, room_id: &RoomId, token: &str) -> Result<PublicRoomState, InfluenceError> {
        let session = self.authorize(room_id, token).await?;
        let room = self.rooms.load(room_id).await?;
        Ok(project(&room, Some(&session.participant_id)))
    }

    /// Checks that `token` is a live session for `room_id`.
    pub async fn authorize(&self, room_id: &RoomId, token: &str) -> Result<Session, InfluenceError> {
        let token = require("token", token)?;
        Ok(self.sessions.resolve_for_room(token, room_id).await?)
    }

    /// Broadcasts the neutral projection. Viewers that need their own
    /// cards ask with [`view`](Self::view).
    async fn publish(&self, event_type: EventType, room: &Room, payload: Option<EventPayload>) {
        let mut event = ServerEvent::new(event_type, room.id.clone()).with_state(project(room, None));
        if let Some(payload) = payload {
            event = event.with_payload(payload);
        }
        if let Err(e) = self.hub.publish_event(&event).await {
            warn!(room_id = %room.id, ?event_type, error = %e, "event not published");
        }
    }
}

fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, InfluenceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfluenceError::Validation { field });
    }
    Ok(value)
}

//! Stream protocol: what clients send over a live connection and what the
//! server replies directly.
//!
//! Broadcasts are not part of this enum. They are raw [`ServerEvent`]
//! JSON (keyed by `eventType`), while direct replies are keyed by `type`.
//!
//! [`ServerEvent`]: crate::ServerEvent

use serde::{Deserialize, Serialize};

use crate::{JoinCode, ParticipantId, PublicRoomState, RoomId};

/// Client → Server.
///
/// `create_room` and `join_room` are accepted before `subscribe`; they
/// hand out the session token the client then subscribes with. The rest
/// require a subscribed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        nickname: String,
    },
    JoinRoom {
        code: JoinCode,
        nickname: String,
    },
    /// Binds this connection to a room's broadcasts.
    Subscribe {
        #[serde(rename = "roomID")]
        room_id: RoomId,
        token: String,
    },
    StartGame,
    DeclareAction {
        action: String,
        #[serde(default, rename = "targetID", skip_serializing_if = "Option::is_none")]
        target_id: Option<ParticipantId>,
    },
    /// Asks for the caller's own (unredacted where allowed) view.
    FetchState,
    Heartbeat {
        client_time: u64,
    },
    Disconnect {
        reason: String,
    },
}

/// Server → Client, in reply to a [`ClientMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A room was created or joined. Keep `token`; it is the only
    /// credential for this participant.
    Onboarded {
        #[serde(rename = "participantID")]
        participant_id: ParticipantId,
        token: String,
        state: PublicRoomState,
    },
    Subscribed {
        #[serde(rename = "participantID")]
        participant_id: ParticipantId,
        state: PublicRoomState,
    },
    State {
        state: PublicRoomState,
    },
    HeartbeatAck {
        client_time: u64,
        server_time: i64,
    },
    /// `status` follows HTTP conventions; `code` is a stable snake_case
    /// identifier clients can switch on.
    Error {
        status: u16,
        code: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags_are_snake_case() {
        let msg = ClientMessage::Subscribe {
            room_id: RoomId::new("r-1"),
            token: "tok".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "subscribe");
        assert_eq!(json["roomID"], "r-1");
        assert_eq!(json["token"], "tok");
    }

    #[test]
    fn test_declare_action_target_is_optional() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"declare_action","action":"income"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::DeclareAction { action: "income".into(), target_id: None }
        );

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"declare_action","action":"steal","targetID":"p-2"}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::DeclareAction { target_id: Some(ref t), .. } if t.as_str() == "p-2"
        ));
    }

    #[test]
    fn test_unit_variants_decode() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start_game"}"#).unwrap();
        assert_eq!(msg, ClientMessage::StartGame);
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"fetch_state"}"#).unwrap();
        assert_eq!(msg, ClientMessage::FetchState);
    }

    #[test]
    fn test_server_error_json_format() {
        let msg = ServerMessage::Error { status: 401, code: "invalid_session".into() };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["status"], 401);
        assert_eq!(json["code"], "invalid_session");
    }

    #[test]
    fn test_unknown_client_message_type_returns_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"fly_to_moon"}"#);
        assert!(result.is_err());
    }
}

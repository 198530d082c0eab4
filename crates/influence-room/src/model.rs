//! The persisted room aggregate.
//!
//! These types are what the backend stores (as JSON) under
//! `room:<roomID>`. They hold everything, hidden roles and the deck
//! included, so they never go to clients directly: see
//! [`project`](crate::project).

use chrono::{DateTime, Utc};
use influence_protocol::{ActionKind, JoinCode, LifecycleState, ParticipantId, Role, RoomId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Influence
// ---------------------------------------------------------------------------

/// One role card, face down until revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Influence {
    pub role: Role,
    pub revealed: bool,
}

impl Influence {
    /// A face-down card.
    pub fn hidden(role: Role) -> Self {
        Self {
            role,
            revealed: false,
        }
    }

    /// Actions this card lets its holder claim.
    pub fn actions(&self) -> &'static [ActionKind] {
        self.role.actions()
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// A joined player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub nickname: String,
    pub coins: u32,
    pub alive: bool,
    pub influences: Vec<Influence>,
}

impl Participant {
    /// A fresh lobby participant with a random ID.
    ///
    /// No coins and not alive: both are set when the game starts.
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::generate(),
            nickname: nickname.into(),
            coins: 0,
            alive: false,
            influences: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One match instance.
///
/// `turn_index` is meaningful only once started, and always taken modulo
/// the participant count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "adminID")]
    pub admin_id: ParticipantId,
    pub join_code: JoinCode,
    pub participants: Vec<Participant>,
    pub turn_index: usize,
    pub lifecycle: LifecycleState,
    pub deck: Vec<Influence>,
}

impl Room {
    /// A lobby room whose only participant is its admin.
    pub fn new(id: RoomId, join_code: JoinCode, admin: Participant) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            admin_id: admin.id.clone(),
            join_code,
            participants: vec![admin],
            turn_index: 0,
            lifecycle: LifecycleState::Lobby,
            deck: Vec::new(),
        }
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.id == id)
    }

    pub fn is_admin(&self, id: &ParticipantId) -> bool {
        &self.admin_id == id
    }

    /// Returns `true` if a participant already uses `nickname`.
    pub fn has_nickname(&self, nickname: &str) -> bool {
        self.participants.iter().any(|p| p.nickname == nickname)
    }

    /// Whose turn it is. `None` only for an empty room.
    pub fn current_participant(&self) -> Option<&Participant> {
        let len = self.participants.len();
        if len == 0 {
            return None;
        }
        self.participants.get(self.turn_index % len)
    }

    /// Moves the turn to the next living participant.
    ///
    /// If nobody is alive the turn still advances by one seat.
    pub fn advance_turn(&mut self) {
        let len = self.participants.len();
        if len == 0 {
            return;
        }
        let from = self.turn_index % len;
        self.turn_index = (1..=len)
            .map(|step| (from + step) % len)
            .find(|&seat| self.participants[seat].alive)
            .unwrap_or((from + 1) % len);
    }

    /// Influences held by participants.
    pub fn dealt_count(&self) -> usize {
        self.participants.iter().map(|p| p.influences.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use influence_protocol::{Codec, JsonCodec};

    use super::*;

    fn room_with(nicknames: &[&str]) -> Room {
        let mut participants = nicknames.iter().map(|n| Participant::new(*n));
        let admin = participants.next().unwrap();
        let mut room = Room::new(RoomId::new("r-1"), JoinCode::new("ABC234"), admin);
        room.participants.extend(participants);
        room
    }

    #[test]
    fn test_new_room_admin_is_first_participant() {
        let room = room_with(&["alice"]);
        assert_eq!(room.participants.len(), 1);
        assert!(room.is_admin(&room.participants[0].id));
        assert_eq!(room.lifecycle, LifecycleState::Lobby);
        assert!(room.deck.is_empty());
    }

    #[test]
    fn test_new_participant_is_not_alive_and_broke() {
        let p = Participant::new("bob");
        assert_eq!(p.coins, 0);
        assert!(!p.alive);
        assert!(p.influences.is_empty());
    }

    #[test]
    fn test_has_nickname_is_exact() {
        let room = room_with(&["alice", "bob"]);
        assert!(room.has_nickname("bob"));
        assert!(!room.has_nickname("Bob"));
    }

    #[test]
    fn test_advance_turn_skips_dead_participants() {
        let mut room = room_with(&["a", "b", "c"]);
        room.participants[0].alive = true;
        room.participants[1].alive = false;
        room.participants[2].alive = true;

        room.advance_turn();
        assert_eq!(room.turn_index, 2);

        room.advance_turn();
        assert_eq!(room.turn_index, 0);
    }

    #[test]
    fn test_advance_turn_nobody_alive_moves_one_seat() {
        let mut room = room_with(&["a", "b"]);
        room.advance_turn();
        assert_eq!(room.turn_index, 1);
    }

    #[test]
    fn test_current_participant_wraps_index() {
        let mut room = room_with(&["a", "b"]);
        room.turn_index = 3;
        assert_eq!(room.current_participant().unwrap().nickname, "b");
    }

    #[test]
    fn test_room_json_round_trip_preserves_every_field() {
        let mut room = room_with(&["alice", "bob", "carol"]);
        room.lifecycle = LifecycleState::Started;
        room.turn_index = 2;
        room.participants[1].coins = 7;
        room.participants[1].alive = true;
        room.participants[1].influences = vec![
            Influence::hidden(Role::Duke),
            Influence {
                role: Role::Captain,
                revealed: true,
            },
        ];
        room.deck = vec![Influence::hidden(Role::Contessa)];

        let bytes = JsonCodec.encode(&room).unwrap();
        let decoded: Room = JsonCodec.decode(&bytes).unwrap();

        assert_eq!(decoded, room);
    }

    #[test]
    fn test_influence_actions_follow_role() {
        assert_eq!(
            Influence::hidden(Role::Assassin).actions(),
            &[ActionKind::Assassinate]
        );
        for role in Role::ALL {
            assert_eq!(Influence::hidden(role).actions(), role.actions());
        }
    }
}

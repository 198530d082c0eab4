//! Error types for the room layer.

use std::time::Duration;

use influence_protocol::{ProtocolError, RoomId};
use influence_store::BackendError;

/// Errors that can occur during room operations.
///
/// Rule violations (everything from `AlreadyStarted` to `InvalidAction`)
/// are raised inside a mutator and abort [`mutate`](crate::RoomStateStore::mutate)
/// immediately. Only a lost compare-and-swap is retried, and running out of
/// attempts is [`Conflict`](Self::Conflict).
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (or its key expired).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// `insert` found a room already stored under this ID.
    #[error("room {0} already exists")]
    AlreadyExists(RoomId),

    /// The game has already started.
    #[error("game already started")]
    AlreadyStarted,

    /// The game is over.
    #[error("game already finished")]
    AlreadyFinished,

    /// The action needs a started game.
    #[error("game not started")]
    NotStarted,

    /// Another participant in the lobby already uses this nickname.
    #[error("nickname {0:?} already taken in this room")]
    PlayerAlreadyJoined(String),

    /// The room is at (or a start would exceed) the participant limit.
    #[error("too many players (max {max})")]
    TooManyPlayers { max: usize },

    /// Too few participants to start.
    #[error("not enough players (min {min})")]
    NotEnoughPlayers { min: usize },

    /// Only the room's admin may start the game.
    #[error("only the admin can start the game")]
    OnlyAdminCanStart,

    /// The deck cannot cover the deal.
    #[error("not enough influences in the deck")]
    NotEnoughInfluences,

    /// The actor does not hold the turn.
    #[error("not your turn")]
    NotYourTurn,

    /// The actor is not a participant of this room.
    #[error("not a participant of this room")]
    NotAParticipant,

    /// The action name is unknown or has no handler.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Every attempt lost the compare-and-swap race.
    #[error("room {room_id} is contended, gave up after {attempts} attempts")]
    Conflict { room_id: RoomId, attempts: u32 },

    /// The mutation did not finish within its deadline.
    #[error("room mutation timed out after {0:?}")]
    Timeout(Duration),

    /// The stored record could not be encoded or decoded.
    #[error(transparent)]
    Record(#[from] ProtocolError),

    /// The backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

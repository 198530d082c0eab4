//! Pure room transitions.
//!
//! Each function takes the current room by reference and returns the next
//! one, or the rule it would break. No I/O happens here, so these are
//! safe to run (and re-run) inside [`RoomStateStore::mutate`](crate::RoomStateStore::mutate).

use influence_protocol::{LifecycleState, ParticipantId, Role};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::{Influence, Participant, Room, RoomConfig, RoomError};

/// Copies of each role in the base deck.
pub const COPIES_PER_ROLE: usize = 3;

/// Cards dealt to every participant on start.
pub const INFLUENCES_PER_PARTICIPANT: usize = 2;

/// Coins every participant starts the game with.
pub const STARTING_COINS: u32 = 2;

/// The 15-card deck, unshuffled: three of each role.
pub fn base_deck() -> Vec<Influence> {
    Role::ALL
        .iter()
        .flat_map(|&role| std::iter::repeat_n(Influence::hidden(role), COPIES_PER_ROLE))
        .collect()
}

/// Rejects anything but a lobby.
fn require_lobby(room: &Room) -> Result<(), RoomError> {
    match room.lifecycle {
        LifecycleState::Lobby => Ok(()),
        LifecycleState::Started => Err(RoomError::AlreadyStarted),
        LifecycleState::Finished => Err(RoomError::AlreadyFinished),
    }
}

/// Adds `newcomer` to the lobby.
///
/// # Errors
/// - [`RoomError::AlreadyStarted`] / [`RoomError::AlreadyFinished`]
/// - [`RoomError::PlayerAlreadyJoined`] if the nickname is taken
/// - [`RoomError::TooManyPlayers`] if the room is full
pub fn join(room: &Room, newcomer: &Participant, config: &RoomConfig) -> Result<Room, RoomError> {
    require_lobby(room)?;

    if room.has_nickname(&newcomer.nickname) {
        return Err(RoomError::PlayerAlreadyJoined(newcomer.nickname.clone()));
    }
    if room.participants.len() >= config.max_participants {
        return Err(RoomError::TooManyPlayers {
            max: config.max_participants,
        });
    }

    let mut next = room.clone();
    next.participants.push(newcomer.clone());
    Ok(next)
}

/// Starts the game, shuffling with the thread-local RNG.
pub fn start(room: &Room, caller: &ParticipantId, config: &RoomConfig) -> Result<Room, RoomError> {
    start_with_rng(room, caller, config, &mut rand::rng())
}

/// Starts the game: shuffles a fresh deck and deals in seat order.
///
/// Every participant gets [`INFLUENCES_PER_PARTICIPANT`] face-down cards,
/// [`STARTING_COINS`] coins, and comes alive. The turn goes to seat 0 and
/// the undealt cards become the shared deck.
///
/// # Errors
/// - [`RoomError::OnlyAdminCanStart`] if `caller` is not the admin
/// - [`RoomError::AlreadyStarted`] / [`RoomError::AlreadyFinished`]
/// - [`RoomError::NotEnoughPlayers`] / [`RoomError::TooManyPlayers`]
///   outside the configured bounds
/// - [`RoomError::NotEnoughInfluences`] if the deck cannot cover the deal
pub fn start_with_rng<R: Rng + ?Sized>(
    room: &Room,
    caller: &ParticipantId,
    config: &RoomConfig,
    rng: &mut R,
) -> Result<Room, RoomError> {
    if !room.is_admin(caller) {
        return Err(RoomError::OnlyAdminCanStart);
    }
    require_lobby(room)?;

    let count = room.participants.len();
    if count < config.min_participants {
        return Err(RoomError::NotEnoughPlayers {
            min: config.min_participants,
        });
    }
    if count > config.max_participants {
        return Err(RoomError::TooManyPlayers {
            max: config.max_participants,
        });
    }

    let mut deck = base_deck();
    if deck.len() < count * INFLUENCES_PER_PARTICIPANT {
        return Err(RoomError::NotEnoughInfluences);
    }
    deck.shuffle(rng);

    let mut next = room.clone();
    for participant in &mut next.participants {
        let hand = deck.split_off(deck.len() - INFLUENCES_PER_PARTICIPANT);
        participant.influences = hand;
        participant.coins = STARTING_COINS;
        participant.alive = true;
    }
    next.deck = deck;
    next.turn_index = 0;
    next.lifecycle = LifecycleState::Started;
    Ok(next)
}

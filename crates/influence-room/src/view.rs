//! Viewer-scoped projection of a room.
//!
//! Every field the projection exposes belongs to a [`FieldClass`], and
//! every class has one declared [`Visibility`]. [`project`] runs all of
//! them through the same predicate, so changing who may see what is a
//! one-line edit in [`FieldClass::visibility`].
//!
//! ```text
//!                    anonymous   participant   owner   admin
//! Public                 ✓            ✓          ✓       ✓
//! OwnerOnly                                      ✓       ✓
//! AdminDebug                                             ✓
//! ```

use influence_protocol::{
    ParticipantId, PublicInfluence, PublicParticipant, PublicRoomState,
};

use crate::{Influence, Participant, Room};

/// Who may see a class of field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Everyone, including the neutral broadcast view.
    Public,
    /// The participant the field belongs to.
    OwnerOnly,
    /// The room's admin only. Used for state a player must never see
    /// mid-game, such as the order of the undealt deck.
    AdminDebug,
}

/// The kinds of field a projection contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    HiddenRole,
    RevealedRole,
    Coins,
    Alive,
    TurnIndex,
    Lifecycle,
    DeckRemaining,
    DeckContents,
}

impl FieldClass {
    /// The visibility table.
    pub const fn visibility(self) -> Visibility {
        match self {
            Self::HiddenRole => Visibility::OwnerOnly,
            Self::RevealedRole
            | Self::Coins
            | Self::Alive
            | Self::TurnIndex
            | Self::Lifecycle
            | Self::DeckRemaining => Visibility::Public,
            Self::DeckContents => Visibility::AdminDebug,
        }
    }
}

/// Who is looking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer<'a> {
    /// Nobody in particular: the broadcast view.
    Anonymous,
    Participant(&'a ParticipantId),
    /// The admin sees every class.
    Admin(&'a ParticipantId),
}

impl<'a> Viewer<'a> {
    /// Classifies `viewer` against `room`. IDs that are not in the room
    /// are treated as anonymous.
    pub fn of(room: &Room, viewer: Option<&'a ParticipantId>) -> Self {
        match viewer {
            Some(id) if room.is_admin(id) => Self::Admin(id),
            Some(id) if room.participant(id).is_some() => Self::Participant(id),
            _ => Self::Anonymous,
        }
    }
}

impl Visibility {
    /// The one predicate: may `viewer` see a field of this visibility that
    /// belongs to `owner` (`None` for room-level fields)?
    pub fn allows(self, viewer: Viewer<'_>, owner: Option<&ParticipantId>) -> bool {
        match (self, viewer) {
            (_, Viewer::Admin(_)) => true,
            (Self::Public, _) => true,
            (Self::OwnerOnly, Viewer::Participant(id)) => owner == Some(id),
            (Self::OwnerOnly, Viewer::Anonymous) => false,
            (Self::AdminDebug, _) => false,
        }
    }
}

/// Returns `value` if `viewer` may see `class`, else the type's default.
fn shown<T: Default>(
    class: FieldClass,
    viewer: Viewer<'_>,
    owner: Option<&ParticipantId>,
    value: T,
) -> T {
    if class.visibility().allows(viewer, owner) {
        value
    } else {
        T::default()
    }
}

fn project_influence(
    influence: &Influence,
    viewer: Viewer<'_>,
    owner: &ParticipantId,
) -> PublicInfluence {
    let class = if influence.revealed {
        FieldClass::RevealedRole
    } else {
        FieldClass::HiddenRole
    };
    PublicInfluence {
        role: shown(class, viewer, Some(owner), Some(influence.role)),
        revealed: influence.revealed,
    }
}

fn project_participant(participant: &Participant, viewer: Viewer<'_>) -> PublicParticipant {
    let owner = Some(&participant.id);
    PublicParticipant {
        id: participant.id.clone(),
        nickname: participant.nickname.clone(),
        coins: shown(FieldClass::Coins, viewer, owner, participant.coins),
        alive: shown(FieldClass::Alive, viewer, owner, participant.alive),
        influences: participant
            .influences
            .iter()
            .map(|influence| project_influence(influence, viewer, &participant.id))
            .collect(),
    }
}

/// Builds the state `viewer` is allowed to see.
///
/// Pure and deterministic: the same room and viewer always give an equal
/// result. `None` gives the neutral projection used for broadcasts, in
/// which no hidden role appears.
pub fn project(room: &Room, viewer: Option<&ParticipantId>) -> PublicRoomState {
    let viewer = Viewer::of(room, viewer);
    PublicRoomState {
        room_id: room.id.clone(),
        join_code: room.join_code.clone(),
        admin_id: room.admin_id.clone(),
        lifecycle: shown(FieldClass::Lifecycle, viewer, None, room.lifecycle),
        turn_index: shown(FieldClass::TurnIndex, viewer, None, room.turn_index),
        participants: room
            .participants
            .iter()
            .map(|participant| project_participant(participant, viewer))
            .collect(),
        deck_remaining: shown(FieldClass::DeckRemaining, viewer, None, room.deck.len()),
        deck: shown(
            FieldClass::DeckContents,
            viewer,
            None,
            room.deck.iter().map(|influence| influence.role).collect(),
        ),
    }
}

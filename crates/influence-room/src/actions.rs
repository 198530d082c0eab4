//! Declared actions and their handlers.
//!
//! An [`ActionHandler`] is the rule for one action: given the current
//! room and who is acting, produce the next room. Handlers are pure, so
//! the store can run them again after losing a compare-and-swap.
//!
//! New rules plug in through [`ActionRegistry::register`] without any
//! change to the store or the service above it.

use std::collections::HashMap;
use std::sync::Arc;

use influence_protocol::{ActionKind, LifecycleState, ParticipantId};

use crate::{rules, Room, RoomConfig, RoomError};

/// Everything a handler knows about the request besides the room.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    /// Who declared the action.
    pub actor: &'a ParticipantId,

    /// Optional target participant.
    pub target: Option<&'a ParticipantId>,

    pub config: &'a RoomConfig,
}

/// The rule for one declared action.
///
/// # Example
///
/// ```rust
/// use influence_room::{ActionContext, ActionHandler, Room, RoomError};
///
/// /// Gives the actor one coin, any time.
/// struct Gift;
///
/// impl ActionHandler for Gift {
///     fn apply(&self, room: &Room, ctx: ActionContext<'_>) -> Result<Room, RoomError> {
///         let mut next = room.clone();
///         let actor = next
///             .participant_mut(ctx.actor)
///             .ok_or(RoomError::NotAParticipant)?;
///         actor.coins += 1;
///         Ok(next)
///     }
/// }
/// ```
pub trait ActionHandler: Send + Sync + 'static {
    /// Returns the next room, or the rule the action breaks.
    ///
    /// Must not perform I/O: it may run several times per request.
    fn apply(&self, room: &Room, ctx: ActionContext<'_>) -> Result<Room, RoomError>;
}

// ---------------------------------------------------------------------------
// Built-in handlers
// ---------------------------------------------------------------------------

/// `start`: same rule as starting the game directly.
#[derive(Debug, Default)]
pub struct StartGame;

impl ActionHandler for StartGame {
    fn apply(&self, room: &Room, ctx: ActionContext<'_>) -> Result<Room, RoomError> {
        rules::start(room, ctx.actor, ctx.config)
    }
}

/// `income`: the acting participant takes one coin and the turn passes.
#[derive(Debug, Default)]
pub struct Income;

impl ActionHandler for Income {
    fn apply(&self, room: &Room, ctx: ActionContext<'_>) -> Result<Room, RoomError> {
        require_turn(room, ctx.actor)?;
        let mut next = room.clone();
        if let Some(actor) = next.participant_mut(ctx.actor) {
            actor.coins += 1;
        }
        next.advance_turn();
        Ok(next)
    }
}

/// `end_turn`: the turn passes without any other effect.
#[derive(Debug, Default)]
pub struct EndTurn;

impl ActionHandler for EndTurn {
    fn apply(&self, room: &Room, ctx: ActionContext<'_>) -> Result<Room, RoomError> {
        require_turn(room, ctx.actor)?;
        let mut next = room.clone();
        next.advance_turn();
        Ok(next)
    }
}

/// The game must be running and `actor` must be the living participant
/// whose turn it is.
fn require_turn(room: &Room, actor: &ParticipantId) -> Result<(), RoomError> {
    match room.lifecycle {
        LifecycleState::Started => {}
        LifecycleState::Lobby => return Err(RoomError::NotStarted),
        LifecycleState::Finished => return Err(RoomError::AlreadyFinished),
    }
    if room.participant(actor).is_none() {
        return Err(RoomError::NotAParticipant);
    }
    match room.current_participant() {
        Some(current) if &current.id == actor && current.alive => Ok(()),
        _ => Err(RoomError::NotYourTurn),
    }
}

// ---------------------------------------------------------------------------
// ActionRegistry
// ---------------------------------------------------------------------------

/// Maps action names to handlers.
///
/// Cheap to clone; handlers are shared.
#[derive(Clone)]
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl Default for ActionRegistry {
    /// A registry with the built-in handlers.
    fn default() -> Self {
        Self::empty()
            .with(ActionKind::Start, StartGame)
            .with(ActionKind::Income, Income)
            .with(ActionKind::EndTurn, EndTurn)
    }
}

impl ActionRegistry {
    /// A registry with no handlers at all.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers (or replaces) the handler for `kind`.
    pub fn register(&mut self, kind: ActionKind, handler: impl ActionHandler) {
        self.handlers.insert(kind, Arc::new(handler));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, kind: ActionKind, handler: impl ActionHandler) -> Self {
        self.register(kind, handler);
        self
    }

    /// Returns `true` if `kind` has a handler.
    pub fn handles(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Finds the handler for a wire action name.
    ///
    /// # Errors
    /// [`RoomError::InvalidAction`] if the name is unknown or unhandled.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn ActionHandler>, RoomError> {
        let kind: ActionKind = name
            .parse()
            .map_err(|_| RoomError::InvalidAction(name.to_string()))?;
        self.handlers
            .get(&kind)
            .cloned()
            .ok_or_else(|| RoomError::InvalidAction(name.to_string()))
    }

    /// Looks up and applies the handler for `name`.
    pub fn dispatch(
        &self,
        name: &str,
        room: &Room,
        ctx: ActionContext<'_>,
    ) -> Result<Room, RoomError> {
        self.lookup(name)?.apply(room, ctx)
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("ActionRegistry").field("handlers", &kinds).finish()
    }
}

//! Error types for the session layer.

use influence_protocol::ProtocolError;
use influence_store::BackendError;

/// Errors that can occur while issuing or checking admission.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token is unknown, expired, unreadable, or bound to another room.
    ///
    /// Deliberately one variant: callers learn nothing about *why* a
    /// token was refused.
    #[error("invalid session")]
    InvalidSession,

    /// No room is registered under the join code (or it expired).
    #[error("join code not found")]
    JoinCodeNotFound,

    /// Every generated code collided with a live one.
    #[error("no free join code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    /// A session record could not be encoded.
    #[error(transparent)]
    Record(#[from] ProtocolError),

    /// The backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` always means the problem is in encoding, decoding, or
//! interpreting wire vocabulary, never in storage or networking.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or a
    /// record written by an incompatible version.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// An action name that is not part of the vocabulary.
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

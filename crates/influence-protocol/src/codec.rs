//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The same codec serves both the wire (events, stream replies) and the
//! backend (room and session records), so a record in the key-value store
//! reads exactly like the state a client receives.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Converts between Rust values and bytes.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task and by the stores. `decode` returns owned data
/// (`DeserializeOwned`) so the input buffer can be dropped right away.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is human-readable: messages can be inspected in browser DevTools
/// and records read straight out of `redis-cli`.
///
/// ## Example
///
/// ```rust
/// use influence_protocol::{Codec, EventType, JsonCodec, RoomId, ServerEvent};
///
/// let codec = JsonCodec;
/// let event = ServerEvent::new(EventType::GameStateUpdated, RoomId::new("r-1"));
///
/// let bytes = codec.encode(&event).unwrap();
/// let decoded: ServerEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(event, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventType, RoomId, ServerEvent};

    #[test]
    fn test_json_codec_encodes_same_value_to_same_bytes() {
        let codec = JsonCodec;
        let event = ServerEvent::new(EventType::GameStarted, RoomId::new("r-1"));
        assert_eq!(codec.encode(&event).unwrap(), codec.encode(&event).unwrap());
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<ServerEvent, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}

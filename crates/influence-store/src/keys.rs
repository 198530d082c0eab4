//! Backend key namespacing.
//!
//! These prefixes are part of the storage format: other processes (and
//! operators with `redis-cli`) rely on them.

use influence_protocol::{JoinCode, RoomId};

/// Key holding the serialized room.
pub fn room_key(room_id: &RoomId) -> String {
    format!("room:{room_id}")
}

/// Key mapping a join code to its room ID.
pub fn join_code_key(code: &JoinCode) -> String {
    format!("joincode:{code}")
}

/// Key holding a session record.
pub fn session_key(token: &str) -> String {
    format!("session:{token}")
}

//! Per-room fanout for the Influence room engine.
//!
//! The [`BroadcastHub`] maps each room to the live connections subscribed
//! to it. Publishing snapshots a room's subscribers, drops the lock, and
//! writes to all of them at once with a per-subscriber deadline. Anyone
//! who fails or stalls is evicted, so one dead socket never delays the
//! rest of the room.
//!
//! The hub is process-local and meant to be built once and shared behind
//! an `Arc`:
//!
//! ```text
//! mutation committed ──► publish(room, bytes)
//!                           │ snapshot under read lock
//!                           ▼
//!              ┌── send ──► conn-1   ✓
//!   join_all ──┼── send ──► conn-2   ✗ (error)    ──► evict
//!              └── send ──► conn-3   ⏱ (timeout)  ──► evict
//! ```

mod hub;

pub use hub::{BroadcastHub, HubConfig, PublishReport, Subscription};

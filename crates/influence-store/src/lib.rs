//! Key-value backend for the Influence room engine.
//!
//! Every piece of authoritative state (rooms, join codes, sessions) lives
//! behind the [`KeyValueBackend`] trait. The engine never takes a local lock
//! over game state: concurrent writers are arbitrated by the backend's
//! [`compare_and_swap`](KeyValueBackend::compare_and_swap), which lets
//! several processes share one backend.
//!
//! # Implementations
//!
//! - [`MemoryBackend`]: in-process map with TTLs, for tests and
//!   single-process deployments
//! - [`RedisBackend`]: Redis via a multiplexed connection and a Lua
//!   compare-and-swap script (feature `redis`, on by default)
//!
//! # Key namespaces
//!
//! See [`keys`]: `room:<roomID>`, `joincode:<CODE>`, `session:<token>`.

mod backend;
mod error;
pub mod keys;
mod memory;
#[cfg(feature = "redis")]
mod redis_backend;

pub use backend::KeyValueBackend;
pub use error::BackendError;
pub use memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use redis_backend::RedisBackend;

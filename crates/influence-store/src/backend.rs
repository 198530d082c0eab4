//! The `KeyValueBackend` trait.

use std::future::Future;
use std::time::Duration;

use crate::BackendError;

/// Storage capability required by the engine.
///
/// Values are opaque bytes; the stores above this layer decide the
/// encoding. A `ttl` of `None` means the key never expires.
///
/// The methods return `impl Future + Send` instead of being declared
/// `async fn` so that generic callers can hold these futures across
/// `tokio::spawn`. Implementors may still write `async fn`.
///
/// `Send + Sync + 'static`: one backend is shared (behind an `Arc`) by
/// every registry and every connection task.
pub trait KeyValueBackend: Send + Sync + 'static {
    /// Reads a key. Expired keys read as `None`.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, BackendError>> + Send;

    /// Unconditionally writes a key.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Writes a key only if it does not exist. Returns `true` if written.
    fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// Deletes a key. Returns `true` if something was removed.
    fn delete(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// Remaining time to live. `None` if the key is missing or persistent.
    fn ttl(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Duration>, BackendError>> + Send;

    /// The optimistic read-modify-write commit.
    ///
    /// Writes `value` only if the key currently holds exactly `expected`
    /// (`None` = the key must be absent). Returns `Ok(false)` when another
    /// writer got there first; the caller re-reads and tries again.
    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;
}

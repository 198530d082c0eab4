//! Error types for the backend layer.

/// Errors surfaced by a [`KeyValueBackend`](crate::KeyValueBackend).
///
/// A lost compare-and-swap is *not* an error: it is reported as
/// `Ok(false)` so callers can retry. Everything here means the backend
/// itself could not serve the request, and the engine does not retry it.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached or rejected the command.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for BackendError {
    fn from(e: redis::RedisError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

//! In-process backend.
//!
//! A `HashMap` behind a Tokio mutex, with per-key expiry. Expired entries
//! are dropped lazily, the first time they are touched. Expiry uses
//! `tokio::time::Instant`, so tests can pause and advance time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{BackendError, KeyValueBackend};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A [`KeyValueBackend`] that keeps everything in memory.
///
/// Cheap to clone: clones share the same map, the way several processes
/// would share one Redis.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.len()
    }

    /// Returns `true` if no live keys remain.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Drops `key` if it has expired, then returns what is left.
fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
    let now = Instant::now();
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        entries.remove(key);
    }
    entries.get(key)
}

impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key).map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), Entry::new(value, ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool, BackendError> {
        let mut entries = self.entries.lock().await;
        if live(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry::new(value, ttl));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        let mut entries = self.entries.lock().await;
        let existed = live(&mut entries, key).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, BackendError> {
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now())))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool, BackendError> {
        let mut entries = self.entries.lock().await;
        let current = live(&mut entries, key).map(|entry| entry.value.as_slice());
        if current != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry::new(value, ttl));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let backend = MemoryBackend::new();
        backend.set("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(backend.ttl("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_if_absent_refuses_existing_key() {
        let backend = MemoryBackend::new();
        assert!(backend.set_if_absent("k", b"1".to_vec(), Some(HOUR)).await.unwrap());
        assert!(!backend.set_if_absent("k", b"2".to_vec(), Some(HOUR)).await.unwrap());
        assert_eq!(backend.get("k").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_key_reads_as_missing() {
        let backend = MemoryBackend::new();
        backend
            .set("k", b"v".to_vec(), Some(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(backend.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(backend.get("k").await.unwrap().is_none());
        assert!(backend.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_if_absent_succeeds_after_expiry() {
        let backend = MemoryBackend::new();
        backend
            .set_if_absent("k", b"1".to_vec(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(backend.set_if_absent("k", b"2".to_vec(), None).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_counts_down() {
        let backend = MemoryBackend::new();
        backend.set("k", b"v".to_vec(), Some(HOUR)).await.unwrap();
        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(
            backend.ttl("k").await.unwrap(),
            Some(Duration::from_secs(3000))
        );
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let backend = MemoryBackend::new();
        backend.set("k", b"v".to_vec(), None).await.unwrap();
        assert!(backend.delete("k").await.unwrap());
        assert!(!backend.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_compare_and_swap_requires_expected_value() {
        let backend = MemoryBackend::new();
        backend.set("k", b"old".to_vec(), None).await.unwrap();

        let stale = backend
            .compare_and_swap("k", Some(b"other"), b"new".to_vec(), None)
            .await
            .unwrap();
        assert!(!stale);
        assert_eq!(backend.get("k").await.unwrap(), Some(b"old".to_vec()));

        let fresh = backend
            .compare_and_swap("k", Some(b"old"), b"new".to_vec(), None)
            .await
            .unwrap();
        assert!(fresh);
        assert_eq!(backend.get("k").await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_compare_and_swap_none_means_absent() {
        let backend = MemoryBackend::new();
        assert!(backend.compare_and_swap("k", None, b"1".to_vec(), None).await.unwrap());
        assert!(!backend.compare_and_swap("k", None, b"2".to_vec(), None).await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let a = MemoryBackend::new();
        let b = a.clone();
        a.set("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(b.get("k").await.unwrap(), Some(b"v".to_vec()));
    }
}

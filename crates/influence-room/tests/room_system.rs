//! Integration tests for the room store under contention.
//!
//! Uses the in-memory backend for real races and two hand-written
//! backends for the failure paths: one that always loses the
//! compare-and-swap, one that never answers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use influence_protocol::{Codec, JoinCode, JsonCodec, LifecycleState, RoomId};
use influence_room::{
    project, rules, ActionContext, ActionRegistry, Participant, RetryPolicy, Room, RoomConfig,
    RoomError, RoomStateStore, StoreConfig,
};
use influence_store::{BackendError, KeyValueBackend, MemoryBackend};

// =========================================================================
// Mock backends
// =========================================================================

/// Serves a fixed room and loses every compare-and-swap, as if another
/// writer always committed first.
struct AlwaysLosing {
    room: Vec<u8>,
    swaps: AtomicU32,
}

impl AlwaysLosing {
    fn new(room: &Room) -> Self {
        Self {
            room: JsonCodec.encode(room).unwrap(),
            swaps: AtomicU32::new(0),
        }
    }
}

impl KeyValueBackend for AlwaysLosing {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(Some(self.room.clone()))
    }

    async fn set(&self, _: &str, _: Vec<u8>, _: Option<Duration>) -> Result<(), BackendError> {
        Ok(())
    }

    async fn set_if_absent(
        &self,
        _: &str,
        _: Vec<u8>,
        _: Option<Duration>,
    ) -> Result<bool, BackendError> {
        Ok(false)
    }

    async fn delete(&self, _: &str) -> Result<bool, BackendError> {
        Ok(false)
    }

    async fn ttl(&self, _: &str) -> Result<Option<Duration>, BackendError> {
        Ok(None)
    }

    async fn compare_and_swap(
        &self,
        _: &str,
        _: Option<&[u8]>,
        _: Vec<u8>,
        _: Option<Duration>,
    ) -> Result<bool, BackendError> {
        self.swaps.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }
}

/// Never completes a read.
struct Unresponsive;

impl KeyValueBackend for Unresponsive {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        std::future::pending().await
    }

    async fn set(&self, _: &str, _: Vec<u8>, _: Option<Duration>) -> Result<(), BackendError> {
        std::future::pending().await
    }

    async fn set_if_absent(
        &self,
        _: &str,
        _: Vec<u8>,
        _: Option<Duration>,
    ) -> Result<bool, BackendError> {
        std::future::pending().await
    }

    async fn delete(&self, _: &str) -> Result<bool, BackendError> {
        std::future::pending().await
    }

    async fn ttl(&self, _: &str) -> Result<Option<Duration>, BackendError> {
        std::future::pending().await
    }

    async fn compare_and_swap(
        &self,
        _: &str,
        _: Option<&[u8]>,
        _: Vec<u8>,
        _: Option<Duration>,
    ) -> Result<bool, BackendError> {
        std::future::pending().await
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn lobby() -> Room {
    Room::new(
        RoomId::generate(),
        JoinCode::new("ABC234"),
        Participant::new("alice"),
    )
}

fn memory_store() -> RoomStateStore<MemoryBackend> {
    RoomStateStore::new(Arc::new(MemoryBackend::new()), StoreConfig::default())
}

// =========================================================================
// Contention
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_nickname_joins_exactly_one_wins() {
    let store = memory_store();
    let room = lobby();
    store.insert(&room).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        let room_id = room.id.clone();
        tasks.push(tokio::spawn(async move {
            let bob = Participant::new("bob");
            store
                .mutate(&room_id, |r| rules::join(r, &bob, &RoomConfig::default()))
                .await
        }));
    }

    let mut ok = 0;
    let mut duplicate = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(RoomError::PlayerAlreadyJoined(n)) if n == "bob" => duplicate += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!((ok, duplicate), (1, 1));

    let stored = store.load(&room.id).await.unwrap();
    assert_eq!(stored.participants.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_joins_all_land() {
    let store = memory_store();
    let room = lobby();
    store.insert(&room).await.unwrap();

    let names = ["bob", "carol", "dave", "erin", "frank"];
    let mut tasks = Vec::new();
    for name in names {
        let store = store.clone();
        let room_id = room.id.clone();
        tasks.push(tokio::spawn(async move {
            let newcomer = Participant::new(name);
            store
                .mutate(&room_id, |r| rules::join(r, &newcomer, &RoomConfig::default()))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stored = store.load(&room.id).await.unwrap();
    assert_eq!(stored.participants.len(), 6);
    for name in names {
        assert!(stored.has_nickname(name), "{name} missing");
    }
}

#[tokio::test(start_paused = true)]
async fn test_always_losing_backend_yields_conflict_after_max_attempts() {
    let room = lobby();
    let backend = Arc::new(AlwaysLosing::new(&room));
    let config = StoreConfig {
        retry: RetryPolicy {
            max_attempts: 4,
            ..RetryPolicy::default()
        },
        ..StoreConfig::default()
    };
    let store = RoomStateStore::new(Arc::clone(&backend), config);
    let calls = AtomicU32::new(0);

    let result = store
        .mutate(&room.id, |r| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(r.clone())
        })
        .await;

    assert!(
        matches!(result, Err(RoomError::Conflict { attempts: 4, .. })),
        "got {result:?}"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(backend.swaps.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_rule_error_is_attempted_once() {
    let room = lobby();
    let backend = Arc::new(AlwaysLosing::new(&room));
    let store = RoomStateStore::new(Arc::clone(&backend), StoreConfig::default());
    let calls = AtomicU32::new(0);

    let result = store
        .mutate(&room.id, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RoomError::OnlyAdminCanStart)
        })
        .await;

    assert!(matches!(result, Err(RoomError::OnlyAdminCanStart)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.swaps.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unresponsive_backend_times_out() {
    let config = StoreConfig {
        mutation_timeout: Duration::from_secs(2),
        ..StoreConfig::default()
    };
    let store = RoomStateStore::new(Arc::new(Unresponsive), config);

    let result = store.mutate(&RoomId::new("r-1"), |r| Ok(r.clone())).await;

    assert!(matches!(result, Err(RoomError::Timeout(d)) if d == Duration::from_secs(2)));
}

// =========================================================================
// Full lobby-to-turn flow through the store
// =========================================================================

#[tokio::test]
async fn test_lobby_start_and_first_turns() {
    let store = memory_store();
    let config = RoomConfig::default();
    let room = lobby();
    let admin = room.admin_id.clone();
    store.insert(&room).await.unwrap();

    for name in ["bob", "carol"] {
        let p = Participant::new(name);
        store
            .mutate(&room.id, |r| rules::join(r, &p, &config))
            .await
            .unwrap();
    }

    let actions = ActionRegistry::default();
    let started = store
        .mutate(&room.id, |r| {
            actions.dispatch(
                "start",
                r,
                ActionContext {
                    actor: &admin,
                    target: None,
                    config: &config,
                },
            )
        })
        .await
        .unwrap();
    assert_eq!(started.lifecycle, LifecycleState::Started);
    assert_eq!(project(&started, None).deck_remaining, 9);

    // Seat 0 (alice) takes income, then seat 1 (bob) ends the turn.
    let bob = started.participants[1].id.clone();
    let after_income = store
        .mutate(&room.id, |r| {
            actions.dispatch(
                "income",
                r,
                ActionContext {
                    actor: &admin,
                    target: None,
                    config: &config,
                },
            )
        })
        .await
        .unwrap();
    assert_eq!(after_income.participants[0].coins, 3);
    assert_eq!(after_income.turn_index, 1);

    let after_end = store
        .mutate(&room.id, |r| {
            actions.dispatch(
                "end_turn",
                r,
                ActionContext {
                    actor: &bob,
                    target: None,
                    config: &config,
                },
            )
        })
        .await
        .unwrap();
    assert_eq!(after_end.turn_index, 2);
}

//! Room and store configuration.

use std::time::Duration;

use rand::Rng;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Game-level limits.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Minimum participants required to start the game.
    pub min_participants: usize,

    /// Maximum participants allowed in the room.
    pub max_participants: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_participants: 3,
            max_participants: 6,
        }
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How hard [`mutate`](crate::RoomStateStore::mutate) tries after losing a
/// compare-and-swap.
///
/// Delay before retry `n` (1-based) is `base_delay * 2^(n-1)`, capped at
/// `max_delay`. With `jitter` on, the delay is drawn uniformly from the
/// upper half of that range so that writers who collided once do not
/// collide again in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `0` is treated as `1`.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Upper bound on any single delay.
    pub max_delay: Duration,

    /// Randomize each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(200),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Attempts actually made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let capped = self
            .base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay);

        if !self.jitter || capped.is_zero() {
            return capped;
        }

        let half = capped / 2;
        let spread = (capped - half).as_nanos() as u64;
        half + Duration::from_nanos(rng.random_range(0..=spread))
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Settings for [`RoomStateStore`](crate::RoomStateStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// TTL written with every commit, so an idle room eventually
    /// disappears. `None` keeps rooms forever. Default: 24 hours.
    pub room_ttl: Option<Duration>,

    /// Deadline for one whole `mutate` call, retries included.
    /// Default: 5 seconds.
    pub mutation_timeout: Duration,

    /// Retry behavior on a lost compare-and-swap.
    pub retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            room_ttl: Some(Duration::from_secs(24 * 60 * 60)),
            mutation_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            jitter: false,
        }
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let policy = no_jitter();
        let mut rng = StdRng::seed_from_u64(1);

        let delays: Vec<u64> = (1..=6)
            .map(|n| policy.backoff(n, &mut rng).as_millis() as u64)
            .collect();

        assert_eq!(delays, vec![10, 20, 40, 80, 100, 100]);
    }

    #[test]
    fn test_backoff_with_jitter_stays_in_upper_half() {
        let policy = RetryPolicy {
            jitter: true,
            ..no_jitter()
        };
        let mut rng = StdRng::seed_from_u64(42);

        for attempt in 1..=8 {
            let unjittered = no_jitter().backoff(attempt, &mut rng);
            let delay = policy.backoff(attempt, &mut rng);
            assert!(delay >= unjittered / 2, "{delay:?} below half of {unjittered:?}");
            assert!(delay <= unjittered, "{delay:?} above {unjittered:?}");
        }
    }

    #[test]
    fn test_backoff_huge_attempt_does_not_overflow() {
        let policy = no_jitter();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.backoff(u32::MAX, &mut rng), policy.max_delay);
    }

    #[test]
    fn test_attempts_never_zero() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.attempts(), 1);
        assert_eq!(RetryPolicy::no_retry().attempts(), 1);
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.min_participants, 3);
        assert_eq!(config.max_participants, 6);
    }
}

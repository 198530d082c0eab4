//! Redis backend.
//!
//! Uses one `MultiplexedConnection`, which is cheap to clone and safe to
//! use concurrently, so no locking happens on our side. Compare-and-swap
//! runs as a Lua script: Redis executes scripts atomically, which gives
//! the same guarantee as `WATCH`/`MULTI`/`EXEC` without needing a
//! dedicated connection per transaction.

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{Client, Script};
use tracing::{error, warn};

use crate::{BackendError, KeyValueBackend};

/// Lua compare-and-swap.
///
/// Arguments:
/// - KEYS[1]: key to write
/// - ARGV[1]: `"1"` if a current value is expected, `"0"` if the key must be absent
/// - ARGV[2]: expected current value (ignored when ARGV[1] is `"0"`)
/// - ARGV[3]: new value
/// - ARGV[4]: TTL in milliseconds, `0` for no expiry
///
/// Returns:
/// - 1: written
/// - 0: current value differs (lost the race)
pub(crate) const COMPARE_AND_SWAP: &str = r#"
local current = redis.call('GET', KEYS[1])

if ARGV[1] == '1' then
    if current == false or current ~= ARGV[2] then
        return 0
    end
else
    if current ~= false then
        return 0
    end
end

local ttl = tonumber(ARGV[4])
if ttl ~= nil and ttl > 0 then
    redis.call('SET', KEYS[1], ARGV[3], 'PX', ttl)
else
    redis.call('SET', KEYS[1], ARGV[3])
end
return 1
"#;

/// A [`KeyValueBackend`] backed by Redis.
///
/// Cheaply cloneable; clone it rather than wrapping it in a mutex.
#[derive(Clone)]
pub struct RedisBackend {
    connection: MultiplexedConnection,
    compare_and_swap_script: Script,
}

impl RedisBackend {
    /// Connects to `redis_url` (e.g. `redis://localhost:6379`).
    pub async fn connect(redis_url: &str) -> Result<Self, BackendError> {
        // The URL may carry credentials; never log it.
        let client = Client::open(redis_url).map_err(|e| {
            error!(error = %e, "failed to open Redis client");
            BackendError::from(e)
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(error = %e, "failed to connect to Redis");
                BackendError::from(e)
            })?;

        Ok(Self {
            connection,
            compare_and_swap_script: Script::new(COMPARE_AND_SWAP),
        })
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    // PX 0 is rejected by Redis; round sub-millisecond TTLs up.
    (ttl.as_millis() as u64).max(1)
}

impl KeyValueBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(error = %e, key, "GET failed");
                BackendError::from(e)
            })?;
        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let mut conn = self.connection.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await.map_err(|e| {
            warn!(error = %e, key, "SET failed");
            BackendError::from(e)
        })?;
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool, BackendError> {
        let mut conn = self.connection.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        // SET NX replies OK when written and nil when the key exists.
        let reply: Option<String> = cmd.query_async(&mut conn).await.map_err(|e| {
            warn!(error = %e, key, "SET NX failed");
            BackendError::from(e)
        })?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        let mut conn = self.connection.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(error = %e, key, "DEL failed");
                BackendError::from(e)
            })?;
        Ok(removed > 0)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, BackendError> {
        let mut conn = self.connection.clone();
        // -2: missing, -1: no expiry.
        let millis: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(BackendError::from)?;
        Ok((millis >= 0).then(|| Duration::from_millis(millis as u64)))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool, BackendError> {
        let mut conn = self.connection.clone();
        let has_expected = if expected.is_some() { "1" } else { "0" };
        let swapped: i64 = self
            .compare_and_swap_script
            .key(key)
            .arg(has_expected)
            .arg(expected.unwrap_or_default())
            .arg(value)
            .arg(ttl.map_or(0, ttl_millis))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(error = %e, key, "compare-and-swap script failed");
                BackendError::from(e)
            })?;
        Ok(swapped == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_and_swap_script_checks_absent_and_present() {
        // Missing keys come back from GET as `false` inside Lua.
        assert!(COMPARE_AND_SWAP.contains("if current ~= false then"));
        assert!(COMPARE_AND_SWAP.contains("current ~= ARGV[2]"));
    }

    #[test]
    fn test_compare_and_swap_script_return_values() {
        assert!(COMPARE_AND_SWAP.contains("return 1"));
        assert!(COMPARE_AND_SWAP.contains("return 0"));
    }

    #[test]
    fn test_compare_and_swap_script_sets_ttl_in_millis() {
        assert!(COMPARE_AND_SWAP.contains("'PX', ttl"));
    }

    #[test]
    fn test_ttl_millis_never_zero() {
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
    }
}

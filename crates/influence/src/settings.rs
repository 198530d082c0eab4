//! Process settings loaded from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `INFLUENCE_BIND` | `127.0.0.1:8080` |
//! | `REDIS_URL` | unset: in-memory backend |
//! | `INFLUENCE_SESSION_TTL_SECS` | 21600 |
//! | `INFLUENCE_JOIN_CODE_TTL_SECS` | 7200 |

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use influence_session::SessionConfig;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{name} must be a positive integer number of seconds, got {value:?}")]
    InvalidSeconds { name: &'static str, value: String },
}

/// Everything the server binary needs to start.
///
/// `redis_url` may carry credentials and is redacted in `Debug` output.
#[derive(Clone)]
pub struct ServerSettings {
    pub bind_address: String,
    pub redis_url: Option<String>,
    pub session: SessionConfig,
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("bind_address", &self.bind_address)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("session", &self.session)
            .finish()
    }
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Same as [`from_env`](Self::from_env) but reads from a map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let bind_address = vars
            .get("INFLUENCE_BIND")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let redis_url = vars
            .get("REDIS_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            session_ttl: seconds(vars, "INFLUENCE_SESSION_TTL_SECS")?
                .unwrap_or(defaults.session_ttl),
            join_code_ttl: seconds(vars, "INFLUENCE_JOIN_CODE_TTL_SECS")?
                .unwrap_or(defaults.join_code_ttl),
            ..defaults
        };

        Ok(Self {
            bind_address,
            redis_url,
            session,
        })
    }
}

fn seconds(
    vars: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<Duration>, SettingsError> {
    let Some(value) = vars.get(name) else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(SettingsError::InvalidSeconds {
            name,
            value: value.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_vars_defaults() {
        let settings = ServerSettings::from_vars(&HashMap::new()).unwrap();
        assert_eq!(settings.bind_address, DEFAULT_BIND_ADDRESS);
        assert!(settings.redis_url.is_none());
        assert_eq!(settings.session.session_ttl, Duration::from_secs(6 * 60 * 60));
        assert_eq!(settings.session.join_code_ttl, Duration::from_secs(2 * 60 * 60));
    }

    #[test]
    fn test_from_vars_custom_values() {
        let settings = ServerSettings::from_vars(&vars(&[
            ("INFLUENCE_BIND", "0.0.0.0:9000"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("INFLUENCE_SESSION_TTL_SECS", "60"),
            ("INFLUENCE_JOIN_CODE_TTL_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(settings.bind_address, "0.0.0.0:9000");
        assert_eq!(settings.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(settings.session.session_ttl, Duration::from_secs(60));
        assert_eq!(settings.session.join_code_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_from_vars_blank_redis_url_means_memory() {
        let settings = ServerSettings::from_vars(&vars(&[("REDIS_URL", "  ")])).unwrap();
        assert!(settings.redis_url.is_none());
    }

    #[test]
    fn test_from_vars_zero_ttl_rejected() {
        let result = ServerSettings::from_vars(&vars(&[("INFLUENCE_SESSION_TTL_SECS", "0")]));
        assert!(matches!(
            result,
            Err(SettingsError::InvalidSeconds { name: "INFLUENCE_SESSION_TTL_SECS", .. })
        ));
    }

    #[test]
    fn test_from_vars_non_numeric_ttl_rejected() {
        let result = ServerSettings::from_vars(&vars(&[("INFLUENCE_JOIN_CODE_TTL_SECS", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_redis_url() {
        let settings =
            ServerSettings::from_vars(&vars(&[("REDIS_URL", "redis://:hunter2@cache:6379")])).unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}

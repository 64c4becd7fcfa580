//! Server configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a default so the service starts with an empty environment.
//! Malformed numeric values fall back to their default; only `PORT` is strict
//! because binding the wrong port silently is worse than refusing to start.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_HUB_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_HUB_PING_HISTORY: usize = 10;
pub const DEFAULT_WS_IDLE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_WS_KEEPALIVE_SECS: u64 = 30;
pub const DEFAULT_WS_WRITE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WS_MAX_MESSAGE_BYTES: usize = 512;

/// The init and id messages are queued before the writer starts.
pub const MIN_HUB_QUEUE_CAPACITY: usize = 2;

/// The ping buffer is preallocated, so its size is capped.
pub const MAX_HUB_PING_HISTORY: usize = 1_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Registry sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Outbound queue capacity per session. A full queue evicts the session.
    pub queue_capacity: usize,
    /// Number of recent ping events replayed to new sessions.
    pub ping_history: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { queue_capacity: DEFAULT_HUB_QUEUE_CAPACITY, ping_history: DEFAULT_HUB_PING_HISTORY }
    }
}

/// Per-connection timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub idle_timeout: Duration,
    pub keepalive: Duration,
    pub write_timeout: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(DEFAULT_WS_IDLE_TIMEOUT_SECS),
            keepalive: Duration::from_secs(DEFAULT_WS_KEEPALIVE_SECS),
            write_timeout: Duration::from_secs(DEFAULT_WS_WRITE_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub static_dir: Option<PathBuf>,
    pub cookie_secure: bool,
    pub hub: HubConfig,
    pub timing: SessionTiming,
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            static_dir: None,
            cookie_secure: false,
            hub: HubConfig::default(),
            timing: SessionTiming::default(),
            max_message_bytes: DEFAULT_WS_MAX_MESSAGE_BYTES,
        }
    }
}

impl ServerConfig {
    /// Build the server config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 8000
    /// - `DATABASE_URL`: unset selects the in-memory store
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `STATIC_DIR`: directory served for unmatched paths
    /// - `COOKIE_SECURE`: `1/true/yes/on` marks the visitor cookie `Secure`
    /// - `HUB_QUEUE_CAPACITY`, `HUB_PING_HISTORY`
    /// - `WS_IDLE_TIMEOUT_SECS`, `WS_KEEPALIVE_SECS`, `WS_WRITE_TIMEOUT_SECS`
    /// - `WS_MAX_MESSAGE_BYTES`
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` does not parse or the timing is inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };

        let config = Self {
            port,
            database_url: env_non_empty("DATABASE_URL"),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            static_dir: env_non_empty("STATIC_DIR").map(PathBuf::from),
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            hub: HubConfig {
                queue_capacity: env_parse("HUB_QUEUE_CAPACITY", DEFAULT_HUB_QUEUE_CAPACITY),
                ping_history: env_parse("HUB_PING_HISTORY", DEFAULT_HUB_PING_HISTORY),
            },
            timing: SessionTiming {
                idle_timeout: Duration::from_secs(env_parse("WS_IDLE_TIMEOUT_SECS", DEFAULT_WS_IDLE_TIMEOUT_SECS)),
                keepalive: Duration::from_secs(env_parse("WS_KEEPALIVE_SECS", DEFAULT_WS_KEEPALIVE_SECS)),
                write_timeout: Duration::from_secs(env_parse("WS_WRITE_TIMEOUT_SECS", DEFAULT_WS_WRITE_TIMEOUT_SECS)),
            },
            max_message_bytes: env_parse("WS_MAX_MESSAGE_BYTES", DEFAULT_WS_MAX_MESSAGE_BYTES),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timing = &self.timing;
        if timing.idle_timeout.is_zero() || timing.keepalive.is_zero() || timing.write_timeout.is_zero() {
            return Err(ConfigError::Invalid("websocket timeouts must be non-zero".into()));
        }
        if timing.keepalive >= timing.idle_timeout {
            return Err(ConfigError::Invalid(format!(
                "WS_KEEPALIVE_SECS ({}s) must be shorter than WS_IDLE_TIMEOUT_SECS ({}s)",
                timing.keepalive.as_secs(),
                timing.idle_timeout.as_secs()
            )));
        }
        if self.hub.queue_capacity < MIN_HUB_QUEUE_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "HUB_QUEUE_CAPACITY must be at least {MIN_HUB_QUEUE_CAPACITY}"
            )));
        }
        if self.hub.ping_history > MAX_HUB_PING_HISTORY {
            return Err(ConfigError::Invalid(format!(
                "HUB_PING_HISTORY must be at most {MAX_HUB_PING_HISTORY}"
            )));
        }
        if self.max_message_bytes == 0 {
            return Err(ConfigError::Invalid("WS_MAX_MESSAGE_BYTES must be non-zero".into()));
        }
        Ok(())
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

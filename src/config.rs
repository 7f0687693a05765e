//! Client configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Every key has a default so a bare `tutor-link` invocation
//! talks to a backend on `localhost:8000`.

use std::time::Duration;

use crate::error::ClientError;

/// Default WebSocket endpoint of the chat backend.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";

/// Default document upload endpoint.
pub const DEFAULT_UPLOAD_URL: &str = "http://localhost:8000/api/upload-pdf";

/// Default cap on consecutive reconnect attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default fixed delay between reconnect attempts, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 3_000;

/// Default fixed delay between reconnect attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(DEFAULT_RETRY_DELAY_MS);

/// Default capacity of the client event bus.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Top-level client configuration.
///
/// Loaded once at startup via [`ClientConfig::from_env`], or built directly
/// (tests use [`ClientConfig::default`] and override fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket URL of the chat endpoint (`ws://` or `wss://`).
    pub server_url: String,

    /// HTTP URL documents are posted to.
    pub upload_url: String,

    /// Consecutive reconnect attempts before giving up.
    pub max_retries: u32,

    /// Fixed delay before each reconnect attempt.
    pub retry_delay: Duration,

    /// Capacity of the [`crate::domain::EventBus`] broadcast channel.
    pub event_capacity: usize,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_WS_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            log_json: false,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is missing or unparsable.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if `TUTOR_WS_URL` does not use
    /// a WebSocket scheme.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();

        let server_url =
            std::env::var("TUTOR_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
        let upload_url =
            std::env::var("TUTOR_UPLOAD_URL").unwrap_or_else(|_| DEFAULT_UPLOAD_URL.to_string());

        let config = Self {
            server_url,
            upload_url,
            max_retries: parse_env("TUTOR_MAX_RETRIES", DEFAULT_MAX_RETRIES),
            retry_delay: Duration::from_millis(parse_env(
                "TUTOR_RETRY_DELAY_MS",
                DEFAULT_RETRY_DELAY_MS,
            )),
            event_capacity: parse_env("TUTOR_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY),
            log_json: parse_env_bool("TUTOR_LOG_JSON", false),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks values that have no sensible fallback.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] for a non-WebSocket server URL
    /// or a zero event capacity.
    pub fn validate(&self) -> Result<(), ClientError> {
        if !is_websocket_url(&self.server_url) {
            return Err(ClientError::InvalidConfig(format!(
                "server url must start with ws:// or wss://, got {:?}",
                self.server_url
            )));
        }
        if self.event_capacity == 0 {
            return Err(ClientError::InvalidConfig(
                "event capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns `true` for `ws://` and `wss://` URLs.
#[must_use]
pub fn is_websocket_url(url: &str) -> bool {
    url.starts_with("ws://") || url.starts_with("wss://")
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref().map(str::to_ascii_lowercase) {
        Some(v) if v == "true" || v == "1" => true,
        Some(v) if v == "false" || v == "0" => false,
        _ => default,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_layout() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "ws://localhost:8000/ws");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay, Duration::from_secs(3));
        assert_eq!(
            u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).ok(),
            Some(DEFAULT_RETRY_DELAY_MS)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_http_server_url() {
        let config = ClientConfig {
            server_url: "http://localhost:8000/ws".to_string(),
            ..ClientConfig::default()
        };
        let Err(ClientError::InvalidConfig(msg)) = config.validate() else {
            panic!("http url must be rejected");
        };
        assert!(msg.contains("ws://"));
    }

    #[test]
    fn rejects_zero_event_capacity() {
        let config = ClientConfig {
            event_capacity: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn websocket_schemes() {
        assert!(is_websocket_url("ws://a/ws"));
        assert!(is_websocket_url("wss://a/ws"));
        assert!(!is_websocket_url("https://a/ws"));
    }

    #[test]
    fn missing_env_falls_back() {
        assert_eq!(parse_env("TUTOR_TEST_UNSET_NUMBER", 7u32), 7);
        assert!(parse_env_bool("TUTOR_TEST_UNSET_BOOL", true));
    }
}

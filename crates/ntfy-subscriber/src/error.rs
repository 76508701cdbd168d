//! # Error Types
//!
//! Semantic error types for the ntfy subscriber. Variants fall into four
//! families, and the listener treats each family differently:
//!
//! | Family | Variants | Effect on a listener |
//! |--------|----------|----------------------|
//! | Configuration | `NoActiveEndpoint`, `NoTopics`, `InvalidEndpoint`, `ConfigError` | Listener never starts |
//! | Transport | `ConnectionFailed`, `ConnectionLost`, `WebSocket`, `Timeout` | Reconnect with backoff |
//! | Exhaustion | `ReconnectionExhausted` | Listener parks in `Idle` |
//! | Delivery | `SinkRejected` | Logged, listener unaffected |
//!
//! Malformed payloads are never errors: the classifier falls back to
//! plain-text content instead.

use thiserror::Error;

/// Convenient Result alias for subscriber operations.
pub type NtfyResult<T> = std::result::Result<T, NtfyError>;

/// All errors that can occur while subscribing to ntfy topics.
#[derive(Error, Debug)]
pub enum NtfyError {
    // ─── Configuration ──────────────────────────────────────────────
    /// No configured server matches the active server id.
    #[error("No active ntfy server: '{active_id}' does not match any configured server")]
    NoActiveEndpoint { active_id: String },

    /// Neither a commands topic nor a responses topic is configured.
    #[error("No topics configured: set commands_topic and/or responses_topic")]
    NoTopics,

    /// The server URL or topic list cannot be turned into a WebSocket URL.
    #[error("Invalid endpoint: {reason}")]
    InvalidEndpoint { reason: String },

    /// Configuration file error (missing, malformed, or invalid values).
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    // ─── Connection ─────────────────────────────────────────────────
    /// Failed to establish a WebSocket connection to the ntfy server.
    #[error("Failed to connect to ntfy at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// WebSocket connection was lost after being established.
    #[error("Connection to ntfy lost: {reason}")]
    ConnectionLost { reason: String },

    /// An operation timed out.
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    // ─── Reconnect ──────────────────────────────────────────────────
    /// The configured reconnect attempt cap has been reached.
    #[error("Reconnection abandoned after {attempts} attempts: {last_error}")]
    ReconnectionExhausted { attempts: u32, last_error: String },

    // ─── Delivery ───────────────────────────────────────────────────
    /// The event sink refused a classified event.
    #[error("Event sink rejected event: {reason}")]
    SinkRejected { reason: String },

    // ─── WebSocket ──────────────────────────────────────────────────
    /// Low-level WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    // ─── I/O ────────────────────────────────────────────────────────
    /// Filesystem or I/O error (config file reading, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NtfyError {
    /// Returns `true` if the failure is transient and the connection should
    /// be retried after a backoff delay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NtfyError::ConnectionFailed { .. }
                | NtfyError::ConnectionLost { .. }
                | NtfyError::Timeout { .. }
                | NtfyError::WebSocket(_)
        )
    }

    /// Returns `true` if this error prevents a listener from starting at all.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            NtfyError::NoActiveEndpoint { .. }
                | NtfyError::NoTopics
                | NtfyError::InvalidEndpoint { .. }
                | NtfyError::ConfigError { .. }
        )
    }
}

// ─── From impls for external error types ────────────────────────────────

impl From<tokio_tungstenite::tungstenite::Error> for NtfyError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        NtfyError::WebSocket(err.to_string())
    }
}

#[cfg(feature = "config-toml")]
impl From<toml::de::Error> for NtfyError {
    fn from(err: toml::de::Error) -> Self {
        NtfyError::ConfigError {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(NtfyError::Timeout { seconds: 5 }.is_retryable());
        assert!(NtfyError::ConnectionLost { reason: "x".into() }.is_retryable());
        assert!(NtfyError::WebSocket("reset".into()).is_retryable());
        assert!(
            NtfyError::ConnectionFailed {
                url: "wss://ntfy.sh/a/ws".into(),
                reason: "refused".into(),
            }
            .is_retryable()
        );
        assert!(!NtfyError::NoTopics.is_retryable());
        assert!(
            !NtfyError::ReconnectionExhausted {
                attempts: 3,
                last_error: "refused".into(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(
            NtfyError::NoActiveEndpoint {
                active_id: "a".into()
            }
            .is_configuration_error()
        );
        assert!(NtfyError::NoTopics.is_configuration_error());
        assert!(
            NtfyError::InvalidEndpoint {
                reason: "empty".into()
            }
            .is_configuration_error()
        );
        assert!(!NtfyError::WebSocket("x".into()).is_configuration_error());
    }

    #[test]
    fn test_no_active_endpoint_message_names_id() {
        let err = NtfyError::NoActiveEndpoint {
            active_id: "backup".into(),
        };
        assert!(err.to_string().contains("'backup'"));
    }

    #[test]
    fn test_from_tungstenite_error() {
        let ws_error = tokio_tungstenite::tungstenite::Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "broken pipe",
        ));
        let err: NtfyError = ws_error.into();
        assert!(matches!(err, NtfyError::WebSocket(_)));
        assert!(err.to_string().contains("WebSocket error"));
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn test_from_toml_error_conversion() {
        #[derive(Debug, serde::Deserialize)]
        struct DummyConfig {
            _value: String,
        }

        let toml_err = toml::from_str::<DummyConfig>("value = [").unwrap_err();
        let err: NtfyError = toml_err.into();
        assert!(matches!(err, NtfyError::ConfigError { .. }));
        assert!(err.to_string().contains("Configuration error"));
    }
}

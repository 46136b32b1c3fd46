//! Error types for EchoClaw
//!
//! This module defines all error types used throughout the engine.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use std::fmt;
use thiserror::Error;

/// Longest response body kept inside a [`GatewayError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

// ============================================================================
// Gateway Error Classification
// ============================================================================

/// Structured room gateway error classification.
///
/// Separates transient network conditions from permanent client errors so the
/// retry policy can decide without string matching.
#[derive(Debug)]
pub enum GatewayError {
    /// Connection refused, DNS failure, reset mid-request
    Network(String),
    /// Request did not complete within the client timeout
    Timeout(String),
    /// The gateway answered with a non-success HTTP status
    Status { status: u16, body: String },
    /// The response body was not the expected JSON shape
    Decode(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Network(msg) => write!(f, "Network error: {}", msg),
            GatewayError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            GatewayError::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            GatewayError::Decode(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl GatewayError {
    /// Build a status error, truncating oversized bodies.
    pub fn status(status: u16, body: &str) -> Self {
        let body = if body.chars().count() > MAX_ERROR_BODY_CHARS {
            let mut truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            truncated.push_str("...");
            truncated
        } else {
            body.to_string()
        };
        GatewayError::Status { status, body }
    }

    /// Classify a transport-level reqwest failure.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }

    /// Returns `true` if the failure is likely to clear on its own.
    ///
    /// Transient: network failures, timeouts, 408, 429 and 5xx responses.
    /// Only used to label log lines; every gateway failure is retried.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Network(_) | GatewayError::Timeout(_) => true,
            GatewayError::Status { status, .. } => {
                matches!(status, 408 | 429 | 500..=599)
            }
            GatewayError::Decode(_) => false,
        }
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<GatewayError> for EchoError {
    fn from(err: GatewayError) -> Self {
        EchoError::Gateway(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for EchoClaw operations.
#[derive(Error, Debug)]
pub enum EchoError {
    /// Missing or invalid required configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or HTTP failure talking to the room gateway
    #[error("Gateway error: {0}")]
    Gateway(GatewayError),

    /// The requested room does not exist on the gateway
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// The response generator failed to produce a verdict or text
    #[error("Generation error: {0}")]
    Generation(String),

    /// Consecutive poll-cycle failures exceeded the reconnection ceiling
    #[error("Reconnection attempts exhausted after {attempts} consecutive failures")]
    ReconnectExhausted { attempts: u32 },

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors outside of a gateway call
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EchoError {
    /// Whether a gateway call that failed with this error may be retried.
    ///
    /// Every gateway or HTTP failure is retried up to the policy limit; other
    /// errors (missing room, bad config, generation) are returned at once.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EchoError::Gateway(_) | EchoError::Http(_))
    }

    /// Whether the underlying gateway failure looks transient.
    pub fn is_transient(&self) -> bool {
        match self {
            EchoError::Gateway(err) => err.is_transient(),
            EchoError::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

/// A specialized `Result` type for EchoClaw operations.
pub type Result<T> = std::result::Result<T, EchoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EchoError::Config("ECHOCHAMBERS_API_KEY is required".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: ECHOCHAMBERS_API_KEY is required"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EchoError = io_err.into();
        assert!(matches!(err, EchoError::Io(_)));
    }

    #[test]
    fn test_reconnect_exhausted_display() {
        let err = EchoError::ReconnectExhausted { attempts: 6 };
        assert!(err.to_string().contains("6 consecutive failures"));
    }

    #[test]
    fn test_gateway_error_is_transient() {
        assert!(GatewayError::Network("refused".into()).is_transient());
        assert!(GatewayError::Timeout("30s".into()).is_transient());
        assert!(GatewayError::status(500, "boom").is_transient());
        assert!(GatewayError::status(503, "busy").is_transient());
        assert!(GatewayError::status(429, "slow down").is_transient());
        assert!(GatewayError::status(408, "timeout").is_transient());

        assert!(!GatewayError::status(400, "bad").is_transient());
        assert!(!GatewayError::status(401, "no key").is_transient());
        assert!(!GatewayError::status(404, "missing").is_transient());
        assert!(!GatewayError::Decode("not json".into()).is_transient());
    }

    #[test]
    fn test_gateway_error_status_code() {
        assert_eq!(GatewayError::status(404, "x").status_code(), Some(404));
        assert_eq!(GatewayError::Network("x".into()).status_code(), None);
    }

    #[test]
    fn test_gateway_error_truncates_body() {
        let err = GatewayError::status(500, &"x".repeat(2000));
        match err {
            GatewayError::Status { body, .. } => {
                assert!(body.ends_with("..."));
                assert_eq!(body.chars().count(), MAX_ERROR_BODY_CHARS + 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_every_gateway_error_is_retryable() {
        let err: EchoError = GatewayError::status(502, "bad gateway").into();
        assert!(err.is_retryable());
        assert!(err.is_transient());

        let err: EchoError = GatewayError::status(404, "missing").into();
        assert!(err.is_retryable());
        assert!(!err.is_transient());

        let err: EchoError = GatewayError::Decode("not json".into()).into();
        assert!(err.is_retryable());

        assert!(!EchoError::RoomNotFound("general".into()).is_retryable());
        assert!(!EchoError::Config("missing key".into()).is_retryable());
        assert!(!EchoError::Generation("empty".into()).is_retryable());
    }

    #[test]
    fn test_gateway_typed_display() {
        let err: EchoError = GatewayError::status(503, "unavailable").into();
        assert_eq!(err.to_string(), "Gateway error: HTTP 503: unavailable");
    }
}

// src/error.rs
// Error types shared across the bridge

use std::time::Duration;

/// Failures on the framed Wyoming connection.
///
/// A peer closing the stream (even mid-frame) is not an error: the codec
/// reports it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Any failure talking to Home Assistant or the gateway.
///
/// The dispatcher never propagates these to the peer; they become a spoken
/// apology instead.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} request failed: {reason}")]
    Transport {
        service: &'static str,
        reason: String,
    },

    #[error("{service} did not answer within {}s", .after.as_secs())]
    Timeout {
        service: &'static str,
        after: Duration,
    },

    #[error("{service} sent an unreadable response: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },

    #[error("{service} reply contained no assistant text")]
    EmptyReply { service: &'static str },
}

impl BackendError {
    /// Classify a reqwest failure for the named backend.
    pub fn from_reqwest(service: &'static str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout {
                service,
                after: timeout,
            }
        } else if err.is_decode() {
            BackendError::InvalidResponse {
                service,
                reason: err.to_string(),
            }
        } else {
            BackendError::Transport {
                service,
                reason: err.to_string(),
            }
        }
    }
}

/// Rejected process configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {name} URL '{value}': {reason}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("{given} was given without {missing}")]
    Incomplete {
        given: &'static str,
        missing: &'static str,
    },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

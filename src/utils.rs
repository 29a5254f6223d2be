// src/utils.rs
// Utility functions module

use std::future::Future;
use std::time::Duration;

use crate::error::BackendError;

// ============================================================================
// Timeout utilities
// ============================================================================

/// Run a backend call with an outer deadline.
pub async fn with_timeout<F, T>(
    duration: Duration,
    operation: F,
    service: &'static str,
) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout {
            service,
            after: duration,
        }),
    }
}

// ============================================================================
// Text helpers
// ============================================================================

/// Cut text to at most `max_chars` characters for log lines.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Join names the way they are spoken: "a", "a and b", "a, b and c".
pub fn join_spoken(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}

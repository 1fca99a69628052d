//! # Delivery Error Types

use std::time::Duration;
use thiserror::Error;

/// Record of one failed fetch attempt, kept for diagnostics when the whole
/// ladder is exhausted.
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Name of the access profile the attempt ran under.
    pub profile: String,
    /// What went wrong (transport error, status, timeout, validation).
    pub reason: String,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "attempt {} via '{}': {}",
            self.attempt, self.profile, self.reason
        )
    }
}

/// Errors that can occur while fetching or resolving media sources.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Every access-strategy attempt failed. Carries the per-attempt errors.
    #[error("all {} fetch attempts failed (last: {})", .attempts.len(), .attempts.last().map(|a| a.reason.as_str()).unwrap_or("none"))]
    ExhaustedRetries { attempts: Vec<AttemptFailure> },

    /// The full resolution exceeded its overall deadline.
    #[error("resolution deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// The in-flight fetch was cancelled because its result is no longer
    /// wanted (e.g. the current track changed).
    #[error("fetch cancelled")]
    Cancelled,

    /// A catalog or option value was structurally invalid.
    #[error("invalid fetch configuration: {0}")]
    InvalidConfiguration(String),
}

impl DeliveryError {
    /// Returns `true` if the operation could plausibly succeed if reissued.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeliveryError::ExhaustedRetries { .. } | DeliveryError::DeadlineExceeded(_)
        )
    }
}

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_retries_reports_last_reason() {
        let err = DeliveryError::ExhaustedRetries {
            attempts: vec![
                AttemptFailure {
                    attempt: 1,
                    profile: "standard".into(),
                    reason: "HTTP 429".into(),
                },
                AttemptFailure {
                    attempt: 2,
                    profile: "desktop-fallback".into(),
                    reason: "timeout".into(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 fetch attempts"));
        assert!(msg.contains("timeout"));
        assert!(err.is_transient());
    }

    #[test]
    fn cancelled_is_not_transient() {
        assert!(!DeliveryError::Cancelled.is_transient());
    }
}

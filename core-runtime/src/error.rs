//! # Runtime Error Types
//!
//! Failures surfaced while assembling and starting the engine: invalid
//! settings, and bridges the host forgot to register. Once the engine is
//! running, failures are domain errors (`DeliveryError`, `PlaybackError`)
//! or session state, never this type.

use thiserror::Error;

/// Errors raised while configuring or initializing the engine runtime.
#[derive(Error, Debug)]
pub enum Error {
    /// A setting value is invalid (log filter, event buffer size, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required bridge implementation was not registered.
    ///
    /// The message names the missing capability and what the host should
    /// inject, so builders fail fast instead of panicking mid-playback.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_missing_names_the_bridge() {
        let err = Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "inject a transport".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Capability missing: HttpClient - inject a transport"
        );
    }
}

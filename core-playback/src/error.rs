//! # Playback Error Types

use bridge_traits::media::SourceKind;
use core_delivery::DeliveryError;
use thiserror::Error;

/// Errors that can occur while resolving or driving playback.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The resolver returned zero usable formats for a track.
    #[error("No playable candidates for track: {0}")]
    NoCandidates(String),

    /// Every access-strategy attempt failed during resolution.
    #[error("Resolution failed for track {track_id}: {source}")]
    Resolution {
        track_id: String,
        #[source]
        source: DeliveryError,
    },

    /// No media engine is registered for the track's source kind.
    #[error("No media engine registered for source kind {0:?}")]
    EngineMissing(SourceKind),

    /// The backing media engine rejected a command.
    #[error("Media engine error: {0}")]
    MediaEngine(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Failure class surfaced to the session as `resolution_failed` reason.
    pub fn failure_reason(&self) -> &'static str {
        match self {
            PlaybackError::NoCandidates(_) => "no-candidates",
            PlaybackError::Resolution { .. } => "network",
            PlaybackError::EngineMissing(_) | PlaybackError::MediaEngine(_) => "media-engine",
            PlaybackError::Internal(_) => "internal",
        }
    }

    /// Returns `true` if reissuing the same command could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Resolution { source, .. } => source.is_transient(),
            PlaybackError::MediaEngine(_) => true,
            _ => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_map_to_session_classes() {
        assert_eq!(
            PlaybackError::NoCandidates("t-1".into()).failure_reason(),
            "no-candidates"
        );
        let network = PlaybackError::Resolution {
            track_id: "t-1".into(),
            source: DeliveryError::ExhaustedRetries { attempts: vec![] },
        };
        assert_eq!(network.failure_reason(), "network");
        assert!(network.is_transient());
    }
}

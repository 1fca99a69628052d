//! Preference Snapshot Abstraction
//!
//! The engine consumes user preferences read-only: it loads one snapshot at
//! startup and receives live updates as setter commands mirrored from the
//! host's preference store. Persistence stays on the host side.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Playback-related user preferences consumed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPreferences {
    /// Prefer the highest available audio quality.
    pub high_quality_audio: bool,
    /// Prefer opus-class candidates over aac-class when both exist.
    pub prefer_opus: bool,
    /// Let the detected network tier cap the audio quality target.
    pub adaptive_audio: bool,
    /// Whether video streams should be selected for video-capable tracks.
    pub video_mode: bool,
    /// Initial volume, normalized to `0.0..=1.0`.
    pub initial_volume: f32,
}

impl Default for PlayerPreferences {
    fn default() -> Self {
        Self {
            high_quality_audio: false,
            prefer_opus: true,
            adaptive_audio: true,
            video_mode: false,
            initial_volume: 1.0,
        }
    }
}

/// Read-only access to the host's preference store.
#[async_trait::async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Load the current preference snapshot.
    async fn load_preferences(&self) -> Result<PlayerPreferences>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preferences() {
        let prefs = PlayerPreferences::default();
        assert!(!prefs.high_quality_audio);
        assert!(prefs.prefer_opus);
        assert!(prefs.adaptive_audio);
        assert_eq!(prefs.initial_volume, 1.0);
    }

    #[test]
    fn test_preferences_roundtrip_serde() {
        let prefs = PlayerPreferences {
            high_quality_audio: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&prefs).unwrap();
        let back: PlayerPreferences = serde_json::from_str(&json).unwrap();
        assert_eq!(prefs, back);
    }
}

//! JSON-file preference store.
//!
//! The engine reads preferences once at startup; persistence and editing
//! stay with the host. This store keeps the snapshot in a single JSON file
//! under the platform config directory, with a write helper for hosts that
//! mirror settings-panel changes back to disk.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::settings::{PlayerPreferences, PreferenceStore};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Preference store backed by one JSON file.
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform default location
    /// (`<config_dir>/playback-engine/preferences.json`).
    pub fn at_default_location() -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| BridgeError::NotAvailable("platform config directory".to_string()))?;
        Ok(Self::new(base.join("playback-engine").join("preferences.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a snapshot, creating parent directories as needed.
    pub async fn write_preferences(&self, preferences: &PlayerPreferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(preferences)
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), "preferences written");
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for JsonPreferenceStore {
    async fn load_preferences(&self) -> Result<PlayerPreferences> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no preference file; using defaults");
                return Ok(PlayerPreferences::default());
            }
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(preferences) => Ok(preferences),
            Err(err) => {
                // A corrupt file should not keep the engine from starting.
                warn!(path = %self.path.display(), error = %err, "preference file unreadable; using defaults");
                Ok(PlayerPreferences::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pref-store-{}-{}.json", std::process::id(), name))
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let store = JsonPreferenceStore::new(scratch_path("missing"));
        let prefs = store.load_preferences().await.unwrap();
        assert_eq!(prefs, PlayerPreferences::default());
    }

    #[tokio::test]
    async fn write_then_load_round_trips() {
        let path = scratch_path("roundtrip");
        let store = JsonPreferenceStore::new(&path);

        let prefs = PlayerPreferences {
            high_quality_audio: true,
            initial_volume: 0.5,
            ..Default::default()
        };
        store.write_preferences(&prefs).await.unwrap();

        let loaded = store.load_preferences().await.unwrap();
        assert_eq!(loaded, prefs);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_defaults() {
        let path = scratch_path("corrupt");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = JsonPreferenceStore::new(&path);
        let prefs = store.load_preferences().await.unwrap();
        assert_eq!(prefs, PlayerPreferences::default());

        let _ = tokio::fs::remove_file(&path).await;
    }
}

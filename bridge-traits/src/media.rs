//! Media engine bridge traits.
//!
//! These abstractions let the playback orchestrator drive whatever is
//! actually rendering audio/video - a native element, an embedded
//! third-party player - through one capability surface. Hosts register one
//! engine per [`SourceKind`]; the orchestrator picks the engine matching the
//! current track rather than branching inside the state machine.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Origin class of a track's media, used to select a backing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Direct HTTP(S) stream playable by a native element.
    DirectStream,
    /// Requires an embedded third-party player.
    Embedded,
}

/// Event reported by a backing media engine.
///
/// The engine mirrors these into the playback session; the media element is
/// the authoritative source for position, the session only displays it.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEngineEvent {
    /// Playback position advanced (seconds from start).
    TimeUpdate(f64),
    /// Buffered fraction of the current source, in `[0.0, 1.0]`.
    Buffering(f64),
    /// Duration became known or changed (seconds).
    DurationChanged(f64),
    /// The current source played to its natural end.
    Ended,
    /// The engine failed to load or decode the source.
    Failed(String),
}

/// Stream of media engine events
#[async_trait::async_trait]
pub trait MediaEventStream: Send {
    /// Get the next engine event.
    ///
    /// Returns `None` when the engine has been unloaded.
    async fn next(&mut self) -> Option<MediaEngineEvent>;
}

/// Capability trait for a backing media engine.
///
/// Implementations wrap a concrete playback surface. All methods are
/// best-effort commands; failures surface through the event stream as
/// [`MediaEngineEvent::Failed`] or as `BridgeError` on the command itself.
#[async_trait::async_trait]
pub trait MediaEngine: Send + Sync {
    /// Load a resolved source URL, replacing whatever was loaded before.
    ///
    /// `headers` carries any request headers the resolution produced (e.g.
    /// the access profile's identity string for hosts that enforce it).
    async fn load(&self, url: &str, headers: &HashMap<String, String>) -> Result<()>;

    /// Begin or resume playback of the loaded source.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the source loaded.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position in seconds.
    async fn seek(&self, position_seconds: f64) -> Result<()>;

    /// Set volume, normalized to `0.0..=1.0`.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Set the playback rate multiplier.
    async fn set_rate(&self, rate: f32) -> Result<()>;

    /// Unload the current source and release engine resources.
    async fn unload(&self) -> Result<()>;

    /// Subscribe to engine events.
    async fn subscribe_events(&self) -> Result<Box<dyn MediaEventStream>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_is_hashable() {
        let mut engines: HashMap<SourceKind, &str> = HashMap::new();
        engines.insert(SourceKind::DirectStream, "native");
        engines.insert(SourceKind::Embedded, "iframe");
        assert_eq!(engines.get(&SourceKind::DirectStream), Some(&"native"));
    }

    #[test]
    fn test_event_equality() {
        assert_eq!(MediaEngineEvent::Ended, MediaEngineEvent::Ended);
        assert_ne!(
            MediaEngineEvent::TimeUpdate(1.0),
            MediaEngineEvent::TimeUpdate(2.0)
        );
    }
}

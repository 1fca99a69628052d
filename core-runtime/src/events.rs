//! # Event Bus System
//!
//! Provides an event-driven architecture for the playback engine using
//! `tokio::sync::broadcast`. UI layers and other observers subscribe here;
//! the engine publishes playback and network events as they happen.
//!
//! ## Overview
//!
//! - **Event Types**: typed enum hierarchies per domain
//! - **EventBus**: central broadcast channel for publishing events
//! - **EventStream**: wrapper for consuming events with filtering
//!
//! ## Error Handling
//!
//! The bus uses `tokio::sync::broadcast`, which produces two error kinds on
//! the receive side:
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal;
//!   the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: all senders dropped; treat as shutdown.
//!
//! Events are advisory display state. The authoritative session snapshot is
//! the watch channel exposed by the orchestrator, so a lagged subscriber can
//! always resynchronize from there.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback-related events
    Playback(PlaybackEvent),
    /// Network-related events
    Network(NetworkEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Network(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::ResolutionFailed { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::ResolutionSucceeded { .. }) => EventSeverity::Info,
            CoreEvent::Network(NetworkEvent::TierChanged { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to the playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The current track changed (queue command or natural advance).
    TrackChanged {
        /// Identity of the track now current, if any.
        track_id: Option<String>,
        /// Queue index of the current track (-1 for empty queue).
        index: i32,
    },
    /// Source resolution began for the current track.
    ResolutionStarted {
        /// The track being resolved.
        track_id: String,
    },
    /// Source resolution produced a playable URL.
    ResolutionSucceeded {
        /// The resolved track.
        track_id: String,
        /// Stream duration in seconds, when reported.
        duration_seconds: Option<f64>,
    },
    /// Source resolution failed; session is in the error state.
    ResolutionFailed {
        /// The track that failed to resolve.
        track_id: String,
        /// Failure class ("no-candidates", "network").
        reason: String,
    },
    /// Playback started or resumed.
    Playing {
        /// The playing track.
        track_id: String,
    },
    /// Playback paused.
    Paused {
        /// The paused track.
        track_id: String,
    },
    /// Playback stopped at the end of a non-repeating queue.
    Stopped,
    /// The queue was replaced.
    QueueReplaced {
        /// New queue length.
        length: usize,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::TrackChanged { .. } => "Current track changed",
            PlaybackEvent::ResolutionStarted { .. } => "Source resolution started",
            PlaybackEvent::ResolutionSucceeded { .. } => "Source resolution succeeded",
            PlaybackEvent::ResolutionFailed { .. } => "Source resolution failed",
            PlaybackEvent::Playing { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Stopped => "Playback stopped",
            PlaybackEvent::QueueReplaced { .. } => "Queue replaced",
        }
    }
}

// ============================================================================
// Network Events
// ============================================================================

/// Events related to network condition changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum NetworkEvent {
    /// The classified network tier changed.
    TierChanged {
        /// New tier name ("restricted", "metered", "unmetered").
        tier: String,
    },
}

impl NetworkEvent {
    fn description(&self) -> &str {
        match self {
            NetworkEvent::TierChanged { .. } => "Network tier changed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for engine events.
///
/// Cheap to clone; all clones publish into the same channel. Fully
/// thread-safe (`Send + Sync`), intended to be shared via `Arc` or clone.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers falling behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are none. Publishers normally ignore the error:
    /// having no observers is a valid state.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive future events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::default();
/// let stream = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Attach a predicate; events failing it are skipped silently.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receive the next event passing the filter.
    ///
    /// `Lagged` errors are surfaced to the caller so it can resynchronize
    /// from the session snapshot if it cares about completeness.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            match &self.filter {
                Some(predicate) if !predicate(&event) => continue,
                _ => return Ok(event),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_and_receive() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(CoreEvent::Playback(PlaybackEvent::Stopped)).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event, CoreEvent::Playback(PlaybackEvent::Stopped));
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::new(10);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let sent = bus
            .emit(CoreEvent::Network(NetworkEvent::TierChanged {
                tier: "metered".into(),
            }))
            .unwrap();
        assert_eq!(sent, 2);

        assert!(matches!(a.recv().await.unwrap(), CoreEvent::Network(_)));
        assert!(matches!(b.recv().await.unwrap(), CoreEvent::Network(_)));
    }

    #[test]
    fn emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus.emit(CoreEvent::Playback(PlaybackEvent::Stopped)).is_err());
    }

    #[tokio::test]
    async fn stream_filter_skips_non_matching() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Network(_)));

        bus.emit(CoreEvent::Playback(PlaybackEvent::Stopped)).unwrap();
        bus.emit(CoreEvent::Network(NetworkEvent::TierChanged {
            tier: "restricted".into(),
        }))
        .unwrap();

        let event = stream.recv().await.unwrap();
        assert!(matches!(event, CoreEvent::Network(_)));
    }

    #[test]
    fn severity_classification() {
        let failed = CoreEvent::Playback(PlaybackEvent::ResolutionFailed {
            track_id: "t-1".into(),
            reason: "network".into(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let stopped = CoreEvent::Playback(PlaybackEvent::Stopped);
        assert_eq!(stopped.severity(), EventSeverity::Debug);
    }

    #[test]
    fn events_serialize_tagged() {
        let event = CoreEvent::Playback(PlaybackEvent::TrackChanged {
            track_id: Some("t-1".into()),
            index: 0,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Playback\""));
        assert!(json.contains("\"event\":\"TrackChanged\""));
    }
}

//! # Playback Orchestrator
//!
//! Glues the session state machine to the delivery side: when a command
//! makes a new track current, the orchestrator resolves candidate formats,
//! selects the best encoding for the network tier and preferences, fetches
//! through the access-profile ladder when the candidate is an indirection,
//! and drives the backing media engine as resolution and playback progress.
//!
//! ## Concurrency
//!
//! The session has exactly one writer: every mutation goes through this
//! orchestrator, applied under a single lock, so racing inputs (a user tap
//! and a network callback) can never interleave partial updates. Readers
//! observe the session through a `watch` channel of full snapshots.
//!
//! At most one resolution is in flight. Starting a new one cancels the
//! previous token, and a completed resolution is dropped unless it still
//! matches the session's current track (stale-result suppression).

use crate::error::PlaybackError;
use crate::queue::Track;
use crate::session::{Command, CommandOutcome, PlaybackSession, SessionEvent};
use bridge_traits::http::HttpRequest;
use bridge_traits::media::{MediaEngine, MediaEngineEvent, SourceKind};
use bridge_traits::resolver::CandidateResolver;
use bridge_traits::settings::PlayerPreferences;
use core_delivery::{
    select_audio, select_video, AccessStrategyCatalog, FetchOptions, NetworkConditionMonitor,
    NetworkTier, ResilientFetcher,
};
use core_runtime::config::EngineConfig;
use core_runtime::events::{CoreEvent, EventBus, NetworkEvent, PlaybackEvent};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything one successful resolution produced.
struct ResolvedSource {
    url: String,
    /// Separate video rendition, when video mode selected one.
    video_url: Option<String>,
    /// Headers the media engine should present, from the access profile
    /// the current tier would pick first.
    headers: HashMap<String, String>,
}

/// Facade over the playback engine. Cheap to clone.
#[derive(Clone)]
pub struct PlaybackOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    session: RwLock<PlaybackSession>,
    snapshot_tx: watch::Sender<PlaybackSession>,
    events: EventBus,
    resolver: Arc<dyn CandidateResolver>,
    fetcher: ResilientFetcher,
    catalog: AccessStrategyCatalog,
    monitor: NetworkConditionMonitor,
    media_engines: HashMap<SourceKind, Arc<dyn MediaEngine>>,
    preferences: RwLock<PlayerPreferences>,
    /// Bumped on every track change; a resolution result is dropped when
    /// its recorded generation no longer matches.
    generation: AtomicU64,
    resolution_cancel: Mutex<Option<CancellationToken>>,
}

impl PlaybackOrchestrator {
    /// Start the engine from a validated configuration.
    ///
    /// Spawns the connectivity watcher and one event pump per registered
    /// media engine. A missing preference store or connectivity provider
    /// degrades to defaults rather than failing.
    pub async fn start(config: EngineConfig) -> Self {
        let monitor = match &config.connectivity {
            Some(provider) => NetworkConditionMonitor::start(Arc::clone(provider)).await,
            None => NetworkConditionMonitor::fixed(NetworkTier::Unmetered),
        };

        let preferences = match &config.preference_store {
            Some(store) => match store.load_preferences().await {
                Ok(prefs) => prefs,
                Err(err) => {
                    warn!(error = %err, "preference load failed; using defaults");
                    PlayerPreferences::default()
                }
            },
            None => PlayerPreferences::default(),
        };

        let session = PlaybackSession::new(preferences.initial_volume, preferences.video_mode);
        let (snapshot_tx, _) = watch::channel(session.clone());
        let catalog = AccessStrategyCatalog::builtin();

        let inner = Arc::new(Inner {
            session: RwLock::new(session),
            snapshot_tx,
            events: EventBus::new(config.event_buffer),
            resolver: Arc::clone(&config.resolver),
            fetcher: ResilientFetcher::new(
                Arc::clone(&config.http_client),
                catalog.clone(),
                monitor.clone(),
            ),
            catalog,
            monitor,
            media_engines: config.media_engines.clone(),
            preferences: RwLock::new(preferences),
            generation: AtomicU64::new(0),
            resolution_cancel: Mutex::new(None),
        });

        Inner::spawn_tier_watcher(&inner);
        for (kind, engine) in &inner.media_engines {
            Inner::spawn_media_pump(&inner, *kind, Arc::clone(engine));
        }

        info!(
            engines = inner.media_engines.len(),
            tier = %inner.monitor.current_tier(),
            "playback engine started"
        );
        Self { inner }
    }

    /// Apply a command and run its side effects.
    pub fn dispatch(&self, command: Command) {
        self.inner.dispatch(command);
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> PlaybackSession {
        self.inner.session.read().clone()
    }

    /// Subscribe to session snapshots. The receiver always holds the
    /// latest state; intermediate snapshots may be coalesced.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSession> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Subscribe to engine events.
    pub fn subscribe_events(&self) -> core_runtime::events::Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    /// Replace the live preference snapshot; affects the next resolution.
    pub fn update_preferences(&self, preferences: PlayerPreferences) {
        *self.inner.preferences.write() = preferences;
    }

    /// Current network tier as seen by the delivery side.
    pub fn current_tier(&self) -> NetworkTier {
        self.inner.monitor.current_tier()
    }
}

impl Inner {
    fn dispatch(self: &Arc<Self>, command: Command) {
        let (outcome, snapshot) = {
            let mut session = self.session.write();
            let outcome = session.apply(command.clone(), &mut rand::thread_rng());
            (outcome, session.clone())
        };
        // send_replace keeps the latest snapshot live even with no
        // subscribers yet.
        self.snapshot_tx.send_replace(snapshot.clone());
        self.run_effects(&command, outcome, &snapshot);
    }

    fn apply_event(&self, event: SessionEvent) {
        let snapshot = {
            let mut session = self.session.write();
            session.apply_event(event);
            session.clone()
        };
        self.snapshot_tx.send_replace(snapshot);
    }

    fn run_effects(self: &Arc<Self>, command: &Command, outcome: CommandOutcome, snapshot: &PlaybackSession) {
        match outcome {
            // Structural no-ops and rejections leave no work behind.
            CommandOutcome::Ignored | CommandOutcome::Rejected => {}

            CommandOutcome::TrackChanged => {
                let track = snapshot.queue.current_track().cloned();
                if matches!(command, Command::SetQueue { .. } | Command::SetTrack(_)) {
                    self.emit(PlaybackEvent::QueueReplaced {
                        length: snapshot.queue.len(),
                    });
                }
                self.emit(PlaybackEvent::TrackChanged {
                    track_id: track.as_ref().map(|t| t.id.clone()),
                    index: snapshot.queue.current_index(),
                });
                if let Some(track) = track {
                    self.begin_resolution(track);
                }
            }

            CommandOutcome::Restarted => {
                if let Some(engine) = self.current_engine(snapshot) {
                    let playing = snapshot.is_playing;
                    tokio::spawn(async move {
                        if let Err(err) = engine.seek(0.0).await {
                            warn!(error = %err, "restart seek failed");
                        } else if playing {
                            if let Err(err) = engine.play().await {
                                warn!(error = %err, "restart play failed");
                            }
                        }
                    });
                }
            }

            CommandOutcome::Applied => self.run_applied_effects(command, snapshot),
        }
    }

    fn run_applied_effects(self: &Arc<Self>, command: &Command, snapshot: &PlaybackSession) {
        match command {
            Command::TogglePlay => {
                let Some(track_id) = snapshot.current_track_id().map(String::from) else {
                    return;
                };
                let playing = snapshot.is_playing;
                self.emit(if playing {
                    PlaybackEvent::Playing {
                        track_id: track_id.clone(),
                    }
                } else {
                    PlaybackEvent::Paused {
                        track_id: track_id.clone(),
                    }
                });
                if let Some(engine) = self.current_engine(snapshot) {
                    tokio::spawn(async move {
                        let result = if playing { engine.play().await } else { engine.pause().await };
                        if let Err(err) = result {
                            warn!(error = %err, track_id, "play/pause command failed");
                        }
                    });
                }
            }

            // Next at the end of a non-repeating queue: playback stops.
            Command::Next => {
                self.emit(PlaybackEvent::Stopped);
                if let Some(engine) = self.current_engine(snapshot) {
                    tokio::spawn(async move {
                        if let Err(err) = engine.pause().await {
                            warn!(error = %err, "end-of-queue pause failed");
                        }
                    });
                }
            }

            Command::SeekTo(_) => {
                if let Some(engine) = self.current_engine(snapshot) {
                    let position = snapshot.current_time_seconds;
                    tokio::spawn(async move {
                        if let Err(err) = engine.seek(position).await {
                            warn!(error = %err, position, "seek failed");
                        }
                    });
                }
            }

            Command::SetVolume(_) => {
                let volume = snapshot.volume;
                for engine in self.media_engines.values().cloned() {
                    tokio::spawn(async move {
                        if let Err(err) = engine.set_volume(volume).await {
                            warn!(error = %err, "volume update failed");
                        }
                    });
                }
            }

            Command::SetPlaybackRate(_) => {
                let rate = snapshot.playback_rate;
                for engine in self.media_engines.values().cloned() {
                    tokio::spawn(async move {
                        if let Err(err) = engine.set_rate(rate).await {
                            warn!(error = %err, "rate update failed");
                        }
                    });
                }
            }

            // Queue replaced by nothing: tear playback down.
            Command::SetQueue { .. } | Command::Clear => {
                self.cancel_resolution();
                self.emit(PlaybackEvent::QueueReplaced { length: 0 });
                self.emit(PlaybackEvent::Stopped);
                for engine in self.media_engines.values().cloned() {
                    tokio::spawn(async move {
                        if let Err(err) = engine.unload().await {
                            warn!(error = %err, "unload failed");
                        }
                    });
                }
            }

            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn begin_resolution(self: &Arc<Self>, track: Track) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        if let Some(previous) = self.resolution_cancel.lock().replace(cancel.clone()) {
            previous.cancel();
        }
        self.emit(PlaybackEvent::ResolutionStarted {
            track_id: track.id.clone(),
        });

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.run_resolution(track, generation, cancel).await;
        });
    }

    fn cancel_resolution(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = self.resolution_cancel.lock().take() {
            token.cancel();
        }
    }

    async fn run_resolution(self: Arc<Self>, track: Track, generation: u64, cancel: CancellationToken) {
        let result = self.resolve_source(&track, &cancel).await;

        if self.is_stale(&track, generation) {
            debug!(track_id = %track.id, "dropping stale resolution result");
            return;
        }

        let resolved = match result {
            Ok(resolved) => resolved,
            Err(err) if matches!(
                &err,
                PlaybackError::Resolution {
                    source: core_delivery::DeliveryError::Cancelled,
                    ..
                }
            ) =>
            {
                debug!(track_id = %track.id, "resolution cancelled");
                return;
            }
            Err(err) => {
                warn!(track_id = %track.id, error = %err, "resolution failed");
                self.finish_failed(&track, err.failure_reason());
                return;
            }
        };

        let Some(engine) = self.media_engines.get(&track.source_kind).cloned() else {
            warn!(track_id = %track.id, kind = ?track.source_kind, "no media engine for source kind");
            self.finish_failed(&track, PlaybackError::EngineMissing(track.source_kind).failure_reason());
            return;
        };

        let load_url = resolved.video_url.as_deref().unwrap_or(&resolved.url);
        if let Err(err) = engine.load(load_url, &resolved.headers).await {
            // A load that lost a race with a track change must not mark
            // the new track's session as failed.
            if self.is_stale(&track, generation) {
                debug!(track_id = %track.id, "dropping stale load failure");
                return;
            }
            warn!(track_id = %track.id, error = %err, "media engine load failed");
            self.finish_failed(&track, "media-engine");
            return;
        }

        // Load may have raced a track change; re-check before driving playback.
        if self.is_stale(&track, generation) {
            debug!(track_id = %track.id, "track changed during load; abandoning");
            return;
        }

        let (volume, rate, playing) = {
            let session = self.session.read();
            (session.volume, session.playback_rate, session.is_playing)
        };
        if let Err(err) = engine.set_volume(volume).await {
            warn!(track_id = %track.id, error = %err, "volume sync after load failed");
        }
        if let Err(err) = engine.set_rate(rate).await {
            warn!(track_id = %track.id, error = %err, "rate sync after load failed");
        }
        if playing {
            if let Err(err) = engine.play().await {
                warn!(track_id = %track.id, error = %err, "autoplay after load failed");
            }
        }

        self.apply_event(SessionEvent::ResolutionSucceeded {
            duration_seconds: None,
        });
        self.emit(PlaybackEvent::ResolutionSucceeded {
            track_id: track.id.clone(),
            duration_seconds: None,
        });
        debug!(track_id = %track.id, url = %resolved.url, "track resolved and loaded");
    }

    fn is_stale(&self, track: &Track, generation: u64) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            return true;
        }
        self.session.read().current_track_id() != Some(track.id.as_str())
    }

    fn finish_failed(&self, track: &Track, reason: &str) {
        self.apply_event(SessionEvent::ResolutionFailed {
            reason: reason.to_string(),
        });
        self.emit(PlaybackEvent::ResolutionFailed {
            track_id: track.id.clone(),
            reason: reason.to_string(),
        });
    }

    async fn resolve_source(
        &self,
        track: &Track,
        cancel: &CancellationToken,
    ) -> crate::error::Result<ResolvedSource> {
        let candidates = self
            .resolver
            .resolve_candidates(&track.to_ref())
            .await
            .map_err(|err| {
                debug!(track_id = %track.id, error = %err, "candidate resolution errored");
                PlaybackError::NoCandidates(track.id.clone())
            })?;

        let preferences = self.preferences.read().clone();
        let tier = self.monitor.current_tier();

        let audio = select_audio(
            &candidates.audio,
            tier,
            preferences.prefer_opus,
            preferences.high_quality_audio,
            preferences.adaptive_audio,
        )
        .ok_or_else(|| PlaybackError::NoCandidates(track.id.clone()))?;

        let url = if audio.requires_indirection {
            let response = self
                .fetcher
                .fetch_with_retry(
                    HttpRequest::get(&audio.source_url),
                    &FetchOptions::default(),
                    cancel,
                )
                .await
                .map_err(|source| PlaybackError::Resolution {
                    track_id: track.id.clone(),
                    source,
                })?;
            let final_url = response
                .text()
                .map(|body| body.trim().to_string())
                .unwrap_or_default();
            if final_url.is_empty() {
                return Err(PlaybackError::NoCandidates(track.id.clone()));
            }
            final_url
        } else {
            audio.source_url.clone()
        };

        let video_mode = self.session.read().video_mode_enabled;
        let video_url = if track.video_capable && video_mode {
            let target = video_target_height(tier, preferences.high_quality_audio);
            select_video(&candidates.video, target).map(|v| v.source_url.clone())
        } else {
            None
        };

        // The engine presents the same identity the first ladder rung would.
        let profile = self
            .catalog
            .select_profile(tier, 1, self.monitor.save_data());
        let headers = profile
            .headers()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(ResolvedSource {
            url,
            video_url,
            headers,
        })
    }

    // ------------------------------------------------------------------
    // Background tasks
    // ------------------------------------------------------------------

    fn spawn_tier_watcher(inner: &Arc<Self>) {
        let weak = Arc::downgrade(inner);
        let mut rx = inner.monitor.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let tier = *rx.borrow_and_update();
                let Some(inner) = weak.upgrade() else { break };
                let _ = inner.events.emit(CoreEvent::Network(NetworkEvent::TierChanged {
                    tier: tier.to_string(),
                }));
            }
        });
    }

    fn spawn_media_pump(inner: &Arc<Self>, kind: SourceKind, engine: Arc<dyn MediaEngine>) {
        let weak = Arc::downgrade(inner);
        tokio::spawn(async move {
            let mut stream = match engine.subscribe_events().await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(error = %err, ?kind, "media engine event stream unavailable");
                    return;
                }
            };
            while let Some(event) = stream.next().await {
                let Some(inner) = weak.upgrade() else { break };
                match event {
                    MediaEngineEvent::TimeUpdate(seconds) => {
                        inner.apply_event(SessionEvent::Tick(seconds));
                    }
                    MediaEngineEvent::Buffering(fraction) => {
                        inner.apply_event(SessionEvent::Buffering(fraction));
                    }
                    MediaEngineEvent::DurationChanged(seconds) => {
                        inner.apply_event(SessionEvent::DurationChanged(seconds));
                    }
                    MediaEngineEvent::Ended => {
                        // Natural end advances the queue so repeat and
                        // crossfade configuration can take effect.
                        debug!(?kind, "media ended; advancing queue");
                        inner.dispatch(Command::Next);
                    }
                    MediaEngineEvent::Failed(reason) => {
                        warn!(?kind, %reason, "media engine reported failure");
                        let snapshot = {
                            let mut session = inner.session.write();
                            session.apply_event(SessionEvent::ResolutionFailed {
                                reason: "media-engine".into(),
                            });
                            session.clone()
                        };
                        inner.snapshot_tx.send_replace(snapshot.clone());
                        if let Some(track_id) = snapshot.current_track_id() {
                            let _ = inner.events.emit(CoreEvent::Playback(
                                PlaybackEvent::ResolutionFailed {
                                    track_id: track_id.to_string(),
                                    reason: "media-engine".into(),
                                },
                            ));
                        }
                    }
                }
            }
        });
    }

    fn current_engine(&self, snapshot: &PlaybackSession) -> Option<Arc<dyn MediaEngine>> {
        snapshot
            .queue
            .current_track()
            .and_then(|track| self.media_engines.get(&track.source_kind))
            .cloned()
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is a valid state.
        let _ = self.events.emit(CoreEvent::Playback(event));
    }
}

/// Target video height for a tier, following the common 144/480/720/1080
/// rendition tiers.
fn video_target_height(tier: NetworkTier, high_quality: bool) -> u32 {
    match tier {
        NetworkTier::Restricted => 144,
        NetworkTier::Metered => 480,
        NetworkTier::Unmetered => {
            if high_quality {
                1080
            } else {
                720
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_target_follows_tier() {
        assert_eq!(video_target_height(NetworkTier::Restricted, true), 144);
        assert_eq!(video_target_height(NetworkTier::Metered, false), 480);
        assert_eq!(video_target_height(NetworkTier::Unmetered, false), 720);
        assert_eq!(video_target_height(NetworkTier::Unmetered, true), 1080);
    }
}

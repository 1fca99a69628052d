//! End-to-end orchestrator tests against canned collaborators: a scripted
//! resolver, an HTTP client that answers indirection fetches, and a media
//! engine that records commands and lets the test inject element events.

use bridge_traits::connectivity::{
    ConnectivityChangeStream, ConnectivityHints, ConnectivityProvider, EffectiveType,
};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media::{MediaEngine, MediaEngineEvent, MediaEventStream, SourceKind};
use bridge_traits::resolver::{
    AudioCandidate, AudioMimeClass, CandidateResolver, CandidateSet, TrackRef,
};
use bytes::Bytes;
use core_playback::{Command, NetworkState, PlaybackOrchestrator, PlaybackSession, Track};
use core_runtime::config::EngineConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Resolver scripted per track id. Tracks listed in `blocked` wait on the
/// notify before answering, so tests can hold a resolution in flight.
struct ScriptedResolver {
    candidates: HashMap<String, CandidateSet>,
    blocked: Mutex<Vec<String>>,
    release: Arc<Notify>,
}

impl ScriptedResolver {
    fn new() -> Self {
        Self {
            candidates: HashMap::new(),
            blocked: Mutex::new(Vec::new()),
            release: Arc::new(Notify::new()),
        }
    }

    fn with_audio(mut self, track_id: &str, audio: Vec<AudioCandidate>) -> Self {
        self.candidates.insert(
            track_id.to_string(),
            CandidateSet {
                audio,
                video: Vec::new(),
            },
        );
        self
    }

    fn blocking(self, track_id: &str) -> Self {
        self.blocked.lock().push(track_id.to_string());
        self
    }
}

#[async_trait::async_trait]
impl CandidateResolver for ScriptedResolver {
    async fn resolve_candidates(&self, track: &TrackRef) -> BridgeResult<CandidateSet> {
        if self.blocked.lock().contains(&track.id) {
            self.release.notified().await;
        }
        self.candidates
            .get(&track.id)
            .cloned()
            .ok_or_else(|| BridgeError::OperationFailed(format!("unknown track {}", track.id)))
    }
}

/// HTTP client answering every request with a fixed body.
struct CannedHttp {
    body: &'static str,
    seen: Mutex<Vec<String>>,
}

impl CannedHttp {
    fn new(body: &'static str) -> Self {
        Self {
            body,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for CannedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.seen.lock().push(request.url.clone());
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(self.body),
        })
    }
}

/// Media engine that records commands and exposes an injectable event feed.
/// URLs registered via `stall_then_fail_load` wait on the notify inside
/// `load`, then fail, so tests can race a doomed load against a track change.
struct RecordingEngine {
    loaded: Mutex<Vec<String>>,
    load_calls: Mutex<u32>,
    play_calls: Mutex<u32>,
    pause_calls: Mutex<u32>,
    stalled_loads: Mutex<Vec<String>>,
    load_release: Arc<Notify>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<MediaEngineEvent>>>,
}

struct InjectedStream(mpsc::UnboundedReceiver<MediaEngineEvent>);

#[async_trait::async_trait]
impl MediaEventStream for InjectedStream {
    async fn next(&mut self) -> Option<MediaEngineEvent> {
        self.0.recv().await
    }
}

impl RecordingEngine {
    fn new() -> (Arc<Self>, mpsc::UnboundedSender<MediaEngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            loaded: Mutex::new(Vec::new()),
            load_calls: Mutex::new(0),
            play_calls: Mutex::new(0),
            pause_calls: Mutex::new(0),
            stalled_loads: Mutex::new(Vec::new()),
            load_release: Arc::new(Notify::new()),
            events_rx: Mutex::new(Some(rx)),
        });
        (engine, tx)
    }

    fn loaded_urls(&self) -> Vec<String> {
        self.loaded.lock().clone()
    }

    fn load_attempts(&self) -> u32 {
        *self.load_calls.lock()
    }

    fn stall_then_fail_load(&self, url: &str) {
        self.stalled_loads.lock().push(url.to_string());
    }
}

#[async_trait::async_trait]
impl MediaEngine for RecordingEngine {
    async fn load(&self, url: &str, _headers: &HashMap<String, String>) -> BridgeResult<()> {
        *self.load_calls.lock() += 1;
        let stalled = self.stalled_loads.lock().iter().any(|u| u == url);
        if stalled {
            self.load_release.notified().await;
            return Err(BridgeError::OperationFailed("source rejected".to_string()));
        }
        self.loaded.lock().push(url.to_string());
        Ok(())
    }
    async fn play(&self) -> BridgeResult<()> {
        *self.play_calls.lock() += 1;
        Ok(())
    }
    async fn pause(&self) -> BridgeResult<()> {
        *self.pause_calls.lock() += 1;
        Ok(())
    }
    async fn seek(&self, _position_seconds: f64) -> BridgeResult<()> {
        Ok(())
    }
    async fn set_volume(&self, _volume: f32) -> BridgeResult<()> {
        Ok(())
    }
    async fn set_rate(&self, _rate: f32) -> BridgeResult<()> {
        Ok(())
    }
    async fn unload(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn subscribe_events(&self) -> BridgeResult<Box<dyn MediaEventStream>> {
        let rx = self
            .events_rx
            .lock()
            .take()
            .ok_or_else(|| BridgeError::NotAvailable("event stream already taken".to_string()))?;
        Ok(Box::new(InjectedStream(rx)))
    }
}

/// Connectivity provider pinned to a fixed hint snapshot.
struct PinnedConnectivity {
    hints: ConnectivityHints,
}

struct SilentStream;

#[async_trait::async_trait]
impl ConnectivityChangeStream for SilentStream {
    async fn next(&mut self) -> Option<ConnectivityHints> {
        std::future::pending().await
    }
}

#[async_trait::async_trait]
impl ConnectivityProvider for PinnedConnectivity {
    async fn current_hints(&self) -> ConnectivityHints {
        self.hints.clone()
    }
    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn ConnectivityChangeStream>> {
        Ok(Box::new(SilentStream))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn opus(bitrate: u32) -> AudioCandidate {
    AudioCandidate::new(
        AudioMimeClass::Opus,
        bitrate,
        "opus",
        format!("https://cdn.example.com/opus-{bitrate}"),
    )
}

fn aac(bitrate: u32) -> AudioCandidate {
    AudioCandidate::new(
        AudioMimeClass::Aac,
        bitrate,
        "mp4a.40.2",
        format!("https://cdn.example.com/aac-{bitrate}"),
    )
}

fn restricted_hints() -> ConnectivityHints {
    ConnectivityHints {
        effective_type: EffectiveType::TwoG,
        downlink_mbps: Some(0.3),
        save_data: false,
    }
}

async fn wait_for<F>(rx: &mut watch::Receiver<PlaybackSession>, predicate: F) -> PlaybackSession
where
    F: Fn(&PlaybackSession) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if predicate(&snapshot) {
                    return snapshot.clone();
                }
            }
            rx.changed().await.expect("snapshot channel closed");
        }
    })
    .await
    .expect("session never reached expected state")
}

struct Harness {
    orchestrator: PlaybackOrchestrator,
    engine: Arc<RecordingEngine>,
    engine_events: mpsc::UnboundedSender<MediaEngineEvent>,
    resolver_release: Arc<Notify>,
}

async fn start(resolver: ScriptedResolver, http_body: &'static str) -> Harness {
    let (engine, engine_events) = RecordingEngine::new();
    let resolver_release = Arc::clone(&resolver.release);
    let config = EngineConfig::builder()
        .http_client(Arc::new(CannedHttp::new(http_body)))
        .resolver(Arc::new(resolver))
        .media_engine(SourceKind::DirectStream, Arc::clone(&engine) as Arc<dyn MediaEngine>)
        .connectivity(Arc::new(PinnedConnectivity {
            hints: restricted_hints(),
        }))
        .build()
        .expect("config");

    Harness {
        orchestrator: PlaybackOrchestrator::start(config).await,
        engine,
        engine_events,
        resolver_release,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_queue_resolves_and_loads_band_midpoint_candidate() {
    // Restricted tier + adaptive + opus preference: the medium band wins
    // and 96k is closest to its midpoint.
    let resolver =
        ScriptedResolver::new().with_audio("t-0", vec![opus(64_000), opus(96_000), aac(40_000)]);
    let harness = start(resolver, "").await;

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetQueue {
        tracks: vec![Track::new("t-0", "First")],
        start_index: 0,
    });

    let session = wait_for(&mut rx, |s| s.network_state == NetworkState::Loaded).await;
    assert!(session.is_playing);
    assert_eq!(
        harness.engine.loaded_urls(),
        vec!["https://cdn.example.com/opus-96000".to_string()]
    );
}

#[tokio::test]
async fn unknown_track_surfaces_no_candidates_error() {
    let harness = start(ScriptedResolver::new(), "").await;

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetTrack(Track::new("t-missing", "Ghost")));

    let session = wait_for(&mut rx, |s| s.network_state == NetworkState::Error).await;
    assert!(!session.is_playing);
    assert!(harness.engine.loaded_urls().is_empty());
}

#[tokio::test]
async fn indirect_candidate_resolves_through_fetcher() {
    let indirect = AudioCandidate::new(
        AudioMimeClass::Opus,
        96_000,
        "opus",
        "https://host.example.com/indirect",
    )
    .with_indirection(true);
    let resolver = ScriptedResolver::new().with_audio("t-0", vec![indirect]);
    let harness = start(resolver, "https://cdn.example.com/final-stream\n").await;

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetTrack(Track::new("t-0", "Indirect")));

    wait_for(&mut rx, |s| s.network_state == NetworkState::Loaded).await;
    assert_eq!(
        harness.engine.loaded_urls(),
        vec!["https://cdn.example.com/final-stream".to_string()]
    );
}

#[tokio::test]
async fn stale_resolution_is_discarded_after_track_change() {
    // t-0's resolution is held in flight; skipping to t-1 must supersede it.
    let resolver = ScriptedResolver::new()
        .with_audio("t-0", vec![opus(96_000)])
        .with_audio("t-1", vec![aac(128_000)])
        .blocking("t-0");
    let harness = start(resolver, "").await;

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetQueue {
        tracks: vec![Track::new("t-0", "Slow"), Track::new("t-1", "Fast")],
        start_index: 0,
    });
    harness.orchestrator.dispatch(Command::Next);

    let session = wait_for(&mut rx, |s| s.network_state == NetworkState::Loaded).await;
    assert_eq!(session.current_track_id(), Some("t-1"));

    // Let the held resolution complete; its result must be dropped.
    harness.resolver_release.notify_waiters();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let loaded = harness.engine.loaded_urls();
    assert_eq!(loaded, vec!["https://cdn.example.com/aac-128000".to_string()]);
    assert_eq!(
        harness.orchestrator.snapshot().current_track_id(),
        Some("t-1")
    );
}

#[tokio::test]
async fn failed_load_of_superseded_track_leaves_new_track_intact() {
    // t-0's load stalls and will fail; skipping to t-1 while it is in
    // flight must keep t-1's loaded state untouched by that failure.
    let resolver = ScriptedResolver::new()
        .with_audio("t-0", vec![opus(96_000)])
        .with_audio("t-1", vec![aac(128_000)]);
    let harness = start(resolver, "").await;
    harness
        .engine
        .stall_then_fail_load("https://cdn.example.com/opus-96000");

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetQueue {
        tracks: vec![Track::new("t-0", "Doomed"), Track::new("t-1", "Next up")],
        start_index: 0,
    });

    // Wait until t-0's load is actually in flight before skipping away.
    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.engine.load_attempts() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("load never started");

    harness.orchestrator.dispatch(Command::Next);
    let session = wait_for(&mut rx, |s| {
        s.current_track_id() == Some("t-1") && s.network_state == NetworkState::Loaded
    })
    .await;
    assert!(session.is_playing);

    // Release the superseded load so it fails now; the failure belongs to
    // a track that is no longer current and must be discarded.
    harness.engine.load_release.notify_waiters();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = harness.orchestrator.snapshot();
    assert_eq!(snapshot.network_state, NetworkState::Loaded);
    assert_eq!(snapshot.current_track_id(), Some("t-1"));
    assert!(snapshot.is_playing);
}

#[tokio::test]
async fn natural_end_advances_to_next_track() {
    let resolver = ScriptedResolver::new()
        .with_audio("t-0", vec![opus(96_000)])
        .with_audio("t-1", vec![opus(128_000)]);
    let harness = start(resolver, "").await;

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetQueue {
        tracks: vec![Track::new("t-0", "First"), Track::new("t-1", "Second")],
        start_index: 0,
    });
    wait_for(&mut rx, |s| s.network_state == NetworkState::Loaded).await;

    harness.engine_events.send(MediaEngineEvent::Ended).unwrap();

    let session = wait_for(&mut rx, |s| {
        s.current_track_id() == Some("t-1") && s.network_state == NetworkState::Loaded
    })
    .await;
    assert!(session.is_playing);
    assert_eq!(harness.engine.loaded_urls().len(), 2);
}

#[tokio::test]
async fn natural_end_of_last_track_stops_playback() {
    let resolver = ScriptedResolver::new().with_audio("t-0", vec![opus(96_000)]);
    let harness = start(resolver, "").await;

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetTrack(Track::new("t-0", "Only")));
    wait_for(&mut rx, |s| s.network_state == NetworkState::Loaded).await;

    harness.engine_events.send(MediaEngineEvent::Ended).unwrap();

    let session = wait_for(&mut rx, |s| !s.is_playing).await;
    assert_eq!(session.queue.current_index(), 0);
    assert_eq!(session.network_state, NetworkState::Loaded);
}

#[tokio::test]
async fn media_element_events_mirror_into_session() {
    let resolver = ScriptedResolver::new().with_audio("t-0", vec![opus(96_000)]);
    let harness = start(resolver, "").await;

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetTrack(Track::new("t-0", "Only")));
    wait_for(&mut rx, |s| s.network_state == NetworkState::Loaded).await;

    harness
        .engine_events
        .send(MediaEngineEvent::DurationChanged(180.0))
        .unwrap();
    harness.engine_events.send(MediaEngineEvent::TimeUpdate(12.5)).unwrap();
    harness.engine_events.send(MediaEngineEvent::Buffering(0.6)).unwrap();

    let session = wait_for(&mut rx, |s| s.buffering_fraction == 0.6).await;
    assert_eq!(session.duration_seconds, Some(180.0));
    assert_eq!(session.current_time_seconds, 12.5);
}

#[tokio::test]
async fn toggle_play_drives_engine_and_stays_consistent() {
    let resolver = ScriptedResolver::new().with_audio("t-0", vec![opus(96_000)]);
    let harness = start(resolver, "").await;

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetTrack(Track::new("t-0", "Only")));
    wait_for(&mut rx, |s| s.network_state == NetworkState::Loaded).await;

    harness.orchestrator.dispatch(Command::TogglePlay);
    let session = wait_for(&mut rx, |s| !s.is_playing).await;
    assert_eq!(session.network_state, NetworkState::Loaded);

    harness.orchestrator.dispatch(Command::TogglePlay);
    wait_for(&mut rx, |s| s.is_playing).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(*harness.engine.pause_calls.lock() >= 1);
}

#[tokio::test]
async fn engine_failure_puts_session_in_error() {
    let resolver = ScriptedResolver::new().with_audio("t-0", vec![opus(96_000)]);
    let harness = start(resolver, "").await;

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetTrack(Track::new("t-0", "Only")));
    wait_for(&mut rx, |s| s.network_state == NetworkState::Loaded).await;

    harness
        .engine_events
        .send(MediaEngineEvent::Failed("decode error".into()))
        .unwrap();

    let session = wait_for(&mut rx, |s| s.network_state == NetworkState::Error).await;
    assert!(!session.is_playing);

    // Play while in the error state is rejected outright.
    harness.orchestrator.dispatch(Command::TogglePlay);
    assert!(!harness.orchestrator.snapshot().is_playing);
}

#[tokio::test]
async fn clear_tears_the_session_down() {
    let resolver = ScriptedResolver::new().with_audio("t-0", vec![opus(96_000)]);
    let harness = start(resolver, "").await;

    let mut rx = harness.orchestrator.subscribe();
    harness.orchestrator.dispatch(Command::SetTrack(Track::new("t-0", "Only")));
    wait_for(&mut rx, |s| s.network_state == NetworkState::Loaded).await;

    harness.orchestrator.dispatch(Command::Clear);
    let session = wait_for(&mut rx, |s| s.queue.is_empty()).await;
    assert_eq!(session.network_state, NetworkState::Idle);
    assert!(!session.is_playing);
}

//! Playback session state machine.
//!
//! One mutable aggregate, mutated exclusively through [`PlaybackSession::apply`]
//! (commands from the UI surface) and [`PlaybackSession::apply_event`]
//! (resolution and media-element events from the orchestrator). Both are
//! pure with respect to I/O, so the whole transition table is testable
//! without a network or a media element.
//!
//! Out-of-range commands never panic or error: they return
//! [`CommandOutcome::Ignored`] and leave the aggregate untouched.

use crate::queue::{PlaybackQueue, Track};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Position threshold below which `previous` moves back instead of
/// restarting the current track.
pub const PREVIOUS_RESTART_THRESHOLD_SECONDS: f64 = 3.0;

/// Queue repeat behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Stop at the end of the queue.
    #[default]
    None,
    /// Repeat the current track forever.
    One,
    /// Wrap from the last track back to the first.
    All,
}

/// Resolution lifecycle of the current track's source.
///
/// `Loading` is entered whenever a new track becomes current; `Loaded` and
/// `Error` are terminal for that resolution until the next track change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

/// Crossfade/gapless transition configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossfadeConfig {
    pub enabled: bool,
    pub duration_seconds: f64,
}

impl Default for CrossfadeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_seconds: 5.0,
        }
    }
}

/// Command surface exposed to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the whole queue and start at `start_index` (clamped).
    SetQueue {
        tracks: Vec<Track>,
        start_index: usize,
    },
    /// Replace the queue with a single track.
    SetTrack(Track),
    /// Play a track immediately, keeping the rest of the queue: splices it
    /// right after the current position and moves to it.
    PlayNow(Track),
    TogglePlay,
    Next,
    Previous,
    SeekTo(f64),
    /// Volume, clamped to `[0, 1]`.
    SetVolume(f32),
    /// Rate multiplier, clamped to `[0.25, 2]`.
    SetPlaybackRate(f32),
    SetRepeatMode(RepeatMode),
    ToggleShuffle,
    /// `duration_seconds: None` keeps the previously configured duration.
    SetCrossfade {
        enabled: bool,
        duration_seconds: Option<f64>,
    },
    SetVideoMode(bool),
    /// Reset to the empty session, preserving volume/rate/crossfade settings.
    Clear,
}

/// Event applied to the session by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The current track resolved to a playable source.
    ResolutionSucceeded { duration_seconds: Option<f64> },
    /// Resolution failed; `reason` is a failure class, not prose.
    ResolutionFailed { reason: String },
    /// Advisory position mirror from the media element.
    Tick(f64),
    /// Buffered fraction of the current source.
    Buffering(f64),
    /// The media element learned or revised the stream duration.
    DurationChanged(f64),
}

/// What applying a command did, so the orchestrator knows which side
/// effects to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// State changed; no new track, no restart.
    Applied,
    /// A different track is now current: resolution must start over.
    TrackChanged,
    /// The same track restarts from zero: seek, not re-resolution.
    Restarted,
    /// Structural no-op (e.g. `Next` on an empty queue). Never an error.
    Ignored,
    /// Command refused in the current state (e.g. play while in error).
    Rejected,
}

/// The single mutable playback aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub queue: PlaybackQueue,
    pub repeat_mode: RepeatMode,
    pub shuffle_enabled: bool,
    pub crossfade: CrossfadeConfig,
    pub network_state: NetworkState,
    /// Buffered fraction of the current source, in `[0, 1]`.
    pub buffering_fraction: f64,
    pub is_playing: bool,
    pub current_time_seconds: f64,
    /// Known duration of the current source, once reported.
    pub duration_seconds: Option<f64>,
    /// Normalized volume in `[0, 1]`.
    pub volume: f32,
    /// Rate multiplier in `[0.25, 2]`.
    pub playback_rate: f32,
    pub video_mode_enabled: bool,
}

impl PlaybackSession {
    /// Empty session with engine defaults.
    pub fn new(initial_volume: f32, video_mode_enabled: bool) -> Self {
        Self {
            volume: initial_volume.clamp(0.0, 1.0),
            playback_rate: 1.0,
            video_mode_enabled,
            ..Self::default()
        }
    }

    /// Identity of the current track, if any.
    pub fn current_track_id(&self) -> Option<&str> {
        self.queue.current_track().map(|t| t.id.as_str())
    }

    /// Apply a command, mutating the session in place.
    ///
    /// `rng` feeds shuffle permutation only; every other command is
    /// deterministic.
    pub fn apply<R: Rng>(&mut self, command: Command, rng: &mut R) -> CommandOutcome {
        match command {
            Command::SetQueue {
                tracks,
                start_index,
            } => self.set_queue(tracks, start_index),
            Command::SetTrack(track) => self.set_queue(vec![track], 0),
            Command::PlayNow(track) => {
                // splice_now records the track in the shuffle baseline
                // itself; re-baselining here would freeze the shuffled
                // arrangement as the restore order.
                self.queue.splice_now(track);
                self.begin_track(true);
                CommandOutcome::TrackChanged
            }
            Command::TogglePlay => self.toggle_play(),
            Command::Next => self.next(),
            Command::Previous => self.previous(),
            Command::SeekTo(seconds) => self.seek_to(seconds),
            Command::SetVolume(volume) => {
                self.volume = volume.clamp(0.0, 1.0);
                CommandOutcome::Applied
            }
            Command::SetPlaybackRate(rate) => {
                self.playback_rate = rate.clamp(0.25, 2.0);
                CommandOutcome::Applied
            }
            Command::SetRepeatMode(mode) => {
                self.repeat_mode = mode;
                CommandOutcome::Applied
            }
            Command::ToggleShuffle => self.toggle_shuffle(rng),
            Command::SetCrossfade {
                enabled,
                duration_seconds,
            } => {
                self.crossfade.enabled = enabled;
                if let Some(duration) = duration_seconds {
                    self.crossfade.duration_seconds = duration.max(0.0);
                }
                CommandOutcome::Applied
            }
            Command::SetVideoMode(enabled) => {
                self.video_mode_enabled = enabled;
                CommandOutcome::Applied
            }
            Command::Clear => {
                self.queue.clear();
                self.shuffle_enabled = false;
                self.is_playing = false;
                self.network_state = NetworkState::Idle;
                self.current_time_seconds = 0.0;
                self.duration_seconds = None;
                self.buffering_fraction = 0.0;
                CommandOutcome::Applied
            }
        }
    }

    /// Apply an orchestrator-produced event.
    pub fn apply_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ResolutionSucceeded { duration_seconds } => {
                self.network_state = NetworkState::Loaded;
                if duration_seconds.is_some() {
                    self.duration_seconds = duration_seconds;
                }
            }
            SessionEvent::ResolutionFailed { .. } => {
                self.network_state = NetworkState::Error;
                self.is_playing = false;
            }
            SessionEvent::Tick(seconds) => {
                self.current_time_seconds = seconds.max(0.0);
            }
            SessionEvent::Buffering(fraction) => {
                self.buffering_fraction = fraction.clamp(0.0, 1.0);
            }
            SessionEvent::DurationChanged(seconds) => {
                self.duration_seconds = Some(seconds.max(0.0));
            }
        }
    }

    fn set_queue(&mut self, tracks: Vec<Track>, start_index: usize) -> CommandOutcome {
        self.queue.replace(tracks, start_index);
        if self.queue.is_empty() {
            self.is_playing = false;
            self.network_state = NetworkState::Idle;
            self.current_time_seconds = 0.0;
            self.duration_seconds = None;
            self.buffering_fraction = 0.0;
            return CommandOutcome::Applied;
        }
        if self.shuffle_enabled {
            self.queue.mark_shuffle_baseline();
        }
        self.begin_track(true);
        CommandOutcome::TrackChanged
    }

    fn toggle_play(&mut self) -> CommandOutcome {
        if self.network_state == NetworkState::Error {
            return CommandOutcome::Rejected;
        }
        if self.queue.is_empty() {
            return CommandOutcome::Ignored;
        }
        self.is_playing = !self.is_playing;
        CommandOutcome::Applied
    }

    fn next(&mut self) -> CommandOutcome {
        if self.queue.is_empty() {
            return CommandOutcome::Ignored;
        }
        if self.repeat_mode == RepeatMode::One {
            self.current_time_seconds = 0.0;
            return CommandOutcome::Restarted;
        }
        if self.queue.advance(self.repeat_mode == RepeatMode::All) {
            self.begin_track(false);
            CommandOutcome::TrackChanged
        } else {
            // End of a non-repeating queue: stop in place, index unchanged.
            self.is_playing = false;
            CommandOutcome::Applied
        }
    }

    fn previous(&mut self) -> CommandOutcome {
        if self.queue.is_empty() {
            return CommandOutcome::Ignored;
        }
        if self.current_time_seconds > PREVIOUS_RESTART_THRESHOLD_SECONDS {
            self.current_time_seconds = 0.0;
            return CommandOutcome::Restarted;
        }
        if self.queue.retreat() {
            self.begin_track(false);
            return CommandOutcome::TrackChanged;
        }
        if self.repeat_mode == RepeatMode::All && self.queue.len() > 1 {
            self.queue.jump_to(self.queue.len() - 1);
            self.begin_track(false);
            return CommandOutcome::TrackChanged;
        }
        // At index 0 with no wrap: restart.
        self.current_time_seconds = 0.0;
        CommandOutcome::Restarted
    }

    fn seek_to(&mut self, seconds: f64) -> CommandOutcome {
        if self.queue.is_empty() {
            return CommandOutcome::Ignored;
        }
        let ceiling = self.duration_seconds.unwrap_or(f64::MAX);
        self.current_time_seconds = seconds.clamp(0.0, ceiling);
        CommandOutcome::Applied
    }

    fn toggle_shuffle<R: Rng>(&mut self, rng: &mut R) -> CommandOutcome {
        if self.shuffle_enabled {
            self.queue.disable_shuffle();
            self.shuffle_enabled = false;
        } else {
            self.queue.enable_shuffle(rng);
            self.shuffle_enabled = true;
        }
        CommandOutcome::Applied
    }

    /// Field resets common to every track change.
    fn begin_track(&mut self, force_playing: bool) {
        self.current_time_seconds = 0.0;
        self.buffering_fraction = 0.0;
        self.duration_seconds = self.queue.current_track().and_then(|t| t.duration_seconds);
        self.network_state = NetworkState::Loading;
        if force_playing {
            self.is_playing = true;
        }
    }
}

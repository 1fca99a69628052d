//! Candidate Resolver Abstraction
//!
//! Turns a track reference into the set of encoded audio/video candidates
//! currently offered by the media host. How candidates are discovered
//! (page scraping, feed parsing, API calls) is entirely the host's concern;
//! the engine only consumes the resulting list and never caches it beyond a
//! single resolution.

use crate::error::Result;
use crate::media::SourceKind;

/// Reference to a track as known by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    /// Opaque track identity, stable across resolutions.
    pub id: String,
    /// Origin class of the track's media.
    pub source_kind: SourceKind,
    /// Whether the track can carry a video stream at all.
    pub video_capable: bool,
}

impl TrackRef {
    pub fn new(id: impl Into<String>, source_kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            source_kind,
            video_capable: false,
        }
    }

    pub fn with_video(mut self, video_capable: bool) -> Self {
        self.video_capable = video_capable;
        self
    }
}

/// Coarse audio container/codec class used by format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMimeClass {
    Opus,
    Aac,
    Other,
}

/// Coarse video container class. `Mp4` is the broadly compatible
/// "standard container" class preferred by selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMimeClass {
    Mp4,
    WebM,
    Other,
}

/// One available encoded version of a track's audio.
///
/// Immutable and externally supplied per playback attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCandidate {
    pub mime_class: AudioMimeClass,
    pub bitrate_bps: u32,
    /// Raw codec string as reported by the host (e.g. `opus`, `mp4a.40.2`).
    pub codec_tag: String,
    pub source_url: String,
    /// True when `source_url` is itself an indirection that needs a further
    /// fetch (through the resilient fetcher) to yield the playable URL.
    pub requires_indirection: bool,
}

impl AudioCandidate {
    pub fn new(
        mime_class: AudioMimeClass,
        bitrate_bps: u32,
        codec_tag: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            mime_class,
            bitrate_bps,
            codec_tag: codec_tag.into(),
            source_url: source_url.into(),
            requires_indirection: false,
        }
    }

    pub fn with_indirection(mut self, requires_indirection: bool) -> Self {
        self.requires_indirection = requires_indirection;
        self
    }
}

/// One available encoded version of a track's video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoCandidate {
    pub height_px: u32,
    pub bitrate_bps: u32,
    pub mime_class: VideoMimeClass,
    pub source_url: String,
}

impl VideoCandidate {
    pub fn new(
        height_px: u32,
        bitrate_bps: u32,
        mime_class: VideoMimeClass,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            height_px,
            bitrate_bps,
            mime_class,
            source_url: source_url.into(),
        }
    }
}

/// Everything a single resolution produced for one track.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    pub audio: Vec<AudioCandidate>,
    pub video: Vec<VideoCandidate>,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty() && self.video.is_empty()
    }
}

/// Candidate resolver trait
///
/// # Failure semantics
///
/// A resolver error and an empty [`CandidateSet`] are treated identically by
/// the engine: "no candidates", surfaced as a resolution failure, never a
/// panic.
#[async_trait::async_trait]
pub trait CandidateResolver: Send + Sync {
    /// Resolve the candidate formats currently available for a track.
    async fn resolve_candidates(&self, track: &TrackRef) -> Result<CandidateSet>;
}

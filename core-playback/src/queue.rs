//! Playback queue: ordered track list with a current position and
//! lossless shuffle.
//!
//! Shuffle keeps the pre-shuffle ordering aside so disabling it restores
//! the original sequence exactly, with the current track staying current
//! across both transitions.

use bridge_traits::media::SourceKind;
use bridge_traits::resolver::TrackRef;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A queued track. Carries only what the session and resolution need;
/// metadata beyond that stays with the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Stable identifier, unique within the queue's source catalog.
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    /// Opaque artwork reference the host can render.
    pub thumbnail_ref: Option<String>,
    /// Known duration in seconds, if the catalog supplied one.
    pub duration_seconds: Option<f64>,
    pub source_kind: SourceKind,
    /// Whether this track has a video rendition worth resolving.
    pub video_capable: bool,
}

impl Track {
    /// Minimal track with the given id, playable as a direct stream.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: None,
            thumbnail_ref: None,
            duration_seconds: None,
            source_kind: SourceKind::DirectStream,
            video_capable: false,
        }
    }

    /// Reference used to ask the resolver for candidate formats.
    pub fn to_ref(&self) -> TrackRef {
        TrackRef::new(&self.id, self.source_kind).with_video(self.video_capable)
    }
}

/// Ordered track sequence with a current position.
///
/// `current_index` is `-1` exactly when the queue is empty; otherwise it is
/// a valid index into `tracks`. All mutating operations preserve that
/// invariant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackQueue {
    tracks: Vec<Track>,
    current_index: i32,
    /// Pre-shuffle ordering, present only while shuffle is on.
    original_order: Option<Vec<Track>>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            current_index: -1,
            original_order: None,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> i32 {
        self.current_index
    }

    pub fn is_shuffled(&self) -> bool {
        self.original_order.is_some()
    }

    /// The track at the current position, `None` when empty.
    pub fn current_track(&self) -> Option<&Track> {
        if self.current_index < 0 {
            None
        } else {
            self.tracks.get(self.current_index as usize)
        }
    }

    /// Replace the whole queue, positioning at `start_index` (clamped to
    /// the valid range). An empty replacement resets to the empty state.
    /// Any shuffle ordering from the previous contents is discarded.
    pub fn replace(&mut self, tracks: Vec<Track>, start_index: usize) {
        self.original_order = None;
        self.tracks = tracks;
        self.current_index = if self.tracks.is_empty() {
            -1
        } else {
            start_index.min(self.tracks.len() - 1) as i32
        };
    }

    /// Insert a track immediately after the current position and move to
    /// it. On an empty queue this is equivalent to `replace([track], 0)`.
    pub fn splice_now(&mut self, track: Track) {
        if self.tracks.is_empty() {
            self.replace(vec![track], 0);
            return;
        }
        let insert_at = (self.current_index + 1) as usize;
        self.tracks.insert(insert_at, track.clone());
        if let Some(original) = self.original_order.as_mut() {
            original.push(track);
        }
        self.current_index = insert_at as i32;
    }

    /// Move to the next track. Wraps when `wrap` is set; otherwise the
    /// index stays put at the end and `false` is returned.
    pub fn advance(&mut self, wrap: bool) -> bool {
        if self.tracks.is_empty() {
            return false;
        }
        let last = (self.tracks.len() - 1) as i32;
        if self.current_index < last {
            self.current_index += 1;
            true
        } else if wrap {
            self.current_index = 0;
            true
        } else {
            false
        }
    }

    /// Move to the previous track, stopping at the start. Returns `false`
    /// when already at index 0 (or empty).
    pub fn retreat(&mut self) -> bool {
        if self.current_index > 0 {
            self.current_index -= 1;
            true
        } else {
            false
        }
    }

    /// Jump straight to an index. Returns `false` if out of range.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.current_index = index as i32;
            true
        } else {
            false
        }
    }

    /// Shuffle the remaining tracks, keeping the current track at its
    /// position's front. The current track moves to index 0 and every
    /// other track is permuted after it. No-op when already shuffled.
    pub fn enable_shuffle<R: Rng>(&mut self, rng: &mut R) {
        if self.original_order.is_some() || self.tracks.is_empty() {
            return;
        }
        self.original_order = Some(self.tracks.clone());
        let current = self.tracks.remove(self.current_index as usize);
        self.tracks.shuffle(rng);
        self.tracks.insert(0, current);
        self.current_index = 0;
    }

    /// Restore the pre-shuffle ordering. The current track stays current:
    /// the index is repositioned to wherever that track sits in the
    /// restored order. No-op when not shuffled.
    pub fn disable_shuffle(&mut self) {
        let Some(original) = self.original_order.take() else {
            return;
        };
        let current_id = self.current_track().map(|t| t.id.clone());
        self.tracks = original;
        self.current_index = current_id
            .and_then(|id| self.tracks.iter().position(|t| t.id == id))
            .map(|i| i as i32)
            .unwrap_or(if self.tracks.is_empty() { -1 } else { 0 });
    }

    /// Mark the current ordering as the shuffle baseline without permuting.
    /// Used when the queue is replaced while shuffle stays on: the new
    /// queue becomes the order a later shuffle-off restores.
    pub fn mark_shuffle_baseline(&mut self) {
        self.original_order = if self.tracks.is_empty() {
            None
        } else {
            Some(self.tracks.clone())
        };
    }

    /// Drop everything, including any shuffle ordering.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.original_order = None;
        self.current_index = -1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n).map(|i| Track::new(format!("t-{i}"), format!("Track {i}"))).collect()
    }

    #[test]
    fn empty_queue_has_sentinel_index() {
        let q = PlaybackQueue::new();
        assert_eq!(q.current_index(), -1);
        assert!(q.current_track().is_none());
    }

    #[test]
    fn replace_clamps_start_index() {
        let mut q = PlaybackQueue::new();
        q.replace(tracks(3), 10);
        assert_eq!(q.current_index(), 2);
        q.replace(vec![], 0);
        assert_eq!(q.current_index(), -1);
    }

    #[test]
    fn advance_without_wrap_stops_at_end() {
        let mut q = PlaybackQueue::new();
        q.replace(tracks(3), 0);
        assert!(q.advance(false));
        assert!(q.advance(false));
        assert!(!q.advance(false));
        assert_eq!(q.current_index(), 2);
    }

    #[test]
    fn advance_with_wrap_cycles() {
        let mut q = PlaybackQueue::new();
        q.replace(tracks(3), 2);
        assert!(q.advance(true));
        assert_eq!(q.current_index(), 0);
    }

    #[test]
    fn retreat_stops_at_start() {
        let mut q = PlaybackQueue::new();
        q.replace(tracks(3), 1);
        assert!(q.retreat());
        assert!(!q.retreat());
        assert_eq!(q.current_index(), 0);
    }

    #[test]
    fn splice_now_inserts_after_current() {
        let mut q = PlaybackQueue::new();
        q.replace(tracks(3), 1);
        q.splice_now(Track::new("t-x", "Spliced"));
        assert_eq!(q.current_index(), 2);
        assert_eq!(q.current_track().unwrap().id, "t-x");
        assert_eq!(q.len(), 4);
        assert_eq!(q.tracks()[3].id, "t-2");
    }

    #[test]
    fn splice_now_on_empty_queue() {
        let mut q = PlaybackQueue::new();
        q.splice_now(Track::new("t-x", "Only"));
        assert_eq!(q.current_index(), 0);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn shuffle_keeps_current_track_and_restores() {
        let mut q = PlaybackQueue::new();
        q.replace(tracks(8), 3);
        let current_id = q.current_track().unwrap().id.clone();

        let mut rng = StdRng::seed_from_u64(42);
        q.enable_shuffle(&mut rng);
        assert!(q.is_shuffled());
        assert_eq!(q.current_index(), 0);
        assert_eq!(q.current_track().unwrap().id, current_id);
        assert_eq!(q.len(), 8);

        q.disable_shuffle();
        assert!(!q.is_shuffled());
        assert_eq!(q.current_track().unwrap().id, current_id);
        assert_eq!(q.current_index(), 3);
        let ids: Vec<_> = q.tracks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t-0", "t-1", "t-2", "t-3", "t-4", "t-5", "t-6", "t-7"]);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut q = PlaybackQueue::new();
        q.replace(tracks(16), 0);
        let mut rng = StdRng::seed_from_u64(7);
        q.enable_shuffle(&mut rng);
        let mut ids: Vec<_> = q.tracks().iter().map(|t| t.id.clone()).collect();
        ids.sort();
        let mut expected: Vec<_> = (0..16).map(|i| format!("t-{i}")).collect();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn disable_shuffle_when_not_shuffled_is_noop() {
        let mut q = PlaybackQueue::new();
        q.replace(tracks(3), 1);
        q.disable_shuffle();
        assert_eq!(q.current_index(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut q = PlaybackQueue::new();
        q.replace(tracks(4), 2);
        let mut rng = StdRng::seed_from_u64(1);
        q.enable_shuffle(&mut rng);
        q.clear();
        assert!(q.is_empty());
        assert!(!q.is_shuffled());
        assert_eq!(q.current_index(), -1);
    }
}

//! # Format Selector
//!
//! Pure selection logic: given heterogeneous candidate formats, a quality
//! target, and the detected network tier, pick the single best candidate.
//!
//! Selection never fails loudly. An empty or unusable candidate list yields
//! `None`, which callers surface as a "no playable source" outcome.

use crate::monitor::NetworkTier;
use bridge_traits::resolver::{AudioCandidate, AudioMimeClass, VideoCandidate, VideoMimeClass};

/// Audio quality target level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AudioLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// Map preferences and tier to a target audio level.
///
/// With adaptive selection disabled the tier is ignored entirely; with it
/// enabled, constrained tiers cap the target at Medium.
pub fn target_audio_level(tier: NetworkTier, high_quality: bool, adaptive: bool) -> AudioLevel {
    if !adaptive {
        return if high_quality {
            AudioLevel::High
        } else {
            AudioLevel::Medium
        };
    }
    match tier {
        NetworkTier::Restricted | NetworkTier::Metered => AudioLevel::Medium,
        NetworkTier::Unmetered => {
            if high_quality {
                AudioLevel::VeryHigh
            } else {
                AudioLevel::High
            }
        }
    }
}

/// Bitrate band for a target level, in bits per second.
///
/// Convention: contiguous inclusive bands. Low = [0, 64_000],
/// Medium = [64_001, 128_000], High = [128_001, 256_000],
/// VeryHigh = [256_001, u32::MAX]. Each bitrate belongs to exactly one band.
pub fn quality_range(level: AudioLevel) -> (u32, u32) {
    match level {
        AudioLevel::Low => (0, 64_000),
        AudioLevel::Medium => (64_001, 128_000),
        AudioLevel::High => (128_001, 256_000),
        AudioLevel::VeryHigh => (256_001, u32::MAX),
    }
}

/// Select the best audio candidate, or `None` when nothing is selectable.
///
/// Steps:
/// 1. partition into opus-class and aac-class candidates
/// 2. preferred set = opus when `prefer_opus` and any exist, else aac when
///    any exist, else all candidates
/// 3. filter the preferred set to the target bitrate band, falling back to
///    the unfiltered preferred set when the band is empty
/// 4. tie-break: `high_quality` picks max bitrate, otherwise the candidate
///    closest to the band midpoint; remaining ties go to input order
pub fn select_audio<'a>(
    candidates: &'a [AudioCandidate],
    tier: NetworkTier,
    prefer_opus: bool,
    high_quality: bool,
    adaptive: bool,
) -> Option<&'a AudioCandidate> {
    if candidates.is_empty() {
        return None;
    }

    let opus: Vec<&AudioCandidate> = candidates
        .iter()
        .filter(|c| is_opus_class(c))
        .collect();
    let aac: Vec<&AudioCandidate> = candidates
        .iter()
        .filter(|c| c.mime_class == AudioMimeClass::Aac)
        .collect();

    let preferred: Vec<&AudioCandidate> = if prefer_opus && !opus.is_empty() {
        opus
    } else if !aac.is_empty() {
        aac
    } else {
        candidates.iter().collect()
    };

    let level = target_audio_level(tier, high_quality, adaptive);
    let (min_bps, max_bps) = quality_range(level);

    let in_range: Vec<&AudioCandidate> = preferred
        .iter()
        .copied()
        .filter(|c| c.bitrate_bps >= min_bps && c.bitrate_bps <= max_bps)
        .collect();
    let pool = if in_range.is_empty() { preferred } else { in_range };

    if high_quality {
        pick_max_bitrate(&pool)
    } else {
        let midpoint = (min_bps as u64 + max_bps as u64) / 2;
        pick_closest_to(&pool, midpoint)
    }
}

fn is_opus_class(candidate: &AudioCandidate) -> bool {
    candidate.mime_class == AudioMimeClass::Opus
        || candidate.codec_tag.to_ascii_lowercase().contains("opus")
}

// Strict comparisons keep earlier candidates on ties (stable by input order).
fn pick_max_bitrate<'a>(pool: &[&'a AudioCandidate]) -> Option<&'a AudioCandidate> {
    let mut best: Option<&AudioCandidate> = None;
    for &candidate in pool {
        if best.map_or(true, |b| candidate.bitrate_bps > b.bitrate_bps) {
            best = Some(candidate);
        }
    }
    best
}

fn pick_closest_to<'a>(pool: &[&'a AudioCandidate], target_bps: u64) -> Option<&'a AudioCandidate> {
    let mut best: Option<(&AudioCandidate, u64)> = None;
    for &candidate in pool {
        let distance = (candidate.bitrate_bps as u64).abs_diff(target_bps);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }
    best.map(|(c, _)| c)
}

/// Height tolerance band around the target, as a fraction of the target.
const VIDEO_HEIGHT_TOLERANCE: f64 = 0.25;

/// Select the best video candidate for a target height, or `None` when the
/// candidate list is empty.
///
/// Candidates within ±25% of the target height are considered first; when
/// that band is empty the whole list is. Within the pool the broadly
/// compatible mp4 class wins over other containers, then max bitrate, then
/// input order.
pub fn select_video(candidates: &[VideoCandidate], target_height_px: u32) -> Option<&VideoCandidate> {
    if candidates.is_empty() {
        return None;
    }

    let min_height = (target_height_px as f64 * (1.0 - VIDEO_HEIGHT_TOLERANCE)) as u32;
    let max_height = (target_height_px as f64 * (1.0 + VIDEO_HEIGHT_TOLERANCE)) as u32;

    let in_band: Vec<&VideoCandidate> = candidates
        .iter()
        .filter(|c| c.height_px >= min_height && c.height_px <= max_height)
        .collect();
    let pool: Vec<&VideoCandidate> = if in_band.is_empty() {
        candidates.iter().collect()
    } else {
        in_band
    };

    let mut best: Option<&VideoCandidate> = None;
    for candidate in pool {
        let better = match best {
            None => true,
            Some(current) => {
                let cand_std = candidate.mime_class == VideoMimeClass::Mp4;
                let curr_std = current.mime_class == VideoMimeClass::Mp4;
                if cand_std != curr_std {
                    cand_std
                } else {
                    candidate.bitrate_bps > current.bitrate_bps
                }
            }
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}

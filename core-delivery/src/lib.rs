//! # Delivery Module
//!
//! Network-access side of the playback engine: classifies connection quality,
//! picks request profiles, retries across them, and selects the best encoded
//! format for the current conditions.
//!
//! ## Components
//!
//! - **Network Condition Monitor** (`monitor`): classifies host connectivity
//!   hints into a coarse [`NetworkTier`](monitor::NetworkTier) and notifies on
//!   tier transitions (de-duplicated).
//! - **Access Strategy Catalog** (`profiles`): a fixed registry of named
//!   request profiles and the deterministic ladder mapping (tier, attempt,
//!   save-data) to a profile.
//! - **Resilient Fetcher** (`fetcher`): executes a request under a chosen
//!   profile and escalates to the next profile on failure, bounded by an
//!   attempt budget and an overall deadline.
//! - **Format Selector** (`selector`): picks the single best audio/video
//!   candidate for a quality target and network tier.

pub mod error;
pub mod fetcher;
pub mod monitor;
pub mod profiles;
pub mod selector;

pub use error::{AttemptFailure, DeliveryError, Result};
pub use fetcher::{FetchOptions, ResilientFetcher};
pub use monitor::{NetworkConditionMonitor, NetworkTier};
pub use profiles::{AccessProfile, AccessStrategyCatalog};
pub use selector::{select_audio, select_video, target_audio_level, AudioLevel};

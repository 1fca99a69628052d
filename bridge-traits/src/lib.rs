//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback engine and
//! platform-specific implementations. Each trait represents a capability that
//! the engine requires but that must be implemented differently per host
//! (desktop, mobile, web shell).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP request execution
//! - [`ConnectivityProvider`](connectivity::ConnectivityProvider) - Connection
//!   hints (effective type, downlink estimate, save-data flag)
//!
//! ### Media
//! - [`MediaEngine`](media::MediaEngine) - Backing media element control
//!   (`load`/`play`/`pause`/`seek` plus an event stream)
//! - [`CandidateResolver`](resolver::CandidateResolver) - Turns a track
//!   reference into a set of encoded audio/video candidates
//!
//! ### Preferences
//! - [`PreferenceStore`](settings::PreferenceStore) - Read-only snapshot of
//!   user playback preferences
//!
//! ## Fail-Fast Strategy
//!
//! The engine fails fast with descriptive errors when a required capability is
//! missing; see `core_runtime::config::EngineConfig` for the validation point.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert platform-specific errors to
//! `BridgeError` and provide actionable messages with context (URLs, status
//! codes, hint values).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks.

pub mod connectivity;
pub mod error;
pub mod http;
pub mod media;
pub mod resolver;
pub mod settings;

pub use error::BridgeError;

// Re-export commonly used types
pub use connectivity::{
    ConnectivityChangeStream, ConnectivityHints, ConnectivityProvider, EffectiveType,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use media::{MediaEngine, MediaEngineEvent, MediaEventStream, SourceKind};
pub use resolver::{
    AudioCandidate, AudioMimeClass, CandidateResolver, CandidateSet, TrackRef, VideoCandidate,
    VideoMimeClass,
};
pub use settings::{PlayerPreferences, PreferenceStore};

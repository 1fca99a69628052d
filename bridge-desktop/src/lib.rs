//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the bridge
//! traits the playback engine consumes, using desktop-appropriate
//! libraries:
//! - `HttpClient` using `reqwest`
//! - `ConnectivityProvider` as a host-fed hint channel (desktops expose
//!   no portable connection API)
//! - `PreferenceStore` as a JSON file under the platform config directory
//!
//! Media engines are intentionally absent: rendering is host-specific, so
//! shells register their own `MediaEngine` implementations.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonPreferenceStore, ManualConnectivityProvider, ReqwestHttpClient};
//! use core_runtime::config::EngineConfig;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::builder()
//!     .http_client(Arc::new(ReqwestHttpClient::new()))
//!     .connectivity(Arc::new(ManualConnectivityProvider::new()))
//!     .preference_store(Arc::new(JsonPreferenceStore::at_default_location()?))
//!     // .resolver(...) and .media_engine(...) supplied by the shell
//!     .build()?;
//! ```

mod connectivity;
mod http;
mod preferences;

pub use connectivity::{ConnectivityHandle, ManualConnectivityProvider};
pub use http::ReqwestHttpClient;
pub use preferences::JsonPreferenceStore;

//! # Engine Configuration Module
//!
//! Provides configuration management for the playback engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `EngineConfig` instance holding all bridge implementations and settings
//! the engine needs. It enforces fail-fast validation so a missing
//! capability surfaces at startup with an actionable message, not as a
//! panic mid-playback.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - outbound request execution
//! - `CandidateResolver` - candidate format discovery
//! - at least one `MediaEngine`, keyed by the `SourceKind` it can play
//!
//! ## Optional Dependencies
//!
//! - `ConnectivityProvider` - absent hosts run with the optimistic
//!   unmetered default
//! - `PreferenceStore` - absent hosts run with default preferences
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//! use bridge_traits::media::SourceKind;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::builder()
//!     .http_client(Arc::new(MyHttpClient))
//!     .resolver(Arc::new(MyResolver))
//!     .media_engine(SourceKind::DirectStream, Arc::new(MyMediaEngine))
//!     .connectivity(Arc::new(MyConnectivityProvider))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::connectivity::ConnectivityProvider;
use bridge_traits::http::HttpClient;
use bridge_traits::media::{MediaEngine, SourceKind};
use bridge_traits::resolver::CandidateResolver;
use bridge_traits::settings::PreferenceStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Engine configuration.
///
/// Holds all bridges and settings required to start the playback engine.
/// Use [`EngineConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct EngineConfig {
    /// HTTP client for resolution and indirection fetches (required)
    pub http_client: Arc<dyn HttpClient>,

    /// Candidate format resolver (required)
    pub resolver: Arc<dyn CandidateResolver>,

    /// Backing media engines, keyed by the source kind each can play
    /// (at least one required)
    pub media_engines: HashMap<SourceKind, Arc<dyn MediaEngine>>,

    /// Connectivity hints provider (optional)
    pub connectivity: Option<Arc<dyn ConnectivityProvider>>,

    /// User preference store (optional)
    pub preference_store: Option<Arc<dyn PreferenceStore>>,

    /// Buffer size for the engine event bus
    pub event_buffer: usize,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("resolver", &"CandidateResolver { ... }")
            .field(
                "media_engines",
                &self.media_engines.keys().collect::<Vec<_>>(),
            )
            .field(
                "connectivity",
                &self.connectivity.as_ref().map(|_| "ConnectivityProvider { ... }"),
            )
            .field(
                "preference_store",
                &self.preference_store.as_ref().map(|_| "PreferenceStore { ... }"),
            )
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}

impl EngineConfig {
    /// Create a new builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for [`EngineConfig`].
#[derive(Default)]
pub struct EngineConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    resolver: Option<Arc<dyn CandidateResolver>>,
    media_engines: HashMap<SourceKind, Arc<dyn MediaEngine>>,
    connectivity: Option<Arc<dyn ConnectivityProvider>>,
    preference_store: Option<Arc<dyn PreferenceStore>>,
    event_buffer: Option<usize>,
}

impl EngineConfigBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn CandidateResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Register a media engine for a source kind. Registering the same kind
    /// twice replaces the earlier engine.
    pub fn media_engine(mut self, kind: SourceKind, engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engines.insert(kind, engine);
        self
    }

    pub fn connectivity(mut self, provider: Arc<dyn ConnectivityProvider>) -> Self {
        self.connectivity = Some(provider);
        self
    }

    pub fn preference_store(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preference_store = Some(store);
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] naming the first missing
    /// required bridge.
    pub fn build(self) -> Result<EngineConfig> {
        let http_client = self.http_client.ok_or_else(|| Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "No HTTP client implementation provided. \
                      Desktop: use bridge_desktop::ReqwestHttpClient. \
                      Other hosts: inject a platform-native adapter."
                .to_string(),
        })?;

        let resolver = self.resolver.ok_or_else(|| Error::CapabilityMissing {
            capability: "CandidateResolver".to_string(),
            message: "No candidate resolver provided. The engine cannot \
                      discover playable formats without one."
                .to_string(),
        })?;

        if self.media_engines.is_empty() {
            return Err(Error::CapabilityMissing {
                capability: "MediaEngine".to_string(),
                message: "No media engine registered. Register at least one \
                          engine via media_engine(SourceKind, ...)."
                    .to_string(),
            });
        }

        let event_buffer = self.event_buffer.unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE);
        if event_buffer == 0 {
            return Err(Error::Config("event_buffer must be > 0".to_string()));
        }

        Ok(EngineConfig {
            http_client,
            resolver,
            media_engines: self.media_engines,
            connectivity: self.connectivity,
            preference_store: self.preference_store,
            event_buffer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::connectivity::{ConnectivityChangeStream, ConnectivityHints};
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use bridge_traits::media::MediaEventStream;
    use bridge_traits::resolver::{CandidateSet, TrackRef};

    struct StubHttp;

    #[async_trait::async_trait]
    impl HttpClient for StubHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            unimplemented!("stub")
        }
    }

    struct StubResolver;

    #[async_trait::async_trait]
    impl CandidateResolver for StubResolver {
        async fn resolve_candidates(&self, _track: &TrackRef) -> BridgeResult<CandidateSet> {
            Ok(CandidateSet::default())
        }
    }

    struct StubEngine;

    #[async_trait::async_trait]
    impl MediaEngine for StubEngine {
        async fn load(
            &self,
            _url: &str,
            _headers: &std::collections::HashMap<String, String>,
        ) -> BridgeResult<()> {
            Ok(())
        }
        async fn play(&self) -> BridgeResult<()> {
            Ok(())
        }
        async fn pause(&self) -> BridgeResult<()> {
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
            unimplemented!("stub")
        }
    }

    struct StubConnectivity;

    #[async_trait::async_trait]
    impl ConnectivityProvider for StubConnectivity {
        async fn current_hints(&self) -> ConnectivityHints {
            ConnectivityHints::unknown()
        }
        async fn subscribe_changes(&self) -> BridgeResult<Box<dyn ConnectivityChangeStream>> {
            unimplemented!("stub")
        }
    }

    #[test]
    fn build_with_required_bridges() {
        let config = EngineConfig::builder()
            .http_client(Arc::new(StubHttp))
            .resolver(Arc::new(StubResolver))
            .media_engine(SourceKind::DirectStream, Arc::new(StubEngine))
            .build()
            .unwrap();

        assert_eq!(config.event_buffer, crate::events::DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.connectivity.is_none());
        assert!(config.media_engines.contains_key(&SourceKind::DirectStream));
    }

    #[test]
    fn missing_http_client_fails_fast() {
        let err = EngineConfig::builder()
            .resolver(Arc::new(StubResolver))
            .media_engine(SourceKind::DirectStream, Arc::new(StubEngine))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityMissing { ref capability, .. } if capability == "HttpClient"
        ));
    }

    #[test]
    fn missing_media_engine_fails_fast() {
        let err = EngineConfig::builder()
            .http_client(Arc::new(StubHttp))
            .resolver(Arc::new(StubResolver))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityMissing { ref capability, .. } if capability == "MediaEngine"
        ));
    }

    #[test]
    fn optional_bridges_accepted() {
        let config = EngineConfig::builder()
            .http_client(Arc::new(StubHttp))
            .resolver(Arc::new(StubResolver))
            .media_engine(SourceKind::Embedded, Arc::new(StubEngine))
            .connectivity(Arc::new(StubConnectivity))
            .event_buffer(16)
            .build()
            .unwrap();
        assert!(config.connectivity.is_some());
        assert_eq!(config.event_buffer, 16);
    }

    #[test]
    fn zero_event_buffer_rejected() {
        let err = EngineConfig::builder()
            .http_client(Arc::new(StubHttp))
            .resolver(Arc::new(StubResolver))
            .media_engine(SourceKind::DirectStream, Arc::new(StubEngine))
            .event_buffer(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

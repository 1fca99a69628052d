//! # Network Condition Monitor
//!
//! Classifies the host's connectivity hints into a coarse [`NetworkTier`]
//! and notifies subscribers on tier transitions.
//!
//! De-duplication comes from `tokio::sync::watch`: the tier value is only
//! replaced when classification actually changes, so subscribers wake at
//! most once per real transition even if the host re-reports identical
//! hints.

use bridge_traits::connectivity::{ConnectivityHints, ConnectivityProvider, EffectiveType};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Downlink estimates below this are treated as a metered-class connection.
const METERED_DOWNLINK_MBPS: f64 = 1.5;

/// Coarse classification of current network quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkTier {
    /// Save-data requested or 2g-class connection.
    Restricted,
    /// 3g-class or low-downlink connection.
    Metered,
    /// Everything else, including hosts that report nothing.
    Unmetered,
}

impl NetworkTier {
    /// Classify raw host hints into a tier.
    ///
    /// Absent hints classify as [`NetworkTier::Unmetered`]: the monitor is
    /// optimistic and never blocks playback on missing telemetry.
    pub fn classify(hints: &ConnectivityHints) -> Self {
        if hints.save_data
            || matches!(
                hints.effective_type,
                EffectiveType::Slow2g | EffectiveType::TwoG
            )
        {
            return NetworkTier::Restricted;
        }
        if hints.effective_type == EffectiveType::ThreeG
            || hints
                .downlink_mbps
                .is_some_and(|mbps| mbps < METERED_DOWNLINK_MBPS)
        {
            return NetworkTier::Metered;
        }
        NetworkTier::Unmetered
    }
}

impl std::fmt::Display for NetworkTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NetworkTier::Restricted => "restricted",
            NetworkTier::Metered => "metered",
            NetworkTier::Unmetered => "unmetered",
        };
        f.write_str(name)
    }
}

/// Watches a [`ConnectivityProvider`] and maintains the current tier.
///
/// Cheap to clone; all clones observe the same underlying channel.
#[derive(Clone)]
pub struct NetworkConditionMonitor {
    tier_rx: watch::Receiver<NetworkTier>,
    save_data: Arc<AtomicBool>,
    // Keeps the channel open for monitors not backed by a provider task.
    _fixed_tx: Option<Arc<watch::Sender<NetworkTier>>>,
}

impl NetworkConditionMonitor {
    /// Start monitoring the given provider.
    ///
    /// Reads one initial hint snapshot, then consumes the provider's change
    /// stream on a background task until the stream closes or the monitor's
    /// last clone is dropped.
    pub async fn start(provider: Arc<dyn ConnectivityProvider>) -> Self {
        let initial = provider.current_hints().await;
        let (tier_tx, tier_rx) = watch::channel(NetworkTier::classify(&initial));
        let save_data = Arc::new(AtomicBool::new(initial.save_data));

        let flag = Arc::clone(&save_data);
        tokio::spawn(async move {
            let mut stream = match provider.subscribe_changes().await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(error = %err, "connectivity change stream unavailable; tier frozen at initial value");
                    return;
                }
            };
            while let Some(hints) = stream.next().await {
                flag.store(hints.save_data, Ordering::Relaxed);
                let tier = NetworkTier::classify(&hints);
                // send_if_modified keeps the at-most-once-per-transition
                // guarantee: identical re-reports never wake subscribers.
                let changed = tier_tx.send_if_modified(|current| {
                    if *current != tier {
                        *current = tier;
                        true
                    } else {
                        false
                    }
                });
                if changed {
                    debug!(%tier, "network tier changed");
                }
                if tier_tx.is_closed() {
                    break;
                }
            }
        });

        Self {
            tier_rx,
            save_data,
            _fixed_tx: None,
        }
    }

    /// Monitor pinned to a fixed tier, for hosts without hints and for tests.
    pub fn fixed(tier: NetworkTier) -> Self {
        let (tx, rx) = watch::channel(tier);
        Self {
            tier_rx: rx,
            save_data: Arc::new(AtomicBool::new(false)),
            _fixed_tx: Some(Arc::new(tx)),
        }
    }

    /// Current network tier.
    pub fn current_tier(&self) -> NetworkTier {
        *self.tier_rx.borrow()
    }

    /// Whether the host currently requests reduced data usage.
    pub fn save_data(&self) -> bool {
        self.save_data.load(Ordering::Relaxed)
    }

    /// Subscribe to tier transitions.
    ///
    /// The receiver yields at most one wake-up per actual tier change.
    pub fn subscribe(&self) -> watch::Receiver<NetworkTier> {
        self.tier_rx.clone()
    }
}

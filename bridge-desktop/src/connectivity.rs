//! Connectivity Provider for Desktop Hosts
//!
//! Desktop platforms expose no portable equivalent of the browser's
//! connection hints, so this provider is host-fed: the application reports
//! hints through a [`ConnectivityHandle`] (from a tray toggle, a platform
//! API shim, or a config file watcher) and the engine consumes them like
//! any other provider. With no reports the engine sees unknown hints,
//! which classify as unmetered.

use async_trait::async_trait;
use bridge_traits::connectivity::{
    ConnectivityChangeStream, ConnectivityHints, ConnectivityProvider,
};
use bridge_traits::error::Result;
use tokio::sync::watch;
use tracing::debug;

/// Host-side handle for reporting connectivity hints.
#[derive(Clone)]
pub struct ConnectivityHandle {
    tx: watch::Sender<ConnectivityHints>,
}

impl ConnectivityHandle {
    /// Report a new hint snapshot. Identical consecutive reports are
    /// forwarded; the engine's monitor de-duplicates at the tier level.
    pub fn report(&self, hints: ConnectivityHints) {
        debug!(?hints.effective_type, save_data = hints.save_data, "connectivity hints reported");
        let _ = self.tx.send(hints);
    }
}

/// Connectivity provider fed by the host application.
pub struct ManualConnectivityProvider {
    rx: watch::Receiver<ConnectivityHints>,
    tx: watch::Sender<ConnectivityHints>,
}

impl ManualConnectivityProvider {
    /// Provider starting from unknown hints.
    pub fn new() -> Self {
        Self::with_initial(ConnectivityHints::unknown())
    }

    pub fn with_initial(initial: ConnectivityHints) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self { rx, tx }
    }

    /// Handle the host uses to push hint updates.
    pub fn handle(&self) -> ConnectivityHandle {
        ConnectivityHandle {
            tx: self.tx.clone(),
        }
    }
}

impl Default for ManualConnectivityProvider {
    fn default() -> Self {
        Self::new()
    }
}

struct WatchStream {
    rx: watch::Receiver<ConnectivityHints>,
}

#[async_trait]
impl ConnectivityChangeStream for WatchStream {
    async fn next(&mut self) -> Option<ConnectivityHints> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            // All handles dropped: no further updates will ever arrive.
            Err(_) => None,
        }
    }
}

#[async_trait]
impl ConnectivityProvider for ManualConnectivityProvider {
    async fn current_hints(&self) -> ConnectivityHints {
        self.rx.borrow().clone()
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn ConnectivityChangeStream>> {
        Ok(Box::new(WatchStream {
            rx: self.rx.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::connectivity::EffectiveType;

    #[tokio::test]
    async fn starts_with_unknown_hints() {
        let provider = ManualConnectivityProvider::new();
        let hints = provider.current_hints().await;
        assert_eq!(hints.effective_type, EffectiveType::Unknown);
        assert!(!hints.save_data);
    }

    #[tokio::test]
    async fn reported_hints_reach_subscribers() {
        let provider = ManualConnectivityProvider::new();
        let handle = provider.handle();
        let mut stream = provider.subscribe_changes().await.unwrap();

        handle.report(ConnectivityHints {
            effective_type: EffectiveType::ThreeG,
            downlink_mbps: Some(0.8),
            save_data: true,
        });

        let hints = stream.next().await.unwrap();
        assert_eq!(hints.effective_type, EffectiveType::ThreeG);
        assert!(hints.save_data);
        assert_eq!(provider.current_hints().await.downlink_mbps, Some(0.8));
    }
}

//! Connectivity Hints Abstraction
//!
//! Exposes the host environment's connection quality hints to the engine.
//!
//! The hints mirror what browser-style hosts report (effective connection
//! type, downlink estimate, save-data flag). Native hosts map their own
//! telemetry onto the same shape. Classification of hints into a network
//! tier lives in `core-delivery`; this trait only transports raw values.

use crate::error::Result;

/// Effective connection type as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveType {
    Slow2g,
    TwoG,
    ThreeG,
    FourG,
    /// Host did not report a type.
    Unknown,
}

/// Raw connectivity hints from the host environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityHints {
    /// Effective connection type, when reported.
    pub effective_type: EffectiveType,
    /// Downlink estimate in megabits per second, when reported.
    pub downlink_mbps: Option<f64>,
    /// Whether the user has requested reduced data usage.
    pub save_data: bool,
}

impl ConnectivityHints {
    /// Hints for a host that reports nothing. The engine treats absent hints
    /// optimistically and never blocks on them.
    pub fn unknown() -> Self {
        Self {
            effective_type: EffectiveType::Unknown,
            downlink_mbps: None,
            save_data: false,
        }
    }
}

impl Default for ConnectivityHints {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Connectivity provider trait
///
/// Supplies current hints and a change stream so the engine can react to
/// network quality transitions.
///
/// # Platform Support
///
/// - **Desktop**: OS network telemetry, or manual updates from the host shell
/// - **Web**: Network Information API (`navigator.connection`)
/// - **Mobile**: ConnectivityManager / NWPathMonitor
#[async_trait::async_trait]
pub trait ConnectivityProvider: Send + Sync {
    /// Get the current connectivity hints.
    async fn current_hints(&self) -> ConnectivityHints;

    /// Subscribe to hint updates.
    ///
    /// Implementations may deliver duplicate consecutive values; consumers
    /// are responsible for de-duplicating derived state.
    async fn subscribe_changes(&self) -> Result<Box<dyn ConnectivityChangeStream>>;
}

/// Stream of connectivity hint updates
#[async_trait::async_trait]
pub trait ConnectivityChangeStream: Send {
    /// Get the next hint update.
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<ConnectivityHints>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_hints_are_optimistic() {
        let hints = ConnectivityHints::unknown();
        assert_eq!(hints.effective_type, EffectiveType::Unknown);
        assert_eq!(hints.downlink_mbps, None);
        assert!(!hints.save_data);
    }

    #[test]
    fn test_hints_equality() {
        let a = ConnectivityHints {
            effective_type: EffectiveType::ThreeG,
            downlink_mbps: Some(1.2),
            save_data: false,
        };
        assert_eq!(a, a.clone());
        assert_ne!(a, ConnectivityHints::unknown());
    }
}

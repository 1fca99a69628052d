//! # Access Strategy Catalog
//!
//! A registry of named request profiles and the deterministic ladder that
//! maps (network tier, attempt number, save-data flag) to a profile.
//!
//! Media hosts refuse or throttle requests based on the client they think
//! they are talking to. Each profile bundles the headers, identity string,
//! and timeout/retry budget of one client persona; the ladder walks through
//! personas as attempts fail.

use crate::error::{DeliveryError, Result};
use crate::monitor::NetworkTier;
use std::collections::HashMap;
use std::time::Duration;

/// Built-in profile names.
pub const MOBILE_EMULATION: &str = "mobile-emulation";
pub const DESKTOP_FALLBACK: &str = "desktop-fallback";
pub const AGGRESSIVE_MOBILE: &str = "aggressive-mobile";
pub const STANDARD: &str = "standard";

/// A named bundle of request parameters mimicking one client persona.
///
/// Immutable once registered in the catalog.
#[derive(Debug, Clone)]
pub struct AccessProfile {
    pub name: String,
    /// User-agent string presented to the media host.
    pub identity_string: String,
    /// Default headers, in insertion order, keys unique.
    headers: Vec<(String, String)>,
    /// Base delay unit for backoff between attempts under this profile.
    pub base_retry_delay: Duration,
    /// Attempt budget a fetch should assume when this profile is primary.
    pub max_attempts: u32,
    /// Per-attempt request timeout.
    pub timeout: Duration,
}

impl AccessProfile {
    pub fn new(name: impl Into<String>, identity_string: impl Into<String>) -> Self {
        let identity_string = identity_string.into();
        let headers = vec![("User-Agent".to_string(), identity_string.clone())];
        Self {
            name: name.into(),
            identity_string,
            headers,
            base_retry_delay: Duration::from_millis(500),
            max_attempts: 5,
            timeout: Duration::from_secs(10),
        }
    }

    /// Add a default header. Later inserts with an existing key replace the
    /// value in place, keeping keys unique and order stable.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.headers.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.headers.push((key, value));
        }
        self
    }

    pub fn base_retry_delay(mut self, delay: Duration) -> Self {
        self.base_retry_delay = delay;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Iterate default headers in insertion order.
    pub fn headers(&self) -> impl Iterator<Item = (&String, &String)> {
        self.headers.iter().map(|(k, v)| (k, v))
    }
}

/// Fixed registry of access profiles plus the per-tier selection ladders.
#[derive(Debug, Clone)]
pub struct AccessStrategyCatalog {
    profiles: HashMap<String, AccessProfile>,
}

impl AccessStrategyCatalog {
    /// Catalog with the four built-in personas.
    pub fn builtin() -> Self {
        let mut catalog = Self {
            profiles: HashMap::new(),
        };

        catalog.insert(
            AccessProfile::new(
                MOBILE_EMULATION,
                "Mozilla/5.0 (Linux; Android 12; Pixel 6) AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/120.0.0.0 Mobile Safari/537.36",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("X-Requested-With", "com.android.browser")
            .base_retry_delay(Duration::from_millis(500))
            .timeout(Duration::from_secs(10)),
        );

        catalog.insert(
            AccessProfile::new(
                DESKTOP_FALLBACK,
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/120.0.0.0 Safari/537.36",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Sec-Fetch-Mode", "navigate")
            .base_retry_delay(Duration::from_millis(800))
            .timeout(Duration::from_secs(15)),
        );

        catalog.insert(
            AccessProfile::new(
                AGGRESSIVE_MOBILE,
                "Mozilla/5.0 (Linux; Android 11; SM-A515F) AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/119.0.0.0 Mobile Safari/537.36",
            )
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Save-Data", "on")
            .base_retry_delay(Duration::from_millis(300))
            .timeout(Duration::from_secs(8)),
        );

        catalog.insert(
            AccessProfile::new(
                STANDARD,
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/120.0.0.0 Safari/537.36",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .base_retry_delay(Duration::from_millis(600))
            .timeout(Duration::from_secs(12)),
        );

        catalog
    }

    fn insert(&mut self, profile: AccessProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    /// Register an additional profile. Fails if the name is already taken;
    /// registered profiles are immutable.
    pub fn register(&mut self, profile: AccessProfile) -> Result<()> {
        if self.profiles.contains_key(&profile.name) {
            return Err(DeliveryError::InvalidConfiguration(format!(
                "profile '{}' already registered",
                profile.name
            )));
        }
        self.insert(profile);
        Ok(())
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Option<&AccessProfile> {
        self.profiles.get(name)
    }

    /// Select the profile for a given tier and 1-based attempt number.
    ///
    /// Total and deterministic: every (tier, attempt, save_data) input maps
    /// to exactly one built-in profile. `save_data` forces the aggressive
    /// mobile persona for the first two attempts regardless of tier; beyond
    /// the third attempt the ladder falls back to its first rung.
    pub fn select_profile(
        &self,
        tier: NetworkTier,
        attempt: u32,
        save_data: bool,
    ) -> &AccessProfile {
        let name = Self::ladder_name(tier, attempt, save_data);
        self.profiles
            .get(name)
            .unwrap_or_else(|| unreachable!("built-in profile '{name}' missing"))
    }

    fn ladder_name(tier: NetworkTier, attempt: u32, save_data: bool) -> &'static str {
        if save_data && attempt <= 2 {
            return AGGRESSIVE_MOBILE;
        }
        let ladder: [&'static str; 3] = match tier {
            NetworkTier::Restricted => [MOBILE_EMULATION, AGGRESSIVE_MOBILE, DESKTOP_FALLBACK],
            NetworkTier::Metered => [MOBILE_EMULATION, DESKTOP_FALLBACK, AGGRESSIVE_MOBILE],
            NetworkTier::Unmetered => [STANDARD, DESKTOP_FALLBACK, MOBILE_EMULATION],
        };
        match attempt {
            0 | 1 => ladder[0],
            2 => ladder[1],
            3 => ladder[2],
            _ => ladder[0],
        }
    }
}

impl Default for AccessStrategyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

//! # Resilient Fetcher
//!
//! Executes a request under a catalog-selected access profile and escalates
//! to the next profile on failure.
//!
//! The attempt loop:
//! 1. pick the profile for (current tier, attempt number, save-data flag)
//! 2. merge the profile's headers into the request (caller values win)
//! 3. issue the request bounded by the profile's timeout
//! 4. a 2xx response that passes the caller's validity predicate returns
//!    immediately; success is never retried
//! 5. otherwise record the failure and back off
//!    `base_retry_delay * attempt + jitter(0..1s)` before the next rung
//!
//! The whole ladder is bounded by an overall deadline and is cancellable, so
//! an abandoned resolution never blocks the next one.

use crate::error::{AttemptFailure, DeliveryError, Result};
use crate::monitor::NetworkConditionMonitor;
use crate::profiles::AccessStrategyCatalog;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Caller-supplied check that a 2xx response actually carries usable data
/// (media hosts are fond of returning 200 with an interstitial body).
pub type ResponseValidator = Arc<dyn Fn(&HttpResponse) -> bool + Send + Sync>;

/// Options for one resilient fetch.
#[derive(Clone)]
pub struct FetchOptions {
    /// Maximum number of attempts across the profile ladder.
    pub max_attempts: u32,
    /// Ceiling for the entire fetch including backoff sleeps.
    pub overall_deadline: Duration,
    validate: Option<ResponseValidator>,
}

impl FetchOptions {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_overall_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = deadline;
        self
    }

    /// Attach a validity predicate; responses failing it count as attempt
    /// failures even when the status is 2xx.
    pub fn with_validator(mut self, validate: ResponseValidator) -> Self {
        self.validate = Some(validate);
        self
    }

    fn is_valid(&self, response: &HttpResponse) -> bool {
        self.validate.as_ref().map_or(true, |check| check(response))
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            overall_deadline: Duration::from_secs(60),
            validate: None,
        }
    }
}

impl std::fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOptions")
            .field("max_attempts", &self.max_attempts)
            .field("overall_deadline", &self.overall_deadline)
            .field("validate", &self.validate.as_ref().map(|_| "fn(..)"))
            .finish()
    }
}

/// Fetcher that retries a request across the access-profile ladder.
#[derive(Clone)]
pub struct ResilientFetcher {
    http: Arc<dyn HttpClient>,
    catalog: AccessStrategyCatalog,
    monitor: NetworkConditionMonitor,
}

impl ResilientFetcher {
    pub fn new(
        http: Arc<dyn HttpClient>,
        catalog: AccessStrategyCatalog,
        monitor: NetworkConditionMonitor,
    ) -> Self {
        Self {
            http,
            catalog,
            monitor,
        }
    }

    /// Execute `request`, escalating across access profiles on failure.
    ///
    /// Returns the first successful response, or
    /// [`DeliveryError::ExhaustedRetries`] carrying one
    /// [`AttemptFailure`] per attempt when every rung failed. The whole call
    /// is bounded by `options.overall_deadline` and aborts early with
    /// [`DeliveryError::Cancelled`] once `cancel` fires.
    pub async fn fetch_with_retry(
        &self,
        request: HttpRequest,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        if options.max_attempts == 0 {
            return Err(DeliveryError::InvalidConfiguration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        match timeout(
            options.overall_deadline,
            self.run_attempts(request, options, cancel),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::DeadlineExceeded(options.overall_deadline)),
        }
    }

    async fn run_attempts(
        &self,
        request: HttpRequest,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let mut failures = Vec::with_capacity(options.max_attempts as usize);

        for attempt in 1..=options.max_attempts {
            if cancel.is_cancelled() {
                return Err(DeliveryError::Cancelled);
            }

            let tier = self.monitor.current_tier();
            let profile = self
                .catalog
                .select_profile(tier, attempt, self.monitor.save_data());

            debug!(
                attempt,
                max_attempts = options.max_attempts,
                profile = %profile.name,
                %tier,
                url = %request.url,
                "issuing fetch attempt"
            );

            // Caller headers win on collision; the profile only fills gaps.
            let attempt_request = request.clone().merge_headers(profile.headers());

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(DeliveryError::Cancelled),
                result = timeout(profile.timeout, self.http.execute(attempt_request)) => result,
            };

            let reason = match outcome {
                Err(_) => format!("attempt timed out after {:?}", profile.timeout),
                Ok(Err(err)) => err.to_string(),
                Ok(Ok(response)) if !response.is_success() => {
                    format!("HTTP {}", response.status)
                }
                Ok(Ok(response)) => {
                    if options.is_valid(&response) {
                        debug!(attempt, profile = %profile.name, "fetch succeeded");
                        return Ok(response);
                    }
                    "response body failed validation".to_string()
                }
            };

            warn!(attempt, profile = %profile.name, %reason, "fetch attempt failed");
            failures.push(AttemptFailure {
                attempt,
                profile: profile.name.clone(),
                reason,
            });

            if attempt < options.max_attempts {
                let backoff = profile.base_retry_delay * attempt + jitter();
                debug!(delay_ms = backoff.as_millis() as u64, "backing off before next attempt");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(DeliveryError::Cancelled),
                    _ = sleep(backoff) => {}
                }
            }
        }

        Err(DeliveryError::ExhaustedRetries { attempts: failures })
    }
}

fn jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..1000))
}

//! Rate/retry governor wrapped around every adapter call.
//!
//! One counting semaphore per [`SourceKind`] caps in-flight calls per
//! provider; governors built for separate runs share them through
//! [`ProviderPermits`]. Each attempt holds a permit only while it runs and
//! is bounded by a hard timeout. Transient failures are retried with exponential backoff
//! and +/-25% jitter; `Retry-After` hints stretch the next delay. The run's
//! cancellation token aborts both waits and in-flight attempts.

use crate::adapter::{SourceAdapter, SourceRequest};
use crate::cache::PayloadCache;
use crate::error::{Result, SourceError};
use crate::payload::SourcePayload;
use rand::Rng;
use rankscope_core::{GovernorConfig, SourceKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Backoff, timeout and attempt budget for source calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Ceiling for any delay
    pub max_delay: Duration,
    /// Hard timeout per attempt
    pub call_timeout: Duration,
    /// Randomize delays by +/-25%
    pub jitter: bool,
}

impl RetryPolicy {
    /// Policy from configuration with `max_attempts` total attempts.
    #[must_use]
    pub fn from_config(config: &GovernorConfig, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            jitter: config.jitter,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// `base_delay * 2^(attempt-1)` capped at `max_delay`, jittered, then
    /// raised to the provider hint (itself capped at `max_delay`).
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let mut delay = self
            .base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay);

        if self.jitter {
            let factor = rand::thread_rng().gen_range(0.75..=1.25);
            delay = delay.mul_f64(factor).min(self.max_delay);
        }

        match hint {
            Some(hint) => delay.max(hint.min(self.max_delay)),
            None => delay,
        }
    }
}

/// One counting semaphore per [`SourceKind`].
///
/// Share a single instance between every governor that talks to the same
/// providers so the ceiling holds across concurrent runs.
#[derive(Debug)]
pub struct ProviderPermits {
    ceiling: usize,
    semaphores: HashMap<SourceKind, Arc<Semaphore>>,
}

impl ProviderPermits {
    /// At most `max_concurrent_per_provider` in-flight calls per source kind.
    #[must_use]
    pub fn new(max_concurrent_per_provider: usize) -> Self {
        let ceiling = max_concurrent_per_provider.max(1);
        let semaphores = SourceKind::ALL
            .into_iter()
            .map(|kind| (kind, Arc::new(Semaphore::new(ceiling))))
            .collect();
        Self {
            ceiling,
            semaphores,
        }
    }

    /// Per-kind ceiling.
    #[must_use]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Permits currently free for `kind`.
    #[must_use]
    pub fn available(&self, kind: SourceKind) -> usize {
        self.semaphores
            .get(&kind)
            .map_or(0, |semaphore| semaphore.available_permits())
    }

    fn semaphore(&self, kind: SourceKind) -> Option<&Semaphore> {
        self.semaphores.get(&kind).map(AsRef::as_ref)
    }
}

/// Applies caching, concurrency limits, timeouts and retries to adapter calls.
pub struct Governor {
    policy: RetryPolicy,
    permits: Arc<ProviderPermits>,
    cache: Option<Arc<PayloadCache>>,
}

impl Governor {
    /// Governor from configuration with `max_attempts` total attempts per call.
    #[must_use]
    pub fn new(config: &GovernorConfig, max_attempts: u32) -> Self {
        Self::with_policy(
            RetryPolicy::from_config(config, max_attempts),
            config.max_concurrent_per_provider,
        )
    }

    /// Governor with an explicit policy and per-provider concurrency ceiling.
    #[must_use]
    pub fn with_policy(policy: RetryPolicy, max_concurrent_per_provider: usize) -> Self {
        Self {
            policy,
            permits: Arc::new(ProviderPermits::new(max_concurrent_per_provider)),
            cache: None,
        }
    }

    /// Draw concurrency permits from `permits` instead of a private set.
    #[must_use]
    pub fn with_permits(mut self, permits: Arc<ProviderPermits>) -> Self {
        self.permits = permits;
        self
    }

    /// Serve repeated requests from `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<PayloadCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Active retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `adapter` for `request` under the governor's policy.
    pub async fn call(
        &self,
        adapter: &dyn SourceAdapter,
        request: &SourceRequest,
        cancel: &CancellationToken,
    ) -> Result<SourcePayload> {
        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(request).await {
                tracing::debug!(
                    source = %request.kind(),
                    url = request.url(),
                    "Cache hit"
                );
                return Ok(hit);
            }
        }

        let mut attempt = 1;
        loop {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SourceError::Cancelled),
                outcome = self.attempt(adapter, request) => outcome,
            };

            let error = match outcome {
                Ok(payload) => {
                    if let Some(cache) = &self.cache {
                        cache.insert(request, payload.clone()).await;
                    }
                    return Ok(payload);
                }
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.policy.max_attempts {
                tracing::warn!(
                    source = %request.kind(),
                    provider = adapter.source_id(),
                    url = request.url(),
                    attempt,
                    "Source call failed: {}",
                    error
                );
                return Err(error);
            }

            let delay = self.policy.backoff_delay(attempt, error.retry_after());
            tracing::warn!(
                source = %request.kind(),
                provider = adapter.source_id(),
                url = request.url(),
                attempt,
                max_attempts = self.policy.max_attempts,
                "Source call failed ({}), retrying in {:?}",
                error,
                delay
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SourceError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        adapter: &dyn SourceAdapter,
        request: &SourceRequest,
    ) -> Result<SourcePayload> {
        let semaphore = self
            .permits
            .semaphore(adapter.kind())
            .ok_or_else(|| SourceError::upstream(format!("no permits for {}", adapter.kind())))?;
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| SourceError::Cancelled)?;

        match tokio::time::timeout(self.policy.call_timeout, adapter.fetch(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SourceError::timeout(format!(
                "{} call exceeded {:?}",
                adapter.kind(),
                self.policy.call_timeout
            ))),
        }
    }
}

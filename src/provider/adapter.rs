//! Retry/timeout/backoff wrapper shared by all providers.
//!
//! Each attempt races the provider future against the policy deadline.
//! Only failures classified retryable (429, 5xx, timeout, transport) may
//! consume the single retry; everything else surfaces on first occurrence.
//! Backoff runs between retryable attempts only, never after the last one.
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::guard::UsageGuard;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn text() -> Self {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(400),
            max_jitter: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(45),
        }
    }

    pub fn image() -> Self {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(400),
            max_jitter: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(120),
        }
    }

    /// Delay before the given attempt (1 = first retry): `base * 2^attempt`
    /// plus bounded random jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay * 2u32.saturating_pow(attempt);
        let jitter_ms = rand::thread_rng().gen_range(0..=self.max_jitter.as_millis() as u64);
        base + Duration::from_millis(jitter_ms)
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Parse a provider-reported retry hint out of an error payload, clamped to
/// a sane range. Providers disagree on the field name.
pub fn parse_retry_after(body: &Value) -> u64 {
    const DEFAULT: u64 = 30;
    let raw = body
        .get("retry_after")
        .or_else(|| body.get("retryAfterSeconds"))
        .or_else(|| body.get("error").and_then(|e| e.get("retry_after")))
        .and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        });
    raw.map(|s| s.clamp(1, 300)).unwrap_or(DEFAULT)
}

/// Map a non-success provider status to the error taxonomy. The original
/// body text is preserved for diagnostics on fatal failures.
pub fn classify_status(provider: &str, status: u16, body: &str) -> AppError {
    if status == 429 {
        let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        return AppError::RateLimited {
            provider: provider.to_string(),
            retry_after_seconds: parse_retry_after(&parsed),
        };
    }
    if is_retryable_status(status) {
        return AppError::ProviderUnavailable {
            provider: provider.to_string(),
            message: format!("status {}: {}", status, body),
        };
    }
    AppError::Provider(format!("{} returned status {}: {}", provider, status, body))
}

#[derive(Debug, Clone)]
pub struct ProviderAdapter {
    guard: Arc<UsageGuard>,
}

impl ProviderAdapter {
    pub fn new(guard: Arc<UsageGuard>) -> Self {
        ProviderAdapter { guard }
    }

    /// Run one provider operation under the policy. `attempt_fn` performs a
    /// single attempt; this wrapper owns the deadline, the retry budget and
    /// the guard assertion before each network dispatch.
    pub async fn invoke<T, F, Fut>(
        &self,
        provider: &str,
        trace_id: &str,
        policy: &RetryPolicy,
        attempt_fn: F,
    ) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = AppResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            self.guard.assert_used(trace_id)?;
            let started = Instant::now();
            let outcome = tokio::time::timeout(policy.attempt_timeout, attempt_fn()).await;
            let latency_ms = started.elapsed().as_millis() as u64;
            let last = attempt + 1 >= policy.max_attempts;

            let err = match outcome {
                Ok(Ok(value)) => {
                    tracing::info!(provider, trace_id, attempt, latency_ms, "provider call ok");
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                // The in-flight call is abandoned; any late response is
                // ignored.
                Err(_) => AppError::Timeout {
                    provider: provider.to_string(),
                    seconds: policy.attempt_timeout.as_secs(),
                },
            };

            if !err.is_retryable() || last {
                tracing::warn!(
                    provider,
                    trace_id,
                    attempt,
                    latency_ms,
                    error = %err,
                    "provider call failed"
                );
                return Err(err);
            }

            attempt += 1;
            let delay = policy.backoff_delay(attempt);
            tracing::info!(
                provider,
                trace_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying provider call"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

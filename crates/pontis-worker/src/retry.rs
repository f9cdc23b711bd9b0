// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff with jitter and transient-error classification.
//!
//! `delay(n) = min(max_delay, initial_delay * backoff^(n-1) * U(0.8, 1.2))`
//! where `n` is the 1-based attempt that just failed. The RNG is injected
//! so tests pin the seed; sleeps go through tokio's clock so paused-time
//! tests run instantly.

use std::time::Duration;

use pontis_core::PontisError;
use rand::Rng;
use tracing::warn;

/// Backoff parameters for one call site.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub backoff: f64,
    pub max_delay: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            backoff: 2.0,
            max_delay: Duration::from_secs(10),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the `attempt`-th failure (1-based).
    pub fn delay(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let exponential =
            self.initial_delay.as_millis() as f64 * self.backoff.powi(attempt as i32 - 1);
        let jittered = exponential * rng.gen_range(0.8..1.2);
        let capped = jittered.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// A call that did not succeed within the policy's attempt budget.
#[derive(Debug)]
pub struct RetryError {
    pub error: PontisError,
    /// Attempts actually made.
    pub attempts: u32,
    /// True when every failure was transient and the budget ran out;
    /// false when a permanent error stopped the retries early.
    pub transient: bool,
}

/// Default transient classification.
///
/// Retryable: transport failures and timeouts, HTTP 429/503/504 and any
/// 5xx, and storage errors that look like a connection drop. A 429's
/// Retry-After is advisory only; backoff stays policy-driven.
pub fn is_transient(error: &PontisError) -> bool {
    match error {
        PontisError::Network { .. } | PontisError::Timeout { .. } => true,
        PontisError::Upstream { status, .. } => {
            matches!(status, 429 | 503 | 504) || (500..600).contains(status)
        }
        PontisError::Storage { source } => {
            let message = source.to_string();
            message.contains("Database connection")
                || message.contains("not available")
                || message.to_ascii_lowercase().contains("network")
        }
        _ => false,
    }
}

/// Run `op` under the policy, sleeping between transient failures.
///
/// `classify` decides retryability (call sites with stage-specific rules
/// pass their own predicate; everyone else passes [`is_transient`]).
/// The closure receives the 1-based attempt number.
pub async fn run_with_retry<T, F, Fut, C, R>(
    policy: &RetryPolicy,
    classify: C,
    rng: &mut R,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, PontisError>>,
    C: Fn(&PontisError) -> bool,
    R: Rng,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !classify(&error) {
                    return Err(RetryError {
                        error,
                        attempts: attempt,
                        transient: false,
                    });
                }
                if attempt >= policy.max_attempts {
                    return Err(RetryError {
                        error,
                        attempts: attempt,
                        transient: true,
                    });
                }
                let delay = policy.delay(attempt, rng);
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %error,
                      "transient failure, backing off");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

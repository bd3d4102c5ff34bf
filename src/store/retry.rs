// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::warn;

use crate::store::StoreError;

/// Bounded retry policy applied to store operations.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Upper bound on total attempts, including the initial one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier applied per retry.
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): `base * factor^retry`,
    /// saturating rather than overflowing.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let pow = self.backoff_factor.saturating_pow(retry);
        let millis = self.base_delay.as_millis().saturating_mul(pow as u128);
        Duration::from_millis(millis.min(u64::MAX as u128) as u64)
    }
}

/// Runs `op` until it succeeds, fails non-transiently, or the attempt budget
/// is spent. Exhaustion converts the last transient failure into
/// `StoreError::Unavailable` carrying the operation label.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(StoreError::Transient(last)) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(StoreError::Unavailable {
                        op: label.to_string(),
                        attempts: attempt,
                        last,
                    });
                }
                let delay = policy.delay_for(attempt - 1);
                warn!(op = label, attempt, ?delay, error = %last, "transient store failure, backing off");
                sleep(delay).await;
            },
            Err(other) => return Err(other),
        }
    }
}

//! Per-credential request quota.
//!
//! Fixed-window counters keyed by credential. A window opens on the first
//! request for a key and lasts `window`; the count resets when it ends.

use crate::config::QuotaConfig;
use crate::error::GuardrailError;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    count: u64,
}

/// Request-rate ceiling enforced before pipeline execution.
#[derive(Debug)]
pub struct QuotaGuard {
    limit: u64,
    window: Duration,
    counters: DashMap<String, Window>,
}

impl QuotaGuard {
    /// `limit` requests per `window`; a limit of zero disables the guard.
    pub fn new(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            counters: DashMap::new(),
        }
    }

    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::new(config.limit, Duration::from_secs(config.window_secs))
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Count one request for `key`, or fail with `QuotaExceeded`.
    ///
    /// The read-modify-write happens under the key's entry lock, so
    /// concurrent calls for one key never lose increments.
    pub fn check_and_consume(&self, key: &str) -> Result<(), GuardrailError> {
        if self.limit == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert(Window { opened: now, count: 0 });

        let elapsed = now.duration_since(entry.opened);
        if elapsed >= self.window {
            *entry = Window { opened: now, count: 0 };
        }

        if entry.count >= self.limit {
            let remaining = self.window.saturating_sub(now.duration_since(entry.opened));
            let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(GuardrailError::QuotaExceeded {
                retry_after_secs: retry_after_secs.max(1),
            });
        }

        entry.count += 1;
        Ok(())
    }

    /// Drop counters whose window has ended. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters
            .retain(|_, w| now.duration_since(w.opened) < self.window);
        before - self.counters.len()
    }
}

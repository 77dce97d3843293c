//! Lease acquisition orchestration.
//!
//! `LockCoordinator` drives the acquire/release cycle against a
//! [`LeaseStore`]: blocking acquisition retries under the [`Backoff`] policy
//! until success or budget exhaustion; fail-fast acquisition makes exactly
//! one attempt. It holds no lease state itself: a lease is wholly external,
//! referenced by key only.

use crate::backoff::Backoff;
use crate::clock::Clock;
use crate::error::{ExlockError, Result};
use crate::shutdown::ShutdownToken;
use crate::store::LeaseStore;
use std::sync::Arc;

/// Orchestrates lease acquisition and release for one store.
pub struct LockCoordinator {
    store: Arc<dyn LeaseStore>,
    clock: Arc<dyn Clock>,
    backoff: Backoff,
    shutdown: ShutdownToken,
}

impl LockCoordinator {
    /// Create a coordinator with the default backoff policy.
    pub fn new(store: Arc<dyn LeaseStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            backoff: Backoff::default(),
            shutdown: ShutdownToken::new(),
        }
    }

    /// Replace the backoff policy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// The token that interrupts in-progress backoff sleeps.
    ///
    /// Trigger it (e.g., from a signal handler) to make any blocked
    /// `acquire_blocking` return [`ExlockError::Interrupted`].
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Acquire the lease for `key`, retrying with backoff until the wait
    /// budget is exhausted.
    ///
    /// Once elapsed time reaches the budget no further attempts are made;
    /// with the budget already spent at entry, zero attempts are made.
    pub fn acquire_blocking(&self, key: &str, ttl_millis: u64) -> Result<()> {
        let start = self.clock.now_millis();
        let mut retry_count: u32 = 0;

        loop {
            let elapsed = self.clock.now_millis().saturating_sub(start);
            if self.backoff.is_exhausted(elapsed) {
                tracing::debug!(key, retry_count, "lease wait budget exhausted");
                return Err(ExlockError::AcquireTimeout(key.to_string()));
            }

            if self.store.try_acquire(key, ttl_millis) {
                tracing::debug!(key, retry_count, "lease acquired");
                return Ok(());
            }

            let elapsed = self.clock.now_millis().saturating_sub(start);
            let Some(delay) = self.backoff.next_delay(retry_count, elapsed) else {
                return Err(ExlockError::AcquireTimeout(key.to_string()));
            };

            tracing::debug!(key, retry_count, delay, "lease contended, backing off");
            if self.shutdown.wait_timeout(delay) {
                return Err(ExlockError::Interrupted(key.to_string()));
            }
            retry_count += 1;
        }
    }

    /// Make exactly one acquisition attempt; never sleeps.
    ///
    /// Contention surfaces as [`ExlockError::LeaseHeld`], a distinct and
    /// expected condition the caller decides to skip or escalate on.
    pub fn acquire_fail_fast(&self, key: &str, ttl_millis: u64) -> Result<()> {
        if self.store.try_acquire(key, ttl_millis) {
            tracing::debug!(key, "lease acquired (fail-fast)");
            Ok(())
        } else {
            Err(ExlockError::LeaseHeld(key.to_string()))
        }
    }

    /// Release the lease for `key`. Idempotent, best-effort.
    pub fn release(&self, key: &str) {
        self.store.release(key);
    }
}

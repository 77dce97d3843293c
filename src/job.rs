//! Periodic jobs that must run on at most one instance per tick.
//!
//! An [`ExclusiveJob`] wraps a job body in a fail-fast guarded execution
//! under a fixed key. When another instance already holds the lease the
//! tick is skipped, the expected outcome under horizontal scaling, logged
//! at info and reported as [`TickOutcome::Skipped`], never an error.

use crate::coordinator::LockCoordinator;
use crate::error::{ExlockError, Result};
use crate::guard::{DEFAULT_LEASE_TTL_MILLIS, LockMode, OperationGuard};
use crate::shutdown::ShutdownToken;

/// What happened on one tick of an exclusive job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// This instance won the lease and ran the job body.
    Ran,
    /// Another instance holds the lease; the tick was skipped.
    Skipped,
}

/// A named periodic job guarded by a fixed lease key.
#[derive(Debug, Clone)]
pub struct ExclusiveJob {
    name: String,
    key: String,
    lease_ttl_millis: u64,
}

impl ExclusiveJob {
    /// Create a job with a key unique to it.
    pub fn new(name: &str, key: &str) -> Self {
        Self {
            name: name.to_string(),
            key: key.to_string(),
            lease_ttl_millis: DEFAULT_LEASE_TTL_MILLIS,
        }
    }

    /// Set the lease TTL for each tick.
    pub fn with_ttl_millis(mut self, ttl_millis: u64) -> Self {
        self.lease_ttl_millis = ttl_millis;
        self
    }

    /// Job name, for logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run one tick: fail-fast acquire, run `body`, release.
    ///
    /// Contention maps to `Ok(Skipped)`. Anything else the body or the
    /// guard reports propagates unchanged.
    pub fn run_tick<F>(&self, coordinator: &LockCoordinator, body: F) -> Result<TickOutcome>
    where
        F: FnOnce() -> Result<()>,
    {
        let guard = OperationGuard::new(coordinator);
        match guard.execute_keyed(&self.key, LockMode::FailFast, self.lease_ttl_millis, body) {
            Ok(()) => {
                tracing::debug!(job = %self.name, key = %self.key, "tick ran");
                Ok(TickOutcome::Ran)
            }
            Err(ExlockError::LeaseHeld(_)) => {
                tracing::info!(
                    job = %self.name,
                    key = %self.key,
                    "another instance holds the lease, skipping tick"
                );
                Ok(TickOutcome::Skipped)
            }
            Err(e) => Err(e),
        }
    }

    /// Run ticks every `interval_millis` until `token` fires.
    ///
    /// A triggered token ends the loop cleanly after the current tick.
    pub fn run_loop<F>(
        &self,
        coordinator: &LockCoordinator,
        interval_millis: u64,
        token: &ShutdownToken,
        mut body: F,
    ) -> Result<()>
    where
        F: FnMut() -> Result<()>,
    {
        loop {
            if token.is_triggered() {
                return Ok(());
            }
            self.run_tick(coordinator, &mut body)?;
            if token.wait_timeout(interval_millis) {
                return Ok(());
            }
        }
    }
}

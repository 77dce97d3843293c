//! Scoped lock guarding for arbitrary operations.
//!
//! `OperationGuard` wraps an operation with a named lease: resolve the key,
//! acquire per the configured mode, run the operation, and release on every
//! exit path. Release is handled by an RAII [`ReleaseGuard`] so it happens
//! exactly once: on success, on error, and on panic.
//!
//! The key is either fixed or derived from the operation's own input
//! through a typed accessor (a closure), so a miswired key is a compile
//! error or an explicit `Config` failure rather than a silent global lock.

use crate::coordinator::LockCoordinator;
use crate::error::{ExlockError, Result};

/// Default lease TTL for guarded operations, in milliseconds.
pub const DEFAULT_LEASE_TTL_MILLIS: u64 = 60_000;

/// How acquisition behaves under contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Retry with backoff until the wait budget is exhausted.
    #[default]
    Retry,
    /// Single attempt; contention surfaces immediately as `LeaseHeld`.
    FailFast,
}

/// Where the lock key comes from.
pub enum KeySource<T> {
    /// A fixed key known at configuration time.
    Fixed(String),
    /// A key derived from the operation's input at invocation time.
    ///
    /// Returning `None` (or a blank string) is a configuration error, not a
    /// contention failure: the accessor was wired to the wrong field.
    FromInput(Box<dyn Fn(&T) -> Option<String> + Send + Sync>),
}

impl<T> std::fmt::Debug for KeySource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Fixed(key) => f.debug_tuple("Fixed").field(key).finish(),
            KeySource::FromInput(_) => f.debug_tuple("FromInput").field(&"<accessor>").finish(),
        }
    }
}

/// Lock configuration for one guarded operation.
#[derive(Debug)]
pub struct GuardSpec<T> {
    /// Source of the lock key.
    pub key: KeySource<T>,

    /// Acquisition mode.
    pub mode: LockMode,

    /// Lease TTL in milliseconds.
    pub ttl_millis: u64,
}

impl<T> GuardSpec<T> {
    /// Spec with a fixed key, retry mode, and the default TTL.
    pub fn fixed(key: &str) -> Self {
        Self {
            key: KeySource::Fixed(key.to_string()),
            mode: LockMode::default(),
            ttl_millis: DEFAULT_LEASE_TTL_MILLIS,
        }
    }

    /// Spec whose key is derived from the operation input.
    pub fn derived<F>(accessor: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            key: KeySource::FromInput(Box::new(accessor)),
            mode: LockMode::default(),
            ttl_millis: DEFAULT_LEASE_TTL_MILLIS,
        }
    }

    /// Set the acquisition mode.
    pub fn with_mode(mut self, mode: LockMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the lease TTL.
    pub fn with_ttl_millis(mut self, ttl_millis: u64) -> Self {
        self.ttl_millis = ttl_millis;
        self
    }

    /// Resolve the lock key against the actual input.
    ///
    /// Blank keys and accessors that come back empty are configuration
    /// errors, raised before any acquisition attempt and never retried.
    pub fn resolve_key(&self, input: &T) -> Result<String> {
        let key = match &self.key {
            KeySource::Fixed(key) => key.clone(),
            KeySource::FromInput(accessor) => accessor(input).ok_or_else(|| {
                ExlockError::Config("lock key accessor resolved to no value".to_string())
            })?,
        };

        if key.trim().is_empty() {
            return Err(ExlockError::Config("lock key cannot be blank".to_string()));
        }
        Ok(key)
    }
}

/// Releases a held lease when dropped.
///
/// Dropping is the only release path, so the lease is released exactly once
/// regardless of how the protected operation exits, including a panic.
struct ReleaseGuard<'a> {
    coordinator: &'a LockCoordinator,
    key: &'a str,
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.release(self.key);
    }
}

/// Wraps operations in an acquire/run/release cycle.
pub struct OperationGuard<'a> {
    coordinator: &'a LockCoordinator,
}

impl<'a> OperationGuard<'a> {
    /// Create a guard over the given coordinator.
    pub fn new(coordinator: &'a LockCoordinator) -> Self {
        Self { coordinator }
    }

    /// Run `op` under the lease described by `spec`.
    ///
    /// The operation runs only after the lease is held. If acquisition
    /// fails (contention in fail-fast mode, timeout in retry mode, or an
    /// unresolvable key), the operation does not run and the failure
    /// surfaces as its distinct error variant.
    pub fn execute<T, R, F>(&self, spec: &GuardSpec<T>, input: &T, op: F) -> Result<R>
    where
        F: FnOnce(&T) -> Result<R>,
    {
        let key = spec.resolve_key(input)?;

        match spec.mode {
            LockMode::Retry => self.coordinator.acquire_blocking(&key, spec.ttl_millis)?,
            LockMode::FailFast => self.coordinator.acquire_fail_fast(&key, spec.ttl_millis)?,
        }

        let _release = ReleaseGuard {
            coordinator: self.coordinator,
            key: &key,
        };
        op(input)
    }

    /// Run `op` under a fixed key, for operations with no meaningful input.
    pub fn execute_keyed<R, F>(
        &self,
        key: &str,
        mode: LockMode,
        ttl_millis: u64,
        op: F,
    ) -> Result<R>
    where
        F: FnOnce() -> Result<R>,
    {
        let spec = GuardSpec::<()>::fixed(key)
            .with_mode(mode)
            .with_ttl_millis(ttl_millis);
        self.execute(&spec, &(), |()| op())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::Backoff;
    use crate::clock::SystemClock;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TransferRequest {
        id: Option<String>,
    }

    fn coordinator() -> LockCoordinator {
        let clock = Arc::new(SystemClock);
        let store = Arc::new(MemoryStore::new(clock.clone()));
        LockCoordinator::new(store, clock).with_backoff(Backoff::new(10, 300))
    }

    #[test]
    fn operation_runs_with_lease_held_and_releases_after() {
        let coordinator = coordinator();
        let guard = OperationGuard::new(&coordinator);

        let result = guard
            .execute_keyed("job-x", LockMode::FailFast, 60_000, || {
                // While the body runs the lease is held.
                let err = coordinator.acquire_fail_fast("job-x", 60_000).unwrap_err();
                assert!(matches!(err, ExlockError::LeaseHeld(_)));
                Ok(42)
            })
            .unwrap();
        assert_eq!(result, 42);

        // Released after completion.
        coordinator.acquire_fail_fast("job-x", 60_000).unwrap();
    }

    #[test]
    fn lease_is_released_when_operation_fails() {
        let coordinator = coordinator();
        let guard = OperationGuard::new(&coordinator);

        let err = guard
            .execute_keyed("job-y", LockMode::Retry, 60_000, || {
                Err::<(), _>(ExlockError::UserError("boom".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, ExlockError::UserError(_)));

        // The failure did not leak the lease.
        coordinator.acquire_fail_fast("job-y", 60_000).unwrap();
    }

    #[test]
    fn lease_is_released_when_operation_panics() {
        let coordinator = coordinator();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let guard = OperationGuard::new(&coordinator);
            let _ = guard.execute_keyed("job-p", LockMode::FailFast, 60_000, || -> Result<()> {
                panic!("operation blew up")
            });
        }));
        assert!(result.is_err());

        coordinator.acquire_fail_fast("job-p", 60_000).unwrap();
    }

    #[test]
    fn fail_fast_contention_prevents_operation_from_running() {
        let coordinator = coordinator();
        coordinator.acquire_fail_fast("job-x", 60_000).unwrap();

        let guard = OperationGuard::new(&coordinator);
        let ran = AtomicUsize::new(0);
        let err = guard
            .execute_keyed("job-x", LockMode::FailFast, 60_000, || {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, ExlockError::LeaseHeld(_)));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn retry_timeout_prevents_operation_from_running() {
        let coordinator = coordinator();
        coordinator.acquire_fail_fast("job-x", 60_000).unwrap();

        let guard = OperationGuard::new(&coordinator);
        let ran = AtomicUsize::new(0);
        let err = guard
            .execute_keyed("job-x", LockMode::Retry, 60_000, || {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, ExlockError::AcquireTimeout(_)));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn key_derived_from_input_field() {
        let coordinator = coordinator();
        let guard = OperationGuard::new(&coordinator);

        let spec = GuardSpec::<TransferRequest>::derived(|req| req.id.clone())
            .with_mode(LockMode::FailFast);
        let input = TransferRequest {
            id: Some("transfer-7".to_string()),
        };

        guard
            .execute(&spec, &input, |req| {
                // The derived key, not some global one, is held.
                let err = coordinator
                    .acquire_fail_fast("transfer-7", 60_000)
                    .unwrap_err();
                assert!(matches!(err, ExlockError::LeaseHeld(_)));
                assert_eq!(req.id.as_deref(), Some("transfer-7"));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn unresolvable_key_is_a_config_error_and_skips_acquisition() {
        let coordinator = coordinator();
        let guard = OperationGuard::new(&coordinator);

        let spec = GuardSpec::<TransferRequest>::derived(|req| req.id.clone());
        let input = TransferRequest { id: None };

        let err = guard
            .execute(&spec, &input, |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, ExlockError::Config(_)));
    }

    #[test]
    fn blank_key_is_a_config_error() {
        let coordinator = coordinator();
        let guard = OperationGuard::new(&coordinator);

        let err = guard
            .execute_keyed("   ", LockMode::Retry, 60_000, || Ok(()))
            .unwrap_err();
        assert!(matches!(err, ExlockError::Config(_)));

        let spec = GuardSpec::<TransferRequest>::derived(|_| Some(String::new()));
        let input = TransferRequest { id: None };
        let err = guard.execute(&spec, &input, |_| Ok(())).unwrap_err();
        assert!(matches!(err, ExlockError::Config(_)));
    }

    #[test]
    fn concurrent_fail_fast_guards_run_exactly_one_body() {
        use std::sync::Barrier;

        let coordinator = Arc::new(coordinator());
        let barrier = Arc::new(Barrier::new(2));
        let ran = Arc::new(AtomicUsize::new(0));
        let held = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let coordinator = coordinator.clone();
                let barrier = barrier.clone();
                let ran = ran.clone();
                let held = held.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let guard = OperationGuard::new(&coordinator);
                    let result = guard.execute_keyed("job-x", LockMode::FailFast, 60_000, || {
                        ran.fetch_add(1, Ordering::SeqCst);
                        // Hold the lease long enough for the loser to observe it.
                        std::thread::sleep(std::time::Duration::from_millis(50));
                        Ok(())
                    });
                    if matches!(result, Err(ExlockError::LeaseHeld(_))) {
                        held.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(held.load(Ordering::SeqCst), 1);
    }
}

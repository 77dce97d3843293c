//! Interruptible waiting for retry loops and watch loops.
//!
//! The only blocking point in the crate is the backoff sleep inside
//! `acquire_blocking` (and the tick sleep in `ExclusiveJob::run_loop`).
//! Both wait on a [`ShutdownToken`] instead of `thread::sleep` so another
//! thread can cut the wait short and the waiter sees a clean "interrupted"
//! outcome rather than an uncontrolled unwind mid-retry.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Cloneable one-shot shutdown signal.
///
/// All clones share the same flag; triggering any clone wakes every waiter.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownToken {
    /// Create a new, untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the token, waking all current and future waiters.
    pub fn trigger(&self) {
        let (flag, condvar) = &*self.inner;
        let mut triggered = flag.lock().unwrap_or_else(|poison| poison.into_inner());
        *triggered = true;
        condvar.notify_all();
    }

    /// Whether the token has been triggered.
    pub fn is_triggered(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Wait up to `millis`, returning early if the token is triggered.
    ///
    /// Returns `true` if the token was triggered (before or during the
    /// wait), `false` if the full duration elapsed.
    pub fn wait_timeout(&self, millis: u64) -> bool {
        let deadline = Instant::now() + Duration::from_millis(millis);
        let (flag, condvar) = &*self.inner;
        let mut triggered = flag.lock().unwrap_or_else(|poison| poison.into_inner());

        // Condvar waits can wake spuriously; loop until the flag is set or
        // the deadline passes.
        while !*triggered {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _timeout) = condvar
                .wait_timeout(triggered, deadline - now)
                .unwrap_or_else(|poison| poison.into_inner());
            triggered = guard;
        }
        true
    }
}

//! Retry backoff policy for lease acquisition.
//!
//! Computes successive retry delays inside a bounded wall-clock budget.
//! The growth function is capped exponential doubling: 30ms, 60ms, 120ms,
//! and so on, clamped to whatever remains of the budget.

/// Default total wall-clock budget for blocking acquisition, in milliseconds.
pub const DEFAULT_WAIT_BUDGET_MILLIS: u64 = 5000;

/// Default delay before the first retry, in milliseconds.
pub const DEFAULT_RETRY_INTERVAL_MILLIS: u64 = 30;

/// Backoff policy: doubling delays capped at the remaining wait budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_millis: u64,

    /// Total wall-clock budget for the whole acquisition attempt.
    pub wait_budget_millis: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay_millis: DEFAULT_RETRY_INTERVAL_MILLIS,
            wait_budget_millis: DEFAULT_WAIT_BUDGET_MILLIS,
        }
    }
}

impl Backoff {
    /// Create a backoff policy with explicit initial delay and budget.
    pub fn new(initial_delay_millis: u64, wait_budget_millis: u64) -> Self {
        Self {
            initial_delay_millis,
            wait_budget_millis,
        }
    }

    /// Delay in milliseconds before retry number `retry_count` (0-based),
    /// given the time elapsed since acquisition began.
    ///
    /// Returns `None` once the budget is exhausted: no further attempts may
    /// be made. The returned delay never sleeps past the budget:
    /// `delay = min(initial * 2^retry_count, remaining_budget)`.
    pub fn next_delay(&self, retry_count: u32, elapsed_millis: u64) -> Option<u64> {
        if elapsed_millis >= self.wait_budget_millis {
            return None;
        }
        let remaining = self.wait_budget_millis - elapsed_millis;
        let grown = self
            .initial_delay_millis
            .saturating_mul(2u64.saturating_pow(retry_count));
        Some(grown.min(remaining))
    }

    /// Whether the budget is spent for the given elapsed time.
    pub fn is_exhausted(&self, elapsed_millis: u64) -> bool {
        elapsed_millis >= self.wait_budget_millis
    }
}

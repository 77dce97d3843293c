//! exlock: distributed mutual-exclusion leases over a shared TTL store.
//!
//! Multiple independent process instances coordinate exclusive execution of
//! a named operation through a shared lease store; the store is the only
//! communication channel. Crash safety comes from lease expiry: if a holder
//! dies before releasing, the lease self-destructs after its TTL.
//!
//! Layering, leaf-first:
//! - [`store`]: the shared store adapters (atomic acquire-with-expiry,
//!   idempotent delete)
//! - [`backoff`]: retry delays inside a bounded wall-clock budget
//! - [`coordinator`]: the acquire/release orchestration (blocking-with-retry
//!   and fail-fast)
//! - [`guard`]: scoped guarding of operations with guaranteed release
//! - [`job`]: periodic jobs that run on at most one instance per tick
//!
//! This is best-effort mutual exclusion with a liveness fallback, not a
//! consensus protocol: no fencing tokens, no FIFO fairness, no guarantee
//! the holder is still alive.

pub mod backoff;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod exit_codes;
pub mod guard;
pub mod job;
pub mod shutdown;
pub mod store;

pub use backoff::Backoff;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use coordinator::LockCoordinator;
pub use error::{ExlockError, Result};
pub use guard::{GuardSpec, KeySource, LockMode, OperationGuard};
pub use job::{ExclusiveJob, TickOutcome};
pub use shutdown::ShutdownToken;
pub use store::{FileStore, LeaseStore, MemoryStore};

//! Lease store adapters.
//!
//! A lease store is the shared, TTL-capable key-value surface all instances
//! coordinate through. The contract is deliberately tiny:
//!
//! - `try_acquire`: atomic create-if-absent with expiry. Returns `true` iff
//!   this call created the lease. Store failures are logged and reported as
//!   "not acquired" so the retry loop treats an outage like contention.
//! - `release`: unconditional, idempotent delete. Failures are logged and
//!   swallowed; an orphaned lease still expires via its TTL.
//!
//! Two adapters are provided: [`MemoryStore`] for in-process coordination
//! and tests, and [`FileStore`] where a shared directory is the store
//! (exclusive-create lease files with JSON metadata).

mod file;
mod memory;
mod metadata;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use metadata::{LeaseInfo, LeaseMetadata};

/// Fixed prefix applied to lease keys inside a store, keeping them apart
/// from unrelated entries when the store is shared.
pub const LEASE_KEY_PREFIX: &str = "lock:";

/// Shared, TTL-capable store of lease records.
pub trait LeaseStore: Send + Sync {
    /// Atomically create the lease for `key` if and only if no non-expired
    /// lease exists, set to auto-expire after `ttl_millis`.
    ///
    /// Returns `true` iff this call created the lease. Must never panic or
    /// surface store errors: transient failures count as "not acquired".
    fn try_acquire(&self, key: &str, ttl_millis: u64) -> bool;

    /// Delete the lease for `key` unconditionally. Deleting an absent key
    /// is not an error.
    fn release(&self, key: &str);
}

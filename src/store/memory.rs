//! In-process lease store.
//!
//! A mutex-guarded map of key to expiry timestamp. Useful for tests and for
//! serializing guarded operations inside a single process; it offers the
//! same contract as the shared adapters, just with process-local scope.

use super::{LEASE_KEY_PREFIX, LeaseStore};
use crate::clock::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Lease store backed by an in-process map.
pub struct MemoryStore {
    leases: Mutex<HashMap<String, u64>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create an empty store against the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            leases: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of live (non-expired) leases. Test/diagnostic helper.
    pub fn live_leases(&self) -> usize {
        let now = self.clock.now_millis();
        let leases = self.leases.lock().unwrap_or_else(|poison| poison.into_inner());
        leases.values().filter(|&&expires| expires > now).count()
    }

    fn store_key(key: &str) -> String {
        format!("{}{}", LEASE_KEY_PREFIX, key)
    }
}

impl LeaseStore for MemoryStore {
    fn try_acquire(&self, key: &str, ttl_millis: u64) -> bool {
        let now = self.clock.now_millis();
        let store_key = Self::store_key(key);
        let mut leases = self.leases.lock().unwrap_or_else(|poison| poison.into_inner());

        if let Some(&expires_at) = leases.get(&store_key)
            && expires_at > now
        {
            return false;
        }

        leases.insert(store_key, now.saturating_add(ttl_millis));
        tracing::debug!(key, ttl_millis, "lease acquired (memory)");
        true
    }

    fn release(&self, key: &str) {
        let mut leases = self.leases.lock().unwrap_or_else(|poison| poison.into_inner());
        if leases.remove(&Self::store_key(key)).is_some() {
            tracing::debug!(key, "lease released (memory)");
        }
    }
}

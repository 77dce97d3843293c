//! File-backed lease store.
//!
//! A shared directory (NFS mount, bind mount, plain local dir) acts as the
//! store: one file per lease, created with **create_new** semantics so only
//! one process can create a given lease at a time. Each file carries JSON
//! metadata (owner, pid, acquired_at, ttl, purpose) used for TTL expiry and
//! for the `exlock lease` operator commands.
//!
//! The store never surfaces I/O errors through the `LeaseStore` contract:
//! failures are logged and reported as "not acquired" (acquire) or swallowed
//! (release). An unreadable lease file counts as held, because without a
//! readable TTL it cannot be proven expired; operators clear those with
//! `exlock lease clear`.

use super::{LeaseInfo, LeaseMetadata, LeaseStore};
use crate::clock::Clock;
use crate::error::{ExlockError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File extension for lease files.
const LEASE_EXTENSION: &str = "lease";

/// Lease store backed by exclusive-create files in a shared directory.
pub struct FileStore {
    lease_dir: PathBuf,
    clock: Arc<dyn Clock>,
    purpose: String,
}

impl FileStore {
    /// Create a store rooted at `lease_dir`. The directory is created on
    /// first acquisition.
    pub fn new<P: AsRef<Path>>(lease_dir: P, clock: Arc<dyn Clock>) -> Self {
        Self {
            lease_dir: lease_dir.as_ref().to_path_buf(),
            clock,
            purpose: String::new(),
        }
    }

    /// Record what leases from this store are taken for (shown by
    /// `exlock lease list`).
    pub fn with_purpose(mut self, purpose: &str) -> Self {
        self.purpose = purpose.to_string();
        self
    }

    /// Directory holding the lease files.
    pub fn lease_dir(&self) -> &Path {
        &self.lease_dir
    }

    /// Path of the lease file for `key`.
    ///
    /// Key bytes outside `[A-Za-z0-9._-]` are replaced with `_` to keep the
    /// filename portable. Exotic keys that sanitize to the same name share a
    /// lease, which over-locks but never under-locks.
    pub fn lease_path(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.lease_dir
            .join(format!("{}.{}", sanitized, LEASE_EXTENSION))
    }

    /// Exclusively create the lease file and persist its metadata.
    fn create_lease(&self, path: &Path, key: &str, ttl_millis: u64) -> std::io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;

        let metadata =
            LeaseMetadata::new(key, ttl_millis, self.clock.now_millis(), &self.purpose);
        let json = metadata
            .to_json()
            .map_err(|e| std::io::Error::other(e.to_string()));
        let write_result = json.and_then(|json| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        });

        if let Err(e) = write_result {
            // A lease file without readable metadata would block everyone
            // until cleared; take it back out.
            let _ = fs::remove_file(path);
            return Err(e);
        }
        Ok(())
    }

    /// Reclaim an expired lease and retry the exclusive create once.
    ///
    /// The read-check-delete-create sequence is not atomic; a competitor may
    /// reclaim first, in which case our create_new simply loses. See
    /// DESIGN.md for the accepted race window.
    fn reclaim_and_retry(&self, path: &Path, key: &str, ttl_millis: u64) -> bool {
        tracing::debug!(key, "reclaiming expired lease");
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::error!(key, error = %e, "failed to remove expired lease");
                return false;
            }
        }
        match self.create_lease(path, key, ttl_millis) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(key, error = %e, "lost reclaim race");
                false
            }
        }
    }

    /// List all leases in the store, expired ones included.
    pub fn list(&self) -> Result<Vec<LeaseInfo>> {
        let mut leases = Vec::new();

        if !self.lease_dir.exists() {
            return Ok(leases);
        }

        let entries = fs::read_dir(&self.lease_dir).map_err(|e| {
            ExlockError::UserError(format!(
                "failed to read lease directory '{}': {}",
                self.lease_dir.display(),
                e
            ))
        })?;

        let now = self.clock.now_millis();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ExlockError::UserError(format!("failed to read lease directory entry: {}", e))
            })?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some(LEASE_EXTENSION) {
                continue;
            }

            // Skip unparseable files here; `clear` can still remove them.
            let Ok(metadata) = LeaseMetadata::from_file(&path) else {
                continue;
            };

            let is_expired = metadata.is_expired(now);
            leases.push(LeaseInfo {
                path,
                metadata,
                is_expired,
            });
        }

        leases.sort_by(|a, b| a.metadata.key.cmp(&b.metadata.key));
        Ok(leases)
    }

    /// Remove the lease for `key` regardless of holder or expiry, returning
    /// its last-known info for audit output.
    ///
    /// The caller is responsible for confirming the holder is really gone
    /// (the CLI requires `--force`).
    pub fn clear(&self, key: &str) -> Result<LeaseInfo> {
        let path = self.lease_path(key);

        if !path.exists() {
            return Err(ExlockError::UserError(format!(
                "no lease for key '{}' at: {}",
                key,
                path.display()
            )));
        }

        let metadata = LeaseMetadata::from_file(&path)?;
        let is_expired = metadata.is_expired(self.clock.now_millis());

        fs::remove_file(&path).map_err(|e| {
            ExlockError::UserError(format!("failed to clear lease '{}': {}", path.display(), e))
        })?;

        Ok(LeaseInfo {
            path,
            metadata,
            is_expired,
        })
    }
}

impl LeaseStore for FileStore {
    fn try_acquire(&self, key: &str, ttl_millis: u64) -> bool {
        let path = self.lease_path(key);

        match self.create_lease(&path, key, ttl_millis) {
            Ok(()) => {
                tracing::debug!(key, ttl_millis, "lease acquired (file)");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                match LeaseMetadata::from_file(&path) {
                    Ok(meta) if meta.is_expired(self.clock.now_millis()) => {
                        self.reclaim_and_retry(&path, key, ttl_millis)
                    }
                    Ok(_) => false,
                    Err(e) => {
                        // Can't prove it expired without a readable TTL.
                        tracing::error!(key, error = %e, "unreadable lease file, treating as held");
                        false
                    }
                }
            }
            Err(e) => {
                tracing::error!(key, error = %e, "failed to acquire lease");
                false
            }
        }
    }

    fn release(&self, key: &str) {
        let path = self.lease_path(key);
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(key, "lease released (file)"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                // Best effort: the TTL bounds how long a stuck lease lingers.
                tracing::error!(key, error = %e, "failed to release lease");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};
    use tempfile::TempDir;

    fn test_store() -> (TempDir, Arc<ManualClock>, FileStore) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = FileStore::new(dir.path(), clock.clone()).with_purpose("test");
        (dir, clock, store)
    }

    #[test]
    fn acquire_creates_lease_file_with_metadata() {
        let (_dir, _clock, store) = test_store();

        assert!(store.try_acquire("job-x", 60_000));

        let path = store.lease_path("job-x");
        assert!(path.exists());

        let meta = LeaseMetadata::from_file(&path).unwrap();
        assert_eq!(meta.key, "job-x");
        assert_eq!(meta.ttl_millis, 60_000);
        assert_eq!(meta.purpose, "test");
        assert!(meta.pid.is_some());
    }

    #[test]
    fn second_acquire_fails_while_lease_is_live() {
        let (_dir, _clock, store) = test_store();

        assert!(store.try_acquire("job-x", 60_000));
        assert!(!store.try_acquire("job-x", 60_000));
    }

    #[test]
    fn release_then_acquire_succeeds() {
        let (_dir, _clock, store) = test_store();

        assert!(store.try_acquire("job-x", 60_000));
        store.release("job-x");
        assert!(store.try_acquire("job-x", 60_000));
    }

    #[test]
    fn release_is_idempotent() {
        let (_dir, _clock, store) = test_store();

        store.release("job-x");
        assert!(store.try_acquire("job-x", 60_000));
        store.release("job-x");
        store.release("job-x");
    }

    #[test]
    fn expired_lease_is_reclaimed() {
        let (_dir, clock, store) = test_store();

        assert!(store.try_acquire("job-x", 1000));
        assert!(!store.try_acquire("job-x", 1000));

        clock.advance(1000);
        assert!(store.try_acquire("job-x", 1000));

        // The reclaimed lease belongs to the new acquisition.
        let meta = LeaseMetadata::from_file(store.lease_path("job-x")).unwrap();
        assert_eq!(meta.acquired_at.timestamp_millis() as u64, clock.now_millis());
    }

    #[test]
    fn unreadable_lease_file_counts_as_held() {
        let (_dir, _clock, store) = test_store();

        fs::create_dir_all(store.lease_dir()).unwrap();
        fs::write(store.lease_path("job-x"), "not json").unwrap();

        assert!(!store.try_acquire("job-x", 60_000));
    }

    #[test]
    fn keys_are_sanitized_into_portable_filenames() {
        let (_dir, _clock, store) = test_store();

        let path = store.lease_path("tenant/42:cleanup");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, "tenant_42_cleanup.lease");

        assert!(store.try_acquire("tenant/42:cleanup", 60_000));
        assert!(path.exists());
    }

    #[test]
    fn list_reports_live_and_expired_leases() {
        let (_dir, clock, store) = test_store();

        assert!(store.try_acquire("short", 1000));
        assert!(store.try_acquire("long", 60_000));
        clock.advance(2000);

        let leases = store.list().unwrap();
        assert_eq!(leases.len(), 2);

        // Sorted by key.
        assert_eq!(leases[0].metadata.key, "long");
        assert!(!leases[0].is_expired);
        assert_eq!(leases[1].metadata.key, "short");
        assert!(leases[1].is_expired);
    }

    #[test]
    fn list_is_empty_when_directory_missing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("never-created"), Arc::new(SystemClock));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn list_skips_foreign_and_corrupt_files() {
        let (_dir, _clock, store) = test_store();

        assert!(store.try_acquire("job-x", 60_000));
        fs::write(store.lease_dir().join("notes.txt"), "hi").unwrap();
        fs::write(store.lease_dir().join("broken.lease"), "not json").unwrap();

        let leases = store.list().unwrap();
        assert_eq!(leases.len(), 1);
        assert_eq!(leases[0].metadata.key, "job-x");
    }

    #[test]
    fn clear_removes_lease_and_returns_info() {
        let (_dir, _clock, store) = test_store();

        assert!(store.try_acquire("job-x", 60_000));
        let cleared = store.clear("job-x").unwrap();

        assert_eq!(cleared.metadata.key, "job-x");
        assert!(!cleared.is_expired);
        assert!(!store.lease_path("job-x").exists());
        assert!(store.try_acquire("job-x", 60_000));
    }

    #[test]
    fn clear_of_absent_lease_fails() {
        let (_dir, _clock, store) = test_store();

        let result = store.clear("nope");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no lease"));
    }

    #[test]
    fn concurrent_file_acquire_admits_exactly_one_winner() {
        use std::sync::Barrier;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(dir.path(), Arc::new(SystemClock)));
        let barrier = Arc::new(Barrier::new(8));
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let barrier = barrier.clone();
                let wins = wins.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    if store.try_acquire("job-x", 60_000) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}

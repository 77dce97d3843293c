//! Lease metadata structures and utilities.

use crate::error::{ExlockError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata stored in a lease file.
///
/// The holder identity fields exist for operators: when a lease looks stuck,
/// `exlock lease list` shows who took it, when, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseMetadata {
    /// The lock key this lease covers (before any filename sanitization).
    pub key: String,

    /// Owner of the lease (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lease holder (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Timestamp when the lease was acquired (RFC3339).
    pub acquired_at: DateTime<Utc>,

    /// Milliseconds after `acquired_at` at which the lease auto-expires.
    pub ttl_millis: u64,

    /// What the holder is doing (e.g., the guarded command).
    pub purpose: String,
}

impl LeaseMetadata {
    /// Create metadata for a lease acquired now (per the given epoch-millis
    /// timestamp) by this process.
    pub fn new(key: &str, ttl_millis: u64, now_millis: u64, purpose: &str) -> Self {
        Self {
            key: key.to_string(),
            owner: get_owner_string(),
            pid: Some(std::process::id()),
            acquired_at: DateTime::from_timestamp_millis(now_millis as i64)
                .unwrap_or_else(Utc::now),
            ttl_millis,
            purpose: purpose.to_string(),
        }
    }

    /// Parse lease metadata from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ExlockError::UserError(format!(
                "failed to read lease file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            ExlockError::UserError(format!(
                "failed to parse lease file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Serialize lease metadata to JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ExlockError::UserError(format!("failed to serialize lease metadata: {}", e)))
    }

    /// Epoch milliseconds at which this lease expires.
    pub fn expires_at_millis(&self) -> u64 {
        (self.acquired_at.timestamp_millis().max(0) as u64).saturating_add(self.ttl_millis)
    }

    /// Whether the lease has expired as of `now_millis`.
    pub fn is_expired(&self, now_millis: u64) -> bool {
        now_millis >= self.expires_at_millis()
    }

    /// Age of the lease relative to the wall clock.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();

        if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds)
        }
    }
}

/// Information about a lease on disk, for the operator surface.
#[derive(Debug, Clone)]
pub struct LeaseInfo {
    /// The lease file path.
    pub path: PathBuf,

    /// The lease metadata.
    pub metadata: LeaseMetadata,

    /// Whether the lease has expired (reclaimable on next acquire).
    pub is_expired: bool,
}

impl std::fmt::Display for LeaseInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}, purpose: {}{})",
            self.metadata.key,
            self.metadata.owner,
            self.metadata.age_string(),
            self.metadata.purpose,
            if self.is_expired { ", EXPIRED" } else { "" }
        )
    }
}

/// Get the owner string for lease metadata.
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn metadata_records_holder_identity() {
        let meta = LeaseMetadata::new("job-x", 60_000, 1_700_000_000_000, "cleanup");

        assert_eq!(meta.key, "job-x");
        assert!(!meta.owner.is_empty());
        assert!(meta.pid.is_some());
        assert_eq!(meta.ttl_millis, 60_000);
        assert_eq!(meta.purpose, "cleanup");
        assert_eq!(meta.acquired_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let meta = LeaseMetadata::new("job-y", 30_000, 1_700_000_000_000, "report");
        let json = meta.to_json().unwrap();

        let parsed: LeaseMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.key, "job-y");
        assert_eq!(parsed.ttl_millis, 30_000);
        assert_eq!(parsed.acquired_at, meta.acquired_at);
    }

    #[test]
    fn expiry_is_acquired_at_plus_ttl() {
        let meta = LeaseMetadata::new("k", 1000, 10_000, "");

        assert_eq!(meta.expires_at_millis(), 11_000);
        assert!(!meta.is_expired(10_999));
        assert!(meta.is_expired(11_000));
        assert!(meta.is_expired(50_000));
    }

    #[test]
    fn age_string_uses_coarsest_unit() {
        let mut meta = LeaseMetadata::new("k", 1000, 0, "");

        meta.acquired_at = Utc::now() - Duration::seconds(5);
        assert!(meta.age_string().ends_with('s'));

        meta.acquired_at = Utc::now() - Duration::minutes(3);
        assert!(meta.age_string().contains('m'));

        meta.acquired_at = Utc::now() - Duration::hours(2);
        assert!(meta.age_string().contains('h'));
    }

    #[test]
    fn lease_info_display_marks_expired() {
        let meta = LeaseMetadata::new("job-x", 1000, 0, "cleanup");
        let info = LeaseInfo {
            path: PathBuf::from("/tmp/job-x.lease"),
            metadata: meta,
            is_expired: true,
        };

        let display = format!("{}", info);
        assert!(display.contains("job-x"));
        assert!(display.contains("cleanup"));
        assert!(display.contains("EXPIRED"));
    }

    #[test]
    #[serial]
    fn owner_string_is_user_at_host() {
        // SAFETY: guarded by #[serial]; no other test mutates USER concurrently.
        unsafe { std::env::set_var("USER", "testuser") };
        let owner = get_owner_string();
        assert!(owner.starts_with("testuser@"));
        assert!(owner.contains('@'));
    }
}

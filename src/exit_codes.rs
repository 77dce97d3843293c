//! Exit code constants for the exlock CLI.
//!
//! - 0: Success
//! - 1: User or configuration error
//! - 2: Guarded command failed
//! - 3: Lease held by another instance (fail-fast contention)
//! - 4: Lease acquisition timed out (retry budget exhausted)
//! - 5: Interrupted while waiting for a lease

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid config, or an unresolvable lock key.
pub const USER_ERROR: i32 = 1;

/// The guarded command ran but exited non-zero.
pub const COMMAND_FAILURE: i32 = 2;

/// Fail-fast acquisition found the lease already held.
pub const LEASE_HELD: i32 = 3;

/// Retry-mode acquisition exhausted its wait budget.
pub const ACQUIRE_TIMEOUT: i32 = 4;

/// The backoff sleep was interrupted by a shutdown signal.
pub const INTERRUPTED: i32 = 5;

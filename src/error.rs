//! Error types for exlock.
//!
//! Uses thiserror for derive macros. Each variant maps to a distinct exit
//! code so callers (and shell scripts around the CLI) can tell an expected
//! contention outcome apart from a real failure.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for exlock operations.
///
/// The three acquisition outcomes (`LeaseHeld`, `AcquireTimeout`,
/// `Interrupted`) are deliberately separate variants: a caller that skips a
/// tick on contention must not also skip on a timeout or an interrupt.
#[derive(Error, Debug)]
pub enum ExlockError {
    /// Lock configuration is invalid: blank key, unresolvable key accessor,
    /// or bad config values. Never retried.
    #[error("invalid lock configuration: {0}")]
    Config(String),

    /// Fail-fast acquisition found the lease already held. This is an
    /// expected outcome under horizontal scaling, not a fault.
    #[error("lease already held for key '{0}'")]
    LeaseHeld(String),

    /// Retry-mode acquisition exhausted its wait budget without success.
    #[error("timed out waiting for lease '{0}'")]
    AcquireTimeout(String),

    /// The backoff sleep was interrupted by a shutdown signal.
    #[error("interrupted while waiting for lease '{0}'")]
    Interrupted(String),

    /// User provided invalid arguments or the environment is in a bad state.
    #[error("{0}")]
    UserError(String),

    /// The guarded command ran but exited non-zero.
    #[error("command exited with code {0}")]
    CommandFailed(i32),
}

impl ExlockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExlockError::Config(_) => exit_codes::USER_ERROR,
            ExlockError::LeaseHeld(_) => exit_codes::LEASE_HELD,
            ExlockError::AcquireTimeout(_) => exit_codes::ACQUIRE_TIMEOUT,
            ExlockError::Interrupted(_) => exit_codes::INTERRUPTED,
            ExlockError::UserError(_) => exit_codes::USER_ERROR,
            // Pass the child's own exit code through where it is meaningful.
            ExlockError::CommandFailed(code) if *code > 0 => *code,
            ExlockError::CommandFailed(_) => exit_codes::COMMAND_FAILURE,
        }
    }
}

/// Result type alias for exlock operations.
pub type Result<T> = std::result::Result<T, ExlockError>;

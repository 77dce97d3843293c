//! Implementation of the `exlock run` command.
//!
//! Runs a single command while holding the lease for a key: acquire (retry
//! or fail-fast), execute, release on every exit path. The child's exit
//! status is surfaced through the exlock exit code.

use crate::cli::RunArgs;
use exlock::clock::SystemClock;
use exlock::config::Config;
use exlock::coordinator::LockCoordinator;
use exlock::error::{ExlockError, Result};
use exlock::guard::{LockMode, OperationGuard};
use exlock::store::FileStore;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

pub fn cmd_run(args: RunArgs, config: &Config, lease_dir: &Path) -> Result<()> {
    let argv = parse_command(&args.command)?;
    let ttl_millis = args.ttl_millis.unwrap_or(config.lease_ttl_millis);

    let mut backoff = config.backoff();
    if let Some(budget) = args.wait_budget_millis {
        backoff.wait_budget_millis = budget;
    }
    if let Some(interval) = args.retry_interval_millis {
        backoff.initial_delay_millis = interval;
    }

    let clock = Arc::new(SystemClock);
    let store = Arc::new(FileStore::new(lease_dir, clock.clone()).with_purpose(&args.command));
    let coordinator = LockCoordinator::new(store, clock).with_backoff(backoff);

    let mode = if args.no_wait {
        LockMode::FailFast
    } else {
        LockMode::Retry
    };

    let guard = OperationGuard::new(&coordinator);
    guard.execute_keyed(&args.key, mode, ttl_millis, || run_command(&argv))
}

/// Parse a command string into argv with shell-words.
///
/// The command is executed without a shell, so the parse must be
/// deterministic and quoting errors surface up front.
pub(super) fn parse_command(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command).map_err(|e| {
        ExlockError::UserError(format!(
            "failed to parse command '{}': {}\n\n\
             Fix: check for unmatched quotes or invalid escape sequences.",
            command, e
        ))
    })?;

    if argv.is_empty() {
        return Err(ExlockError::UserError(
            "command is empty after parsing.\n\n\
             Fix: provide a command to run while the lease is held."
                .to_string(),
        ));
    }

    Ok(argv)
}

/// Run the command with inherited stdio, mapping a non-zero exit to
/// [`ExlockError::CommandFailed`].
pub(super) fn run_command(argv: &[String]) -> Result<()> {
    let program = &argv[0];
    let args = &argv[1..];

    let status = Command::new(program).args(args).status().map_err(|e| {
        ExlockError::UserError(format!(
            "failed to execute command '{}': {}\n\n\
             Fix: ensure the command is installed and in PATH.",
            program, e
        ))
    })?;

    if status.success() {
        Ok(())
    } else {
        // A child killed by a signal has no exit code; record -1.
        Err(ExlockError::CommandFailed(status.code().unwrap_or(-1)))
    }
}

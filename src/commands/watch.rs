//! Implementation of the `exlock watch` command.
//!
//! Drives an [`ExclusiveJob`]: every tick, attempt a fail-fast acquisition
//! of the job key and run the command if this instance wins. Losing a tick
//! is an expected outcome under horizontal scaling and is logged, not
//! failed. A tick whose command exits non-zero is reported and the loop
//! keeps going; only infrastructure errors stop the watcher.

use crate::cli::WatchArgs;
use exlock::clock::SystemClock;
use exlock::config::Config;
use exlock::coordinator::LockCoordinator;
use exlock::error::{ExlockError, Result};
use exlock::job::{ExclusiveJob, TickOutcome};
use exlock::store::FileStore;
use std::path::Path;
use std::sync::Arc;

/// Lower bound on the tick interval, so a misconfigured watcher cannot
/// busy-loop against the store.
const MIN_INTERVAL_MS: u64 = 50;

pub fn cmd_watch(args: WatchArgs, config: &Config, lease_dir: &Path) -> Result<()> {
    let argv = super::run::parse_command(&args.command)?;
    let ttl_millis = args.ttl_millis.unwrap_or(config.lease_ttl_millis);
    let interval_ms = args.interval_ms.max(MIN_INTERVAL_MS);

    let clock = Arc::new(SystemClock);
    let store = Arc::new(FileStore::new(lease_dir, clock.clone()).with_purpose(&args.command));
    let coordinator = LockCoordinator::new(store, clock).with_backoff(config.backoff());

    let job = ExclusiveJob::new(&args.key, &args.key).with_ttl_millis(ttl_millis);

    eprintln!("exlock watch started");
    eprintln!("  key:      {}", args.key);
    eprintln!("  command:  {}", args.command);
    eprintln!("  leases:   {}", lease_dir.display());
    eprintln!("  interval: {}ms (ttl {}ms)", interval_ms, ttl_millis);
    eprintln!();

    let body = || match super::run::run_command(&argv) {
        Ok(()) => Ok(()),
        Err(ExlockError::CommandFailed(code)) => {
            // The tick ran and the lease protected it; a failing command is
            // the job's problem, not the watcher's.
            eprintln!("Warning: tick command exited with code {}", code);
            Ok(())
        }
        Err(e) => Err(e),
    };

    if args.once {
        match job.run_tick(&coordinator, body)? {
            TickOutcome::Ran => println!("tick ran"),
            TickOutcome::Skipped => println!("tick skipped: lease held by another instance"),
        }
        return Ok(());
    }

    let token = coordinator.shutdown_token();
    job.run_loop(&coordinator, interval_ms, &token, body)
}

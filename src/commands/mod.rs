//! Command implementations for exlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the lease inspection commands. Each command builds
//! its store from the resolved lease directory (flag > config > default).

mod run;
mod watch;

use crate::cli::{Cli, Command, LeaseAction, LeaseClearArgs, LeaseCommand};
use exlock::clock::SystemClock;
use exlock::config::Config;
use exlock::error::{ExlockError, Result};
use exlock::store::FileStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    let lease_dir = resolve_lease_dir(&cli, &config);

    match cli.command {
        Command::Run(args) => run::cmd_run(args, &config, &lease_dir),
        Command::Watch(args) => watch::cmd_watch(args, &config, &lease_dir),
        Command::Lease(lease_cmd) => dispatch_lease(lease_cmd, &lease_dir),
    }
}

/// Lease directory precedence: --lease-dir flag, then config.
fn resolve_lease_dir(cli: &Cli, config: &Config) -> PathBuf {
    cli.lease_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.lease_dir))
}

/// Dispatch lease subcommands.
fn dispatch_lease(lease_cmd: LeaseCommand, lease_dir: &std::path::Path) -> Result<()> {
    match lease_cmd.action {
        LeaseAction::List => cmd_lease_list(lease_dir),
        LeaseAction::Clear(args) => cmd_lease_clear(args, lease_dir),
    }
}

fn open_store(lease_dir: &std::path::Path) -> FileStore {
    FileStore::new(lease_dir, Arc::new(SystemClock))
}

fn cmd_lease_list(lease_dir: &std::path::Path) -> Result<()> {
    let store = open_store(lease_dir);
    let leases = store.list()?;

    if leases.is_empty() {
        println!("No leases.");
        return Ok(());
    }

    println!("Leases ({}):", leases.len());
    println!();

    for lease in &leases {
        println!("  {}:", lease.metadata.key);
        println!("    Owner:      {}", lease.metadata.owner);
        if let Some(pid) = lease.metadata.pid {
            println!("    PID:        {}", pid);
        }
        println!(
            "    Acquired:   {}",
            lease.metadata.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("    Age:        {}", lease.metadata.age_string());
        println!("    TTL:        {}ms", lease.metadata.ttl_millis);
        if !lease.metadata.purpose.is_empty() {
            println!("    Purpose:    {}", lease.metadata.purpose);
        }
        if lease.is_expired {
            println!("    Status:     EXPIRED (reclaimable on next acquire)");
        }
        println!("    Path:       {}", lease.path.display());
        println!();
    }

    let expired_count = leases.iter().filter(|l| l.is_expired).count();
    if expired_count > 0 {
        println!(
            "Note: {} lease(s) have expired and will be reclaimed by the next acquirer.",
            expired_count
        );
    }

    Ok(())
}

fn cmd_lease_clear(args: LeaseClearArgs, lease_dir: &std::path::Path) -> Result<()> {
    // Require --force
    if !args.force {
        return Err(ExlockError::UserError(format!(
            "refusing to clear lease without --force flag.\n\n\
             Clearing a lease while its holder is alive breaks mutual exclusion.\n\
             Only clear leases if you are certain the holder has crashed\n\
             (expired leases are reclaimed automatically).\n\n\
             To clear the lease, run:\n  exlock lease clear {} --force",
            args.key
        )));
    }

    let store = open_store(lease_dir);
    let cleared = store.clear(&args.key)?;

    println!("Cleared lease: {}", cleared.metadata.key);
    println!();
    println!("Lease details:");
    println!("  Owner:      {}", cleared.metadata.owner);
    if let Some(pid) = cleared.metadata.pid {
        println!("  PID:        {}", pid);
    }
    println!(
        "  Acquired:   {}",
        cleared.metadata.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Age:        {}", cleared.metadata.age_string());
    if !cleared.metadata.purpose.is_empty() {
        println!("  Purpose:    {}", cleared.metadata.purpose);
    }
    if cleared.is_expired {
        println!("  Status:     was EXPIRED");
    }
    println!("  Path:       {}", cleared.path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use exlock::exit_codes;
    use exlock::store::LeaseStore;
    use tempfile::TempDir;

    fn cli_from(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn lease_dir_flag_overrides_config() {
        let cli = cli_from(&["exlock", "lease", "list", "--lease-dir", "/tmp/other"]);
        let config = Config::default();
        assert_eq!(resolve_lease_dir(&cli, &config), PathBuf::from("/tmp/other"));
    }

    #[test]
    fn lease_dir_defaults_to_config() {
        let cli = cli_from(&["exlock", "lease", "list"]);
        let config = Config::default();
        assert_eq!(
            resolve_lease_dir(&cli, &config),
            PathBuf::from(".exlock/leases")
        );
    }

    #[test]
    fn lease_clear_refuses_without_force() {
        let dir = TempDir::new().unwrap();
        let args = LeaseClearArgs {
            key: "job-x".to_string(),
            force: false,
        };
        let result = cmd_lease_clear(args, dir.path());
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(err.to_string().contains("--force"));
    }

    #[test]
    fn lease_clear_removes_held_lease() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path());
        assert!(store.try_acquire("job-x", 60_000));

        let args = LeaseClearArgs {
            key: "job-x".to_string(),
            force: true,
        };
        cmd_lease_clear(args, dir.path()).unwrap();

        assert!(store.try_acquire("job-x", 60_000));
    }

    #[test]
    fn lease_clear_fails_for_absent_key() {
        let dir = TempDir::new().unwrap();
        let args = LeaseClearArgs {
            key: "nope".to_string(),
            force: true,
        };
        let result = cmd_lease_clear(args, dir.path());
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn lease_list_of_empty_store_succeeds() {
        let dir = TempDir::new().unwrap();
        cmd_lease_list(dir.path()).unwrap();
    }

    #[test]
    fn dispatch_routes_lease_list() {
        let dir = TempDir::new().unwrap();
        let dir_str = dir.path().to_str().unwrap();
        let cli = cli_from(&["exlock", "lease", "list", "--lease-dir", dir_str]);
        dispatch(cli).unwrap();
    }
}

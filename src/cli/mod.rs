//! CLI argument parsing for exlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// exlock: run commands under a distributed mutual-exclusion lease.
///
/// Instances coordinate through a shared lease directory: one lease file
/// per key, created exclusively, auto-expiring after its TTL. Use `run`
/// for one-off guarded commands, `watch` for periodic jobs that must run
/// on at most one instance per tick, and `lease` to inspect the store.
#[derive(Parser, Debug)]
#[command(name = "exlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (default: ./exlock.yaml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Lease directory, overriding the config file.
    #[arg(long, global = true)]
    pub lease_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for exlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command while holding the lease for a key.
    ///
    /// By default waits for the lease with backoff (up to the wait
    /// budget); with --no-wait a held lease fails immediately instead.
    Run(RunArgs),

    /// Periodically run a command under a fail-fast lease.
    ///
    /// On every tick, exactly one instance across the fleet wins the
    /// lease and runs the command; the others skip the tick.
    Watch(WatchArgs),

    /// Lease management commands.
    ///
    /// List or force-clear leases in the store.
    Lease(LeaseCommand),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Lock key naming the exclusive resource.
    pub key: String,

    /// Command to execute while the lease is held (parsed shell-style,
    /// executed without a shell).
    pub command: String,

    /// Fail immediately if the lease is held instead of retrying.
    #[arg(long)]
    pub no_wait: bool,

    /// Lease TTL in milliseconds (crash-safety bound). Defaults to
    /// lease_ttl_millis from config.
    #[arg(long)]
    pub ttl_millis: Option<u64>,

    /// Override the total wait budget in milliseconds.
    #[arg(long)]
    pub wait_budget_millis: Option<u64>,

    /// Override the initial retry interval in milliseconds.
    #[arg(long)]
    pub retry_interval_millis: Option<u64>,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Lock key unique to this job.
    pub key: String,

    /// Command to execute on each winning tick.
    pub command: String,

    /// Tick interval in milliseconds.
    #[arg(long, default_value_t = 60_000)]
    pub interval_ms: u64,

    /// Lease TTL in milliseconds for each tick. Defaults to
    /// lease_ttl_millis from config.
    #[arg(long)]
    pub ttl_millis: Option<u64>,

    /// Run a single tick and exit.
    #[arg(long)]
    pub once: bool,
}

/// Lease subcommands.
#[derive(Parser, Debug)]
pub struct LeaseCommand {
    #[command(subcommand)]
    pub action: LeaseAction,
}

/// Available lease actions.
#[derive(Subcommand, Debug)]
pub enum LeaseAction {
    /// List all leases in the store.
    ///
    /// Shows key, owner, age, purpose, and whether the lease has expired.
    List,

    /// Force-clear a specific lease.
    ///
    /// Requires --force to prevent accidental clearing while the holder
    /// is still alive.
    Clear(LeaseClearArgs),
}

/// Arguments for the `lease clear` command.
#[derive(Parser, Debug)]
pub struct LeaseClearArgs {
    /// Key whose lease should be cleared.
    pub key: String,

    /// Force clearing the lease (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

//! CLI argument parsing for phabstack.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};

/// Phabstack: submit local commit stacks to Phabricator.
///
/// Every commit between the base and HEAD becomes one revision. The
/// revisions are chained so the remote dependency graph mirrors the
/// local stack.
#[derive(Parser, Debug)]
#[command(name = "phabstack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log debug output (API calls, skipped steps).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for phabstack.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit the local stack for review.
    ///
    /// Builds a diff per commit, uploads binary files, then creates or
    /// updates one revision per commit.
    Submit(SubmitArgs),

    /// Reorganise the remote stack to match the local one.
    ///
    /// Every local commit must already name its revision. Revisions no
    /// longer in the local stack are abandoned.
    #[command(alias = "reorganise")]
    Reorg(ReorgArgs),
}

/// Arguments for the `submit` command.
#[derive(Parser, Debug, Default)]
pub struct SubmitArgs {
    /// Base revision of the stack (default: `{remote}/{main_branch}`).
    #[arg(long)]
    pub base: Option<String>,

    /// Send less context for large text files.
    #[arg(long)]
    pub less_context: bool,
}

/// Arguments for the `reorg` command.
#[derive(Parser, Debug, Default)]
pub struct ReorgArgs {
    /// Base revision of the stack (default: `{remote}/{main_branch}`).
    #[arg(long)]
    pub base: Option<String>,

    /// Relink every revision, even if the remote stack is not linear.
    #[arg(long)]
    pub force: bool,

    /// Do not abandon revisions missing from the local stack.
    #[arg(long)]
    pub no_abandon: bool,

    /// With --force, unlink revisions missing locally instead of abandoning them.
    #[arg(long)]
    pub no_abandon_unconnected: bool,

    /// Apply the plan without asking.
    #[arg(short, long)]
    pub yes: bool,

    /// Print the plan and stop.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

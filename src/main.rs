//! Phabstack: submit local commit stacks to Phabricator.
//!
//! This is the main entry point for the `phabstack` CLI. It parses arguments,
//! sets up logging and interrupt handling, dispatches to the appropriate
//! command handler, and handles errors with proper exit codes.

mod cancel;
mod cli;
mod commands;
pub mod conduit;
pub mod config;
pub mod diff;
pub mod error;
pub mod exit_codes;
pub mod git;
mod logging;
pub mod stack;
pub mod vcs;

#[cfg(test)]
mod test_support;

use cancel::CancelFlag;
use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);
    let cancel = CancelFlag::install();

    match commands::dispatch(cli.command, &cancel) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}

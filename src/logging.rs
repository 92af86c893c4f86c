//! Diagnostic logging.
//!
//! Logs go to stderr through `tracing`. `PHABSTACK_LOG` takes an
//! `EnvFilter` directive; without it the level is `info`, or `debug` with
//! `--verbose`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter directive.
pub const LOG_ENV: &str = "PHABSTACK_LOG";

/// Filter directive used when `PHABSTACK_LOG` is unset or invalid.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}

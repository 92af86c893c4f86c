//! Exit code constants for the phabstack CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, missing config, invalid local state)
//! - 2: Malformed input (diff/raw status parse error, non-linear stack)
//! - 3: VCS operation failure
//! - 4: Review system failure (API error, transport, upload)
//! - 70: Internal invariant violated
//! - 130: Interrupted by the user

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, missing configuration, or invalid local state.
pub const USER_ERROR: i32 = 1;

/// Parse failure or a remote/local stack that is not a linear chain.
pub const STRUCTURE_FAILURE: i32 = 2;

/// VCS process failure.
pub const VCS_FAILURE: i32 = 3;

/// Review system failure: Conduit error, transport error, or failed upload.
pub const REMOTE_FAILURE: i32 = 4;

/// Internal invariant violated (EX_SOFTWARE).
pub const INTERNAL_ERROR: i32 = 70;

/// Interrupted by SIGINT/SIGTERM.
pub const INTERRUPTED: i32 = 130;

//! Diff construction.
//!
//! Turns the raw per-path status of one commit into the review system's
//! diff representation:
//! - [`hunk`] parses and synthesises line-level hunks
//! - [`classify`] decides text versus binary and how much context to request
//! - [`builder`] assigns change kinds and assembles a [`Diff`]
//! - `upload` and `submit` push binary contents and the diff itself

pub mod builder;
pub mod change;
pub mod classify;
pub mod hunk;
mod submit;
mod upload;


pub use builder::{BuildOptions, Diff, DiffBuilder};
pub use change::{Change, ChangePayload, FileType, HunkPayload, Kind, Upload, UploadSlot};
pub use classify::{LESS_CONTEXT_LINES, binary_file_type, context_size, guess_mime, is_binary};
pub use hunk::{
    Hunk, HunkHeader, NO_NEWLINE_MARKER, added_hunk, build_hunks_from_unified_text, deleted_hunk,
    hunk_lines, newline_flags, parse_hunk_header, unchanged_hunk,
};
pub use submit::{CREATION_METHOD, SubmitContext};

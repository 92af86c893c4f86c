//! Version-control collaborator.
//!
//! The diff builder and the commands need the commits of the stack, the raw
//! per-path status of one commit, blob contents, a unified diff between two
//! blobs, and a way to reword a commit of the stack. [`Vcs`] is that
//! boundary; [`GitVcs`] implements it by shelling out to git.

mod commit;
mod git;
mod raw;

pub use commit::{Commit, parse_revision_id, short_node};
pub use git::GitVcs;
pub use raw::{ChangeStatus, NULL_BLOB, RawChange, parse_raw_records};

use crate::error::Result;

/// Operations the core consumes from a version-control system.
pub trait Vcs {
    /// Commits in `base..HEAD`, oldest first.
    fn commit_stack(&self, base: &str) -> Result<Vec<Commit>>;

    /// Raw per-path status records of one commit, in VCS order.
    fn raw_changes(&self, commit: &str) -> Result<Vec<RawChange>>;

    /// Exact bytes of a blob.
    fn blob(&self, id: &str) -> Result<Vec<u8>>;

    /// Unified diff text between two blobs with `context` lines of context.
    fn unified_diff(&self, old_blob: &str, new_blob: &str, context: usize) -> Result<String>;

    /// Replace the message of `commit`, an ancestor of HEAD.
    ///
    /// Commits between it and HEAD are recreated on top of the rewritten
    /// one with their trees unchanged, and HEAD moves to the new tip.
    /// Returns the new node of `commit`.
    fn amend_message(&self, commit: &Commit, message: &str) -> Result<String>;
}

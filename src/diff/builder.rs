//! Per-commit diff construction.
//!
//! [`DiffBuilder`] walks the raw status records of one commit, classifies
//! every path as text or binary, synthesises or parses its hunks and finally
//! assigns the change kind. The resulting [`Diff`] is ready to be uploaded
//! and submitted.

use super::change::{Change, ChangePayload, FileType, Kind};
use super::classify::{context_size, guess_mime, is_binary};
use super::hunk::{Hunk, added_hunk, build_hunks_from_unified_text, deleted_hunk, unchanged_hunk};
use crate::error::{PhabError, Result};
use crate::vcs::{ChangeStatus, RawChange, Vcs};
use std::collections::HashMap;
use tracing::debug;

/// All changes of one commit, keyed by current path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub changes: HashMap<String, Change>,
    /// Remote diff id, set by a successful submit.
    pub id: Option<u64>,
    /// Remote diff PHID, set by a successful submit.
    pub phid: Option<String>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the change for `path`.
    pub fn change_for(&mut self, path: &str) -> &mut Change {
        self.changes
            .entry(path.to_string())
            .or_insert_with(|| Change::new(path))
    }

    /// Changes ordered by current path, the order the review system expects.
    pub fn sorted_changes(&self) -> Vec<&Change> {
        let mut changes: Vec<&Change> = self.changes.values().collect();
        changes.sort_by(|a, b| a.cur_path.cmp(&b.cur_path));
        changes
    }

    /// Wire payload of every change, sorted by current path.
    pub fn payload(&self, commit_hash: &str) -> Vec<ChangePayload> {
        self.sorted_changes()
            .into_iter()
            .map(|change| change.to_payload(commit_hash))
            .collect()
    }

    /// Assign kind, modes, old path and away paths from one raw record.
    ///
    /// Renames and copies also touch the source path's change, which may
    /// already have been referenced by an earlier record of the same commit.
    pub fn set_change_kind(&mut self, record: &RawChange) -> Result<()> {
        match record.status {
            ChangeStatus::Added => {
                let change = self.change_for(&record.new_path);
                change.kind = Kind::Add;
                change.cur_mode = Some(record.new_mode.clone());
            }
            ChangeStatus::Deleted => {
                let change = self.change_for(&record.old_path);
                change.kind = Kind::Delete;
                change.old_mode = Some(record.old_mode.clone());
                change.old_path = Some(record.old_path.clone());
            }
            ChangeStatus::Modified => {
                if record.old_path != record.new_path {
                    return Err(PhabError::ParseError(format!(
                        "modification changes path from '{}' to '{}'",
                        record.old_path, record.new_path
                    )));
                }
                let change = self.change_for(&record.new_path);
                // A path that is also a copy source keeps its away kind:
                // `away_paths` is only non-empty for away kinds.
                if !is_away(change.kind) {
                    change.kind = Kind::Change;
                }
                record_modes(change, record);
                change.old_path = Some(record.old_path.clone());
            }
            ChangeStatus::Renamed | ChangeStatus::Copied => {
                let renamed = record.status == ChangeStatus::Renamed;

                let destination = self.change_for(&record.new_path);
                destination.kind = if renamed { Kind::MoveHere } else { Kind::CopyHere };
                record_modes(destination, record);
                destination.old_path = Some(record.old_path.clone());

                let source = self.change_for(&record.old_path);
                source.kind = match source.kind {
                    Kind::MoveAway | Kind::CopyAway | Kind::Multicopy => Kind::Multicopy,
                    _ if renamed => Kind::MoveAway,
                    _ => Kind::CopyAway,
                };
                source.away_paths.push(record.new_path.clone());
            }
        }
        Ok(())
    }
}

fn is_away(kind: Kind) -> bool {
    matches!(kind, Kind::MoveAway | Kind::CopyAway | Kind::Multicopy)
}

fn record_modes(change: &mut Change, record: &RawChange) {
    if record.old_mode != record.new_mode {
        change.old_mode = Some(record.old_mode.clone());
        change.cur_mode = Some(record.new_mode.clone());
    }
}

/// Size thresholds and context policy for building diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub max_text_size: usize,
    pub max_context_size: usize,
    pub less_context: bool,
}

/// Builds a [`Diff`] for one commit from a [`Vcs`].
pub struct DiffBuilder<'a, V: Vcs> {
    vcs: &'a V,
    options: BuildOptions,
}

impl<'a, V: Vcs> DiffBuilder<'a, V> {
    pub fn new(vcs: &'a V, options: BuildOptions) -> Self {
        Self { vcs, options }
    }

    /// Build the diff of `commit` against its parent.
    ///
    /// Records are processed in the order the VCS reports them.
    pub fn build(&self, commit: &str) -> Result<Diff> {
        let mut diff = Diff::new();
        for record in self.vcs.raw_changes(commit)? {
            self.apply_raw_change(&mut diff, &record)?;
        }
        debug!(commit, changes = diff.changes.len(), "built diff");
        Ok(diff)
    }

    fn apply_raw_change(&self, diff: &mut Diff, record: &RawChange) -> Result<()> {
        let old_body = self.read_blob(record.old_blob.as_deref())?;
        let new_body = self.read_blob(record.new_blob.as_deref())?;
        let path = match record.status {
            ChangeStatus::Deleted => &record.old_path,
            _ => &record.new_path,
        };

        if is_binary(&old_body, &new_body, self.options.max_text_size) {
            let old_mime = guess_mime(&record.old_path);
            let new_mime = guess_mime(&record.new_path);
            diff.change_for(path)
                .set_as_binary(old_body, old_mime, new_body, new_mime);
        } else {
            let hunks = self.text_hunks(record, &old_body, &new_body)?;
            let change = diff.change_for(path);
            change.file_type = FileType::Text;
            change.hunks = hunks;
        }

        diff.set_change_kind(record)
    }

    fn read_blob(&self, id: Option<&str>) -> Result<Vec<u8>> {
        match id {
            Some(id) => self.vcs.blob(id),
            None => Ok(Vec::new()),
        }
    }

    fn text_hunks(
        &self,
        record: &RawChange,
        old_body: &[u8],
        new_body: &[u8],
    ) -> Result<Vec<Hunk>> {
        // Both sides passed the binary check, so they are valid UTF-8.
        let old_text = String::from_utf8_lossy(old_body);
        let new_text = String::from_utf8_lossy(new_body);

        let hunk = match (record.old_blob.as_deref(), record.new_blob.as_deref()) {
            _ if old_body == new_body => unchanged_hunk(&new_text),
            (None, _) => added_hunk(&new_text),
            (_, None) => deleted_hunk(&old_text),
            (Some(old_blob), Some(new_blob)) => {
                let file_size = old_body.len().max(new_body.len());
                let context = context_size(
                    self.options.less_context,
                    file_size,
                    self.options.max_context_size,
                );
                let text = self.vcs.unified_diff(old_blob, new_blob, context)?;
                return build_hunks_from_unified_text(&text);
            }
        };

        Ok(hunk.into_iter().collect())
    }
}

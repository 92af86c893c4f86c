//! Git implementation of the [`Vcs`] collaborator.

use super::commit::{Commit, SHOW_FORMAT};
use super::raw::{RawChange, parse_raw_records};
use super::Vcs;
use crate::error::{PhabError, Result};
use crate::git::{run_git, run_git_bytes, run_git_env};
use std::path::{Path, PathBuf};

/// Git repository rooted at `root`.
#[derive(Debug, Clone)]
pub struct GitVcs {
    root: PathBuf,
}

impl GitVcs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn commit(&self, node: &str) -> Result<Commit> {
        let format = format!("--format={}", SHOW_FORMAT);
        let output = run_git_bytes(&self.root, &["show", "-s", &format, node])?;
        Commit::from_show_output(&String::from_utf8_lossy(&output))
    }

    /// Write a copy of `node` on top of `parent`, optionally with a new message.
    ///
    /// Tree and author (with the original timezone) are kept.
    fn recommit(&self, node: &str, parent: &str, message: Option<&str>) -> Result<String> {
        let format = format!("--format={}", RECOMMIT_FORMAT);
        let output = run_git_bytes(&self.root, &["show", "-s", "--date=raw", &format, node])?;
        let text = String::from_utf8_lossy(&output);
        let fields: Vec<&str> = text.splitn(5, '\0').collect();
        let &[tree, name, email, date, original] = fields.as_slice() else {
            return Err(PhabError::ParseError(format!(
                "unexpected commit record for {}",
                node
            )));
        };

        let message = message.unwrap_or(original).trim_end();
        let output = run_git_env(
            &self.root,
            &["commit-tree", tree, "-p", parent, "-m", message],
            &[
                ("GIT_AUTHOR_NAME", name),
                ("GIT_AUTHOR_EMAIL", email),
                ("GIT_AUTHOR_DATE", date),
            ],
        )?;
        Ok(output.stdout)
    }
}

/// Tree, author name, email, raw date and message, NUL separated.
const RECOMMIT_FORMAT: &str = "%T%x00%an%x00%ae%x00%ad%x00%B";

impl Vcs for GitVcs {
    fn commit_stack(&self, base: &str) -> Result<Vec<Commit>> {
        let range = format!("{}..HEAD", base);
        let output = run_git(&self.root, &["rev-list", "--reverse", "--topo-order", &range])?;

        if output.is_empty() {
            return Ok(Vec::new());
        }

        output.lines().into_iter().map(|node| self.commit(node)).collect()
    }

    fn raw_changes(&self, commit: &str) -> Result<Vec<RawChange>> {
        let output = run_git_bytes(
            &self.root,
            &[
                "diff-tree",
                "-r",
                "--root",
                "--raw",
                "-z",
                "-M",
                "-C",
                "--no-abbrev",
                "--no-commit-id",
                commit,
            ],
        )?;
        parse_raw_records(&String::from_utf8_lossy(&output))
    }

    fn blob(&self, id: &str) -> Result<Vec<u8>> {
        run_git_bytes(&self.root, &["cat-file", "blob", id])
    }

    fn unified_diff(&self, old_blob: &str, new_blob: &str, context: usize) -> Result<String> {
        let context = format!("-U{}", context);
        let output = run_git_bytes(
            &self.root,
            &[
                "diff",
                "--submodule=short",
                "--no-ext-diff",
                "--no-color",
                "--no-textconv",
                &context,
                old_blob,
                new_blob,
            ],
        )?;
        String::from_utf8(output)
            .map_err(|e| PhabError::ParseError(format!("diff output is not valid UTF-8: {}", e)))
    }

    fn amend_message(&self, commit: &Commit, message: &str) -> Result<String> {
        run_git(&self.root, &["merge-base", "--is-ancestor", &commit.node, "HEAD"]).map_err(
            |_| PhabError::VcsError(format!("{} is not an ancestor of HEAD", commit.name())),
        )?;

        let head = run_git(&self.root, &["rev-parse", "HEAD"])?.stdout;
        let range = format!("{}..HEAD", commit.node);
        let descendants = run_git(
            &self.root,
            &["rev-list", "--reverse", "--topo-order", "--ancestry-path", &range],
        )?;

        let amended = self.recommit(&commit.node, &commit.parent, Some(message))?;
        let mut tip = amended.clone();
        for node in descendants.lines() {
            tip = self.recommit(node, &tip, None)?;
        }

        // HEAD is symbolic on a branch, so the branch follows.
        run_git(
            &self.root,
            &["update-ref", "-m", "phabstack: record revision", "HEAD", &tip, &head],
        )?;
        Ok(amended)
    }
}

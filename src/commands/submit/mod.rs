//! Implementation of the `phabstack submit` command.
//!
//! Every commit of `{base}..HEAD` becomes one revision, oldest first.
//!
//! # Steps per commit
//!
//! 1. Build the diff against the commit's parent
//! 2. Upload binary file contents through the bounded upload pool
//! 3. Create the diff and attach the `local:commits` property
//! 4. Create the revision, or update the one named by the commit's
//!    `Differential Revision:` trailer
//!
//! A new revision that is not the first of the stack is made to depend on
//! the revision of the previous commit. Once the stack is submitted, every
//! commit that created a revision gets a `Differential Revision:` trailer so
//! the next run updates it instead of creating another one.

use super::Session;
use crate::cancel::CancelFlag;
use crate::cli::SubmitArgs;
use crate::conduit::{ConduitApi, LookupCache, Phabricator};
use crate::diff::{BuildOptions, DiffBuilder, SubmitContext};
use crate::error::{PhabError, Result};
use crate::stack::EditTransaction;
use crate::vcs::{Commit, Vcs};
use tracing::{debug, info};


/// Everything `submit_stack` needs besides the collaborators.
#[derive(Debug, Clone)]
pub(crate) struct SubmitOptions {
    pub build: BuildOptions,
    pub upload_workers: usize,
    pub context: SubmitContext,
    /// Base URL written into the revision trailers.
    pub phabricator_url: String,
}

/// Outcome for one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubmittedRevision {
    pub commit: String,
    pub id: u64,
    pub phid: String,
    pub created: bool,
}

/// Execute the `phabstack submit` command.
///
/// # Exit Codes
///
/// - 0: Success
/// - 1: User error (nothing to submit, missing configuration)
/// - 3: Git error
/// - 4: Phabricator rejected a call or an upload failed
/// - 130: Interrupted
pub fn cmd_submit(args: SubmitArgs, cancel: &CancelFlag) -> Result<()> {
    let session = Session::open()?;
    let base = session.base(args.base);

    let commits = session.vcs.commit_stack(&base)?;
    if commits.is_empty() {
        return Err(PhabError::UserError(format!(
            "no commits to submit between {} and HEAD",
            base
        )));
    }

    let options = SubmitOptions {
        build: session.config.build_options(args.less_context),
        upload_workers: session.config.upload_workers,
        context: SubmitContext {
            repository_phid: session.config.repository_phid.clone(),
            source_path: session.root.display().to_string(),
        },
        phabricator_url: session.config.require_url()?.to_string(),
    };

    println!("Submitting {} commit(s) on top of {}:", commits.len(), base);
    let submitted = submit_stack(&session.vcs, &session.phab, &commits, &options, cancel)?;

    for revision in &submitted {
        let action = if revision.created { "created" } else { "updated" };
        println!("  D{} {} ({})", revision.id, action, revision.commit);
    }

    Ok(())
}

/// Submit `commits` (oldest first) one by one, then record the new
/// revisions in their commit messages.
///
/// Stops at the first failure; revisions already created stay and their
/// commits are still amended.
pub(crate) fn submit_stack<V: Vcs, C: ConduitApi, K: LookupCache>(
    vcs: &V,
    phab: &Phabricator<C, K>,
    commits: &[Commit],
    options: &SubmitOptions,
    cancel: &CancelFlag,
) -> Result<Vec<SubmittedRevision>> {
    let mut submitted: Vec<SubmittedRevision> = Vec::with_capacity(commits.len());
    let outcome = submit_each(vcs, phab, commits, options, cancel, &mut submitted);
    record_revisions(vcs, commits, &submitted, &options.phabricator_url)?;
    outcome?;
    Ok(submitted)
}

fn submit_each<V: Vcs, C: ConduitApi, K: LookupCache>(
    vcs: &V,
    phab: &Phabricator<C, K>,
    commits: &[Commit],
    options: &SubmitOptions,
    cancel: &CancelFlag,
    submitted: &mut Vec<SubmittedRevision>,
) -> Result<()> {
    let builder = DiffBuilder::new(vcs, options.build);

    for commit in commits {
        cancel.check()?;

        let mut diff = builder.build(&commit.node)?;
        diff.upload_files(phab, options.upload_workers, cancel)?;
        let created = diff.submit(phab, commit, &commit.message(), &options.context)?;

        let parent = submitted.last().map(|previous| previous.phid.as_str());
        let transactions = revision_transactions(commit, &created.phid, parent);
        let identifier = commit.rev_id.map(|id| format!("D{}", id));
        let handle = phab.edit_revision(identifier.as_deref(), &transactions)?;

        info!(
            commit = %commit.name(),
            revision = handle.id,
            diff = created.id,
            "submitted"
        );
        submitted.push(SubmittedRevision {
            commit: commit.name(),
            id: handle.id,
            phid: handle.phid,
            created: commit.rev_id.is_none(),
        });
    }

    Ok(())
}

/// Add the revision trailer to every commit that created a revision.
///
/// Newest first: rewording a commit recreates its descendants, so the
/// nodes of older commits stay valid.
fn record_revisions<V: Vcs>(
    vcs: &V,
    commits: &[Commit],
    submitted: &[SubmittedRevision],
    url: &str,
) -> Result<()> {
    let created: Vec<(&Commit, &SubmittedRevision)> = commits
        .iter()
        .zip(submitted)
        .filter(|(_, revision)| revision.created)
        .collect();

    for (commit, revision) in created.into_iter().rev() {
        let message = amend_revision_url(&commit.message(), url, revision.id);
        let node = vcs.amend_message(commit, &message)?;
        debug!(commit = %commit.name(), revision = revision.id, node = %node, "trailer recorded");
    }
    Ok(())
}

/// `message` with a `Differential Revision: {url}/D{id}` trailer appended.
pub(crate) fn amend_revision_url(message: &str, url: &str, id: u64) -> String {
    format!(
        "{}\n\nDifferential Revision: {}/D{}",
        message.trim_end(),
        url.trim_end_matches('/'),
        id
    )
}

/// Transactions attaching `diff_phid` to the commit's revision.
///
/// `parent` is only used when the revision is new; existing revisions keep
/// their dependencies, those are managed by `reorg`.
pub(crate) fn revision_transactions(
    commit: &Commit,
    diff_phid: &str,
    parent: Option<&str>,
) -> Vec<EditTransaction> {
    let mut transactions = vec![
        EditTransaction::Update(diff_phid.to_string()),
        EditTransaction::Title(commit.title.clone()),
        EditTransaction::Summary(summary(commit)),
    ];
    if commit.rev_id.is_none()
        && let Some(parent) = parent
    {
        transactions.push(EditTransaction::ParentsSet(vec![parent.to_string()]));
    }
    transactions
}

/// Commit body without the `Differential Revision:` trailer.
fn summary(commit: &Commit) -> String {
    commit
        .body
        .lines()
        .filter(|line| !line.trim_start().starts_with("Differential Revision:"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

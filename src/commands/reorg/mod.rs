//! Implementation of the `phabstack reorg` command.
//!
//! Makes the remote revision dependencies match the local commit order.
//!
//! # Steps
//!
//! 1. Require every local commit to name its revision
//! 2. Load the revisions and merge their stack graphs
//! 3. Load every revision the graph mentions and linearise the graph
//! 4. Compute the edits (strict or force mode)
//! 5. Print the plan, confirm, and apply the edits one revision at a time

mod plan;


use super::Session;
use crate::cancel::CancelFlag;
use crate::cli::ReorgArgs;
use crate::conduit::{ConduitApi, LookupCache, Phabricator, Revision};
use crate::error::{PhabError, Result};
use crate::stack::{
    RevisionEdit, convert_stackgraph_to_linear, force_stack_transactions, remote_stack_order,
    stack_transactions,
};
use crate::vcs::{Commit, Vcs};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use tracing::{info, warn};

use plan::{describe_plan, glossary};

/// Reconciliation switches of one run.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReorgOptions {
    pub force: bool,
    pub no_abandon: bool,
    pub no_abandon_unconnected: bool,
}

impl From<&ReorgArgs> for ReorgOptions {
    fn from(args: &ReorgArgs) -> Self {
        Self {
            force: args.force,
            no_abandon: args.no_abandon,
            no_abandon_unconnected: args.no_abandon_unconnected,
        }
    }
}

impl ReorgOptions {
    fn validate(&self) -> Result<()> {
        if self.no_abandon_unconnected && !self.force {
            return Err(PhabError::UserError(
                "--no-abandon-unconnected can only be used with --force".to_string(),
            ));
        }
        Ok(())
    }
}

/// Edits to apply plus the revisions they refer to.
#[derive(Debug, Default)]
pub(crate) struct ReorgPlan {
    pub edits: Vec<RevisionEdit>,
    /// Every revision loaded while planning, by PHID.
    pub revisions: HashMap<String, Revision>,
    pub force: bool,
}

impl ReorgPlan {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Execute the `phabstack reorg` command.
///
/// # Exit Codes
///
/// - 0: Success, nothing to do, or dry run
/// - 1: User error (bad flags, unsubmitted commits, declined confirmation)
/// - 2: Remote stack is not linear
/// - 4: Phabricator rejected a call
/// - 70: Reconciliation produced an inconsistent stack
/// - 130: Interrupted
pub fn cmd_reorg(args: ReorgArgs, cancel: &CancelFlag) -> Result<()> {
    let options = ReorgOptions::from(&args);
    options.validate()?;

    let session = Session::open()?;
    let base = session.base(args.base);
    let commits = session.vcs.commit_stack(&base)?;
    if commits.is_empty() {
        return Err(PhabError::UserError(format!(
            "no commits to reorganise between {} and HEAD",
            base
        )));
    }

    println!("Reorganisation based on {} commit(s):", commits.len());
    let plan = plan_reorg(&session.phab, &commits, options).inspect_err(|e| {
        if !options.force && matches!(e, PhabError::StructuralError(_)) {
            warn!("Reorganisation failed. --force skips the remote stack checks.");
        }
    })?;

    if plan.is_empty() {
        println!("Reorganisation is not needed.");
        return Ok(());
    }

    if plan.force {
        println!("Stack will be forcibly synchronized:");
    } else {
        println!("Stack will be reorganised:");
    }
    for line in describe_plan(&plan.edits, &plan.revisions, plan.force) {
        println!(" * {}", line);
    }
    println!();
    println!("Referenced revisions:");
    for line in glossary(&plan.edits, &plan.revisions) {
        println!(" * {}", line);
    }

    if args.dry_run {
        return Ok(());
    }
    if !args.yes && !confirm("Perform reorganisation?") {
        return Err(PhabError::UserError("Reorganisation cancelled.".to_string()));
    }

    let applied = apply_plan(&session.phab, &plan, cancel)?;
    info!(revisions = applied, "stack reorganised");
    println!("Stack has been reorganised.");
    Ok(())
}

/// Compute the edits turning the remote stack into the order of `commits`.
///
/// # Errors
///
/// * `UserError` - a commit has no revision, or no revision is found remotely
/// * `StructuralError` - the remote graph is not a linear chain (strict
///   mode, or a parent with two children in any mode)
/// * `InvariantViolation` - strict reconciliation is inconsistent
pub(crate) fn plan_reorg<C: ConduitApi, K: LookupCache>(
    phab: &Phabricator<C, K>,
    commits: &[Commit],
    options: ReorgOptions,
) -> Result<ReorgPlan> {
    options.validate()?;
    let local_ids = revision_ids(commits, options.force)?;

    let revisions = phab.search_revisions_by_ids(&local_ids)?;
    if revisions.is_empty() {
        return Err(PhabError::UserError(
            "Could not find revisions on Phabricator.".to_string(),
        ));
    }

    let mut stack_graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for revision in &revisions {
        stack_graph.extend(revision.stack_graph.clone());
    }

    let graph_phids: Vec<String> = stack_graph.keys().cloned().collect();
    let mut loaded: HashMap<String, Revision> = revisions
        .into_iter()
        .map(|revision| (revision.phid.clone(), revision))
        .collect();
    if !graph_phids.is_empty() {
        for revision in phab.search_revisions_by_phids(&graph_phids)? {
            loaded.insert(revision.phid.clone(), revision);
        }
    }

    let names: HashMap<String, u64> = loaded
        .values()
        .map(|revision| (revision.phid.clone(), revision.id))
        .collect();
    let linear = convert_stackgraph_to_linear(&stack_graph, &names)?;
    let remote = remote_stack_order(&linear, options.force)?;
    let local = phab.ids_to_phids(&local_ids)?;
    let abandoned: HashSet<String> = loaded
        .values()
        .filter(|revision| revision.is_abandoned())
        .map(|revision| revision.phid.clone())
        .collect();

    let edits = if options.force {
        force_stack_transactions(&remote, &local, &abandoned, options.no_abandon_unconnected)
    } else {
        stack_transactions(&remote, &local, &abandoned, options.no_abandon)?
    };

    Ok(ReorgPlan {
        edits,
        revisions: loaded,
        force: options.force,
    })
}

/// Apply the plan one revision at a time, returning how many were edited.
///
/// The cancel flag is checked before every call; edits already applied stay.
pub(crate) fn apply_plan<C: ConduitApi, K: LookupCache>(
    phab: &Phabricator<C, K>,
    plan: &ReorgPlan,
    cancel: &CancelFlag,
) -> Result<usize> {
    for edit in &plan.edits {
        cancel.check()?;
        phab.apply_transactions(edit)?;
    }
    Ok(plan.edits.len())
}

fn revision_ids(commits: &[Commit], force: bool) -> Result<Vec<u64>> {
    let missing: Vec<String> = commits
        .iter()
        .filter(|commit| commit.rev_id.is_none())
        .map(Commit::name)
        .collect();

    if missing.is_empty() {
        return Ok(commits.iter().filter_map(|commit| commit.rev_id).collect());
    }
    if force {
        return Err(PhabError::UserError(
            "Force mode requires all local revisions to be present on Phabricator.".to_string(),
        ));
    }

    let (plural, them) = if missing.len() > 1 { ("s", "them") } else { ("", "it") };
    Err(PhabError::UserError(format!(
        "Found new commit{} in the local stack: {}.\n\
         Please submit {} separately and call `phabstack reorg` again.",
        plural,
        missing.join(", "),
        them
    )))
}

/// Ask on stdin; anything but an answer starting with `y` declines.
fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    let _ = std::io::stdout().flush();

    let mut buffer = String::new();
    if std::io::stdin().read_line(&mut buffer).is_err() {
        return false;
    }
    buffer
        .trim()
        .chars()
        .next()
        .is_some_and(|first| first.eq_ignore_ascii_case(&'y'))
}

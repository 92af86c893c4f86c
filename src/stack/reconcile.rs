//! Reconciliation of a remote revision stack with the local one.

use super::llist::{LinkedStack, to_linked_list, walk_or_empty};
use super::transaction::{EditTransaction, RevisionEdit};
use crate::error::{PhabError, Result};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Transactions grouped per revision, in first-mention order.
#[derive(Debug, Default)]
struct EditPlan {
    order: Vec<String>,
    edits: HashMap<String, Vec<EditTransaction>>,
}

impl EditPlan {
    fn new<'a>(revisions: impl IntoIterator<Item = &'a String>) -> Self {
        let mut plan = Self::default();
        for revision in revisions {
            if !plan.edits.contains_key(revision) {
                plan.order.push(revision.clone());
                plan.edits.insert(revision.clone(), Vec::new());
            }
        }
        plan
    }

    fn push(&mut self, revision: &str, transaction: EditTransaction) {
        if !self.edits.contains_key(revision) {
            self.order.push(revision.to_string());
        }
        self.edits
            .entry(revision.to_string())
            .or_default()
            .push(transaction);
    }

    /// Non-empty edits in plan order.
    fn into_edits(mut self) -> Vec<RevisionEdit> {
        self.order
            .into_iter()
            .filter_map(|revision| {
                let transactions = self.edits.remove(&revision)?;
                (!transactions.is_empty()).then_some(RevisionEdit {
                    revision,
                    transactions,
                })
            })
            .collect()
    }
}

fn child_of(list: &LinkedStack, revision: &str) -> Option<String> {
    list.get(revision).cloned().flatten()
}

/// `children.set` to the local child, or `children.remove` of a remote child
/// the local stack no longer has.
fn remove_or_set_child(
    local: &LinkedStack,
    remote: &LinkedStack,
    revision: &str,
) -> Option<EditTransaction> {
    if let Some(child) = child_of(local, revision) {
        return Some(EditTransaction::ChildrenSet(vec![child]));
    }
    child_of(remote, revision).map(|child| EditTransaction::ChildrenRemove(vec![child]))
}

// Keeps the working view consistent while it is being edited.
fn rewalk(list: &LinkedStack) -> Result<()> {
    walk_or_empty(list, true)?;
    Ok(())
}

/// Transactions turning the `remote` stack into the `local` one.
///
/// Both stacks are ordered oldest first. Remote revisions missing locally are
/// detached and abandoned unless they are in `abandoned` or `no_abandon` is
/// set. Revisions without any transaction are left out.
///
/// # Errors
///
/// * `StructuralError` - an intermediate view has no head or loops
/// * `InvariantViolation` - the edited remote view does not end up in the
///   local order
pub fn stack_transactions(
    remote: &[String],
    local: &[String],
    abandoned: &HashSet<String>,
    no_abandon: bool,
) -> Result<Vec<RevisionEdit>> {
    let mut remote_list = to_linked_list(remote);
    let local_list = to_linked_list(local);
    let mut plan = EditPlan::new(remote.iter().chain(local));

    let local_set: HashSet<&String> = local.iter().collect();
    let remote_set: HashSet<&String> = remote.iter().collect();
    let missing_locally: Vec<&String> = remote.iter().filter(|r| !local_set.contains(r)).collect();

    // Detach revisions that are gone locally.
    for &revision in &missing_locally {
        if let Some(child) = child_of(&remote_list, revision) {
            plan.push(revision, EditTransaction::ChildrenRemove(vec![child]));
        }
        remote_list.insert(revision.clone(), None);
        rewalk(&remote_list)?;
    }

    // Link revisions that are new to the remote stack.
    for revision in local.iter().filter(|r| !remote_set.contains(r)) {
        if let Some(transaction) = remove_or_set_child(&local_list, &remote_list, revision) {
            plan.push(revision, transaction);
        }
        remote_list.insert(revision.clone(), child_of(&local_list, revision));
        rewalk(&remote_list)?;
    }

    // Relink revisions whose child changed.
    for revision in remote.iter().filter(|r| local_set.contains(r)) {
        let child = child_of(&local_list, revision);
        if child == child_of(&remote_list, revision) {
            continue;
        }
        if let Some(transaction) = remove_or_set_child(&local_list, &remote_list, revision) {
            plan.push(revision, transaction);
        }
        remote_list.insert(revision.clone(), child);
        rewalk(&remote_list)?;
    }

    for &revision in &missing_locally {
        if no_abandon {
            debug!(revision = %revision, "not abandoning, abandoning is disabled");
        } else if !abandoned.contains(revision) {
            plan.push(revision, EditTransaction::Abandon(true));
        }
        remote_list.remove(revision);
        rewalk(&remote_list)?;
    }

    let remote_order = walk_or_empty(&remote_list, false)?;
    let local_order = walk_or_empty(&local_list, false)?;
    if remote_order != local_order {
        return Err(PhabError::InvariantViolation(format!(
            "remote stack {} does not match local stack {}",
            remote_order.join(":"),
            local_order.join(":")
        )));
    }

    Ok(plan.into_edits())
}

/// Transactions forcing the remote stack into the `local` order.
///
/// Nothing is reused: every local revision gets `children.set` to its
/// successor, or to nothing for the last one. Remote revisions missing
/// locally are abandoned unless already in `abandoned`. With
/// `no_abandon_unconnected` they are instead only unlinked from their
/// children and stay open.
pub fn force_stack_transactions(
    remote: &[String],
    local: &[String],
    abandoned: &HashSet<String>,
    no_abandon_unconnected: bool,
) -> Vec<RevisionEdit> {
    let local_list = to_linked_list(local);
    let local_set: HashSet<&String> = local.iter().collect();
    let mut plan = EditPlan::new(remote.iter().chain(local));

    for revision in remote.iter().filter(|r| !local_set.contains(r)) {
        if no_abandon_unconnected {
            plan.push(revision, EditTransaction::ChildrenSet(Vec::new()));
        } else if !abandoned.contains(revision) {
            plan.push(revision, EditTransaction::Abandon(true));
        }
    }

    for revision in local {
        let children = child_of(&local_list, revision).into_iter().collect();
        plan.push(revision, EditTransaction::ChildrenSet(children));
    }

    plan.into_edits()
}

/// Canonical order of the remote stack.
///
/// In force mode a non-linear remote stack is tolerated: the problem is
/// logged and the revisions are taken in key order.
pub fn remote_stack_order(list: &LinkedStack, force: bool) -> Result<Vec<String>> {
    match walk_or_empty(list, false) {
        Ok(order) => Ok(order),
        Err(e) if force => {
            warn!("Remote stack is not linear ({}), continuing in force mode.", e);
            Ok(list.keys().cloned().collect())
        }
        Err(e) => Err(e.into()),
    }
}


//! Human-readable rendering of a reorganisation plan.

use crate::conduit::Revision;
use crate::stack::{EditTransaction, RevisionEdit};
use std::collections::{BTreeSet, HashMap};

/// One line per dependency change, in plan order.
///
/// A revision that gets abandoned is only reported as abandoned. PHIDs
/// without a known revision are skipped.
pub(crate) fn describe_plan(
    edits: &[RevisionEdit],
    revisions: &HashMap<String, Revision>,
    force: bool,
) -> Vec<String> {
    let name = |phid: &str| revisions.get(phid).map(Revision::name);
    let mut lines = Vec::new();

    for edit in edits {
        let Some(node) = name(edit.revision.as_str()) else {
            continue;
        };
        if edit.is_abandon() {
            lines.push(format!("{} will be abandoned", node));
            continue;
        }

        for transaction in &edit.transactions {
            match transaction {
                EditTransaction::ChildrenSet(children) => {
                    match children.first().and_then(|child| name(child.as_str())) {
                        Some(child) => lines.push(format!("{} will depend on {}", child, node)),
                        None if force => {
                            lines.push(format!("{} will have all dependencies removed", node))
                        }
                        None => {}
                    }
                }
                EditTransaction::ChildrenRemove(children) => {
                    if let Some(child) = children.first().and_then(|child| name(child.as_str())) {
                        lines.push(format!("{} will no longer depend on {}", child, node));
                    }
                }
                _ => {}
            }
        }
    }

    lines
}

/// `D<id>: title` for every revision the plan touches or points at, by id.
pub(crate) fn glossary(edits: &[RevisionEdit], revisions: &HashMap<String, Revision>) -> Vec<String> {
    let mut referenced: BTreeSet<(u64, &str)> = BTreeSet::new();
    let mut reference = |phid: &str| {
        if let Some(revision) = revisions.get(phid) {
            referenced.insert((revision.id, revision.title.as_str()));
        }
    };

    for edit in edits {
        reference(edit.revision.as_str());
        for transaction in &edit.transactions {
            if let EditTransaction::ChildrenSet(children) | EditTransaction::ChildrenRemove(children) =
                transaction
            {
                children.iter().for_each(|child| reference(child.as_str()));
            }
        }
    }

    referenced
        .into_iter()
        .map(|(id, title)| format!("D{}: {}", id, title))
        .collect()
}

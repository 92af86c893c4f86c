//! Linked-list view of a revision stack.
//!
//! A stack is stored as a map from each revision to its single child, with
//! `None` marking the tail. Keys are kept sorted so head selection is
//! deterministic.

use crate::error::StackError;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Revision identifier to its child, `None` for the tail.
pub type LinkedStack = BTreeMap<String, Option<String>>;

/// Build a linked list from revisions ordered oldest first.
pub fn to_linked_list<S: AsRef<str>>(ids: &[S]) -> LinkedStack {
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let child = ids.get(i + 1).map(|next| next.as_ref().to_string());
            (id.as_ref().to_string(), child)
        })
        .collect()
}

/// Canonical order of a linked list, head first.
///
/// The head is the smallest key nobody references as a child. With
/// `allow_multiple_heads` the first head wins and the other chains are
/// ignored; this is only meant for lists that are being edited. A child
/// without an entry of its own ends the walk and is included.
///
/// # Errors
///
/// * [`StackError::NoHead`] - every key is someone's child, or the list is empty
/// * [`StackError::MultipleHeads`] - more than one head and not allowed
/// * [`StackError::DependencyLoop`] - the walk reaches a node twice
pub fn walk(list: &LinkedStack, allow_multiple_heads: bool) -> Result<Vec<String>, StackError> {
    let referenced: HashSet<&str> = list.values().flatten().map(String::as_str).collect();
    let mut heads = list.keys().filter(|key| !referenced.contains(key.as_str()));

    let head = heads.next().ok_or(StackError::NoHead)?;
    if !allow_multiple_heads && heads.next().is_some() {
        return Err(StackError::MultipleHeads);
    }

    let mut nodes = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = Some(head.as_str());
    while let Some(node) = current {
        nodes.push(node.to_string());
        visited.insert(node);

        let child = list.get(node).and_then(|child| child.as_deref());
        if child.is_some_and(|child| visited.contains(child)) {
            return Err(StackError::DependencyLoop);
        }
        current = child;
    }

    Ok(nodes)
}

/// Like [`walk`], but an empty list walks to an empty order.
pub fn walk_or_empty(list: &LinkedStack, allow_multiple_heads: bool) -> Result<Vec<String>, StackError> {
    if list.is_empty() {
        Ok(Vec::new())
    } else {
        walk(list, allow_multiple_heads)
    }
}

/// Turn a remote stack graph (revision to its parents) into a linked list.
///
/// `names` maps PHIDs to numeric ids for error messages. Revisions that only
/// appear as children become tails. A graph without any edge yields an empty
/// list.
///
/// # Errors
///
/// [`StackError::MultipleChildren`] when a revision is the parent of two
/// others.
pub fn convert_stackgraph_to_linear(
    stack_graph: &BTreeMap<String, Vec<String>>,
    names: &HashMap<String, u64>,
) -> Result<LinkedStack, StackError> {
    let mut linear = LinkedStack::new();

    for (child, parents) in stack_graph {
        for parent in parents {
            if linear.contains_key(parent) {
                let name = match names.get(parent) {
                    Some(id) => format!("D{}", id),
                    None => parent.clone(),
                };
                return Err(StackError::MultipleChildren(name));
            }
            linear.insert(parent.clone(), Some(child.clone()));
        }
    }

    let tails: Vec<String> = linear
        .values()
        .flatten()
        .filter(|child| !linear.contains_key(child.as_str()))
        .cloned()
        .collect();
    for tail in tails {
        linear.insert(tail, None);
    }

    Ok(linear)
}

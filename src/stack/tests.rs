//! Tests for the stack walker and reconciliation.

use super::*;
use crate::error::{PhabError, StackError};
use std::collections::{BTreeMap, HashMap, HashSet};

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|id| id.to_string()).collect()
}

fn llist(entries: &[(&str, Option<&str>)]) -> LinkedStack {
    entries
        .iter()
        .map(|(id, child)| (id.to_string(), child.map(str::to_string)))
        .collect()
}

fn set(list: &[&str]) -> HashSet<String> {
    list.iter().map(|id| id.to_string()).collect()
}

fn plan(edits: &[RevisionEdit]) -> Vec<(&str, Vec<EditTransaction>)> {
    edits
        .iter()
        .map(|edit| (edit.revision.as_str(), edit.transactions.clone()))
        .collect()
}

fn children_set(list: &[&str]) -> EditTransaction {
    EditTransaction::ChildrenSet(ids(list))
}

fn children_remove(list: &[&str]) -> EditTransaction {
    EditTransaction::ChildrenRemove(ids(list))
}

const ABANDON: EditTransaction = EditTransaction::Abandon(true);

// ---- Walker ----

#[test]
fn test_walk_simple_chain() {
    let list = llist(&[("a", Some("b")), ("b", None)]);
    assert_eq!(walk(&list, false).unwrap(), vec!["a", "b"]);
}

#[test]
fn test_walk_detects_dependency_loop() {
    let list = llist(&[("a", Some("b")), ("b", Some("c")), ("c", Some("b"))]);
    assert_eq!(walk(&list, false), Err(StackError::DependencyLoop));
}

#[test]
fn test_walk_detects_multiple_heads() {
    let list = llist(&[("a", Some("b")), ("c", None)]);
    assert_eq!(walk(&list, false), Err(StackError::MultipleHeads));
}

#[test]
fn test_walk_multiple_heads_allowed_takes_first_chain() {
    let list = llist(&[("a", Some("b")), ("c", None)]);
    // "b" has no entry of its own but is still part of the chain.
    assert_eq!(walk(&list, true).unwrap(), vec!["a", "b"]);
}

#[test]
fn test_walk_empty_has_no_head() {
    assert_eq!(walk(&LinkedStack::new(), false), Err(StackError::NoHead));
    assert_eq!(walk_or_empty(&LinkedStack::new(), false).unwrap(), Vec::<String>::new());
}

#[test]
fn test_walk_full_cycle_has_no_head() {
    let list = llist(&[("a", Some("b")), ("b", Some("a"))]);
    assert_eq!(walk(&list, true), Err(StackError::NoHead));
}

#[test]
fn test_linked_list_round_trips_through_walk() {
    let order = ids(&["zeta", "alpha", "mid"]);
    let list = to_linked_list(&order);

    assert_eq!(list["zeta"].as_deref(), Some("alpha"));
    assert_eq!(list["mid"], None);
    assert_eq!(walk(&list, false).unwrap(), order);
    assert!(to_linked_list::<String>(&[]).is_empty());
}

// ---- Stack graph linearisation ----

#[test]
fn test_convert_stackgraph_to_linear() {
    let graph: BTreeMap<String, Vec<String>> = BTreeMap::from([
        ("P1".to_string(), vec![]),
        ("P2".to_string(), ids(&["P1"])),
        ("P3".to_string(), ids(&["P2"])),
    ]);

    let linear = convert_stackgraph_to_linear(&graph, &HashMap::new()).unwrap();

    assert_eq!(
        linear,
        llist(&[("P1", Some("P2")), ("P2", Some("P3")), ("P3", None)])
    );
    assert_eq!(walk(&linear, false).unwrap(), vec!["P1", "P2", "P3"]);
}

#[test]
fn test_convert_stackgraph_rejects_branching() {
    let graph: BTreeMap<String, Vec<String>> = BTreeMap::from([
        ("P2".to_string(), ids(&["P1"])),
        ("P3".to_string(), ids(&["P1"])),
    ]);
    let names = HashMap::from([("P1".to_string(), 1u64)]);

    assert_eq!(
        convert_stackgraph_to_linear(&graph, &names),
        Err(StackError::MultipleChildren("D1".to_string()))
    );
}

#[test]
fn test_convert_stackgraph_single_revision_is_empty() {
    let graph = BTreeMap::from([("P1".to_string(), Vec::new())]);
    assert!(convert_stackgraph_to_linear(&graph, &HashMap::new()).unwrap().is_empty());
}

#[test]
fn test_remote_stack_order_tolerates_branching_only_in_force_mode() {
    let list = llist(&[("a", Some("b")), ("c", None)]);

    assert_eq!(remote_stack_order(&list, true).unwrap(), vec!["a", "c"]);
    assert!(matches!(
        remote_stack_order(&list, false),
        Err(PhabError::StructuralError(StackError::MultipleHeads))
    ));
    assert!(remote_stack_order(&LinkedStack::new(), false).unwrap().is_empty());
}

// ---- Strict reconciliation ----

#[test]
fn test_same_stack_needs_no_transactions() {
    for stack in [ids(&["A"]), ids(&["A", "B"]), ids(&["A", "B", "C", "D"])] {
        let edits = stack_transactions(&stack, &stack, &HashSet::new(), false).unwrap();
        assert!(edits.is_empty(), "unexpected edits for {:?}: {:?}", stack, edits);
    }
}

#[test]
fn test_dropping_tail_detaches_and_abandons() {
    let edits = stack_transactions(&ids(&["A", "B", "C"]), &ids(&["A"]), &HashSet::new(), false).unwrap();

    assert_eq!(
        plan(&edits),
        vec![
            ("A", vec![children_remove(&["B"])]),
            ("B", vec![children_remove(&["C"]), ABANDON]),
            ("C", vec![ABANDON]),
        ]
    );
}

#[test]
fn test_reorder_two_revisions() {
    let edits = stack_transactions(&ids(&["A", "B"]), &ids(&["B", "A"]), &HashSet::new(), false).unwrap();

    assert_eq!(
        plan(&edits),
        vec![
            ("A", vec![children_remove(&["B"])]),
            ("B", vec![children_set(&["A"])]),
        ]
    );
}

#[test]
fn test_removed_middle_revision_is_abandoned_and_neighbours_relinked() {
    let edits = stack_transactions(&ids(&["A", "B", "C"]), &ids(&["A", "C"]), &HashSet::new(), false).unwrap();

    assert_eq!(
        plan(&edits),
        vec![
            ("A", vec![children_set(&["C"])]),
            ("B", vec![children_remove(&["C"]), ABANDON]),
        ]
    );
}

#[test]
fn test_inserted_revision_is_linked_in() {
    let edits = stack_transactions(&ids(&["A", "C"]), &ids(&["A", "B", "C"]), &HashSet::new(), false).unwrap();

    assert_eq!(
        plan(&edits),
        vec![
            ("A", vec![children_set(&["B"])]),
            ("B", vec![children_set(&["C"])]),
        ]
    );
}

#[test]
fn test_appended_revision() {
    let edits = stack_transactions(&ids(&["A"]), &ids(&["A", "N"]), &HashSet::new(), false).unwrap();
    assert_eq!(plan(&edits), vec![("A", vec![children_set(&["N"])])]);
}

#[test]
fn test_empty_remote_stack() {
    let edits = stack_transactions(&[], &ids(&["A", "B"]), &HashSet::new(), false).unwrap();
    assert_eq!(plan(&edits), vec![("A", vec![children_set(&["B"])])]);
}

#[test]
fn test_empty_local_stack_abandons_everything() {
    let edits = stack_transactions(&ids(&["A", "B"]), &[], &HashSet::new(), false).unwrap();

    assert_eq!(
        plan(&edits),
        vec![
            ("A", vec![children_remove(&["B"]), ABANDON]),
            ("B", vec![ABANDON]),
        ]
    );
}

#[test]
fn test_already_abandoned_revision_is_not_abandoned_again() {
    let edits = stack_transactions(&ids(&["A", "B"]), &ids(&["A"]), &set(&["B"]), false).unwrap();
    assert_eq!(plan(&edits), vec![("A", vec![children_remove(&["B"])])]);
}

#[test]
fn test_no_abandon_suppresses_abandon() {
    let edits = stack_transactions(&ids(&["A", "B", "C"]), &ids(&["A"]), &HashSet::new(), true).unwrap();

    assert!(edits.iter().all(|edit| !edit.is_abandon()));
    assert_eq!(
        plan(&edits),
        vec![
            ("A", vec![children_remove(&["B"])]),
            ("B", vec![children_remove(&["C"])]),
        ]
    );
}

#[test]
fn test_strict_mode_rejects_looping_remote_view() {
    // A duplicated remote entry folds into a loop once relinked.
    let result = stack_transactions(&ids(&["A", "B", "A"]), &ids(&["A", "B"]), &HashSet::new(), false);
    assert!(matches!(result, Err(PhabError::StructuralError(StackError::NoHead))));
}

// ---- Force reconciliation ----

#[test]
fn test_force_abandons_everything_missing_locally() {
    let edits = force_stack_transactions(&ids(&["A", "B"]), &[], &HashSet::new(), false);
    assert_eq!(plan(&edits), vec![("A", vec![ABANDON]), ("B", vec![ABANDON])]);
}

#[test]
fn test_force_no_abandon_unconnected_only_unlinks() {
    let edits = force_stack_transactions(&ids(&["A", "B"]), &[], &HashSet::new(), true);

    assert!(edits.iter().all(|edit| !edit.is_abandon()));
    assert_eq!(
        plan(&edits),
        vec![("A", vec![children_set(&[])]), ("B", vec![children_set(&[])])]
    );
}

#[test]
fn test_force_relinks_every_local_revision() {
    let edits = force_stack_transactions(&ids(&["A", "B", "C"]), &ids(&["C", "A"]), &set(&["B"]), false);

    assert_eq!(
        plan(&edits),
        vec![
            ("A", vec![children_set(&[])]),
            ("C", vec![children_set(&["A"])]),
        ]
    );
}

#[test]
fn test_force_with_identical_stacks_still_sets_children() {
    let stack = ids(&["A", "B"]);
    let edits = force_stack_transactions(&stack, &stack, &HashSet::new(), false);

    assert_eq!(
        plan(&edits),
        vec![("A", vec![children_set(&["B"])]), ("B", vec![children_set(&[])])]
    );
}

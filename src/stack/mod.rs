//! Stack model and reconciliation.
//!
//! [`llist`] holds the linked-list representation of a revision chain and
//! its walker. [`reconcile`] diffs the remote chain against the local one and
//! produces the `differential.revision.edit` transactions that make them
//! match, either incrementally (strict) or from scratch (force).

pub mod llist;
pub mod reconcile;
pub mod transaction;

#[cfg(test)]
mod tests;

pub use llist::{LinkedStack, convert_stackgraph_to_linear, to_linked_list, walk, walk_or_empty};
pub use reconcile::{force_stack_transactions, remote_stack_order, stack_transactions};
pub use transaction::{EditTransaction, RevisionEdit};

//! Partial-aggregate plumbing: combinator names, the state rewrite, the merge
//! wrapper and the mergeable in-memory state.

pub mod function;
pub mod merge;
pub mod partial;
pub mod state_form;

#[cfg(test)]
mod function_test;
#[cfg(test)]
mod merge_test;

pub use function::{AggregateFunction, AggregateName, AggregateStage};
pub use merge::{MergeColumn, MergeColumnKind, MergeLayout, combine, merge_expr};
pub use partial::AggState;
pub use state_form::{to_state_form, to_state_form_node};

//! Minimal typed SELECT representation shared by the rollup and live paths.
//!
//! Trees are persistent: every transform returns a new tree and leaves its input
//! untouched. Printing is for logs and the CLI only; execution goes through the
//! gateway, which receives the tree itself.

mod expr;
mod printer;
mod query;
mod visit;


pub use expr::{
    Alias, BoolKind, BoolOperation, Call, CompareOperation, CompareOperator, Constant, Expr,
    Field, OrderDirection, OrderExpr, SqlType,
};
pub use query::{QueryNode, SelectQuery, SelectSetQuery, SetOperator, Source};

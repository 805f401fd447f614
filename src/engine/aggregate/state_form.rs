use crate::engine::aggregate::function::{AggregateName, AggregateStage};
use crate::engine::ast::{Call, Expr, QueryNode, SelectQuery};

fn to_state_call(expr: Expr) -> Expr {
    match expr {
        Expr::Call(call) => match AggregateName::parse(&call.name) {
            Some(name) if name.stage == AggregateStage::Direct => Expr::Call(Call {
                name: name.with_stage(AggregateStage::State).to_string(),
                ..call
            }),
            _ => Expr::Call(call),
        },
        other => other,
    }
}

/// Rewrites every direct aggregate call (`uniq`, `sumIf`, ...) into its `State`
/// form, including inside subqueries. Aliases, arguments and everything that is
/// not an aggregate call are carried over unchanged, so typed `NULL`
/// placeholders stay scalar.
pub fn to_state_form(query: &SelectQuery) -> SelectQuery {
    query.map_exprs(&mut to_state_call)
}

pub fn to_state_form_node(query: &QueryNode) -> QueryNode {
    query.map_exprs(&mut to_state_call)
}

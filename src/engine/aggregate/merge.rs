use std::collections::HashMap;

use crate::engine::aggregate::function::{AggregateFunction, AggregateName, AggregateStage};
use crate::engine::ast::{Constant, Expr, OrderExpr, SelectQuery, SelectSetQuery, Source, SqlType};
use crate::engine::errors::BuildError;

/// Builds `fMerge(column)` or, with a predicate, `fMergeIf(column, predicate)`.
pub fn merge_expr(function: AggregateFunction, column: &str, predicate: Option<Expr>) -> Expr {
    let name = AggregateName::merge(function, predicate.is_some());
    let mut args = vec![Expr::field(column)];
    args.extend(predicate);
    Expr::call(&name.to_string(), args)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeColumnKind {
    /// Grouping key, passed through and grouped on.
    Key,
    /// Partial state of the given aggregate.
    State(AggregateFunction),
    /// Column no branch can supply, re-emitted as a typed `NULL`.
    Placeholder(SqlType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeColumn {
    pub alias: String,
    pub kind: MergeColumnKind,
}

impl MergeColumn {
    pub fn key(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            kind: MergeColumnKind::Key,
        }
    }

    pub fn state(alias: &str, function: AggregateFunction) -> Self {
        Self {
            alias: alias.to_string(),
            kind: MergeColumnKind::State(function),
        }
    }

    pub fn placeholder(alias: &str, ty: SqlType) -> Self {
        Self {
            alias: alias.to_string(),
            kind: MergeColumnKind::Placeholder(ty),
        }
    }
}

/// The outer SELECT that folds branch states into final values. Expressions refer
/// to branch columns by their alias.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeLayout {
    pub outputs: Vec<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderExpr>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl MergeLayout {
    /// One output per column, named after it: `fMerge(col) AS col` for states, the key
    /// itself for keys, and a typed `NULL` for placeholders.
    pub fn from_columns(columns: &[MergeColumn]) -> Self {
        let mut layout = MergeLayout::default();
        for column in columns {
            match column.kind {
                MergeColumnKind::Key => {
                    layout.outputs.push(Expr::field(&column.alias));
                    layout.group_by.push(Expr::field(&column.alias));
                }
                MergeColumnKind::State(function) => layout
                    .outputs
                    .push(merge_expr(function, &column.alias, None).alias(&column.alias)),
                MergeColumnKind::Placeholder(ty) => layout
                    .outputs
                    .push(Expr::typed_null(ty).alias(&column.alias)),
            }
        }
        layout
    }

    /// Infers the columns of a state-form branch from its select list.
    pub fn columns_of(branch: &SelectQuery) -> Vec<MergeColumn> {
        branch
            .select
            .iter()
            .map(|e| {
                let alias = e.output_name();
                match e.unaliased() {
                    Expr::Call(call) => match AggregateName::parse(&call.name) {
                        Some(name) if name.stage == AggregateStage::State => {
                            MergeColumn::state(&alias, name.function)
                        }
                        _ => MergeColumn::key(&alias),
                    },
                    Expr::Constant(Constant::TypedNull(ty)) => {
                        MergeColumn::placeholder(&alias, *ty)
                    }
                    _ => MergeColumn::key(&alias),
                }
            })
            .collect()
    }

    pub fn from_branch(branch: &SelectQuery) -> Self {
        Self::from_columns(&Self::columns_of(branch))
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderExpr>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>, offset: Option<usize>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

fn validate(branches: &[SelectQuery]) -> Result<Vec<String>, BuildError> {
    let first = branches.first().ok_or(BuildError::NoBranches)?;
    let expected = first.output_names();

    for (index, branch) in branches.iter().enumerate() {
        if let Some(dup) = branch.duplicate_alias() {
            return Err(BuildError::DuplicateAlias(dup.to_string()));
        }
        let found = branch.output_names();
        if found != expected {
            return Err(BuildError::MismatchedAliases {
                index,
                expected,
                found,
            });
        }
    }
    Ok(expected)
}

fn is_aggregate_call(e: &Expr) -> bool {
    matches!(e, Expr::Call(c) if AggregateName::parse(&c.name).is_some())
}

/// A plain scan whose columns can be substituted straight into the merge select.
fn is_inlinable(branch: &SelectQuery) -> bool {
    matches!(branch.from, Source::Table { .. })
        && branch.group_by.is_empty()
        && branch.order_by.is_empty()
        && branch.limit.is_none()
        && !branch.select.iter().any(|e| e.any(is_aggregate_call))
}

fn inline(branch: SelectQuery, layout: &MergeLayout) -> SelectQuery {
    let columns: HashMap<String, Expr> = branch
        .select
        .iter()
        .map(|e| (e.output_name(), e.unaliased().clone()))
        .collect();

    let mut substitute = |e: Expr| match e {
        Expr::Field(f) if f.chain.len() == 1 => match columns.get(&f.chain[0]) {
            Some(replacement) => replacement.clone(),
            None => Expr::Field(f),
        },
        other => other,
    };

    let mut select = Vec::with_capacity(layout.outputs.len());
    for output in &layout.outputs {
        match output {
            Expr::Field(f) if f.chain.len() == 1 => {
                select.push(output.map(&mut substitute).alias(&f.chain[0]))
            }
            _ => select.push(output.map(&mut substitute)),
        }
    }
    let mut group_by = Vec::with_capacity(layout.group_by.len());
    for e in &layout.group_by {
        group_by.push(e.map(&mut substitute));
    }

    SelectQuery {
        select,
        from: branch.from,
        where_clause: branch.where_clause,
        group_by,
        order_by: layout.order_by.clone(),
        limit: layout.limit,
        offset: layout.offset,
    }
}

/// Folds state-form branches into one query producing final values.
///
/// Every branch must expose the same ordered column names. A single plain scan is
/// merged in place; anything else is wrapped as a subquery, with several branches
/// joined by `UNION ALL`. Predicates for `MergeIf` columns travel in `layout`.
pub fn combine(
    mut branches: Vec<SelectQuery>,
    layout: &MergeLayout,
) -> Result<SelectQuery, BuildError> {
    validate(&branches)?;

    let source = if branches.len() == 1 {
        let branch = branches.remove(0);
        if is_inlinable(&branch) {
            return Ok(inline(branch, layout));
        }
        Source::subquery(branch)
    } else {
        Source::subquery(SelectSetQuery::union_all(branches))
    };

    Ok(SelectQuery::new(source)
        .with_select(layout.outputs.clone())
        .with_group_by(layout.group_by.clone())
        .with_order_by(layout.order_by.clone())
        .with_limit(layout.limit)
        .with_offset(layout.offset))
}

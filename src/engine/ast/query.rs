use std::collections::HashSet;

use super::expr::{Expr, OrderExpr};

/// Where a SELECT reads its rows from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table { name: String },
    Subquery { query: Box<QueryNode> },
}

impl Source {
    pub fn table(name: &str) -> Self {
        Source::Table {
            name: name.to_string(),
        }
    }

    pub fn subquery(query: impl Into<QueryNode>) -> Self {
        Source::Subquery {
            query: Box::new(query.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub select: Vec<Expr>,
    pub from: Source,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderExpr>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SelectQuery {
    pub fn new(from: Source) -> Self {
        Self {
            select: Vec::new(),
            from,
            where_clause: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn from_table(name: &str) -> Self {
        Self::new(Source::table(name))
    }

    pub fn with_select(mut self, select: Vec<Expr>) -> Self {
        self.select = select;
        self
    }

    /// Adds a predicate, `AND`-ed with any existing one.
    pub fn and_where(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => Expr::and(vec![existing, predicate]),
            None => predicate,
        });
        self
    }

    pub fn with_group_by(mut self, group_by: Vec<Expr>) -> Self {
        self.group_by = group_by;
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderExpr>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: Option<usize>) -> Self {
        self.offset = offset;
        self
    }

    /// Alias names in select-list order.
    pub fn aliases(&self) -> Vec<&str> {
        self.select.iter().filter_map(Expr::alias_name).collect()
    }

    /// First alias that appears more than once in the select list.
    pub fn duplicate_alias(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.aliases().into_iter().find(|alias| !seen.insert(*alias))
    }

    /// Column names of the result set, in order.
    pub fn output_names(&self) -> Vec<String> {
        self.select.iter().map(Expr::output_name).collect()
    }

    /// Select-list expression carrying `alias`, without the alias wrapper.
    pub fn column(&self, alias: &str) -> Option<&Expr> {
        self.select
            .iter()
            .find(|e| e.alias_name() == Some(alias))
            .map(Expr::unaliased)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperator {
    UnionAll,
}

impl SetOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetOperator::UnionAll => "UNION ALL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectSetQuery {
    pub queries: Vec<SelectQuery>,
    pub set_operator: SetOperator,
}

impl SelectSetQuery {
    pub fn union_all(queries: Vec<SelectQuery>) -> Self {
        Self {
            queries,
            set_operator: SetOperator::UnionAll,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Select(SelectQuery),
    SelectSet(SelectSetQuery),
}

impl QueryNode {
    pub fn as_select(&self) -> Option<&SelectQuery> {
        match self {
            QueryNode::Select(q) => Some(q),
            QueryNode::SelectSet(_) => None,
        }
    }

    /// Result column names; a set query takes them from its first branch.
    pub fn output_names(&self) -> Vec<String> {
        match self {
            QueryNode::Select(q) => q.output_names(),
            QueryNode::SelectSet(set) => set
                .queries
                .first()
                .map(SelectQuery::output_names)
                .unwrap_or_default(),
        }
    }

    /// The outermost `UNION ALL`, either this node or the first one found in a FROM chain.
    pub fn find_union(&self) -> Option<&SelectSetQuery> {
        match self {
            QueryNode::SelectSet(set) => Some(set),
            QueryNode::Select(q) => match &q.from {
                Source::Subquery { query } => query.find_union(),
                Source::Table { .. } => None,
            },
        }
    }

    /// Every physical table the query reads, depth first, without duplicates.
    pub fn tables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_tables(&mut out);
        out
    }

    fn collect_tables(&self, out: &mut Vec<String>) {
        match self {
            QueryNode::Select(q) => collect_select_tables(q, out),
            QueryNode::SelectSet(set) => {
                for branch in &set.queries {
                    collect_select_tables(branch, out);
                }
            }
        }
    }
}

fn collect_select_tables(query: &SelectQuery, out: &mut Vec<String>) {
    match &query.from {
        Source::Table { name } => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        Source::Subquery { query } => query.collect_tables(out),
    }
}

impl From<SelectQuery> for QueryNode {
    fn from(value: SelectQuery) -> Self {
        QueryNode::Select(value)
    }
}

impl From<SelectSetQuery> for QueryNode {
    fn from(value: SelectSetQuery) -> Self {
        QueryNode::SelectSet(value)
    }
}

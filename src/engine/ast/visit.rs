use super::expr::{Alias, BoolOperation, Call, CompareOperation, Expr, OrderExpr};
use super::query::{QueryNode, SelectQuery, SelectSetQuery, Source};

impl Expr {
    /// Rebuilds the tree bottom-up, applying `f` to every node after its children.
    /// The receiver is left untouched.
    pub fn map<F>(&self, f: &mut F) -> Expr
    where
        F: FnMut(Expr) -> Expr,
    {
        let rebuilt = match self {
            Expr::Field(_) | Expr::Constant(_) => self.clone(),
            Expr::Call(call) => {
                let mut args = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    args.push(arg.map(f));
                }
                let params = match &call.params {
                    Some(params) => {
                        let mut mapped = Vec::with_capacity(params.len());
                        for p in params {
                            mapped.push(p.map(f));
                        }
                        Some(mapped)
                    }
                    None => None,
                };
                Expr::Call(Call {
                    name: call.name.clone(),
                    args,
                    params,
                })
            }
            Expr::Alias(alias) => Expr::Alias(Alias {
                alias: alias.alias.clone(),
                expr: Box::new(alias.expr.map(f)),
            }),
            Expr::CompareOp(cmp) => Expr::CompareOp(CompareOperation {
                op: cmp.op,
                left: Box::new(cmp.left.map(f)),
                right: Box::new(cmp.right.map(f)),
            }),
            Expr::BoolOp(op) => {
                let mut exprs = Vec::with_capacity(op.exprs.len());
                for e in &op.exprs {
                    exprs.push(e.map(f));
                }
                Expr::BoolOp(BoolOperation {
                    kind: op.kind,
                    exprs,
                })
            }
            Expr::Tuple(items) => {
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    mapped.push(item.map(f));
                }
                Expr::Tuple(mapped)
            }
            Expr::OrderBy(order) => Expr::OrderBy(order.map(f)),
        };
        f(rebuilt)
    }

    /// Visits every node, parents before children.
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expr),
    {
        f(self);
        match self {
            Expr::Field(_) | Expr::Constant(_) => {}
            Expr::Call(call) => {
                for arg in &call.args {
                    arg.walk(f);
                }
                if let Some(params) = &call.params {
                    for p in params {
                        p.walk(f);
                    }
                }
            }
            Expr::Alias(alias) => alias.expr.walk(f),
            Expr::CompareOp(cmp) => {
                cmp.left.walk(f);
                cmp.right.walk(f);
            }
            Expr::BoolOp(op) => {
                for e in &op.exprs {
                    e.walk(f);
                }
            }
            Expr::Tuple(items) => {
                for item in items {
                    item.walk(f);
                }
            }
            Expr::OrderBy(order) => order.expr.walk(f),
        }
    }

    /// True if any node satisfies `pred`.
    pub fn any<P>(&self, mut pred: P) -> bool
    where
        P: FnMut(&Expr) -> bool,
    {
        let mut found = false;
        self.walk(&mut |e| {
            if !found && pred(e) {
                found = true;
            }
        });
        found
    }
}

impl OrderExpr {
    pub fn map<F>(&self, f: &mut F) -> OrderExpr
    where
        F: FnMut(Expr) -> Expr,
    {
        OrderExpr {
            expr: Box::new(self.expr.map(f)),
            direction: self.direction,
        }
    }
}

impl SelectQuery {
    /// Applies `Expr::map` to every expression of the query, including those of
    /// subqueries in FROM.
    pub fn map_exprs<F>(&self, f: &mut F) -> SelectQuery
    where
        F: FnMut(Expr) -> Expr,
    {
        let from = match &self.from {
            Source::Table { .. } => self.from.clone(),
            Source::Subquery { query } => Source::Subquery {
                query: Box::new(query.map_exprs(f)),
            },
        };

        let mut select = Vec::with_capacity(self.select.len());
        for e in &self.select {
            select.push(e.map(f));
        }
        let where_clause = self.where_clause.as_ref().map(|w| w.map(f));
        let mut group_by = Vec::with_capacity(self.group_by.len());
        for e in &self.group_by {
            group_by.push(e.map(f));
        }
        let mut order_by = Vec::with_capacity(self.order_by.len());
        for o in &self.order_by {
            order_by.push(o.map(f));
        }

        SelectQuery {
            select,
            from,
            where_clause,
            group_by,
            order_by,
            limit: self.limit,
            offset: self.offset,
        }
    }

    /// Visits every expression of the query and its subqueries.
    pub fn walk_exprs<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expr),
    {
        if let Source::Subquery { query } = &self.from {
            query.walk_exprs(f);
        }
        for e in &self.select {
            e.walk(f);
        }
        if let Some(w) = &self.where_clause {
            w.walk(f);
        }
        for e in &self.group_by {
            e.walk(f);
        }
        for o in &self.order_by {
            o.expr.walk(f);
        }
    }
}

impl SelectSetQuery {
    pub fn map_exprs<F>(&self, f: &mut F) -> SelectSetQuery
    where
        F: FnMut(Expr) -> Expr,
    {
        let mut queries = Vec::with_capacity(self.queries.len());
        for q in &self.queries {
            queries.push(q.map_exprs(f));
        }
        SelectSetQuery {
            queries,
            set_operator: self.set_operator,
        }
    }
}

impl QueryNode {
    pub fn map_exprs<F>(&self, f: &mut F) -> QueryNode
    where
        F: FnMut(Expr) -> Expr,
    {
        match self {
            QueryNode::Select(q) => QueryNode::Select(q.map_exprs(f)),
            QueryNode::SelectSet(set) => QueryNode::SelectSet(set.map_exprs(f)),
        }
    }

    pub fn walk_exprs<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expr),
    {
        match self {
            QueryNode::Select(q) => q.walk_exprs(f),
            QueryNode::SelectSet(set) => {
                for q in &set.queries {
                    q.walk_exprs(f);
                }
            }
        }
    }
}

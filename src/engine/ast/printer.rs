use std::fmt::{self, Display, Formatter, Write};

use super::expr::{BoolKind, Constant, Expr, Field, OrderDirection, OrderExpr};
use super::query::{QueryNode, SelectQuery, SelectSetQuery, Source};

const INDENT: &str = "    ";

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_identifier(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    if is_plain_identifier(s) {
        f.write_str(s)
    } else {
        write!(f, "`{}`", s.replace('`', "\\`"))
    }
}

fn write_string_literal(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('\'')?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            other => f.write_char(other)?,
        }
    }
    f.write_char('\'')
}

fn write_list(f: &mut Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, part) in self.chain.iter().enumerate() {
            if i > 0 {
                f.write_char('.')?;
            }
            write_identifier(f, part)?;
        }
        Ok(())
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => f.write_str("NULL"),
            Constant::TypedNull(ty) => write!(f, "CAST(NULL, 'Nullable({})')", ty.as_str()),
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Int(i) => write!(f, "{i}"),
            Constant::Float(x) => write!(f, "{x:?}"),
            Constant::String(s) => write_string_literal(f, s),
            Constant::Date(d) => write!(f, "toDate('{}')", d.format("%Y-%m-%d")),
            Constant::DateTime(dt) => {
                write!(f, "toDateTime('{}', 'UTC')", dt.format("%Y-%m-%d %H:%M:%S"))
            }
        }
    }
}

impl Display for OrderExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        };
        write!(f, "{} {}", self.expr, dir)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Field(field) => write!(f, "{field}"),
            Expr::Constant(c) => write!(f, "{c}"),
            Expr::Call(call) => {
                f.write_str(&call.name)?;
                if let Some(params) = &call.params {
                    f.write_char('(')?;
                    write_list(f, params)?;
                    f.write_char(')')?;
                }
                f.write_char('(')?;
                write_list(f, &call.args)?;
                f.write_char(')')
            }
            Expr::Alias(alias) => {
                write!(f, "{} AS ", alias.expr)?;
                write_identifier(f, &alias.alias)
            }
            Expr::CompareOp(cmp) => write!(f, "{} {} {}", cmp.left, cmp.op.as_str(), cmp.right),
            Expr::BoolOp(op) => {
                let joiner = match op.kind {
                    BoolKind::And => " AND ",
                    BoolKind::Or => " OR ",
                };
                f.write_char('(')?;
                for (i, e) in op.exprs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_char(')')
            }
            Expr::Tuple(items) => {
                f.write_str("tuple(")?;
                write_list(f, items)?;
                f.write_char(')')
            }
            Expr::OrderBy(order) => write!(f, "{order}"),
        }
    }
}

impl Display for SelectQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT")?;
        for (i, e) in self.select.iter().enumerate() {
            let sep = if i + 1 < self.select.len() { "," } else { "" };
            write!(f, "\n{INDENT}{e}{sep}")?;
        }

        match &self.from {
            Source::Table { name } => {
                f.write_str("\nFROM ")?;
                write_identifier(f, name)?;
            }
            Source::Subquery { query } => {
                f.write_str("\nFROM (")?;
                for line in query.to_string().lines() {
                    write!(f, "\n{INDENT}{line}")?;
                }
                f.write_str("\n)")?;
            }
        }

        if let Some(w) = &self.where_clause {
            write!(f, "\nWHERE {w}")?;
        }
        if !self.group_by.is_empty() {
            f.write_str("\nGROUP BY ")?;
            write_list(f, &self.group_by)?;
        }
        if !self.order_by.is_empty() {
            f.write_str("\nORDER BY ")?;
            for (i, o) in self.order_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{o}")?;
            }
        }
        if let Some(limit) = self.limit {
            write!(f, "\nLIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, "\nOFFSET {offset}")?;
        }
        Ok(())
    }
}

impl Display for SelectSetQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, q) in self.queries.iter().enumerate() {
            if i > 0 {
                write!(f, "\n{}\n", self.set_operator.as_str())?;
            }
            write!(f, "{q}")?;
        }
        Ok(())
    }
}

impl Display for QueryNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Select(q) => write!(f, "{q}"),
            QueryNode::SelectSet(set) => write!(f, "{set}"),
        }
    }
}

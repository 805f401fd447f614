use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use indexmap::IndexMap;
use regex::RegexBuilder;
use serde_json::Value as JsonValue;

use crate::engine::aggregate::{AggState, AggregateName, AggregateStage};
use crate::engine::ast::{
    BoolKind, Call, CompareOperator, Constant, Expr, OrderDirection, QueryNode, SelectQuery,
    Source,
};
use crate::engine::errors::ExecutionError;
use crate::engine::exec::gateway::ExecutionResult;
use crate::engine::types::ScalarValue;
use crate::shared::datetime::{BucketGranularity, CalendarTimeBucketer};

const MAX_ALIAS_DEPTH: usize = 16;

/// A stored or computed cell: a plain value or a partial aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Scalar(ScalarValue),
    State(AggState),
}

impl Datum {
    pub fn into_scalar(self) -> Result<ScalarValue, ExecutionError> {
        match self {
            Datum::Scalar(v) => Ok(v),
            Datum::State(s) => Err(ExecutionError::Evaluation(format!(
                "{:?} state used where a value is expected",
                s.function()
            ))),
        }
    }
}

impl From<ScalarValue> for Datum {
    fn from(value: ScalarValue) -> Self {
        Datum::Scalar(value)
    }
}

pub type Record = HashMap<String, Datum>;

/// Result of evaluating a query before it leaves the gateway.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relation {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Datum>>,
}

impl Relation {
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Converts to a gateway result; partial states cannot leave the database.
    pub fn into_result(self) -> Result<ExecutionResult, ExecutionError> {
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in self.rows {
            let mut out = Vec::with_capacity(row.len());
            for datum in row {
                out.push(datum.into_scalar()?);
            }
            rows.push(out);
        }
        Ok(ExecutionResult {
            columns: self.columns,
            rows,
        })
    }
}

/// What a field reference resolves against.
#[derive(Clone, Copy)]
enum Rows<'r> {
    One(&'r Record),
    Group(&'r [&'r Record]),
}

struct Scope<'r> {
    rows: Rows<'r>,
    aliases: &'r HashMap<String, &'r Expr>,
    depth: usize,
}

impl<'r> Scope<'r> {
    fn nested(&self, rows: Rows<'r>) -> Scope<'r> {
        Scope {
            rows,
            aliases: self.aliases,
            depth: self.depth,
        }
    }

    fn deeper(&self) -> Result<Scope<'r>, ExecutionError> {
        if self.depth >= MAX_ALIAS_DEPTH {
            return Err(ExecutionError::Evaluation(
                "alias references nest too deeply".to_string(),
            ));
        }
        Ok(Scope {
            rows: self.rows,
            aliases: self.aliases,
            depth: self.depth + 1,
        })
    }
}

fn truthy(value: &ScalarValue) -> bool {
    value.as_bool().unwrap_or(false)
}

fn is_aggregate_call(e: &Expr) -> bool {
    matches!(e, Expr::Call(c) if AggregateName::parse(&c.name).is_some())
}

fn group_key(values: &[ScalarValue]) -> String {
    JsonValue::Array(values.iter().map(ScalarValue::to_json).collect()).to_string()
}

fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

fn arg(args: &[ScalarValue], i: usize, name: &str) -> Result<ScalarValue, ExecutionError> {
    args.get(i).cloned().ok_or_else(|| {
        ExecutionError::Evaluation(format!("{name} expects at least {} arguments", i + 1))
    })
}

/// Evaluates query trees against in-memory tables.
pub struct Evaluator<'a> {
    tables: &'a HashMap<String, Vec<Record>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(tables: &'a HashMap<String, Vec<Record>>) -> Self {
        Self { tables }
    }

    pub fn run(&self, node: &QueryNode) -> Result<Relation, ExecutionError> {
        match node {
            QueryNode::Select(q) => self.run_select(q),
            QueryNode::SelectSet(set) => {
                let mut branches = set.queries.iter();
                let Some(first) = branches.next() else {
                    return Ok(Relation::default());
                };
                let mut acc = self.run_select(first)?;
                for branch in branches {
                    let rel = self.run_select(branch)?;
                    if acc.columns.len() != rel.columns.len() {
                        return Err(ExecutionError::Evaluation(format!(
                            "UNION ALL branches have {} and {} columns",
                            acc.columns.len(),
                            rel.columns.len()
                        )));
                    }
                    acc.rows.extend(rel.rows);
                }
                Ok(acc)
            }
        }
    }

    fn source_rows(&self, from: &Source) -> Result<Cow<'a, [Record]>, ExecutionError> {
        match from {
            Source::Table { name } => self
                .tables
                .get(name)
                .map(|rows| Cow::Borrowed(rows.as_slice()))
                .ok_or_else(|| ExecutionError::UnknownTable(name.clone())),
            Source::Subquery { query } => Ok(Cow::Owned(self.run(query)?.records())),
        }
    }

    pub fn run_select(&self, q: &SelectQuery) -> Result<Relation, ExecutionError> {
        let source = self.source_rows(&q.from)?;
        let aliases: HashMap<String, &Expr> = q
            .select
            .iter()
            .filter_map(|e| match e {
                Expr::Alias(a) => Some((a.alias.clone(), a.expr.as_ref())),
                _ => None,
            })
            .collect();

        let mut filtered: Vec<&Record> = Vec::with_capacity(source.len());
        for row in source.iter() {
            let keep = match &q.where_clause {
                Some(pred) => {
                    let scope = Scope {
                        rows: Rows::One(row),
                        aliases: &aliases,
                        depth: 0,
                    };
                    truthy(&self.eval(pred, &scope)?.into_scalar()?)
                }
                None => true,
            };
            if keep {
                filtered.push(row);
            }
        }

        let columns: Vec<String> = q.select.iter().map(Expr::output_name).collect();
        let aggregating =
            !q.group_by.is_empty() || q.select.iter().any(|e| e.any(is_aggregate_call));

        let mut rows = Vec::new();
        if aggregating {
            let mut groups: IndexMap<String, Vec<&Record>> = IndexMap::new();
            if q.group_by.is_empty() {
                groups.insert(String::new(), filtered);
            } else {
                for row in filtered {
                    let scope = Scope {
                        rows: Rows::One(row),
                        aliases: &aliases,
                        depth: 0,
                    };
                    let mut key = Vec::with_capacity(q.group_by.len());
                    for e in &q.group_by {
                        key.push(self.eval(e, &scope)?.into_scalar()?);
                    }
                    groups.entry(group_key(&key)).or_default().push(row);
                }
            }
            for members in groups.values() {
                let scope = Scope {
                    rows: Rows::Group(members),
                    aliases: &aliases,
                    depth: 0,
                };
                let mut out = Vec::with_capacity(q.select.len());
                for e in &q.select {
                    out.push(self.eval(e, &scope)?);
                }
                rows.push(out);
            }
        } else {
            for row in filtered {
                let scope = Scope {
                    rows: Rows::One(row),
                    aliases: &aliases,
                    depth: 0,
                };
                let mut out = Vec::with_capacity(q.select.len());
                for e in &q.select {
                    out.push(self.eval(e, &scope)?);
                }
                rows.push(out);
            }
        }

        let mut relation = Relation { columns, rows };
        if !q.order_by.is_empty() {
            self.sort(&mut relation, q)?;
        }
        let offset = q.offset.unwrap_or(0);
        if offset > 0 {
            relation.rows.drain(..offset.min(relation.rows.len()));
        }
        if let Some(limit) = q.limit {
            relation.rows.truncate(limit);
        }
        Ok(relation)
    }

    fn sort(&self, relation: &mut Relation, q: &SelectQuery) -> Result<(), ExecutionError> {
        let no_aliases = HashMap::new();
        let records = relation.records();
        let mut keyed = Vec::with_capacity(records.len());
        for (record, row) in records.iter().zip(relation.rows.drain(..)) {
            let scope = Scope {
                rows: Rows::One(record),
                aliases: &no_aliases,
                depth: 0,
            };
            let mut key = Vec::with_capacity(q.order_by.len());
            for order in &q.order_by {
                key.push(self.eval(&order.expr, &scope)?.into_scalar()?);
            }
            keyed.push((key, row));
        }

        keyed.sort_by(|(a, _), (b, _)| {
            for (i, order) in q.order_by.iter().enumerate() {
                let ord = match (a[i].is_null(), b[i].is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => match order.direction {
                        OrderDirection::Asc => a[i].compare(&b[i]),
                        OrderDirection::Desc => b[i].compare(&a[i]),
                    },
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        relation.rows = keyed.into_iter().map(|(_, row)| row).collect();
        Ok(())
    }

    fn eval(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Datum, ExecutionError> {
        match expr {
            Expr::Field(field) => self.resolve_field(&field.chain, scope),
            Expr::Constant(c) => Ok(Datum::Scalar(match c {
                Constant::Null | Constant::TypedNull(_) => ScalarValue::Null,
                Constant::Bool(b) => ScalarValue::Boolean(*b),
                Constant::Int(i) => ScalarValue::Int64(*i),
                Constant::Float(f) => ScalarValue::Float64(*f),
                Constant::String(s) => ScalarValue::Utf8(s.clone()),
                Constant::Date(d) => ScalarValue::Date(*d),
                Constant::DateTime(dt) => ScalarValue::Timestamp(dt.timestamp()),
            })),
            Expr::Alias(a) => self.eval(&a.expr, scope),
            Expr::OrderBy(o) => self.eval(&o.expr, scope),
            Expr::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scope)?.into_scalar()?);
                }
                Ok(Datum::Scalar(ScalarValue::Tuple(values)))
            }
            Expr::BoolOp(op) => {
                let mut result = op.kind == BoolKind::And;
                for e in &op.exprs {
                    let v = truthy(&self.eval(e, scope)?.into_scalar()?);
                    match op.kind {
                        BoolKind::And if !v => {
                            result = false;
                            break;
                        }
                        BoolKind::Or if v => {
                            result = true;
                            break;
                        }
                        _ => {}
                    }
                }
                Ok(Datum::Scalar(ScalarValue::Boolean(result)))
            }
            Expr::CompareOp(cmp) => {
                let left = self.eval(&cmp.left, scope)?.into_scalar()?;
                let right = self.eval(&cmp.right, scope)?.into_scalar()?;
                Ok(Datum::Scalar(self.compare(cmp.op, &left, &right)?))
            }
            Expr::Call(call) => match AggregateName::parse(&call.name) {
                Some(name) => self.aggregate(call, name, scope),
                None => {
                    let mut args = Vec::with_capacity(call.args.len());
                    for a in &call.args {
                        args.push(self.eval(a, scope)?.into_scalar()?);
                    }
                    Ok(Datum::Scalar(self.call_scalar(&call.name, &args)?))
                }
            },
        }
    }

    fn resolve_field(&self, chain: &[String], scope: &Scope<'_>) -> Result<Datum, ExecutionError> {
        let full = chain.join(".");
        let leaf = chain.last().map(String::as_str).unwrap_or("");

        let row = match scope.rows {
            Rows::One(r) => Some(r),
            Rows::Group(g) => g.first().copied(),
        };
        if let Some(row) = row {
            if let Some(d) = row.get(&full).or_else(|| row.get(leaf)) {
                return Ok(d.clone());
            }
        }
        if let Some(aliased) = scope.aliases.get(&full) {
            return self.eval(aliased, &scope.deeper()?);
        }
        if row.is_none() || chain.first().is_some_and(|c| c == "properties") {
            return Ok(Datum::Scalar(ScalarValue::Null));
        }
        Err(ExecutionError::UnknownColumn(full))
    }

    fn aggregate(
        &self,
        call: &Call,
        name: AggregateName,
        scope: &Scope<'_>,
    ) -> Result<Datum, ExecutionError> {
        let members: &[&Record] = match scope.rows {
            Rows::Group(g) => g,
            Rows::One(_) => {
                return Err(ExecutionError::Evaluation(format!(
                    "aggregate {} outside of an aggregation",
                    call.name
                )));
            }
        };

        let (value_args, condition) = if name.conditional {
            match call.args.split_last() {
                Some((cond, rest)) => (rest, Some(cond)),
                None => {
                    return Err(ExecutionError::Evaluation(format!(
                        "{} requires a condition",
                        call.name
                    )));
                }
            }
        } else {
            (call.args.as_slice(), None)
        };

        let mut state = AggState::empty(name.function);
        for &row in members {
            let row_scope = scope.nested(Rows::One(row));
            if let Some(cond) = condition {
                if !truthy(&self.eval(cond, &row_scope)?.into_scalar()?) {
                    continue;
                }
            }
            match name.stage {
                AggregateStage::Direct | AggregateStage::State => {
                    let value = match value_args.first() {
                        Some(a) => Some(self.eval(a, &row_scope)?.into_scalar()?),
                        None => None,
                    };
                    state.update(value.as_ref());
                }
                AggregateStage::Merge => {
                    let Some(a) = value_args.first() else {
                        return Err(ExecutionError::Evaluation(format!(
                            "{} requires a state argument",
                            call.name
                        )));
                    };
                    match self.eval(a, &row_scope)? {
                        Datum::State(partial) => state.merge(&partial)?,
                        Datum::Scalar(ScalarValue::Null) => {}
                        Datum::Scalar(other) => {
                            return Err(ExecutionError::Evaluation(format!(
                                "{} expects a state, got {:?}",
                                call.name, other
                            )));
                        }
                    }
                }
            }
        }

        Ok(match name.stage {
            AggregateStage::State => Datum::State(state),
            _ => Datum::Scalar(state.finalize()),
        })
    }

    fn compare(
        &self,
        op: CompareOperator,
        left: &ScalarValue,
        right: &ScalarValue,
    ) -> Result<ScalarValue, ExecutionError> {
        if left.is_null() {
            return Ok(ScalarValue::Null);
        }
        let result = match op {
            CompareOperator::In | CompareOperator::NotIn => {
                let ScalarValue::Tuple(items) = right else {
                    return Err(ExecutionError::Evaluation(
                        "IN expects a tuple on the right".to_string(),
                    ));
                };
                let found = items.iter().any(|item| left.sql_eq(item) == Some(true));
                found == (op == CompareOperator::In)
            }
            CompareOperator::ILike | CompareOperator::NotILike => {
                let Some(pattern) = right.as_str() else {
                    return Ok(ScalarValue::Null);
                };
                let re = RegexBuilder::new(&like_to_regex(pattern))
                    .case_insensitive(true)
                    .dot_matches_new_line(true)
                    .build()
                    .map_err(|e| ExecutionError::Evaluation(e.to_string()))?;
                re.is_match(&left.to_string_repr()) == (op == CompareOperator::ILike)
            }
            _ => {
                if right.is_null() {
                    return Ok(ScalarValue::Null);
                }
                let ord = left.compare(right);
                match op {
                    CompareOperator::Eq => ord == Ordering::Equal,
                    CompareOperator::NotEq => ord != Ordering::Equal,
                    CompareOperator::Lt => ord == Ordering::Less,
                    CompareOperator::LtEq => ord != Ordering::Greater,
                    CompareOperator::Gt => ord == Ordering::Greater,
                    CompareOperator::GtEq => ord != Ordering::Less,
                    _ => false,
                }
            }
        };
        Ok(ScalarValue::Boolean(result))
    }

    fn call_scalar(&self, name: &str, args: &[ScalarValue]) -> Result<ScalarValue, ExecutionError> {
        let granularity = match name {
            "toStartOfMinute" => Some(BucketGranularity::Minute),
            "toStartOfHour" => Some(BucketGranularity::Hour),
            "toStartOfDay" => Some(BucketGranularity::Day),
            "toStartOfWeek" => Some(BucketGranularity::Week),
            "toStartOfMonth" => Some(BucketGranularity::Month),
            _ => None,
        };
        if let Some(granularity) = granularity {
            let value = arg(args, 0, name)?;
            let Some(ts) = value.as_timestamp() else {
                return Ok(ScalarValue::Null);
            };
            // mode 0 starts weeks on Sunday, mode 1 on Monday
            let week_start = match args.get(1).and_then(ScalarValue::as_i64) {
                Some(mode) if mode % 2 == 1 => Weekday::Mon,
                _ => Weekday::Sun,
            };
            let bucketer = CalendarTimeBucketer::new(None, week_start);
            return Ok(ScalarValue::Timestamp(
                bucketer.bucket_of(ts.timestamp(), granularity),
            ));
        }

        match name {
            "toDate" => {
                let value = arg(args, 0, name)?;
                Ok(match &value {
                    ScalarValue::Date(_) => value,
                    ScalarValue::Timestamp(ts) => DateTime::<Utc>::from_timestamp(*ts, 0)
                        .map(|dt| ScalarValue::Date(dt.date_naive()))
                        .unwrap_or(ScalarValue::Null),
                    ScalarValue::Utf8(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .map(ScalarValue::Date)
                        .unwrap_or(ScalarValue::Null),
                    _ => ScalarValue::Null,
                })
            }
            "divide" => {
                let (a, b) = (arg(args, 0, name)?, arg(args, 1, name)?);
                Ok(match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => ScalarValue::Float64(x / y),
                    _ => ScalarValue::Null,
                })
            }
            "if" => {
                let cond = arg(args, 0, name)?;
                if truthy(&cond) {
                    arg(args, 1, name)
                } else {
                    arg(args, 2, name)
                }
            }
            "ifNull" => {
                let value = arg(args, 0, name)?;
                if value.is_null() {
                    arg(args, 1, name)
                } else {
                    Ok(value)
                }
            }
            "nullIf" => {
                let (a, b) = (arg(args, 0, name)?, arg(args, 1, name)?);
                if a.sql_eq(&b) == Some(true) {
                    Ok(ScalarValue::Null)
                } else {
                    Ok(a)
                }
            }
            "coalesce" => Ok(args
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(ScalarValue::Null)),
            "isNull" => Ok(ScalarValue::Boolean(arg(args, 0, name)?.is_null())),
            "isNotNull" => Ok(ScalarValue::Boolean(!arg(args, 0, name)?.is_null())),
            "toString" => {
                let value = arg(args, 0, name)?;
                Ok(match value {
                    ScalarValue::Null => ScalarValue::Null,
                    ScalarValue::Utf8(_) => value,
                    other => ScalarValue::Utf8(other.to_string_repr()),
                })
            }
            "not" => Ok(ScalarValue::Boolean(!truthy(&arg(args, 0, name)?))),
            other => Err(ExecutionError::Evaluation(format!(
                "unknown function {other}"
            ))),
        }
    }
}

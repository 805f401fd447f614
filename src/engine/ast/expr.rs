use chrono::{DateTime, NaiveDate, Utc};

/// Column types that typed `NULL` placeholders can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    UInt8,
    Int64,
    Float64,
    String,
    Date,
    DateTime,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::UInt8 => "UInt8",
            SqlType::Int64 => "Int64",
            SqlType::Float64 => "Float64",
            SqlType::String => "String",
            SqlType::Date => "Date",
            SqlType::DateTime => "DateTime",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    /// `NULL` that still carries a column type, so unions of branches type-check.
    TypedNull(SqlType),
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

/// Column reference, possibly qualified (`events.person_id`) or nested (`properties.$os`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub chain: Vec<String>,
}

impl Field {
    pub fn name(&self) -> String {
        self.chain.join(".")
    }

    /// Last element of the chain.
    pub fn leaf(&self) -> &str {
        self.chain.last().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    /// Parametric-function parameters, printed as `name(params)(args)`.
    pub params: Option<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub alias: String,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    ILike,
    NotILike,
    In,
    NotIn,
}

impl CompareOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOperator::Eq => "=",
            CompareOperator::NotEq => "!=",
            CompareOperator::Lt => "<",
            CompareOperator::LtEq => "<=",
            CompareOperator::Gt => ">",
            CompareOperator::GtEq => ">=",
            CompareOperator::ILike => "ILIKE",
            CompareOperator::NotILike => "NOT ILIKE",
            CompareOperator::In => "IN",
            CompareOperator::NotIn => "NOT IN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareOperation {
    pub op: CompareOperator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolKind {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolOperation {
    pub kind: BoolKind,
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderExpr {
    pub expr: Box<Expr>,
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(Field),
    Constant(Constant),
    Call(Call),
    Alias(Alias),
    CompareOp(CompareOperation),
    BoolOp(BoolOperation),
    Tuple(Vec<Expr>),
    OrderBy(OrderExpr),
}

impl Expr {
    pub fn field(name: &str) -> Expr {
        Expr::Field(Field {
            chain: vec![name.to_string()],
        })
    }

    pub fn field_chain(chain: &[&str]) -> Expr {
        Expr::Field(Field {
            chain: chain.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn null() -> Expr {
        Expr::Constant(Constant::Null)
    }

    pub fn typed_null(ty: SqlType) -> Expr {
        Expr::Constant(Constant::TypedNull(ty))
    }

    pub fn int(value: i64) -> Expr {
        Expr::Constant(Constant::Int(value))
    }

    pub fn float(value: f64) -> Expr {
        Expr::Constant(Constant::Float(value))
    }

    pub fn string(value: &str) -> Expr {
        Expr::Constant(Constant::String(value.to_string()))
    }

    pub fn boolean(value: bool) -> Expr {
        Expr::Constant(Constant::Bool(value))
    }

    pub fn date(value: NaiveDate) -> Expr {
        Expr::Constant(Constant::Date(value))
    }

    pub fn datetime(value: DateTime<Utc>) -> Expr {
        Expr::Constant(Constant::DateTime(value))
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call(Call {
            name: name.to_string(),
            args,
            params: None,
        })
    }

    pub fn call_with_params(name: &str, params: Vec<Expr>, args: Vec<Expr>) -> Expr {
        Expr::Call(Call {
            name: name.to_string(),
            args,
            params: Some(params),
        })
    }

    pub fn alias(self, name: &str) -> Expr {
        Expr::Alias(Alias {
            alias: name.to_string(),
            expr: Box::new(self),
        })
    }

    pub fn compare(op: CompareOperator, left: Expr, right: Expr) -> Expr {
        Expr::CompareOp(CompareOperation {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn equals(left: Expr, right: Expr) -> Expr {
        Self::compare(CompareOperator::Eq, left, right)
    }

    pub fn gt_eq(left: Expr, right: Expr) -> Expr {
        Self::compare(CompareOperator::GtEq, left, right)
    }

    pub fn lt_eq(left: Expr, right: Expr) -> Expr {
        Self::compare(CompareOperator::LtEq, left, right)
    }

    /// `AND` of the given predicates. Nested `AND`s are flattened, an empty list is `true`.
    pub fn and(exprs: Vec<Expr>) -> Expr {
        Self::bool_op(BoolKind::And, exprs)
    }

    /// `OR` of the given predicates. Nested `OR`s are flattened, an empty list is `false`.
    pub fn or(exprs: Vec<Expr>) -> Expr {
        Self::bool_op(BoolKind::Or, exprs)
    }

    fn bool_op(kind: BoolKind, exprs: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(exprs.len());
        for expr in exprs {
            match expr {
                Expr::BoolOp(inner) if inner.kind == kind => flat.extend(inner.exprs),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::boolean(kind == BoolKind::And),
            1 => flat.remove(0),
            _ => Expr::BoolOp(BoolOperation { kind, exprs: flat }),
        }
    }

    pub fn tuple(exprs: Vec<Expr>) -> Expr {
        Expr::Tuple(exprs)
    }

    pub fn asc(self) -> OrderExpr {
        OrderExpr {
            expr: Box::new(self),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(self) -> OrderExpr {
        OrderExpr {
            expr: Box::new(self),
            direction: OrderDirection::Desc,
        }
    }

    pub fn alias_name(&self) -> Option<&str> {
        match self {
            Expr::Alias(a) => Some(a.alias.as_str()),
            _ => None,
        }
    }

    /// The expression under any alias wrappers.
    pub fn unaliased(&self) -> &Expr {
        match self {
            Expr::Alias(a) => a.expr.unaliased(),
            other => other,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Expr::Call(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Expr::Field(f) => Some(f),
            _ => None,
        }
    }

    /// Column name this expression produces in a result set.
    pub fn output_name(&self) -> String {
        match self {
            Expr::Alias(a) => a.alias.clone(),
            Expr::Field(f) => f.leaf().to_string(),
            other => other.to_string(),
        }
    }
}

impl From<Constant> for Expr {
    fn from(value: Constant) -> Self {
        Expr::Constant(value)
    }
}

impl From<Field> for Expr {
    fn from(value: Field) -> Self {
        Expr::Field(value)
    }
}

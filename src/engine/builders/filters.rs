use serde_json::Value;

use crate::command::types::{BreakdownBy, PropertyFilter, PropertyOperator};
use crate::engine::ast::{CompareOperator, Expr};

/// Column a property key reads from. Keys with no dedicated column fall back to
/// the `properties` map.
pub fn property_column(key: &str) -> Expr {
    match key {
        "$host" => Expr::field("host"),
        "$device_type" => Expr::field("device_type"),
        "$pathname" => Expr::field("pathname"),
        "$browser" => Expr::field("browser"),
        "$os" => Expr::field("os"),
        "$geoip_country_code" => Expr::field("country_code"),
        "$referring_domain" => Expr::field("referring_domain"),
        other => Expr::field_chain(&["properties", other]),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_expr(value: &Value) -> Expr {
    match value {
        Value::Array(items) => Expr::tuple(items.iter().map(value_expr).collect()),
        Value::Bool(b) => Expr::boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Expr::int(i),
            None => Expr::float(n.as_f64().unwrap_or_default()),
        },
        other => Expr::string(&value_text(other)),
    }
}

/// Predicate for one filter. A list value under `exact` / `is_not` means any of.
pub fn property_filter_expr(filter: &PropertyFilter) -> Expr {
    let column = property_column(&filter.key);
    match filter.operator {
        PropertyOperator::Exact | PropertyOperator::IsNot => {
            let negate = filter.operator == PropertyOperator::IsNot;
            match &filter.value {
                Value::Array(_) => {
                    let op = if negate {
                        CompareOperator::NotIn
                    } else {
                        CompareOperator::In
                    };
                    Expr::compare(op, column, value_expr(&filter.value))
                }
                value => {
                    let op = if negate {
                        CompareOperator::NotEq
                    } else {
                        CompareOperator::Eq
                    };
                    Expr::compare(op, column, value_expr(value))
                }
            }
        }
        PropertyOperator::Icontains | PropertyOperator::NotIcontains => {
            let op = if filter.operator == PropertyOperator::Icontains {
                CompareOperator::ILike
            } else {
                CompareOperator::NotILike
            };
            let pattern = format!("%{}%", value_text(&filter.value));
            Expr::compare(op, column, Expr::string(&pattern))
        }
        PropertyOperator::IsSet => Expr::call("isNotNull", vec![column]),
        PropertyOperator::IsNotSet => Expr::call("isNull", vec![column]),
    }
}

pub fn property_filters(filters: &[PropertyFilter]) -> Vec<Expr> {
    filters.iter().map(property_filter_expr).collect()
}

/// Column holding the value a breakdown groups on.
pub fn breakdown_column(breakdown: BreakdownBy) -> &'static str {
    match breakdown {
        BreakdownBy::Page => "pathname",
        BreakdownBy::InitialPage => "entry_pathname",
        BreakdownBy::ExitPage => "exit_pathname",
        BreakdownBy::DeviceType => "device_type",
        BreakdownBy::Browser => "browser",
        BreakdownBy::Os => "os",
        BreakdownBy::Country => "country_code",
        BreakdownBy::ReferringDomain => "referring_domain",
        BreakdownBy::Viewport => "viewport",
    }
}

/// Breakdown value with `NULL` and empty strings folded into `sentinel`.
pub fn breakdown_key_expr(breakdown: BreakdownBy, sentinel: &str) -> Expr {
    Expr::call(
        "ifNull",
        vec![
            Expr::call(
                "nullIf",
                vec![
                    Expr::call("toString", vec![Expr::field(breakdown_column(breakdown))]),
                    Expr::string(""),
                ],
            ),
            Expr::string(sentinel),
        ],
    )
}

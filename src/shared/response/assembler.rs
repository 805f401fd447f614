use chrono::{DateTime, SecondsFormat, Utc};

use crate::engine::errors::ResultShapeError;
use crate::engine::exec::ExecutionResult;
use crate::engine::types::ScalarValue;
use crate::shared::response::types::{ItemKind, OverviewItem};

/// Fails unless `result` has exactly `expected` columns, in order, and every row
/// has one value per column.
pub fn check_shape(result: &ExecutionResult, expected: &[String]) -> Result<(), ResultShapeError> {
    if result.columns != expected {
        return Err(ResultShapeError::ColumnMismatch {
            expected: expected.to_vec(),
            found: result.columns.clone(),
        });
    }
    for (row, values) in result.rows.iter().enumerate() {
        if values.len() != expected.len() {
            return Err(ResultShapeError::RowArity {
                row,
                expected: expected.len(),
                found: values.len(),
            });
        }
    }
    Ok(())
}

/// A numeric cell as `f64`, with `NULL`, `NaN` and infinities as `None`.
pub fn normalize(value: &ScalarValue, column: &str) -> Result<Option<f64>, ResultShapeError> {
    let number = match value {
        ScalarValue::Null => return Ok(None),
        ScalarValue::Int64(i) => *i as f64,
        ScalarValue::Float64(f) => *f,
        ScalarValue::Boolean(b) => f64::from(u8::from(*b)),
        other => {
            return Err(ResultShapeError::UnexpectedType {
                column: column.to_string(),
                value: format!("{other:?}"),
            });
        }
    };
    Ok(number.is_finite().then_some(number))
}

/// Reads a metric cell: a plain value, or a `(current, previous)` pair.
pub fn split_pair(
    value: &ScalarValue,
    column: &str,
) -> Result<(Option<f64>, Option<f64>), ResultShapeError> {
    match value {
        ScalarValue::Tuple(items) => match items.as_slice() {
            [current, previous] => Ok((normalize(current, column)?, normalize(previous, column)?)),
            _ => Err(ResultShapeError::TupleArity {
                column: column.to_string(),
                found: items.len(),
            }),
        },
        other => Ok((normalize(other, column)?, None)),
    }
}

pub fn change_from_previous(value: Option<f64>, previous: Option<f64>) -> Option<i64> {
    match (value, previous) {
        (Some(v), Some(p)) if p != 0.0 => Some((100.0 * (v - p) / p).round() as i64),
        _ => None,
    }
}

/// Everything the assembler needs to know about one metric column.
#[derive(Debug, Clone, Copy)]
pub struct MetricColumn<'a> {
    pub key: &'a str,
    pub kind: ItemKind,
    pub is_increase_bad: bool,
    pub transform: fn(f64) -> f64,
}

/// Current and previous values of one metric cell, in external units. Without a
/// requested comparison the previous value is always `None`.
pub fn metric_values(
    cell: &ScalarValue,
    column: &MetricColumn<'_>,
    requested_comparison: bool,
) -> Result<(Option<f64>, Option<f64>), ResultShapeError> {
    let (value, previous) = split_pair(cell, column.key)?;
    let transform = column.transform;
    let previous = if requested_comparison {
        previous.map(transform)
    } else {
        None
    };
    Ok((value.map(transform), previous))
}

pub fn overview_item(
    cell: &ScalarValue,
    column: &MetricColumn<'_>,
    requested_comparison: bool,
) -> Result<OverviewItem, ResultShapeError> {
    let (value, previous) = metric_values(cell, column, requested_comparison)?;
    Ok(OverviewItem {
        key: column.key.to_string(),
        kind: column.kind,
        value,
        previous,
        change_from_previous_pct: if requested_comparison {
            change_from_previous(value, previous)
        } else {
            None
        },
        is_increase_bad: column.is_increase_bad,
    })
}

/// A bucket cell as RFC 3339 in UTC, or `YYYY-MM-DD` for plain dates.
pub fn bucket_label(value: &ScalarValue, column: &str) -> Result<String, ResultShapeError> {
    match value {
        ScalarValue::Timestamp(ts) => DateTime::<Utc>::from_timestamp(*ts, 0)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            .ok_or_else(|| ResultShapeError::UnexpectedType {
                column: column.to_string(),
                value: ts.to_string(),
            }),
        ScalarValue::Date(d) => Ok(d.format("%Y-%m-%d").to_string()),
        ScalarValue::Utf8(s) => Ok(s.clone()),
        other => Err(ResultShapeError::UnexpectedType {
            column: column.to_string(),
            value: format!("{other:?}"),
        }),
    }
}

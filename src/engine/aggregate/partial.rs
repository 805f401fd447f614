use ahash::AHashSet;

use crate::engine::aggregate::function::AggregateFunction;
use crate::engine::errors::ExecutionError;
use crate::engine::types::ScalarValue;

/// Mergeable partial aggregate, the in-memory counterpart of a `...State` column.
#[derive(Clone, Debug, PartialEq)]
pub enum AggState {
    Count { count: i64 },
    Uniq { values: AHashSet<String> },
    Sum { sum: f64 },
    Avg { sum: f64, count: i64 },
}

impl AggState {
    pub fn empty(function: AggregateFunction) -> Self {
        match function {
            AggregateFunction::Count => AggState::Count { count: 0 },
            AggregateFunction::Uniq => AggState::Uniq {
                values: AHashSet::new(),
            },
            AggregateFunction::Sum => AggState::Sum { sum: 0.0 },
            AggregateFunction::Avg => AggState::Avg { sum: 0.0, count: 0 },
        }
    }

    pub fn function(&self) -> AggregateFunction {
        match self {
            AggState::Count { .. } => AggregateFunction::Count,
            AggState::Uniq { .. } => AggregateFunction::Uniq,
            AggState::Sum { .. } => AggregateFunction::Sum,
            AggState::Avg { .. } => AggregateFunction::Avg,
        }
    }

    /// Feeds one input row. `None` is the argument-less `count()`; `Null` inputs are
    /// skipped by every aggregate.
    pub fn update(&mut self, value: Option<&ScalarValue>) {
        if value.is_some_and(ScalarValue::is_null) {
            return;
        }
        match self {
            AggState::Count { count } => *count += 1,
            AggState::Uniq { values } => {
                if let Some(v) = value {
                    values.insert(v.to_string_repr());
                }
            }
            AggState::Sum { sum } => {
                if let Some(x) = value.and_then(ScalarValue::as_f64) {
                    *sum += x;
                }
            }
            AggState::Avg { sum, count } => {
                if let Some(x) = value.and_then(ScalarValue::as_f64) {
                    *sum += x;
                    *count += 1;
                }
            }
        }
    }

    /// Folds `other` into `self`. Both must be states of the same aggregate.
    pub fn merge(&mut self, other: &AggState) -> Result<(), ExecutionError> {
        match (&mut *self, other) {
            (AggState::Count { count: a }, AggState::Count { count: b }) => *a += *b,
            (AggState::Uniq { values: a }, AggState::Uniq { values: b }) => {
                for v in b {
                    a.insert(v.clone());
                }
            }
            (AggState::Sum { sum: a }, AggState::Sum { sum: b }) => *a += *b,
            (AggState::Avg { sum: a1, count: c1 }, AggState::Avg { sum: a2, count: c2 }) => {
                *a1 += *a2;
                *c1 += *c2;
            }
            (target, other) => {
                return Err(ExecutionError::Evaluation(format!(
                    "cannot merge a {} state into a {} state",
                    other.kind(),
                    target.kind()
                )));
            }
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        match self {
            AggState::Count { .. } => "count",
            AggState::Uniq { .. } => "uniq",
            AggState::Sum { .. } => "sum",
            AggState::Avg { .. } => "avg",
        }
    }

    /// Final scalar. An average over nothing is `NaN`, like the database's.
    pub fn finalize(&self) -> ScalarValue {
        match self {
            AggState::Count { count } => ScalarValue::Int64(*count),
            AggState::Uniq { values } => ScalarValue::Int64(values.len() as i64),
            AggState::Sum { sum } => ScalarValue::Float64(*sum),
            AggState::Avg { sum, count } => {
                if *count == 0 {
                    ScalarValue::Float64(f64::NAN)
                } else {
                    ScalarValue::Float64(*sum / *count as f64)
                }
            }
        }
    }
}

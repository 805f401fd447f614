use thiserror::Error;
use tracing::{debug, error};

use crate::shared::datetime::DateRangeError;

/// Errors raised by an execution gateway.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("Query timed out after {0} ms")]
    Timeout(u64),

    #[error("Query was cancelled")]
    Cancelled,

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Expression evaluation failed: {0}")]
    Evaluation(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Errors raised while building a query tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("Cannot combine zero branches")]
    NoBranches,

    #[error("Branch {index} aliases {found:?} differ from {expected:?}")]
    MismatchedAliases {
        index: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Alias '{0}' appears more than once in a select list")]
    DuplicateAlias(String),

    #[error("Request is not eligible for pre-aggregated tables")]
    NotPreAggregated,

    #[error("Invalid date range: {0}")]
    DateRange(#[from] DateRangeError),
}

/// Returned rows do not match the columns a builder asked for.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResultShapeError {
    #[error("Expected columns {expected:?}, got {found:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Row {row} has {found} values, expected {expected}")]
    RowArity {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Column '{column}' holds a tuple of {found} values, expected 2")]
    TupleArity { column: String, found: usize },

    #[error("Column '{column}' has unexpected value {value}")]
    UnexpectedType { column: String, value: String },

    #[error("Expected exactly one row, got {0}")]
    RowCount(usize),
}

/// Caller-facing error of a web stats request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WebStatsError {
    #[error("Query build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Query execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Unexpected result shape: {0}")]
    ResultShape(#[from] ResultShapeError),
}

impl WebStatsError {
    pub fn log_error(&self) {
        match self {
            WebStatsError::Build(e) => {
                error!(target: "hybrid_stats::builder", "Query build failed: {}", e);
                debug!(target: "hybrid_stats::builder", "Build error details: {:?}", e);
            }
            WebStatsError::Execution(e) => {
                error!(target: "hybrid_stats::exec", "Live query failed: {}", e);
                debug!(target: "hybrid_stats::exec", "Execution error details: {:?}", e);
            }
            WebStatsError::ResultShape(e) => {
                error!(target: "hybrid_stats::exec", "Result shape mismatch: {}", e);
                debug!(target: "hybrid_stats::exec", "Result shape details: {:?}", e);
            }
        }
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::command::types::Modifiers;
use crate::engine::ast::{QueryNode, SelectQuery};
use crate::engine::errors::ExecutionError;
use crate::engine::exec::eval::{Datum, Evaluator, Record};
use crate::engine::exec::gateway::{ExecutionGateway, ExecutionResult};
use crate::engine::types::ScalarValue;

/// Reference gateway over in-memory tables. Rollup tables hold real partial states,
/// so `...Merge` over them behaves like the database.
#[derive(Default)]
pub struct MemoryGateway {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends plain rows, creating the table on first use.
    pub async fn insert<I>(&self, table: &str, rows: I)
    where
        I: IntoIterator<Item = HashMap<String, ScalarValue>>,
    {
        let mut tables = self.tables.write().await;
        let target = tables.entry(table.to_string()).or_default();
        for row in rows {
            target.push(row.into_iter().map(|(k, v)| (k, Datum::Scalar(v))).collect());
        }
    }

    /// Runs `query` and appends its output, partial states included, to `table`.
    /// Returns the number of rows written.
    pub async fn materialize(&self, table: &str, query: &SelectQuery) -> Result<usize, ExecutionError> {
        let mut tables = self.tables.write().await;
        let relation = Evaluator::new(&tables).run_select(query)?;
        let records = relation.records();
        let written = records.len();
        tables.entry(table.to_string()).or_default().extend(records);
        debug!(target: "hybrid_stats::exec", table, rows = written, "Materialized rollup rows");
        Ok(written)
    }

    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }
}

#[async_trait]
impl ExecutionGateway for MemoryGateway {
    async fn execute(
        &self,
        query: &QueryNode,
        _modifiers: &Modifiers,
    ) -> Result<ExecutionResult, ExecutionError> {
        debug!(target: "hybrid_stats::exec", query = %query, "Executing in memory");
        let tables = self.tables.read().await;
        Evaluator::new(&tables).run(query)?.into_result()
    }
}

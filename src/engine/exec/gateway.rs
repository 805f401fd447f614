use async_trait::async_trait;
use serde::Serialize;

use crate::command::types::Modifiers;
use crate::engine::ast::QueryNode;
use crate::engine::errors::ExecutionError;
use crate::engine::types::ScalarValue;

/// Rows returned by a gateway, in select-list column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ScalarValue>>,
}

impl ExecutionResult {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// The analytical database. Timeouts, pooling and cancellation live behind this call.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn execute(
        &self,
        query: &QueryNode,
        modifiers: &Modifiers,
    ) -> Result<ExecutionResult, ExecutionError>;
}

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::command::types::Modifiers;
use crate::engine::ast::QueryNode;
use crate::engine::errors::ExecutionError;
use crate::engine::exec::{ExecutionGateway, ExecutionResult, MemoryGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fails any query touching a rollup table.
    TimeoutOnRollups,
    /// Answers rollup queries with no rows at all.
    EmptyOnRollups,
    /// Fails every query.
    Always,
}

/// Wraps a [`MemoryGateway`], injecting a fault and recording every query it sees.
pub struct FlakyGateway {
    inner: MemoryGateway,
    fault: Option<Fault>,
    calls: AtomicUsize,
    seen: Mutex<Vec<QueryNode>>,
}

impl FlakyGateway {
    pub fn new(inner: MemoryGateway) -> Self {
        Self {
            inner,
            fault: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn inner(&self) -> &MemoryGateway {
        &self.inner
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<QueryNode> {
        self.seen.lock().unwrap().clone()
    }
}

fn reads_rollups(query: &QueryNode) -> bool {
    query
        .tables()
        .iter()
        .any(|t| t == "web_stats_daily" || t == "web_pre_aggregated_stats")
}

#[async_trait]
impl ExecutionGateway for FlakyGateway {
    async fn execute(
        &self,
        query: &QueryNode,
        modifiers: &Modifiers,
    ) -> Result<ExecutionResult, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(query.clone());

        match self.fault {
            Some(Fault::Always) => Err(ExecutionError::Backend("connection reset".into())),
            Some(Fault::TimeoutOnRollups) if reads_rollups(query) => {
                Err(ExecutionError::Timeout(30_000))
            }
            Some(Fault::EmptyOnRollups) if reads_rollups(query) => Ok(ExecutionResult {
                columns: query.output_names(),
                rows: Vec::new(),
            }),
            _ => self.inner.execute(query, modifiers).await,
        }
    }
}

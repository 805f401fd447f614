use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::builders::PreAggregatedQueryBuilder;
use crate::engine::errors::{BuildError, ExecutionError, ResultShapeError, WebStatsError};
use crate::engine::exec::ExecutionGateway;

/// Why the pre-aggregated attempt did not produce a response. Absorbed by the
/// pipeline, which falls back to the live query.
#[derive(Debug, Error)]
pub(crate) enum PreAggregatedFailure {
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("unexpected result shape: {0}")]
    Shape(#[from] ResultShapeError),

    #[error("implausible result: {0}")]
    Implausible(String),
}

/// Runs one request: the pre-aggregated query when the plan allows it, then at
/// most one live attempt if that fails.
pub struct QueryExecutionPipeline<'a, B> {
    builder: B,
    gateway: &'a dyn ExecutionGateway,
}

impl<'a, B: PreAggregatedQueryBuilder> QueryExecutionPipeline<'a, B> {
    pub fn new(builder: B, gateway: &'a dyn ExecutionGateway) -> Self {
        Self { builder, gateway }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub async fn execute(&self) -> Result<B::Output, WebStatsError> {
        let ctx = self.builder.context();
        let plan = ctx.plan();

        if plan.uses_pre_aggregated() {
            match self.attempt_pre_aggregated().await {
                Ok(output) => return Ok(output),
                Err(failure) => {
                    warn!(
                        target: "hybrid_stats::fallback",
                        plan = %plan,
                        date_from = %ctx.range.from.to_rfc3339(),
                        date_to = %ctx.range.to.to_rfc3339(),
                        error = %failure,
                        "Pre-aggregated query failed, falling back to live"
                    );
                }
            }
        } else {
            debug!(
                target: "hybrid_stats::fallback",
                reason = %ctx.decision.reason,
                "Answering from live events"
            );
        }

        self.attempt_live().await
    }

    async fn attempt_pre_aggregated(&self) -> Result<B::Output, PreAggregatedFailure> {
        let query = self.builder.get_query()?;
        let result = self
            .gateway
            .execute(&query, &self.builder.context().modifiers)
            .await?;
        self.builder
            .is_plausible(&result)
            .map_err(PreAggregatedFailure::Implausible)?;
        Ok(self.builder.assemble(&result, true)?)
    }

    async fn attempt_live(&self) -> Result<B::Output, WebStatsError> {
        let query = self.builder.live_query()?;
        let result = self
            .gateway
            .execute(&query, &self.builder.context().modifiers)
            .await?;
        Ok(self.builder.assemble(&result, false)?)
    }
}

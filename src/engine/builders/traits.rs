use crate::command::types::Metric;
use crate::engine::ast::{Expr, QueryNode};
use crate::engine::builders::context::BuildContext;
use crate::engine::errors::{BuildError, ResultShapeError};
use crate::engine::exec::ExecutionResult;
use crate::engine::planner::QueryPlan;

/// One metric family's query construction and result assembly.
///
/// `get_query` targets the rollups (plus today's raw events when the plan is
/// `Combined`); `live_query` answers the same request from raw events only and
/// is what the pipeline falls back to.
pub trait PreAggregatedQueryBuilder {
    type Output;

    fn context(&self) -> &BuildContext<'_>;

    fn plan(&self) -> QueryPlan {
        self.context().plan()
    }

    fn get_query(&self) -> Result<QueryNode, BuildError>;

    fn live_query(&self) -> Result<QueryNode, BuildError>;

    /// Aliased merge expressions for `requested`, visitors when empty.
    fn metric_exprs(&self, requested: Option<&[Metric]>) -> Vec<Expr>;

    /// Rejects a pre-aggregated result that cannot be right, such as no rows
    /// where the query always yields some.
    fn is_plausible(&self, result: &ExecutionResult) -> Result<(), String>;

    fn assemble(
        &self,
        result: &ExecutionResult,
        used_pre_aggregated: bool,
    ) -> Result<Self::Output, ResultShapeError>;
}

/// Rejects a `LiveOnly` plan before any rollup query is built.
pub(crate) fn require_pre_aggregated(ctx: &BuildContext<'_>) -> Result<(), BuildError> {
    if ctx.plan().uses_pre_aggregated() {
        Ok(())
    } else {
        Err(BuildError::NotPreAggregated)
    }
}

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::command::types::{OverviewQuery, StatsTableQuery, Team, TrendsQuery, WebQuery};
use crate::engine::ast::QueryNode;
use crate::engine::builders::{
    OverviewQueryBuilder, PreAggregatedQueryBuilder, StatsTableQueryBuilder, TrendsQueryBuilder,
};
use crate::engine::errors::WebStatsError;
use crate::engine::exec::ExecutionGateway;
use crate::engine::planner::RoutingDecision;
use crate::shared::config::QueryConfig;
use crate::shared::response::{
    BreakdownResponse, OverviewResponse, TrendsResponse, WebStatsResponse,
};

use super::orchestrator::QueryExecutionPipeline;

/// The query a request would run first, with the routing decision behind it.
#[derive(Debug, Clone)]
pub struct QueryExplanation {
    pub decision: RoutingDecision,
    pub query: QueryNode,
}

/// Answers web stats requests for one team against one gateway.
pub struct WebStatsHandler<'a> {
    gateway: &'a dyn ExecutionGateway,
    team: &'a Team,
    config: &'a QueryConfig,
    now: DateTime<Utc>,
}

impl<'a> WebStatsHandler<'a> {
    pub fn new(gateway: &'a dyn ExecutionGateway, team: &'a Team, config: &'a QueryConfig) -> Self {
        Self {
            gateway,
            team,
            config,
            now: Utc::now(),
        }
    }

    /// Pins the clock the routing decision is made against.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub async fn overview(&self, query: &OverviewQuery) -> Result<OverviewResponse, WebStatsError> {
        let builder = OverviewQueryBuilder::new(query, self.team, self.now, self.config)?;
        QueryExecutionPipeline::new(builder, self.gateway).execute().await
    }

    pub async fn stats_table(
        &self,
        query: &StatsTableQuery,
    ) -> Result<BreakdownResponse, WebStatsError> {
        let builder = StatsTableQueryBuilder::new(query, self.team, self.now, self.config)?;
        QueryExecutionPipeline::new(builder, self.gateway).execute().await
    }

    pub async fn trends(&self, query: &TrendsQuery) -> Result<TrendsResponse, WebStatsError> {
        let builder = TrendsQueryBuilder::new(query, self.team, self.now, self.config)?;
        QueryExecutionPipeline::new(builder, self.gateway).execute().await
    }

    pub async fn handle(&self, query: &WebQuery) -> Result<WebStatsResponse, WebStatsError> {
        debug!(
            target: "hybrid_stats::builder",
            team_id = self.team.id,
            family = ?query.family(),
            "Handling web stats request"
        );
        let response = match query {
            WebQuery::Overview(q) => self.overview(q).await.map(WebStatsResponse::Overview),
            WebQuery::StatsTable(q) => self.stats_table(q).await.map(WebStatsResponse::Breakdown),
            WebQuery::Trends(q) => self.trends(q).await.map(WebStatsResponse::Trends),
        };
        response.inspect_err(WebStatsError::log_error)
    }

    /// Builds, without executing, the query the pipeline would try first.
    pub fn explain(&self, query: &WebQuery) -> Result<QueryExplanation, WebStatsError> {
        match query {
            WebQuery::Overview(q) => {
                explain(OverviewQueryBuilder::new(q, self.team, self.now, self.config)?)
            }
            WebQuery::StatsTable(q) => {
                explain(StatsTableQueryBuilder::new(q, self.team, self.now, self.config)?)
            }
            WebQuery::Trends(q) => {
                explain(TrendsQueryBuilder::new(q, self.team, self.now, self.config)?)
            }
        }
    }
}

fn explain<B: PreAggregatedQueryBuilder>(builder: B) -> Result<QueryExplanation, WebStatsError> {
    let decision = builder.context().decision.clone();
    let query = if decision.plan.uses_pre_aggregated() {
        builder.get_query()?
    } else {
        builder.live_query()?
    };
    Ok(QueryExplanation { decision, query })
}

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::debug;

use crate::command::types::{BreakdownBy, Metric, StatsTableQuery, Team, WebQuery};
use crate::engine::aggregate::{MergeLayout, combine, to_state_form};
use crate::engine::ast::{Expr, OrderExpr, QueryNode, SelectQuery};
use crate::engine::builders::context::BuildContext;
use crate::engine::builders::filters::breakdown_key_expr;
use crate::engine::builders::metrics::{
    ColumnSource, MetricDefinition, PeriodConditions, metric_value_expr, needed_states,
    resolve_metrics,
};
use crate::engine::builders::traits::{PreAggregatedQueryBuilder, require_pre_aggregated};
use crate::engine::errors::{BuildError, ResultShapeError};
use crate::engine::exec::ExecutionResult;
use crate::engine::planner::QueryPlan;
use crate::engine::types::ScalarValue;
use crate::shared::config::QueryConfig;
use crate::shared::response::assembler::{MetricColumn, check_shape, metric_values};
use crate::shared::response::{BreakdownResponse, CellValue, Page, next_link};

pub const BREAKDOWN_ALIAS: &str = "breakdown_value";

/// Top values of one dimension with their metrics, paginated.
pub struct StatsTableQueryBuilder<'a> {
    ctx: BuildContext<'a>,
    breakdown: BreakdownBy,
    definitions: Vec<&'static MetricDefinition>,
    page: Page,
    url: Option<String>,
    merged_periods: PeriodConditions,
}

impl<'a> StatsTableQueryBuilder<'a> {
    pub fn new(
        query: &StatsTableQuery,
        team: &'a Team,
        now: DateTime<Utc>,
        config: &'a QueryConfig,
    ) -> Result<Self, BuildError> {
        let ctx = BuildContext::new(&WebQuery::StatsTable(query.clone()), team, now, config)?;
        let definitions = resolve_metrics(
            query.metrics.as_deref(),
            Some(query.breakdown_by),
            ctx.goal.is_some(),
        );
        if let Some(requested) = &query.metrics {
            let dropped: Vec<Metric> = requested
                .iter()
                .copied()
                .filter(|m| !definitions.iter().any(|d| d.metric == *m))
                .collect();
            if !dropped.is_empty() {
                debug!(
                    target: "hybrid_stats::builder",
                    breakdown = ?query.breakdown_by,
                    dropped = ?dropped,
                    "Omitting metrics not defined for this breakdown"
                );
            }
        }
        let merged_periods = ctx.bucket_periods()?;

        Ok(Self {
            page: Page::new(query.limit, query.offset, config),
            breakdown: query.breakdown_by,
            url: query.url.clone(),
            ctx,
            definitions,
            merged_periods,
        })
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn definitions(&self) -> &[&'static MetricDefinition] {
        &self.definitions
    }

    fn key(&self) -> Expr {
        breakdown_key_expr(self.breakdown, &self.ctx.config.breakdown_null_sentinel)
            .alias(BREAKDOWN_ALIAS)
    }

    fn order_by(&self) -> Vec<OrderExpr> {
        let mut order = Vec::with_capacity(2);
        if let Some(first) = self.definitions.first() {
            order.push(Expr::field(first.internal_column).desc());
        }
        order.push(Expr::field(BREAKDOWN_ALIAS).asc());
        order
    }

    fn expected_columns(&self) -> Vec<String> {
        std::iter::once(BREAKDOWN_ALIAS.to_string())
            .chain(self.definitions.iter().map(|d| d.internal_column.to_string()))
            .collect()
    }
}

impl PreAggregatedQueryBuilder for StatsTableQueryBuilder<'_> {
    type Output = BreakdownResponse;

    fn context(&self) -> &BuildContext<'_> {
        &self.ctx
    }

    fn get_query(&self) -> Result<QueryNode, BuildError> {
        require_pre_aggregated(&self.ctx)?;
        let needed = needed_states(&self.definitions);
        let keys = [self.key()];

        let mut branches = vec![self.ctx.rollup_branch(&keys, &needed, &[])?];
        if self.plan() == QueryPlan::Combined {
            branches.push(to_state_form(&self.ctx.today_branch(&keys, &needed, &[])?));
        }

        let mut outputs = vec![Expr::field(BREAKDOWN_ALIAS)];
        outputs.extend(self.metric_exprs(None));
        let layout = MergeLayout {
            outputs,
            group_by: vec![Expr::field(BREAKDOWN_ALIAS)],
            ..MergeLayout::default()
        }
        .with_order_by(self.order_by())
        .with_limit(Some(self.page.fetch_limit()), Some(self.page.offset));

        Ok(combine(branches, &layout)?.into())
    }

    fn live_query(&self) -> Result<QueryNode, BuildError> {
        let source = ColumnSource::Live {
            goal: self.ctx.goal(),
        };
        let periods = self.ctx.live_periods();
        let mut select = vec![self.key()];
        select.extend(
            self.definitions
                .iter()
                .map(|d| metric_value_expr(d, source, &periods, self.ctx.config.zero_denominator)),
        );

        Ok(SelectQuery::from_table(&self.ctx.config.events_table)
            .with_select(select)
            .and_where(self.ctx.live_where())
            .with_group_by(vec![Expr::field(BREAKDOWN_ALIAS)])
            .with_order_by(self.order_by())
            .with_limit(Some(self.page.fetch_limit()))
            .with_offset(Some(self.page.offset))
            .into())
    }

    fn metric_exprs(&self, requested: Option<&[Metric]>) -> Vec<Expr> {
        let definitions = match requested {
            Some(_) => resolve_metrics(requested, Some(self.breakdown), self.ctx.goal.is_some()),
            None => self.definitions.clone(),
        };
        definitions
            .iter()
            .map(|d| {
                metric_value_expr(
                    d,
                    ColumnSource::Merged,
                    &self.merged_periods,
                    self.ctx.config.zero_denominator,
                )
            })
            .collect()
    }

    fn is_plausible(&self, result: &ExecutionResult) -> Result<(), String> {
        if result.rows.is_empty() {
            return Err("breakdown returned no rows".to_string());
        }
        if result.rows.len() > self.page.fetch_limit() {
            return Err(format!(
                "breakdown returned {} rows for a page of {}",
                result.rows.len(),
                self.page.limit
            ));
        }
        Ok(())
    }

    fn assemble(
        &self,
        result: &ExecutionResult,
        used_pre_aggregated: bool,
    ) -> Result<BreakdownResponse, ResultShapeError> {
        let columns = self.expected_columns();
        check_shape(result, &columns)?;

        let compare = self.ctx.compare();
        let mut results = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            let mut out = IndexMap::with_capacity(row.len());
            let key = match &row[0] {
                ScalarValue::Null => self.ctx.config.breakdown_null_sentinel.clone(),
                value => value.to_string_repr(),
            };
            out.insert(BREAKDOWN_ALIAS.to_string(), CellValue::Text(key));

            for (def, cell) in self.definitions.iter().zip(&row[1..]) {
                let column = MetricColumn {
                    key: def.external_key,
                    kind: def.kind,
                    is_increase_bad: def.is_increase_bad,
                    transform: def.transform,
                };
                let (value, previous) = metric_values(cell, &column, compare)?;
                let cell = if compare {
                    CellValue::Pair(value, previous)
                } else {
                    CellValue::Number(value)
                };
                out.insert(def.external_key.to_string(), cell);
            }
            results.push(out);
        }

        let has_more = self.page.trim(&mut results);
        Ok(BreakdownResponse {
            columns: std::iter::once(BREAKDOWN_ALIAS)
                .chain(self.definitions.iter().map(|d| d.external_key))
                .map(str::to_string)
                .collect(),
            results,
            has_more,
            next: next_link(self.url.as_deref(), &self.page, has_more),
            used_pre_aggregated_tables: used_pre_aggregated,
        })
    }
}

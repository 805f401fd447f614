use chrono::{DateTime, Utc};

use crate::command::types::{Metric, OverviewQuery, Team, WebQuery};
use crate::engine::aggregate::{MergeLayout, combine, to_state_form};
use crate::engine::ast::{Expr, QueryNode, SelectQuery};
use crate::engine::builders::context::BuildContext;
use crate::engine::builders::metrics::{
    ColumnSource, MetricDefinition, PeriodConditions, metric_value_expr, needed_states,
    resolve_metrics,
};
use crate::engine::builders::tables::StateColumn;
use crate::engine::builders::traits::{PreAggregatedQueryBuilder, require_pre_aggregated};
use crate::engine::errors::{BuildError, ResultShapeError};
use crate::engine::exec::ExecutionResult;
use crate::engine::planner::QueryPlan;
use crate::shared::config::QueryConfig;
use crate::shared::response::assembler::{MetricColumn, check_shape, overview_item, split_pair};
use crate::shared::response::OverviewResponse;

const BASE_METRICS: &[Metric] = &[
    Metric::Visitors,
    Metric::Views,
    Metric::Sessions,
    Metric::SessionDuration,
    Metric::BounceRate,
];

const TRAFFIC_METRICS: &[Metric] = &[Metric::Visitors, Metric::Views, Metric::Sessions];

/// Site-wide totals: one row, one column per metric.
pub struct OverviewQueryBuilder<'a> {
    ctx: BuildContext<'a>,
    definitions: Vec<&'static MetricDefinition>,
    merged_periods: PeriodConditions,
}

impl<'a> OverviewQueryBuilder<'a> {
    pub fn new(
        query: &OverviewQuery,
        team: &'a Team,
        now: DateTime<Utc>,
        config: &'a QueryConfig,
    ) -> Result<Self, BuildError> {
        let ctx = BuildContext::new(&WebQuery::Overview(query.clone()), team, now, config)?;

        let mut metrics = BASE_METRICS.to_vec();
        if query.include_revenue {
            metrics.push(Metric::Revenue);
        }
        if query.conversion_goal.is_some() {
            metrics.extend([Metric::Conversions, Metric::ConversionRate]);
        }
        let definitions = resolve_metrics(Some(metrics.as_slice()), None, ctx.goal.is_some());
        let merged_periods = ctx.bucket_periods()?;

        Ok(Self {
            ctx,
            definitions,
            merged_periods,
        })
    }

    pub fn definitions(&self) -> &[&'static MetricDefinition] {
        &self.definitions
    }

    fn expected_columns(&self) -> Vec<String> {
        self.definitions
            .iter()
            .map(|d| d.internal_column.to_string())
            .collect()
    }

    /// Revenue travels in every branch, as a typed `NULL` when not asked for.
    fn branch_states(&self) -> (Vec<StateColumn>, Vec<StateColumn>) {
        let needed = needed_states(&self.definitions);
        let placeholders = if needed.contains(&StateColumn::RevenueSum) {
            Vec::new()
        } else {
            vec![StateColumn::RevenueSum]
        };
        (needed, placeholders)
    }
}

impl PreAggregatedQueryBuilder for OverviewQueryBuilder<'_> {
    type Output = OverviewResponse;

    fn context(&self) -> &BuildContext<'_> {
        &self.ctx
    }

    fn get_query(&self) -> Result<QueryNode, BuildError> {
        require_pre_aggregated(&self.ctx)?;
        let (needed, placeholders) = self.branch_states();

        let mut branches = vec![self.ctx.rollup_branch(&[], &needed, &placeholders)?];
        if self.plan() == QueryPlan::Combined {
            branches.push(to_state_form(
                &self.ctx.today_branch(&[], &needed, &placeholders)?,
            ));
        }

        let layout = MergeLayout {
            outputs: self.metric_exprs(None),
            ..MergeLayout::default()
        };
        Ok(combine(branches, &layout)?.into())
    }

    fn live_query(&self) -> Result<QueryNode, BuildError> {
        let source = ColumnSource::Live {
            goal: self.ctx.goal(),
        };
        let periods = self.ctx.live_periods();
        let select = self
            .definitions
            .iter()
            .map(|d| metric_value_expr(d, source, &periods, self.ctx.config.zero_denominator))
            .collect();

        Ok(SelectQuery::from_table(&self.ctx.config.events_table)
            .with_select(select)
            .and_where(self.ctx.live_where())
            .into())
    }

    fn metric_exprs(&self, requested: Option<&[Metric]>) -> Vec<Expr> {
        let definitions = match requested {
            Some(_) => resolve_metrics(requested, None, self.ctx.goal.is_some()),
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

    /// One row, and some traffic in it. An aggregate without GROUP BY always
    /// returns a row, so all-zero totals are how missing rollups show up.
    fn is_plausible(&self, result: &ExecutionResult) -> Result<(), String> {
        let [row] = result.rows.as_slice() else {
            return Err(format!(
                "overview returned {} rows, expected exactly one",
                result.rows.len()
            ));
        };

        let has_traffic = self
            .definitions
            .iter()
            .zip(row)
            .filter(|(def, _)| TRAFFIC_METRICS.contains(&def.metric))
            .any(|(def, cell)| match split_pair(cell, def.internal_column) {
                Ok((current, previous)) => [current, previous]
                    .into_iter()
                    .flatten()
                    .any(|v| v != 0.0),
                Err(_) => false,
            });

        if has_traffic {
            Ok(())
        } else {
            Err("overview has no visitors, views or sessions".to_string())
        }
    }

    fn assemble(
        &self,
        result: &ExecutionResult,
        used_pre_aggregated: bool,
    ) -> Result<OverviewResponse, ResultShapeError> {
        check_shape(result, &self.expected_columns())?;
        let [row] = result.rows.as_slice() else {
            return Err(ResultShapeError::RowCount(result.rows.len()));
        };

        let compare = self.ctx.compare();
        let mut results = Vec::with_capacity(self.definitions.len());
        for (def, cell) in self.definitions.iter().zip(row) {
            let column = MetricColumn {
                key: def.external_key,
                kind: def.kind,
                is_increase_bad: def.is_increase_bad,
                transform: def.transform,
            };
            results.push(overview_item(cell, &column, compare)?);
        }

        Ok(OverviewResponse {
            results,
            used_pre_aggregated_tables: used_pre_aggregated,
        })
    }
}

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::command::types::{Interval, Metric, Team, TrendsQuery, WebQuery};
use crate::engine::aggregate::{MergeLayout, combine, to_state_form};
use crate::engine::ast::{Expr, QueryNode, SelectQuery};
use crate::engine::builders::context::BuildContext;
use crate::engine::builders::metrics::{
    ColumnSource, MetricDefinition, PeriodConditions, metric_value_expr, needed_states,
    resolve_metrics,
};
use crate::engine::builders::tables::BUCKET_ALIAS;
use crate::engine::builders::traits::{PreAggregatedQueryBuilder, require_pre_aggregated};
use crate::engine::errors::{BuildError, ResultShapeError};
use crate::engine::exec::ExecutionResult;
use crate::engine::planner::QueryPlan;
use crate::shared::config::QueryConfig;
use crate::shared::response::assembler::{bucket_label, check_shape, split_pair};
use crate::shared::response::{TrendPoint, TrendsResponse};

pub const TIME_BUCKET_ALIAS: &str = "bucket";

/// Metrics per time bucket, oldest bucket first.
pub struct TrendsQueryBuilder<'a> {
    ctx: BuildContext<'a>,
    interval: Interval,
    definitions: Vec<&'static MetricDefinition>,
}

impl<'a> TrendsQueryBuilder<'a> {
    pub fn new(
        query: &TrendsQuery,
        team: &'a Team,
        now: DateTime<Utc>,
        config: &'a QueryConfig,
    ) -> Result<Self, BuildError> {
        let ctx = BuildContext::new(&WebQuery::Trends(query.clone()), team, now, config)?;
        let definitions = resolve_metrics(query.metrics.as_deref(), None, ctx.goal.is_some());
        Ok(Self {
            ctx,
            interval: query.interval,
            definitions,
        })
    }

    /// Truncates `column` to the start of its interval.
    pub fn bucket_expr(&self, column: Expr) -> Expr {
        match self.interval {
            Interval::Minute => Expr::call("toStartOfMinute", vec![column]),
            Interval::Hour => Expr::call("toStartOfHour", vec![column]),
            Interval::Day => Expr::call("toStartOfDay", vec![column]),
            Interval::Week => Expr::call(
                "toStartOfWeek",
                vec![column, Expr::int(self.ctx.config.week_start.mode())],
            ),
            Interval::Month => Expr::call("toStartOfMonth", vec![column]),
        }
    }

    fn expected_columns(&self) -> Vec<String> {
        std::iter::once(TIME_BUCKET_ALIAS.to_string())
            .chain(self.definitions.iter().map(|d| d.internal_column.to_string()))
            .collect()
    }
}

impl PreAggregatedQueryBuilder for TrendsQueryBuilder<'_> {
    type Output = TrendsResponse;

    fn context(&self) -> &BuildContext<'_> {
        &self.ctx
    }

    fn get_query(&self) -> Result<QueryNode, BuildError> {
        require_pre_aggregated(&self.ctx)?;
        let needed = needed_states(&self.definitions);

        let mut branches = vec![self.ctx.rollup_branch(&[], &needed, &[])?];
        if self.plan() == QueryPlan::Combined {
            branches.push(to_state_form(&self.ctx.today_branch(&[], &needed, &[])?));
        }

        let mut outputs = vec![self.bucket_expr(Expr::field(BUCKET_ALIAS)).alias(TIME_BUCKET_ALIAS)];
        outputs.extend(self.metric_exprs(None));
        let layout = MergeLayout {
            outputs,
            group_by: vec![Expr::field(TIME_BUCKET_ALIAS)],
            ..MergeLayout::default()
        }
        .with_order_by(vec![Expr::field(TIME_BUCKET_ALIAS).asc()]);

        Ok(combine(branches, &layout)?.into())
    }

    fn live_query(&self) -> Result<QueryNode, BuildError> {
        let source = ColumnSource::Live {
            goal: self.ctx.goal(),
        };
        let periods = PeriodConditions::default();
        let mut select = vec![self.bucket_expr(Expr::field("timestamp")).alias(TIME_BUCKET_ALIAS)];
        select.extend(
            self.definitions
                .iter()
                .map(|d| metric_value_expr(d, source, &periods, self.ctx.config.zero_denominator)),
        );

        Ok(SelectQuery::from_table(&self.ctx.config.events_table)
            .with_select(select)
            .and_where(self.ctx.live_where())
            .with_group_by(vec![Expr::field(TIME_BUCKET_ALIAS)])
            .with_order_by(vec![Expr::field(TIME_BUCKET_ALIAS).asc()])
            .into())
    }

    fn metric_exprs(&self, requested: Option<&[Metric]>) -> Vec<Expr> {
        let definitions = match requested {
            Some(_) => resolve_metrics(requested, None, self.ctx.goal.is_some()),
            None => self.definitions.clone(),
        };
        let periods = PeriodConditions::default();
        definitions
            .iter()
            .map(|d| {
                metric_value_expr(
                    d,
                    ColumnSource::Merged,
                    &periods,
                    self.ctx.config.zero_denominator,
                )
            })
            .collect()
    }

    fn is_plausible(&self, result: &ExecutionResult) -> Result<(), String> {
        if result.rows.is_empty() {
            Err("trends returned no buckets".to_string())
        } else {
            Ok(())
        }
    }

    fn assemble(
        &self,
        result: &ExecutionResult,
        used_pre_aggregated: bool,
    ) -> Result<TrendsResponse, ResultShapeError> {
        check_shape(result, &self.expected_columns())?;

        let mut results = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            let bucket = bucket_label(&row[0], TIME_BUCKET_ALIAS)?;
            let mut metrics = IndexMap::with_capacity(self.definitions.len());
            for (def, cell) in self.definitions.iter().zip(&row[1..]) {
                let (value, _) = split_pair(cell, def.internal_column)?;
                metrics.insert(def.external_key.to_string(), value.map(def.transform));
            }
            results.push(TrendPoint { bucket, metrics });
        }

        Ok(TrendsResponse {
            results,
            used_pre_aggregated_tables: used_pre_aggregated,
        })
    }
}

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::command::types::{Modifiers, PropertyFilter, Team, WebQuery};
use crate::engine::ast::{CompareOperator, Expr, SelectQuery};
use crate::engine::builders::filters::property_filters;
use crate::engine::builders::metrics::PeriodConditions;
use crate::engine::builders::tables::{BUCKET_ALIAS, RollupTables, StateColumn};
use crate::engine::errors::BuildError;
use crate::engine::planner::{QueryPlan, RoutingDecision, evaluate};
use crate::shared::config::QueryConfig;
use crate::shared::datetime::date_range::start_of_day;
use crate::shared::datetime::{ResolvedDateRange, resolve_date_range};

/// Everything a builder needs about one request, resolved once.
#[derive(Debug, Clone)]
pub struct BuildContext<'a> {
    pub team: &'a Team,
    pub config: &'a QueryConfig,
    pub modifiers: Modifiers,
    pub now: DateTime<Utc>,
    pub decision: RoutingDecision,
    pub range: ResolvedDateRange,
    /// Comparison period, when one was requested.
    pub previous: Option<ResolvedDateRange>,
    pub tables: RollupTables,
    pub properties: Vec<PropertyFilter>,
    pub goal: Option<String>,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        query: &WebQuery,
        team: &'a Team,
        now: DateTime<Utc>,
        config: &'a QueryConfig,
    ) -> Result<Self, BuildError> {
        let modifiers = *query.modifiers();
        let decision = evaluate(query, &modifiers, team, now, config);

        let tz = if modifiers.convert_to_project_timezone {
            team.timezone()
        } else {
            Tz::UTC
        };
        let requested = query.date_range();
        let range = resolve_date_range(
            requested.date_from.as_deref(),
            requested.date_to.as_deref(),
            &config.default_date_from,
            tz,
            now,
        )?;
        let previous = if query.wants_comparison() {
            Some(range.previous_period()?)
        } else {
            None
        };

        Ok(Self {
            team,
            config,
            modifiers,
            now,
            decision,
            range,
            previous,
            tables: RollupTables::for_version(modifiers.effective_table_version(team)),
            properties: query.properties().to_vec(),
            goal: query.conversion_goal().map(|g| g.custom_event.clone()),
        })
    }

    pub fn plan(&self) -> QueryPlan {
        self.decision.plan
    }

    pub fn compare(&self) -> bool {
        self.previous.is_some()
    }

    pub fn goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    /// Earliest instant any requested period touches.
    fn window_start(&self) -> DateTime<Utc> {
        self.previous
            .as_ref()
            .map_or(self.range.from, |p| p.from)
            .with_timezone(&Utc)
    }

    fn window_end(&self) -> DateTime<Utc> {
        self.range.to.with_timezone(&Utc)
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    fn day_start(&self, date: NaiveDate) -> Result<DateTime<Utc>, BuildError> {
        Ok(start_of_day(date, Tz::UTC)?.with_timezone(&Utc))
    }

    fn team_filter(&self) -> Expr {
        Expr::equals(Expr::field("team_id"), Expr::int(self.team.id))
    }

    fn between(column: Expr, from: DateTime<Utc>, to: DateTime<Utc>) -> Expr {
        Expr::and(vec![
            Expr::gt_eq(column.clone(), Expr::datetime(from)),
            Expr::lt_eq(column, Expr::datetime(to)),
        ])
    }

    fn with_filters(&self, mut predicates: Vec<Expr>) -> Expr {
        predicates.extend(property_filters(&self.properties));
        Expr::and(predicates)
    }

    /// WHERE of a live query: the whole window, comparison period included.
    pub fn live_where(&self) -> Expr {
        self.with_filters(vec![
            self.team_filter(),
            Self::between(Expr::field("timestamp"), self.window_start(), self.window_end()),
        ])
    }

    /// WHERE of the rollup branch: every whole day of the window before today.
    pub fn rollup_where(&self) -> Result<Expr, BuildError> {
        let yesterday = self.today() - Duration::days(1);
        let last_day = self.range.to_date().min(yesterday);
        let first_day = self.window_start().date_naive();
        Ok(self.with_filters(vec![
            self.team_filter(),
            Self::between(
                Expr::field(self.tables.bucket_column),
                self.day_start(first_day)?,
                self.day_start(last_day)?,
            ),
        ]))
    }

    /// WHERE of the live branch of a combined query: today, up to the end of the range.
    pub fn today_where(&self) -> Result<Expr, BuildError> {
        Ok(self.with_filters(vec![
            self.team_filter(),
            Self::between(
                Expr::field("timestamp"),
                self.day_start(self.today())?,
                self.window_end(),
            ),
        ]))
    }

    /// Conditions splitting a live scan into current and previous period.
    pub fn live_periods(&self) -> PeriodConditions {
        match &self.previous {
            None => PeriodConditions::default(),
            Some(previous) => PeriodConditions {
                current: Some(Self::between(
                    Expr::field("timestamp"),
                    self.range.from.with_timezone(&Utc),
                    self.range.to.with_timezone(&Utc),
                )),
                previous: Some(Self::between(
                    Expr::field("timestamp"),
                    previous.from.with_timezone(&Utc),
                    previous.to.with_timezone(&Utc),
                )),
            },
        }
    }

    /// Conditions splitting merged branches into current and previous period by day bucket.
    pub fn bucket_periods(&self) -> Result<PeriodConditions, BuildError> {
        let Some(previous) = &self.previous else {
            return Ok(PeriodConditions::default());
        };
        let bucket = Expr::field(BUCKET_ALIAS);
        Ok(PeriodConditions {
            current: Some(Self::between(
                bucket.clone(),
                self.day_start(self.range.from_date())?,
                self.day_start(self.range.to_date())?,
            )),
            previous: Some(Expr::and(vec![
                Expr::gt_eq(
                    bucket.clone(),
                    Expr::datetime(self.day_start(previous.from_date())?),
                ),
                Expr::compare(
                    CompareOperator::Lt,
                    bucket,
                    Expr::datetime(self.day_start(self.range.from_date())?),
                ),
            ])),
        })
    }

    fn state_select(&self, live: bool, needed: &[StateColumn], placeholders: &[StateColumn]) -> Vec<Expr> {
        let mut select = Vec::with_capacity(needed.len() + placeholders.len());
        for column in needed {
            let expr = if live {
                column.live_aggregate(self.goal(), None)
            } else if column.in_rollup(&self.tables) {
                Expr::field(column.alias())
            } else {
                Expr::typed_null(column.placeholder_type())
            };
            select.push(expr.alias(column.alias()));
        }
        for column in placeholders {
            select.push(Expr::typed_null(column.placeholder_type()).alias(column.alias()));
        }
        select
    }

    /// Plain scan of the rollup table: `keys`, the day bucket, then state columns.
    pub fn rollup_branch(
        &self,
        keys: &[Expr],
        needed: &[StateColumn],
        placeholders: &[StateColumn],
    ) -> Result<SelectQuery, BuildError> {
        let mut select = keys.to_vec();
        select.push(Expr::field(self.tables.bucket_column).alias(BUCKET_ALIAS));
        select.extend(self.state_select(false, needed, placeholders));
        Ok(SelectQuery::from_table(self.tables.name)
            .with_select(select)
            .and_where(self.rollup_where()?))
    }

    /// Today's raw events aggregated per day into the rollup's column layout.
    /// Still in direct form; callers convert it to state form.
    pub fn today_branch(
        &self,
        keys: &[Expr],
        needed: &[StateColumn],
        placeholders: &[StateColumn],
    ) -> Result<SelectQuery, BuildError> {
        let mut select = keys.to_vec();
        select.push(Expr::call("toStartOfDay", vec![Expr::field("timestamp")]).alias(BUCKET_ALIAS));
        select.extend(self.state_select(true, needed, placeholders));

        let mut group_by = vec![Expr::field(BUCKET_ALIAS)];
        group_by.extend(keys.iter().map(|k| Expr::field(&k.output_name())));

        Ok(SelectQuery::from_table(&self.config.events_table)
            .with_select(select)
            .and_where(self.today_where()?)
            .with_group_by(group_by))
    }
}

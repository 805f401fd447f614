use crate::command::types::TableVersion;
use crate::engine::aggregate::{AggregateFunction, to_state_form};
use crate::engine::ast::{Expr, SelectQuery, SqlType};
use crate::shared::config::QueryConfig;

/// Alias every branch gives its day bucket, whatever the physical column is called.
pub const BUCKET_ALIAS: &str = "period_bucket";

/// Dimension columns shared by the event table and the rollups.
pub const ROLLUP_DIMENSIONS: &[&str] = &[
    "host",
    "device_type",
    "browser",
    "os",
    "country_code",
    "referring_domain",
    "pathname",
    "entry_pathname",
];

/// Physical rollup table set for one table version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupTables {
    pub version: TableVersion,
    pub name: &'static str,
    pub bucket_column: &'static str,
    pub has_revenue: bool,
}

impl RollupTables {
    pub fn for_version(version: TableVersion) -> Self {
        match version {
            TableVersion::V1 => Self {
                version,
                name: "web_stats_daily",
                bucket_column: "day_bucket",
                has_revenue: false,
            },
            TableVersion::V2 => Self {
                version,
                name: "web_pre_aggregated_stats",
                bucket_column: "period_bucket",
                has_revenue: true,
            },
        }
    }

    pub fn is_rollup(name: &str) -> bool {
        [TableVersion::V1, TableVersion::V2]
            .iter()
            .any(|v| Self::for_version(*v).name == name)
    }

    /// State columns physically present in this table set.
    pub fn state_columns(&self) -> Vec<StateColumn> {
        StateColumn::ROLLUP
            .iter()
            .copied()
            .filter(|c| c.in_rollup(self))
            .collect()
    }
}

/// A mergeable partial aggregate, named as the rollups name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateColumn {
    PersonsUniq,
    SessionsUniq,
    PageviewsCount,
    SessionsCount,
    BouncesCount,
    TotalSessionDuration,
    RevenueSum,
    GoalEvents,
    GoalConverters,
}

impl StateColumn {
    pub const ROLLUP: &'static [StateColumn] = &[
        StateColumn::PersonsUniq,
        StateColumn::SessionsUniq,
        StateColumn::PageviewsCount,
        StateColumn::SessionsCount,
        StateColumn::BouncesCount,
        StateColumn::TotalSessionDuration,
        StateColumn::RevenueSum,
    ];

    pub fn alias(self) -> &'static str {
        match self {
            StateColumn::PersonsUniq => "persons_uniq_state",
            StateColumn::SessionsUniq => "sessions_uniq_state",
            StateColumn::PageviewsCount => "pageviews_count_state",
            StateColumn::SessionsCount => "sessions_count_state",
            StateColumn::BouncesCount => "bounces_count_state",
            StateColumn::TotalSessionDuration => "total_session_duration_state",
            StateColumn::RevenueSum => "revenue_sum_state",
            StateColumn::GoalEvents => "goal_events_count_state",
            StateColumn::GoalConverters => "goal_persons_uniq_state",
        }
    }

    pub fn function(self) -> AggregateFunction {
        match self {
            StateColumn::PersonsUniq | StateColumn::SessionsUniq | StateColumn::GoalConverters => {
                AggregateFunction::Uniq
            }
            StateColumn::PageviewsCount
            | StateColumn::SessionsCount
            | StateColumn::BouncesCount
            | StateColumn::GoalEvents => AggregateFunction::Count,
            StateColumn::TotalSessionDuration | StateColumn::RevenueSum => AggregateFunction::Sum,
        }
    }

    /// Declared type of the `NULL` standing in for this column in a branch that lacks it.
    pub fn placeholder_type(self) -> SqlType {
        match self.function() {
            AggregateFunction::Sum | AggregateFunction::Avg => SqlType::Float64,
            AggregateFunction::Uniq | AggregateFunction::Count => SqlType::Int64,
        }
    }

    pub fn in_rollup(self, tables: &RollupTables) -> bool {
        match self {
            StateColumn::GoalEvents | StateColumn::GoalConverters => false,
            StateColumn::RevenueSum => tables.has_revenue,
            _ => true,
        }
    }

    /// The aggregate computing this column from raw events. `condition` is ANDed
    /// into the column's own filter and turns the call into its `If` form.
    pub fn live_aggregate(self, goal: Option<&str>, condition: Option<Expr>) -> Expr {
        let entry = || Expr::equals(Expr::field("is_session_entry"), Expr::int(1));
        let goal_event = || Expr::equals(Expr::field("event"), Expr::string(goal.unwrap_or("")));

        let (value, filter) = match self {
            StateColumn::PersonsUniq => (Some(Expr::field("person_id")), None),
            StateColumn::SessionsUniq => (Some(Expr::field("session_id")), None),
            StateColumn::PageviewsCount => (
                None,
                Some(Expr::equals(Expr::field("event"), Expr::string("$pageview"))),
            ),
            StateColumn::SessionsCount => (None, Some(entry())),
            StateColumn::BouncesCount => (
                None,
                Some(Expr::and(vec![
                    entry(),
                    Expr::equals(Expr::field("is_bounce"), Expr::int(1)),
                ])),
            ),
            StateColumn::TotalSessionDuration => {
                (Some(Expr::field("session_duration_ms")), Some(entry()))
            }
            StateColumn::RevenueSum => (Some(Expr::field("revenue")), None),
            StateColumn::GoalEvents => (None, Some(goal_event())),
            StateColumn::GoalConverters => (Some(Expr::field("person_id")), Some(goal_event())),
        };

        let filter = match (filter, condition) {
            (Some(f), Some(c)) => Some(Expr::and(vec![f, c])),
            (f, c) => f.or(c),
        };

        let base = self.function().as_str();
        let mut args: Vec<Expr> = value.into_iter().collect();
        match filter {
            Some(f) => {
                args.push(f);
                Expr::call(&format!("{base}If"), args)
            }
            None => Expr::call(base, args),
        }
    }
}

/// The offline job that fills a rollup table: one row of partial states per team,
/// day and dimension combination.
pub fn rollup_population_query(tables: &RollupTables, config: &QueryConfig) -> SelectQuery {
    let mut select = vec![
        Expr::field("team_id").alias("team_id"),
        Expr::call("toStartOfDay", vec![Expr::field("timestamp")]).alias(tables.bucket_column),
    ];
    let mut group_by = vec![Expr::field("team_id"), Expr::field(tables.bucket_column)];
    for dim in ROLLUP_DIMENSIONS {
        select.push(Expr::field(dim).alias(dim));
        group_by.push(Expr::field(dim));
    }
    for column in tables.state_columns() {
        select.push(column.live_aggregate(None, None).alias(column.alias()));
    }

    to_state_form(
        &SelectQuery::from_table(&config.events_table)
            .with_select(select)
            .with_group_by(group_by),
    )
}

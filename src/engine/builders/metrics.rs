use crate::command::types::{BreakdownBy, Metric};
use crate::engine::aggregate::merge_expr;
use crate::engine::ast::Expr;
use crate::engine::builders::tables::StateColumn;
use crate::shared::config::ZeroDenominatorPolicy;
use crate::shared::response::ItemKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    Single(StateColumn),
    /// `numerator / denominator`, guarded against a zero denominator.
    Ratio {
        numerator: StateColumn,
        denominator: StateColumn,
    },
}

/// Static description of one metric: where it comes from and how it is reported.
#[derive(Debug, Clone, Copy)]
pub struct MetricDefinition {
    pub metric: Metric,
    /// Output alias inside generated queries
    pub internal_column: &'static str,
    /// Key in responses
    pub external_key: &'static str,
    pub formula: Formula,
    pub transform: fn(f64) -> f64,
    /// `None` means every breakdown.
    pub applicable_breakdowns: Option<&'static [BreakdownBy]>,
    pub kind: ItemKind,
    pub is_increase_bad: bool,
    /// Needs a conversion goal on the request.
    pub needs_goal: bool,
}

fn identity(v: f64) -> f64 {
    v
}

fn millis_to_seconds(v: f64) -> f64 {
    v / 1000.0
}

fn fraction_to_percent(v: f64) -> f64 {
    v * 100.0
}

const PAGE_BREAKDOWNS: &[BreakdownBy] = &[BreakdownBy::Page, BreakdownBy::InitialPage];

static DEFINITIONS: [MetricDefinition; 8] = [
    MetricDefinition {
        metric: Metric::Visitors,
        internal_column: "unique_users",
        external_key: "visitors",
        formula: Formula::Single(StateColumn::PersonsUniq),
        transform: identity,
        applicable_breakdowns: None,
        kind: ItemKind::Unit,
        is_increase_bad: false,
        needs_goal: false,
    },
    MetricDefinition {
        metric: Metric::Views,
        internal_column: "total_pageviews",
        external_key: "views",
        formula: Formula::Single(StateColumn::PageviewsCount),
        transform: identity,
        applicable_breakdowns: None,
        kind: ItemKind::Unit,
        is_increase_bad: false,
        needs_goal: false,
    },
    MetricDefinition {
        metric: Metric::Sessions,
        internal_column: "unique_sessions",
        external_key: "sessions",
        formula: Formula::Single(StateColumn::SessionsUniq),
        transform: identity,
        applicable_breakdowns: None,
        kind: ItemKind::Unit,
        is_increase_bad: false,
        needs_goal: false,
    },
    MetricDefinition {
        metric: Metric::SessionDuration,
        internal_column: "avg_session_duration",
        external_key: "session_duration",
        formula: Formula::Ratio {
            numerator: StateColumn::TotalSessionDuration,
            denominator: StateColumn::SessionsCount,
        },
        transform: millis_to_seconds,
        applicable_breakdowns: None,
        kind: ItemKind::DurationS,
        is_increase_bad: false,
        needs_goal: false,
    },
    MetricDefinition {
        metric: Metric::BounceRate,
        internal_column: "bounce_rate",
        external_key: "bounce_rate",
        formula: Formula::Ratio {
            numerator: StateColumn::BouncesCount,
            denominator: StateColumn::SessionsCount,
        },
        transform: fraction_to_percent,
        applicable_breakdowns: Some(PAGE_BREAKDOWNS),
        kind: ItemKind::Percentage,
        is_increase_bad: true,
        needs_goal: false,
    },
    MetricDefinition {
        metric: Metric::Revenue,
        internal_column: "revenue",
        external_key: "revenue",
        formula: Formula::Single(StateColumn::RevenueSum),
        transform: identity,
        applicable_breakdowns: None,
        kind: ItemKind::Currency,
        is_increase_bad: false,
        needs_goal: false,
    },
    MetricDefinition {
        metric: Metric::Conversions,
        internal_column: "total_conversions",
        external_key: "conversions",
        formula: Formula::Single(StateColumn::GoalEvents),
        transform: identity,
        applicable_breakdowns: None,
        kind: ItemKind::Unit,
        is_increase_bad: false,
        needs_goal: true,
    },
    MetricDefinition {
        metric: Metric::ConversionRate,
        internal_column: "conversion_rate",
        external_key: "conversion_rate",
        formula: Formula::Ratio {
            numerator: StateColumn::GoalConverters,
            denominator: StateColumn::PersonsUniq,
        },
        transform: fraction_to_percent,
        applicable_breakdowns: None,
        kind: ItemKind::Percentage,
        is_increase_bad: false,
        needs_goal: true,
    },
];

impl MetricDefinition {
    pub fn get(metric: Metric) -> &'static MetricDefinition {
        let index = match metric {
            Metric::Visitors => 0,
            Metric::Views => 1,
            Metric::Sessions => 2,
            Metric::SessionDuration => 3,
            Metric::BounceRate => 4,
            Metric::Revenue => 5,
            Metric::Conversions => 6,
            Metric::ConversionRate => 7,
        };
        &DEFINITIONS[index]
    }

    pub fn all() -> &'static [MetricDefinition] {
        &DEFINITIONS
    }

    pub fn applies_to(&self, breakdown: BreakdownBy) -> bool {
        self.applicable_breakdowns
            .is_none_or(|allowed| allowed.contains(&breakdown))
    }

    pub fn state_columns(&self) -> Vec<StateColumn> {
        match self.formula {
            Formula::Single(c) => vec![c],
            Formula::Ratio {
                numerator,
                denominator,
            } => vec![numerator, denominator],
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        (self.transform)(value)
    }
}

/// Where a metric's state columns are read from.
#[derive(Debug, Clone, Copy)]
pub enum ColumnSource<'a> {
    /// Aggregate raw events directly.
    Live { goal: Option<&'a str> },
    /// Merge partial states exposed by the branches under their aliases.
    Merged,
}

impl ColumnSource<'_> {
    fn column(&self, column: StateColumn, condition: Option<Expr>) -> Expr {
        match self {
            ColumnSource::Live { goal } => column.live_aggregate(*goal, condition),
            ColumnSource::Merged => merge_expr(column.function(), column.alias(), condition),
        }
    }
}

/// The value expression of a metric. `condition` scopes every aggregate in it,
/// which is how one scan yields both the current and the previous period.
pub fn metric_expr(
    definition: &MetricDefinition,
    source: ColumnSource<'_>,
    condition: Option<Expr>,
    policy: ZeroDenominatorPolicy,
) -> Expr {
    match definition.formula {
        Formula::Single(c) => source.column(c, condition),
        Formula::Ratio {
            numerator,
            denominator,
        } => {
            let den = source.column(denominator, condition.clone());
            let on_zero = match policy {
                ZeroDenominatorPolicy::Zero => Expr::int(0),
                ZeroDenominatorPolicy::Null => Expr::null(),
            };
            Expr::call(
                "if",
                vec![
                    Expr::equals(den.clone(), Expr::int(0)),
                    on_zero,
                    Expr::call(
                        "divide",
                        vec![source.column(numerator, condition), den],
                    ),
                ],
            )
        }
    }
}

/// `metric_expr` for the current period, paired with the previous one when given.
pub fn metric_value_expr(
    definition: &MetricDefinition,
    source: ColumnSource<'_>,
    periods: &PeriodConditions,
    policy: ZeroDenominatorPolicy,
) -> Expr {
    let current = metric_expr(definition, source, periods.current.clone(), policy);
    let value = match &periods.previous {
        Some(previous) => Expr::tuple(vec![
            current,
            metric_expr(definition, source, Some(previous.clone()), policy),
        ]),
        None => current,
    };
    value.alias(definition.internal_column)
}

/// Per-aggregate conditions selecting each period out of a shared scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodConditions {
    pub current: Option<Expr>,
    pub previous: Option<Expr>,
}

/// Requested metrics, defaulting to visitors, minus those the request cannot
/// produce: goal metrics without a goal, and metrics not defined for the breakdown.
pub fn resolve_metrics(
    requested: Option<&[Metric]>,
    breakdown: Option<BreakdownBy>,
    has_goal: bool,
) -> Vec<&'static MetricDefinition> {
    let requested: &[Metric] = match requested {
        Some(list) if !list.is_empty() => list,
        _ => &[Metric::Visitors],
    };
    let mut out: Vec<&'static MetricDefinition> = Vec::with_capacity(requested.len());
    for metric in requested {
        let def = MetricDefinition::get(*metric);
        if def.needs_goal && !has_goal {
            continue;
        }
        if breakdown.is_some_and(|b| !def.applies_to(b)) {
            continue;
        }
        if !out.iter().any(|d| d.metric == def.metric) {
            out.push(def);
        }
    }
    out
}

/// State columns the given metrics read, deduplicated in first-use order.
pub fn needed_states(definitions: &[&MetricDefinition]) -> Vec<StateColumn> {
    let mut out = Vec::new();
    for def in definitions {
        for c in def.state_columns() {
            if !out.contains(&c) {
                out.push(c);
            }
        }
    }
    out
}

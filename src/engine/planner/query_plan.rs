use std::fmt;

use crate::command::types::{BreakdownBy, Interval, Metric};

/// Which stores a request reads. Decided once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryPlan {
    HistoricalOnly,
    LiveOnly,
    Combined,
}

impl QueryPlan {
    pub fn uses_pre_aggregated(&self) -> bool {
        !matches!(self, QueryPlan::LiveOnly)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryPlan::HistoricalOnly => "historical_only",
            QueryPlan::LiveOnly => "live_only",
            QueryPlan::Combined => "combined",
        }
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule that settled the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingReason {
    PreAggregationDisabled,
    UnsupportedProperty(String),
    ConversionGoal,
    SubDailyInterval(Interval),
    UnsupportedMetric(Metric),
    UnsupportedBreakdown(BreakdownBy),
    ProjectTimezone,
    InvalidDateRange(String),
    /// A bound falls inside a day, which the daily rollup buckets cannot split.
    SubDayBounds,
    EndsBeforeToday,
    SpansToday,
    TodayOnly,
}

impl fmt::Display for RoutingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingReason::PreAggregationDisabled => f.write_str("pre-aggregated tables disabled"),
            RoutingReason::UnsupportedProperty(key) => {
                write!(f, "property '{key}' is not in the rollups")
            }
            RoutingReason::ConversionGoal => f.write_str("conversion goal requested"),
            RoutingReason::SubDailyInterval(i) => write!(f, "interval {i:?} is finer than a day"),
            RoutingReason::UnsupportedMetric(m) => write!(f, "metric {m:?} is not pre-aggregated"),
            RoutingReason::UnsupportedBreakdown(b) => {
                write!(f, "breakdown {b:?} is not pre-aggregated")
            }
            RoutingReason::ProjectTimezone => f.write_str("project timezone conversion requested"),
            RoutingReason::InvalidDateRange(e) => write!(f, "date range unusable: {e}"),
            RoutingReason::SubDayBounds => f.write_str("range bounds are not whole days"),
            RoutingReason::EndsBeforeToday => f.write_str("range ends before today"),
            RoutingReason::SpansToday => f.write_str("range spans history and today"),
            RoutingReason::TodayOnly => f.write_str("range covers only today"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub plan: QueryPlan,
    pub reason: RoutingReason,
}

impl RoutingDecision {
    pub fn live(reason: RoutingReason) -> Self {
        Self {
            plan: QueryPlan::LiveOnly,
            reason,
        }
    }
}

use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::command::types::{
    BreakdownBy, Interval, Metric, Modifiers, QueryFamily, TableVersion, Team, WebQuery,
};
use crate::engine::planner::query_plan::{QueryPlan, RoutingDecision, RoutingReason};
use crate::shared::config::{CONFIG, QueryConfig};
use crate::shared::datetime::{ResolvedDateRange, resolve_date_range};

const OVERVIEW_PROPERTY_KEYS: &[&str] = &["$host", "$device_type"];
const STATS_TABLE_PROPERTY_KEYS: &[&str] = &["$host", "$device_type", "$pathname"];

const BASE_METRICS: &[Metric] = &[
    Metric::Visitors,
    Metric::Views,
    Metric::Sessions,
    Metric::SessionDuration,
    Metric::BounceRate,
];

const OVERVIEW_METRICS_V2: &[Metric] = &[
    Metric::Visitors,
    Metric::Views,
    Metric::Sessions,
    Metric::SessionDuration,
    Metric::BounceRate,
    Metric::Revenue,
];

/// Breakdown dimensions the rollup tables carry.
pub const ROLLUP_BREAKDOWNS: &[BreakdownBy] = &[
    BreakdownBy::Page,
    BreakdownBy::InitialPage,
    BreakdownBy::DeviceType,
    BreakdownBy::Browser,
    BreakdownBy::Os,
    BreakdownBy::Country,
    BreakdownBy::ReferringDomain,
];

/// Property keys a family may filter on and still read the rollups.
pub fn allowed_property_keys(family: QueryFamily) -> &'static [&'static str] {
    match family {
        QueryFamily::Overview | QueryFamily::Trends => OVERVIEW_PROPERTY_KEYS,
        QueryFamily::StatsTable => STATS_TABLE_PROPERTY_KEYS,
    }
}

/// Metrics a family can compute from the rollups of a given table version.
pub fn supported_metrics(family: QueryFamily, version: TableVersion) -> &'static [Metric] {
    match (family, version) {
        (QueryFamily::Overview, TableVersion::V2) => OVERVIEW_METRICS_V2,
        _ => BASE_METRICS,
    }
}

/// Routes a request. Pure: identical inputs always give the same plan.
pub fn decide(
    query: &WebQuery,
    modifiers: &Modifiers,
    team: &Team,
    now: DateTime<Utc>,
) -> QueryPlan {
    evaluate(query, modifiers, team, now, &CONFIG.query).plan
}

/// Like [`decide`], with the rule that settled it and an explicit config.
pub fn evaluate(
    query: &WebQuery,
    modifiers: &Modifiers,
    team: &Team,
    now: DateTime<Utc>,
    config: &QueryConfig,
) -> RoutingDecision {
    let decision = route(query, modifiers, team, now, config);
    debug!(
        target: "hybrid_stats::eligibility",
        family = ?query.family(),
        plan = %decision.plan,
        reason = %decision.reason,
        "Routing decision"
    );
    decision
}

fn route(
    query: &WebQuery,
    modifiers: &Modifiers,
    team: &Team,
    now: DateTime<Utc>,
    config: &QueryConfig,
) -> RoutingDecision {
    let family = query.family();

    if !modifiers.use_pre_aggregated_tables {
        return RoutingDecision::live(RoutingReason::PreAggregationDisabled);
    }

    let allowed = allowed_property_keys(family);
    if let Some(filter) = query
        .properties()
        .iter()
        .find(|p| !allowed.contains(&p.key.as_str()))
    {
        return RoutingDecision::live(RoutingReason::UnsupportedProperty(filter.key.clone()));
    }

    if query.conversion_goal().is_some() {
        return RoutingDecision::live(RoutingReason::ConversionGoal);
    }

    if let Some(interval) = query.interval() {
        if !matches!(interval, Interval::Day | Interval::Week | Interval::Month) {
            return RoutingDecision::live(RoutingReason::SubDailyInterval(interval));
        }
    }

    if let Some(requested) = query.requested_metrics() {
        let supported = supported_metrics(family, modifiers.effective_table_version(team));
        if let Some(metric) = requested.iter().find(|m| !supported.contains(m)) {
            return RoutingDecision::live(RoutingReason::UnsupportedMetric(*metric));
        }
    }

    if let Some(breakdown) = query.breakdown_by() {
        if !ROLLUP_BREAKDOWNS.contains(&breakdown) {
            return RoutingDecision::live(RoutingReason::UnsupportedBreakdown(breakdown));
        }
    }

    if modifiers.convert_to_project_timezone {
        return RoutingDecision::live(RoutingReason::ProjectTimezone);
    }

    let range = query.date_range();
    let resolved = match resolve_date_range(
        range.date_from.as_deref(),
        range.date_to.as_deref(),
        &config.default_date_from,
        Tz::UTC,
        now,
    ) {
        Ok(resolved) => resolved,
        Err(e) => return RoutingDecision::live(RoutingReason::InvalidDateRange(e.to_string())),
    };

    if !whole_day_bounds(&resolved, now) {
        return RoutingDecision::live(RoutingReason::SubDayBounds);
    }

    let today = now.date_naive();
    let yesterday = today - Duration::days(1);

    if resolved.to_date() < today {
        RoutingDecision {
            plan: QueryPlan::HistoricalOnly,
            reason: RoutingReason::EndsBeforeToday,
        }
    } else if resolved.from_date() <= yesterday {
        RoutingDecision {
            plan: QueryPlan::Combined,
            reason: RoutingReason::SpansToday,
        }
    } else {
        RoutingDecision::live(RoutingReason::TodayOnly)
    }
}

/// `from` must open a day and `to` must close one, unless `to` is `now`, whose day
/// is answered from live events.
fn whole_day_bounds(range: &ResolvedDateRange, now: DateTime<Utc>) -> bool {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59);
    let opens_day = range.from.time() == NaiveTime::MIN;
    let closes_day =
        Some(range.to.time()) == last_second || range.to.with_timezone(&Utc) == now;
    opens_day && closes_day
}

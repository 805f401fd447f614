use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which physical rollup table set a team reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TableVersion {
    V1,
    #[default]
    V2,
}

/// Read-only view of the team configuration owned elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub timezone: String,
    pub table_version: Option<TableVersion>,
}

impl Team {
    pub fn table_version(&self) -> TableVersion {
        self.table_version.unwrap_or_default()
    }

    pub fn timezone(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::Tz::UTC)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Modifiers {
    #[serde(default)]
    pub use_pre_aggregated_tables: bool,
    #[serde(default)]
    pub convert_to_project_timezone: bool,
    #[serde(default)]
    pub table_version: Option<TableVersion>,
}

impl Modifiers {
    /// Request override first, then the team switch, then v2.
    pub fn effective_table_version(&self, team: &Team) -> TableVersion {
        self.table_version
            .or(team.table_version)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DateRange {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl DateRange {
    pub fn new(date_from: Option<&str>, date_to: Option<&str>) -> Self {
        Self {
            date_from: date_from.map(str::to_string),
            date_to: date_to.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyOperator {
    Exact,
    IsNot,
    Icontains,
    NotIcontains,
    IsSet,
    IsNotSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub key: String,
    pub operator: PropertyOperator,
    #[serde(default)]
    pub value: Value,
}

impl PropertyFilter {
    pub fn exact(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            operator: PropertyOperator::Exact,
            value: Value::String(value.to_string()),
        }
    }
}

/// Counts people who fired a specific event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionGoal {
    pub custom_event: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompareFilter {
    pub compare: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interval {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakdownBy {
    Page,
    InitialPage,
    ExitPage,
    DeviceType,
    Browser,
    Os,
    Country,
    ReferringDomain,
    Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Visitors,
    Views,
    Sessions,
    SessionDuration,
    BounceRate,
    Revenue,
    Conversions,
    ConversionRate,
}

/// Which metric family a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryFamily {
    Overview,
    StatsTable,
    Trends,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OverviewQuery {
    pub date_range: DateRange,
    #[serde(default)]
    pub properties: Vec<PropertyFilter>,
    pub compare_filter: Option<CompareFilter>,
    pub conversion_goal: Option<ConversionGoal>,
    #[serde(default)]
    pub include_revenue: bool,
    #[serde(default)]
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsTableQuery {
    pub date_range: DateRange,
    #[serde(default)]
    pub properties: Vec<PropertyFilter>,
    pub compare_filter: Option<CompareFilter>,
    pub conversion_goal: Option<ConversionGoal>,
    pub breakdown_by: BreakdownBy,
    pub metrics: Option<Vec<Metric>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Base URL the `next` link is built from.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendsQuery {
    pub date_range: DateRange,
    #[serde(default)]
    pub properties: Vec<PropertyFilter>,
    pub conversion_goal: Option<ConversionGoal>,
    pub interval: Interval,
    pub metrics: Option<Vec<Metric>>,
    #[serde(default)]
    pub modifiers: Modifiers,
}

/// Any request this crate answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WebQuery {
    Overview(OverviewQuery),
    StatsTable(StatsTableQuery),
    Trends(TrendsQuery),
}

impl WebQuery {
    pub fn family(&self) -> QueryFamily {
        match self {
            WebQuery::Overview(_) => QueryFamily::Overview,
            WebQuery::StatsTable(_) => QueryFamily::StatsTable,
            WebQuery::Trends(_) => QueryFamily::Trends,
        }
    }

    pub fn date_range(&self) -> &DateRange {
        match self {
            WebQuery::Overview(q) => &q.date_range,
            WebQuery::StatsTable(q) => &q.date_range,
            WebQuery::Trends(q) => &q.date_range,
        }
    }

    pub fn properties(&self) -> &[PropertyFilter] {
        match self {
            WebQuery::Overview(q) => &q.properties,
            WebQuery::StatsTable(q) => &q.properties,
            WebQuery::Trends(q) => &q.properties,
        }
    }

    pub fn conversion_goal(&self) -> Option<&ConversionGoal> {
        match self {
            WebQuery::Overview(q) => q.conversion_goal.as_ref(),
            WebQuery::StatsTable(q) => q.conversion_goal.as_ref(),
            WebQuery::Trends(q) => q.conversion_goal.as_ref(),
        }
    }

    pub fn modifiers(&self) -> &Modifiers {
        match self {
            WebQuery::Overview(q) => &q.modifiers,
            WebQuery::StatsTable(q) => &q.modifiers,
            WebQuery::Trends(q) => &q.modifiers,
        }
    }

    pub fn interval(&self) -> Option<Interval> {
        match self {
            WebQuery::Trends(q) => Some(q.interval),
            _ => None,
        }
    }

    pub fn breakdown_by(&self) -> Option<BreakdownBy> {
        match self {
            WebQuery::StatsTable(q) => Some(q.breakdown_by),
            _ => None,
        }
    }

    /// The explicitly requested metrics. Overview has a fixed set, so only revenue
    /// is ever "requested" there.
    pub fn requested_metrics(&self) -> Option<Vec<Metric>> {
        match self {
            WebQuery::Overview(q) if q.include_revenue => Some(vec![Metric::Revenue]),
            WebQuery::Overview(_) => None,
            WebQuery::StatsTable(q) => q.metrics.clone(),
            WebQuery::Trends(q) => q.metrics.clone(),
        }
    }

    pub fn wants_comparison(&self) -> bool {
        match self {
            WebQuery::Overview(q) => q.compare_filter.is_some_and(|c| c.compare),
            WebQuery::StatsTable(q) => q.compare_filter.is_some_and(|c| c.compare),
            WebQuery::Trends(_) => false,
        }
    }
}

impl From<OverviewQuery> for WebQuery {
    fn from(q: OverviewQuery) -> Self {
        WebQuery::Overview(q)
    }
}

impl From<StatsTableQuery> for WebQuery {
    fn from(q: StatsTableQuery) -> Self {
        WebQuery::StatsTable(q)
    }
}

impl From<TrendsQuery> for WebQuery {
    fn from(q: TrendsQuery) -> Self {
        WebQuery::Trends(q)
    }
}

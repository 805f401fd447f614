use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// Unit an overview value is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Unit,
    Percentage,
    DurationS,
    Currency,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemKind::Unit => "unit",
            ItemKind::Percentage => "percentage",
            ItemKind::DurationS => "duration_s",
            ItemKind::Currency => "currency",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewItem {
    pub key: String,
    pub kind: ItemKind,
    pub value: Option<f64>,
    pub previous: Option<f64>,
    pub change_from_previous_pct: Option<i64>,
    pub is_increase_bad: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub results: Vec<OverviewItem>,
    pub used_pre_aggregated_tables: bool,
}

impl OverviewResponse {
    pub fn item(&self, key: &str) -> Option<&OverviewItem> {
        self.results.iter().find(|i| i.key == key)
    }
}

/// One cell of a breakdown row. A metric with comparison serializes as `[current, previous]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(Option<f64>),
    Pair(Option<f64>, Option<f64>),
}

impl CellValue {
    pub fn current(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) | CellValue::Pair(v, _) => *v,
            CellValue::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownResponse {
    pub columns: Vec<String>,
    pub results: Vec<IndexMap<String, CellValue>>,
    pub has_more: bool,
    pub next: Option<String>,
    pub used_pre_aggregated_tables: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Bucket start, RFC 3339 in UTC.
    pub bucket: String,
    pub metrics: IndexMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsResponse {
    pub results: Vec<TrendPoint>,
    pub used_pre_aggregated_tables: bool,
}

/// Any response this crate produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WebStatsResponse {
    Overview(OverviewResponse),
    Breakdown(BreakdownResponse),
    Trends(TrendsResponse),
}

impl WebStatsResponse {
    pub fn used_pre_aggregated_tables(&self) -> bool {
        match self {
            WebStatsResponse::Overview(r) => r.used_pre_aggregated_tables,
            WebStatsResponse::Breakdown(r) => r.used_pre_aggregated_tables,
            WebStatsResponse::Trends(r) => r.used_pre_aggregated_tables,
        }
    }
}

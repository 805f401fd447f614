//! Per-family query construction over the rollup and live stores.

pub mod context;
pub mod filters;
pub mod metrics;
pub mod overview;
pub mod stats_table;
pub mod tables;
pub mod traits;
pub mod trends;

#[cfg(test)]
mod stats_table_test;

pub use context::BuildContext;
pub use metrics::{ColumnSource, Formula, MetricDefinition, PeriodConditions, resolve_metrics};
pub use overview::OverviewQueryBuilder;
pub use stats_table::{BREAKDOWN_ALIAS, StatsTableQueryBuilder};
pub use tables::{BUCKET_ALIAS, RollupTables, StateColumn, rollup_population_query};
pub use traits::PreAggregatedQueryBuilder;
pub use trends::{TIME_BUCKET_ALIAS, TrendsQueryBuilder};

pub mod dataset_factory;
pub mod event_factory;
pub mod overview_query_factory;
pub mod stats_table_query_factory;
pub mod team_factory;
pub mod trends_query_factory;

#[cfg(test)]
mod dataset_factory_test;

pub use dataset_factory::DatasetFactory;
pub use event_factory::EventFactory;
pub use overview_query_factory::OverviewQueryFactory;
pub use stats_table_query_factory::StatsTableQueryFactory;
pub use team_factory::TeamFactory;
pub use trends_query_factory::TrendsQueryFactory;

pub use super::factories::{
    DatasetFactory, EventFactory, OverviewQueryFactory, StatsTableQueryFactory, TeamFactory,
    TrendsQueryFactory,
};

pub struct Factory;

impl Factory {
    pub fn team() -> TeamFactory {
        TeamFactory::new()
    }

    pub fn overview_query() -> OverviewQueryFactory {
        OverviewQueryFactory::new()
    }

    pub fn stats_table_query() -> StatsTableQueryFactory {
        StatsTableQueryFactory::new()
    }

    pub fn trends_query() -> TrendsQueryFactory {
        TrendsQueryFactory::new()
    }

    pub fn event() -> EventFactory {
        EventFactory::new()
    }

    pub fn dataset() -> DatasetFactory {
        DatasetFactory::new()
    }
}

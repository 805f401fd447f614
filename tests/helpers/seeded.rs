use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::command::types::TableVersion;
use crate::engine::ast::{CompareOperator, Expr};
use crate::engine::builders::{RollupTables, rollup_population_query};
use crate::engine::exec::MemoryGateway;
use crate::shared::config::QueryConfig;
use crate::test_helpers::factories::DatasetFactory;
use crate::test_helpers::factory::Factory;

/// Last second of the seeded dataset's final day, which is "today".
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 12, 15, 23, 59, 59).unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

/// Raw events for 2023-12-01..=2023-12-15 plus both rollup versions, filled from
/// every day before today the way the nightly job would.
pub async fn seeded_gateway() -> MemoryGateway {
    seeded_gateway_with(Factory::dataset().with_seed(7)).await
}

pub async fn seeded_gateway_with(dataset: DatasetFactory) -> MemoryGateway {
    let gateway = MemoryGateway::new();
    let config = QueryConfig::default();
    gateway.insert(&config.events_table, dataset.create()).await;
    materialize_rollups(&gateway, &config).await;
    gateway
}

pub async fn materialize_rollups(gateway: &MemoryGateway, config: &QueryConfig) {
    let midnight = Utc.from_utc_datetime(&today().and_hms_opt(0, 0, 0).unwrap());
    for version in [TableVersion::V1, TableVersion::V2] {
        let tables = RollupTables::for_version(version);
        let job = rollup_population_query(&tables, config).and_where(Expr::compare(
            CompareOperator::Lt,
            Expr::field("timestamp"),
            Expr::datetime(midnight),
        ));
        gateway.materialize(tables.name, &job).await.unwrap();
    }
}

/// Float comparison for values computed along different paths.
pub fn assert_close(left: Option<f64>, right: Option<f64>, what: &str) {
    match (left, right) {
        (Some(a), Some(b)) => assert!(
            (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0),
            "{what}: {a} != {b}"
        ),
        (a, b) => assert_eq!(a, b, "{what}"),
    }
}

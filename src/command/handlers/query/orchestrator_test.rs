use crate::command::handlers::query::QueryExecutionPipeline;
use crate::command::types::{BreakdownBy, Modifiers};
use crate::engine::builders::{
    OverviewQueryBuilder, PreAggregatedQueryBuilder, StatsTableQueryBuilder,
};
use crate::engine::errors::{ExecutionError, WebStatsError};
use crate::engine::exec::ExecutionGateway;
use crate::logging::init_for_tests;
use crate::shared::config::QueryConfig;
use crate::test_helpers::factory::Factory;
use crate::test_helpers::flaky_gateway::{Fault, FlakyGateway};
use crate::test_helpers::seeded::{assert_close, now, seeded_gateway};

#[tokio::test]
async fn healthy_rollups_answer_in_one_call() {
    init_for_tests();
    let gateway = FlakyGateway::new(seeded_gateway().await);
    let team = Factory::team().create();
    let config = QueryConfig::default();
    let query = Factory::overview_query()
        .with_date_range("2023-12-01", Some("2023-12-10"))
        .create();

    let builder = OverviewQueryBuilder::new(&query, &team, now(), &config).unwrap();
    let response = QueryExecutionPipeline::new(builder, &gateway)
        .execute()
        .await
        .unwrap();

    assert!(response.used_pre_aggregated_tables);
    assert_eq!(gateway.calls(), 1);
    assert_eq!(gateway.seen()[0].tables(), vec!["web_pre_aggregated_stats"]);
}

#[tokio::test]
async fn failing_historical_query_falls_back_to_live() {
    init_for_tests();
    let gateway = FlakyGateway::new(seeded_gateway().await).with_fault(Fault::TimeoutOnRollups);
    let team = Factory::team().create();
    let config = QueryConfig::default();
    let query = Factory::overview_query()
        .with_date_range("2023-12-01", Some("2023-12-10"))
        .with_compare(true)
        .create();

    let builder = OverviewQueryBuilder::new(&query, &team, now(), &config).unwrap();
    let pipeline = QueryExecutionPipeline::new(builder, &gateway);
    let response = pipeline.execute().await.unwrap();

    assert!(!response.used_pre_aggregated_tables);
    assert_eq!(gateway.calls(), 2);
    assert_eq!(gateway.seen()[1].tables(), vec!["events"]);

    let live = gateway
        .inner()
        .execute(
            &pipeline.builder().live_query().unwrap(),
            &Modifiers::default(),
        )
        .await
        .unwrap();
    let direct = pipeline.builder().assemble(&live, false).unwrap();
    for (got, want) in response.results.iter().zip(&direct.results) {
        assert_close(got.value, want.value, &got.key);
        assert_close(got.previous, want.previous, &got.key);
    }
}

#[tokio::test]
async fn empty_rollup_result_is_treated_as_failure() {
    init_for_tests();
    let gateway = FlakyGateway::new(seeded_gateway().await).with_fault(Fault::EmptyOnRollups);
    let team = Factory::team().create();
    let config = QueryConfig::default();
    let query = Factory::stats_table_query()
        .with_breakdown(BreakdownBy::Browser)
        .create();

    let builder = StatsTableQueryBuilder::new(&query, &team, now(), &config).unwrap();
    let response = QueryExecutionPipeline::new(builder, &gateway)
        .execute()
        .await
        .unwrap();

    assert!(!response.used_pre_aggregated_tables);
    assert!(!response.results.is_empty());
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn live_only_plan_skips_rollups() {
    init_for_tests();
    let gateway = FlakyGateway::new(seeded_gateway().await).with_fault(Fault::TimeoutOnRollups);
    let team = Factory::team().create();
    let config = QueryConfig::default();
    let query = Factory::overview_query()
        .with_property("$browser", "Chrome")
        .create();

    let builder = OverviewQueryBuilder::new(&query, &team, now(), &config).unwrap();
    let response = QueryExecutionPipeline::new(builder, &gateway)
        .execute()
        .await
        .unwrap();

    assert!(!response.used_pre_aggregated_tables);
    assert_eq!(gateway.calls(), 1);
    assert_eq!(gateway.seen()[0].tables(), vec!["events"]);
}

#[tokio::test]
async fn live_failure_after_fallback_is_surfaced() {
    init_for_tests();
    let gateway = FlakyGateway::new(seeded_gateway().await).with_fault(Fault::Always);
    let team = Factory::team().create();
    let config = QueryConfig::default();
    let query = Factory::overview_query().create();

    let builder = OverviewQueryBuilder::new(&query, &team, now(), &config).unwrap();
    let err = QueryExecutionPipeline::new(builder, &gateway)
        .execute()
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WebStatsError::Execution(ExecutionError::Backend("connection reset".into()))
    );
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn team_without_rollup_rows_falls_back_to_live() {
    init_for_tests();
    let seeded = seeded_gateway().await;
    let config = QueryConfig::default();
    seeded
        .insert(
            &config.events_table,
            Factory::dataset().with_seed(11).with_team(2).create(),
        )
        .await;
    let gateway = FlakyGateway::new(seeded);
    let team = Factory::team().with_id(2).create();
    let query = Factory::overview_query()
        .with_date_range("2023-12-02", Some("2023-12-10"))
        .create();

    let builder = OverviewQueryBuilder::new(&query, &team, now(), &config).unwrap();
    let response = QueryExecutionPipeline::new(builder, &gateway)
        .execute()
        .await
        .unwrap();

    assert!(!response.used_pre_aggregated_tables);
    assert_eq!(gateway.calls(), 2);
    assert_eq!(gateway.seen()[0].tables(), vec!["web_pre_aggregated_stats"]);
    assert!(response.item("visitors").unwrap().value.unwrap() > 0.0);
}

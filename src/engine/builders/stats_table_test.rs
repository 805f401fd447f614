use crate::command::types::{BreakdownBy, Metric, Modifiers, StatsTableQuery, Team};
use crate::engine::builders::{BREAKDOWN_ALIAS, PreAggregatedQueryBuilder, StatsTableQueryBuilder};
use crate::engine::exec::{ExecutionGateway, ExecutionResult, MemoryGateway};
use crate::engine::planner::QueryPlan;
use crate::engine::types::ScalarValue;
use crate::shared::config::QueryConfig;
use crate::shared::response::{BreakdownResponse, CellValue};
use crate::test_helpers::factory::Factory;
use crate::test_helpers::seeded::{assert_close, now, seeded_gateway};

const ALL_METRICS: &[Metric] = &[
    Metric::Visitors,
    Metric::Views,
    Metric::Sessions,
    Metric::SessionDuration,
    Metric::BounceRate,
];

async fn both_paths(
    gateway: &MemoryGateway,
    query: &StatsTableQuery,
    team: &Team,
) -> (BreakdownResponse, BreakdownResponse) {
    let config = QueryConfig::default();
    let builder = StatsTableQueryBuilder::new(query, team, now(), &config).unwrap();
    let modifiers = Modifiers::default();

    let merged = gateway
        .execute(&builder.get_query().unwrap(), &modifiers)
        .await
        .unwrap();
    let live = gateway
        .execute(&builder.live_query().unwrap(), &modifiers)
        .await
        .unwrap();
    (
        builder.assemble(&merged, true).unwrap(),
        builder.assemble(&live, false).unwrap(),
    )
}

fn assert_same_rows(merged: &BreakdownResponse, live: &BreakdownResponse) {
    assert_eq!(merged.columns, live.columns);
    assert_eq!(merged.has_more, live.has_more);
    assert_eq!(merged.results.len(), live.results.len());
    for (m, l) in merged.results.iter().zip(&live.results) {
        assert_eq!(m[BREAKDOWN_ALIAS], l[BREAKDOWN_ALIAS]);
        for key in merged.columns.iter().skip(1) {
            match (&m[key], &l[key]) {
                (CellValue::Pair(a, b), CellValue::Pair(c, d)) => {
                    assert_close(*a, *c, key);
                    assert_close(*b, *d, key);
                }
                (a, b) => assert_close(a.current(), b.current(), key),
            }
        }
    }
}

fn key_of(row: &indexmap::IndexMap<String, CellValue>) -> String {
    match &row[BREAKDOWN_ALIAS] {
        CellValue::Text(s) => s.clone(),
        other => panic!("breakdown key is not text: {other:?}"),
    }
}

#[test]
fn bounce_rate_only_reported_for_page_breakdowns() {
    let team = Factory::team().create();
    let config = QueryConfig::default();

    let page = Factory::stats_table_query()
        .with_breakdown(BreakdownBy::Page)
        .with_metrics(ALL_METRICS)
        .create();
    let builder = StatsTableQueryBuilder::new(&page, &team, now(), &config).unwrap();
    assert!(builder.definitions().iter().any(|d| d.external_key == "bounce_rate"));

    let device = Factory::stats_table_query()
        .with_breakdown(BreakdownBy::DeviceType)
        .with_metrics(ALL_METRICS)
        .create();
    let builder = StatsTableQueryBuilder::new(&device, &team, now(), &config).unwrap();
    assert!(builder.definitions().iter().all(|d| d.external_key != "bounce_rate"));
    assert_eq!(builder.definitions().len(), ALL_METRICS.len() - 1);
    assert!(!builder.get_query().unwrap().to_string().contains("bounce_rate"));
}

#[test]
fn page_limit_is_clamped_and_fetches_one_extra_row() {
    let team = Factory::team().create();
    let config = QueryConfig::default();
    let query = Factory::stats_table_query().with_page(5_000, 20).create();
    let builder = StatsTableQueryBuilder::new(&query, &team, now(), &config).unwrap();
    assert_eq!(builder.page().limit, config.max_breakdown_limit);

    let select = builder.get_query().unwrap();
    let select = select.as_select().unwrap();
    assert_eq!(select.limit, Some(config.max_breakdown_limit + 1));
    assert_eq!(select.offset, Some(20));
}

#[test]
fn combined_branches_share_the_breakdown_key() {
    let team = Factory::team().create();
    let config = QueryConfig::default();
    let query = Factory::stats_table_query()
        .with_breakdown(BreakdownBy::Browser)
        .create();
    let builder = StatsTableQueryBuilder::new(&query, &team, now(), &config).unwrap();
    assert_eq!(builder.plan(), QueryPlan::Combined);

    let node = builder.get_query().unwrap();
    let union = node.find_union().unwrap();
    for branch in &union.queries {
        assert_eq!(branch.output_names()[0], BREAKDOWN_ALIAS);
    }
}

#[test]
fn plausibility_rejects_empty_and_oversized_results() {
    let team = Factory::team().create();
    let config = QueryConfig::default();
    let query = Factory::stats_table_query().with_page(2, 0).create();
    let builder = StatsTableQueryBuilder::new(&query, &team, now(), &config).unwrap();

    let rows = |n: usize| ExecutionResult {
        columns: vec![],
        rows: vec![vec![ScalarValue::Null]; n],
    };
    assert!(builder.is_plausible(&rows(0)).is_err());
    assert!(builder.is_plausible(&rows(3)).is_ok());
    assert!(builder.is_plausible(&rows(4)).is_err());
}

#[tokio::test]
async fn page_breakdown_matches_live_with_comparison() {
    let gateway = seeded_gateway().await;
    let team = Factory::team().create();
    let query = Factory::stats_table_query()
        .with_breakdown(BreakdownBy::Page)
        .with_metrics(ALL_METRICS)
        .with_compare(true)
        .with_page(50, 0)
        .create();

    let (merged, live) = both_paths(&gateway, &query, &team).await;
    assert_same_rows(&merged, &live);
    assert!(merged.columns.iter().any(|c| c == "bounce_rate"));
    assert!(matches!(merged.results[0]["visitors"], CellValue::Pair(..)));
}

#[tokio::test]
async fn null_and_empty_values_fold_into_sentinel() {
    let gateway = seeded_gateway().await;
    let team = Factory::team().create();
    let query = Factory::stats_table_query()
        .with_breakdown(BreakdownBy::Country)
        .with_date_range("2023-12-01", Some("2023-12-14"))
        .create();

    let (merged, live) = both_paths(&gateway, &query, &team).await;
    assert_same_rows(&merged, &live);
    let sentinel = QueryConfig::default().breakdown_null_sentinel;
    assert!(merged.results.iter().any(|r| key_of(r) == sentinel));
    assert!(merged.results.iter().all(|r| !key_of(r).is_empty()));
}

#[tokio::test]
async fn rows_are_ordered_by_first_metric_then_key() {
    let gateway = seeded_gateway().await;
    let team = Factory::team().create();
    let query = Factory::stats_table_query()
        .with_breakdown(BreakdownBy::Page)
        .with_metrics(&[Metric::Views, Metric::Visitors])
        .create();
    let (merged, _) = both_paths(&gateway, &query, &team).await;

    for pair in merged.results.windows(2) {
        let (a, b) = (pair[0]["views"].current(), pair[1]["views"].current());
        assert!(a >= b);
        if a == b {
            assert!(key_of(&pair[0]) < key_of(&pair[1]));
        }
    }
}

#[tokio::test]
async fn pages_walk_the_same_ordering() {
    let gateway = seeded_gateway().await;
    let team = Factory::team().create();
    let whole = Factory::stats_table_query()
        .with_breakdown(BreakdownBy::Page)
        .with_page(50, 0)
        .create();
    let (all, _) = both_paths(&gateway, &whole, &team).await;
    assert!(all.results.len() > 3);
    assert!(!all.has_more);
    assert_eq!(all.next, None);

    let first = Factory::stats_table_query()
        .with_breakdown(BreakdownBy::Page)
        .with_page(2, 0)
        .with_url("https://app.example.com/api/stats?breakdown=PAGE&limit=2")
        .create();
    let (page, live_page) = both_paths(&gateway, &first, &team).await;
    assert_same_rows(&page, &live_page);
    assert_eq!(page.results.len(), 2);
    assert!(page.has_more);
    assert_eq!(
        page.next.as_deref(),
        Some("https://app.example.com/api/stats?breakdown=PAGE&limit=2&offset=2")
    );

    let second = Factory::stats_table_query()
        .with_breakdown(BreakdownBy::Page)
        .with_page(2, 2)
        .create();
    let (page2, _) = both_paths(&gateway, &second, &team).await;
    let keys: Vec<String> = page.results.iter().chain(&page2.results).map(key_of).collect();
    let expected: Vec<String> = all.results.iter().take(4).map(key_of).collect();
    assert_eq!(keys, expected);
}

use crate::engine::aggregate::{
    AggregateFunction, MergeColumn, MergeLayout, combine, merge_expr, to_state_form,
};
use crate::engine::ast::{Expr, SelectQuery, SqlType, Source};
use crate::engine::errors::BuildError;

fn live_state_branch() -> SelectQuery {
    to_state_form(
        &SelectQuery::from_table("events")
            .with_select(vec![
                Expr::field("host").alias("host"),
                Expr::call("uniq", vec![Expr::field("person_id")]).alias("persons_uniq_state"),
                Expr::typed_null(SqlType::Float64).alias("revenue_sum_state"),
            ])
            .with_group_by(vec![Expr::field("host")]),
    )
}

fn rollup_branch() -> SelectQuery {
    SelectQuery::from_table("web_pre_aggregated_stats")
        .with_select(vec![
            Expr::field("host").alias("host"),
            Expr::field("persons_uniq_state").alias("persons_uniq_state"),
            Expr::typed_null(SqlType::Float64).alias("revenue_sum_state"),
        ])
        .and_where(Expr::equals(Expr::field("team_id"), Expr::int(1)))
}

#[test]
fn merge_expr_names() {
    assert_eq!(
        merge_expr(AggregateFunction::Uniq, "s", None).to_string(),
        "uniqMerge(s)"
    );
    let pred = Expr::gt_eq(Expr::field("period_bucket"), Expr::int(0));
    assert_eq!(
        merge_expr(AggregateFunction::Count, "c", Some(pred)).to_string(),
        "countMergeIf(c, period_bucket >= 0)"
    );
}

#[test]
fn layout_inferred_from_state_branch() {
    let columns = MergeLayout::columns_of(&live_state_branch());
    assert_eq!(
        columns,
        vec![
            MergeColumn::key("host"),
            MergeColumn::state("persons_uniq_state", AggregateFunction::Uniq),
            MergeColumn::placeholder("revenue_sum_state", SqlType::Float64),
        ]
    );

    let layout = MergeLayout::from_columns(&columns);
    let printed: Vec<String> = layout.outputs.iter().map(ToString::to_string).collect();
    assert_eq!(
        printed,
        vec![
            "host",
            "uniqMerge(persons_uniq_state) AS persons_uniq_state",
            "CAST(NULL, 'Nullable(Float64)') AS revenue_sum_state",
        ]
    );
    assert_eq!(layout.group_by, vec![Expr::field("host")]);
}

#[test]
fn two_branches_become_union_under_merge() {
    let layout = MergeLayout::from_branch(&live_state_branch());
    let merged = combine(vec![rollup_branch(), live_state_branch()], &layout).unwrap();

    let node = crate::engine::ast::QueryNode::from(merged.clone());
    let union = node.find_union().expect("union");
    assert_eq!(union.queries.len(), 2);
    assert_eq!(merged.output_names(), vec!["host", "persons_uniq_state", "revenue_sum_state"]);
    assert_eq!(merged.group_by, vec![Expr::field("host")]);
}

#[test]
fn single_plain_scan_is_merged_in_place() {
    let layout = MergeLayout::from_columns(&[
        MergeColumn::key("host"),
        MergeColumn::state("persons_uniq_state", AggregateFunction::Uniq),
    ]);
    let branch = SelectQuery::from_table("web_stats_daily")
        .with_select(vec![
            Expr::field("host").alias("host"),
            Expr::field("persons_uniq_state").alias("persons_uniq_state"),
        ])
        .and_where(Expr::equals(Expr::field("team_id"), Expr::int(7)));

    let merged = combine(vec![branch.clone()], &layout).unwrap();

    assert_eq!(merged.from, Source::table("web_stats_daily"));
    assert_eq!(merged.where_clause, branch.where_clause);
    assert_eq!(
        merged.select[1].to_string(),
        "uniqMerge(persons_uniq_state) AS persons_uniq_state"
    );
    assert_eq!(merged.select[0].to_string(), "host AS host");
}

#[test]
fn single_aggregating_branch_is_wrapped() {
    let branch = live_state_branch();
    let merged = combine(vec![branch.clone()], &MergeLayout::from_branch(&branch)).unwrap();
    match &merged.from {
        Source::Subquery { query } => assert_eq!(query.as_select(), Some(&branch)),
        other => panic!("expected subquery, got {other:?}"),
    }
}

#[test]
fn rejects_bad_branch_sets() {
    let layout = MergeLayout::default();
    assert_eq!(combine(vec![], &layout), Err(BuildError::NoBranches));

    let mut reordered = rollup_branch();
    reordered.select.swap(0, 1);
    match combine(vec![rollup_branch(), reordered], &layout) {
        Err(BuildError::MismatchedAliases { index, .. }) => assert_eq!(index, 1),
        other => panic!("unexpected {other:?}"),
    }

    let duplicated = SelectQuery::from_table("t")
        .with_select(vec![Expr::int(1).alias("a"), Expr::int(2).alias("a")]);
    assert_eq!(
        combine(vec![duplicated], &layout),
        Err(BuildError::DuplicateAlias("a".to_string()))
    );
}

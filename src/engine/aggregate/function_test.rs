use crate::engine::aggregate::{AggregateFunction, AggregateName, AggregateStage};

#[test]
fn parses_every_combinator_form() {
    let cases = [
        ("uniq", AggregateFunction::Uniq, false, AggregateStage::Direct),
        ("countIf", AggregateFunction::Count, true, AggregateStage::Direct),
        ("sumState", AggregateFunction::Sum, false, AggregateStage::State),
        ("avgIfState", AggregateFunction::Avg, true, AggregateStage::State),
        ("uniqMerge", AggregateFunction::Uniq, false, AggregateStage::Merge),
        ("sumMergeIf", AggregateFunction::Sum, true, AggregateStage::Merge),
    ];
    for (name, function, conditional, stage) in cases {
        let parsed = AggregateName::parse(name).unwrap_or_else(|| panic!("{name} should parse"));
        assert_eq!(parsed, AggregateName::new(function, conditional, stage));
        assert_eq!(parsed.to_string(), name);
    }
}

#[test]
fn rejects_non_aggregates() {
    for name in ["divide", "uniqExact", "toStartOfDay", "counter", "sumIfMerge"] {
        assert!(AggregateName::parse(name).is_none(), "{name}");
    }
}

#[test]
fn with_stage_keeps_function_and_condition() {
    let state = AggregateName::parse("countIf")
        .unwrap()
        .with_stage(AggregateStage::State);
    assert_eq!(state.to_string(), "countIfState");
    assert_eq!(
        AggregateName::merge(AggregateFunction::Count, false).to_string(),
        "countMerge"
    );
}

use std::collections::HashSet;

use crate::engine::types::ScalarValue;
use crate::test_helpers::factory::Factory;

#[test]
fn dataset_is_reproducible_for_a_seed() {
    let a = Factory::dataset().with_seed(7).create();
    let b = Factory::dataset().with_seed(7).create();
    assert_eq!(a, b);
}

#[test]
fn every_session_has_exactly_one_entry() {
    let rows = Factory::dataset().with_sessions_per_day(5).create();
    let sessions: HashSet<&str> = rows
        .iter()
        .filter_map(|r| r["session_id"].as_str())
        .collect();
    let entries = rows
        .iter()
        .filter(|r| r["is_session_entry"] == ScalarValue::Int64(1))
        .count();
    assert_eq!(sessions.len(), entries);
    // 15 days
    assert_eq!(entries, 75);
}

#[test]
fn event_factory_defaults_and_overrides() {
    let row = Factory::event()
        .with("pathname", "/docs")
        .session_entry(1500, true)
        .create();
    assert_eq!(row["pathname"], ScalarValue::Utf8("/docs".into()));
    assert_eq!(row["is_bounce"], ScalarValue::Int64(1));
    assert_eq!(row["session_duration_ms"], ScalarValue::Int64(1500));
    assert_eq!(row["event"], ScalarValue::Utf8("$pageview".into()));
}

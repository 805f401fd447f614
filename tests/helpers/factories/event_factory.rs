use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::engine::types::ScalarValue;

/// One raw event row as the live table stores it.
pub struct EventFactory {
    params: HashMap<String, ScalarValue>,
}

impl EventFactory {
    pub fn new() -> Self {
        let mut params = HashMap::new();
        let at = Utc.with_ymd_and_hms(2023, 12, 14, 12, 0, 0).unwrap();
        params.insert("team_id".into(), ScalarValue::Int64(1));
        params.insert("timestamp".into(), ScalarValue::Timestamp(at.timestamp()));
        params.insert("event".into(), "$pageview".into());
        params.insert("person_id".into(), "person-1".into());
        params.insert("session_id".into(), "session-1".into());
        params.insert("host".into(), "example.com".into());
        params.insert("device_type".into(), "Desktop".into());
        params.insert("browser".into(), "Chrome".into());
        params.insert("os".into(), "Mac OS X".into());
        params.insert("country_code".into(), "US".into());
        params.insert("referring_domain".into(), "$direct".into());
        params.insert("pathname".into(), "/".into());
        params.insert("entry_pathname".into(), "/".into());
        params.insert("exit_pathname".into(), "/".into());
        params.insert("viewport".into(), "1440x900".into());
        params.insert("is_session_entry".into(), ScalarValue::Int64(0));
        params.insert("is_bounce".into(), ScalarValue::Int64(0));
        params.insert("session_duration_ms".into(), ScalarValue::Int64(0));
        params.insert("revenue".into(), ScalarValue::Null);
        Self { params }
    }

    pub fn with(mut self, key: &str, value: impl Into<ScalarValue>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn at(self, at: DateTime<Utc>) -> Self {
        self.with("timestamp", ScalarValue::Timestamp(at.timestamp()))
    }

    /// Marks the row as the first event of its session.
    pub fn session_entry(self, duration_ms: i64, bounced: bool) -> Self {
        self.with("is_session_entry", 1i64)
            .with("session_duration_ms", duration_ms)
            .with("is_bounce", i64::from(bounced))
    }

    pub fn create(self) -> HashMap<String, ScalarValue> {
        self.params
    }
}

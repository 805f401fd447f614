use crate::command::types::{DateRange, Interval, Metric, Modifiers, PropertyFilter, TrendsQuery};

pub struct TrendsQueryFactory {
    inner: TrendsQuery,
}

impl TrendsQueryFactory {
    /// Daily buckets over the last seven days, rollups allowed.
    pub fn new() -> Self {
        Self {
            inner: TrendsQuery {
                date_range: DateRange::new(Some("-7d"), None),
                properties: Vec::new(),
                conversion_goal: None,
                interval: Interval::Day,
                metrics: None,
                modifiers: Modifiers {
                    use_pre_aggregated_tables: true,
                    ..Modifiers::default()
                },
            },
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.inner.interval = interval;
        self
    }

    pub fn with_metrics(mut self, metrics: &[Metric]) -> Self {
        self.inner.metrics = Some(metrics.to_vec());
        self
    }

    pub fn with_date_range(mut self, from: &str, to: Option<&str>) -> Self {
        self.inner.date_range = DateRange::new(Some(from), to);
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.inner.properties.push(PropertyFilter::exact(key, value));
        self
    }

    pub fn with_pre_aggregated(mut self, enabled: bool) -> Self {
        self.inner.modifiers.use_pre_aggregated_tables = enabled;
        self
    }

    pub fn create(self) -> TrendsQuery {
        self.inner
    }
}

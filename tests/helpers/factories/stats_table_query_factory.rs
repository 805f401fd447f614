use crate::command::types::{
    BreakdownBy, CompareFilter, ConversionGoal, DateRange, Metric, Modifiers, PropertyFilter,
    StatsTableQuery,
};

pub struct StatsTableQueryFactory {
    inner: StatsTableQuery,
}

impl StatsTableQueryFactory {
    /// Pages over the last seven days, rollups allowed.
    pub fn new() -> Self {
        Self {
            inner: StatsTableQuery {
                date_range: DateRange::new(Some("-7d"), None),
                properties: Vec::new(),
                compare_filter: None,
                conversion_goal: None,
                breakdown_by: BreakdownBy::Page,
                metrics: None,
                limit: None,
                offset: None,
                url: None,
                modifiers: Modifiers {
                    use_pre_aggregated_tables: true,
                    ..Modifiers::default()
                },
            },
        }
    }

    pub fn with_breakdown(mut self, breakdown: BreakdownBy) -> Self {
        self.inner.breakdown_by = breakdown;
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

    pub fn with_page(mut self, limit: usize, offset: usize) -> Self {
        self.inner.limit = Some(limit);
        self.inner.offset = Some(offset);
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.inner.url = Some(url.to_string());
        self
    }

    pub fn with_compare(mut self, compare: bool) -> Self {
        self.inner.compare_filter = Some(CompareFilter { compare });
        self
    }

    pub fn with_conversion_goal(mut self, event: &str) -> Self {
        self.inner.conversion_goal = Some(ConversionGoal {
            custom_event: event.to_string(),
        });
        self
    }

    pub fn with_pre_aggregated(mut self, enabled: bool) -> Self {
        self.inner.modifiers.use_pre_aggregated_tables = enabled;
        self
    }

    pub fn create(self) -> StatsTableQuery {
        self.inner
    }
}

use crate::command::types::{
    CompareFilter, ConversionGoal, DateRange, Modifiers, OverviewQuery, PropertyFilter,
    TableVersion,
};

pub struct OverviewQueryFactory {
    inner: OverviewQuery,
}

impl OverviewQueryFactory {
    /// Last seven days, rollups allowed.
    pub fn new() -> Self {
        Self {
            inner: OverviewQuery {
                date_range: DateRange::new(Some("-7d"), None),
                modifiers: Modifiers {
                    use_pre_aggregated_tables: true,
                    ..Modifiers::default()
                },
                ..OverviewQuery::default()
            },
        }
    }

    pub fn with_date_range(mut self, from: &str, to: Option<&str>) -> Self {
        self.inner.date_range = DateRange::new(Some(from), to);
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.inner.properties.push(PropertyFilter::exact(key, value));
        self
    }

    pub fn with_filter(mut self, filter: PropertyFilter) -> Self {
        self.inner.properties.push(filter);
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

    pub fn with_revenue(mut self) -> Self {
        self.inner.include_revenue = true;
        self
    }

    pub fn with_pre_aggregated(mut self, enabled: bool) -> Self {
        self.inner.modifiers.use_pre_aggregated_tables = enabled;
        self
    }

    pub fn with_project_timezone(mut self) -> Self {
        self.inner.modifiers.convert_to_project_timezone = true;
        self
    }

    pub fn with_table_version(mut self, version: TableVersion) -> Self {
        self.inner.modifiers.table_version = Some(version);
        self
    }

    pub fn create(self) -> OverviewQuery {
        self.inner
    }
}

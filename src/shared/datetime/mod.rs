pub mod date_range;
pub mod time_bucketing;

#[cfg(test)]
mod date_range_test;

pub use date_range::{DateRangeError, ResolvedDateRange, resolve_date_range};
pub use time_bucketing::{BucketGranularity, CalendarTimeBucketer};

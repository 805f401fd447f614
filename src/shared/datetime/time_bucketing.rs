use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Truncation granularity for time buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketGranularity {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

/// Calendar-aware time bucketing, optionally in a named timezone.
#[derive(Debug, Clone, Copy)]
pub struct CalendarTimeBucketer {
    timezone: Option<Tz>,
    week_start: Weekday,
}

impl CalendarTimeBucketer {
    pub fn new(timezone: Option<Tz>, week_start: Weekday) -> Self {
        Self {
            timezone,
            week_start,
        }
    }

    pub fn utc() -> Self {
        Self::new(None, Weekday::Mon)
    }

    /// Start of the bucket containing `ts` (epoch seconds), as epoch seconds.
    pub fn bucket_of(&self, ts: i64, gran: BucketGranularity) -> i64 {
        let utc = DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default();

        if let Some(tz) = self.timezone {
            self.bucket(utc.with_timezone(&tz), gran)
        } else {
            self.bucket(utc, gran)
        }
    }

    fn bucket<T: TimeZone>(&self, dt: DateTime<T>, gran: BucketGranularity) -> i64 {
        let naive_date = match gran {
            BucketGranularity::Week => {
                let days_since_week_start = (dt.weekday().num_days_from_monday() + 7
                    - self.week_start.num_days_from_monday())
                    % 7;
                dt.date_naive() - chrono::Duration::days(days_since_week_start as i64)
            }
            BucketGranularity::Month => dt.date_naive().with_day(1).unwrap_or(dt.date_naive()),
            _ => dt.date_naive(),
        };

        let (hour, minute) = match gran {
            BucketGranularity::Minute => (dt.hour(), dt.minute()),
            BucketGranularity::Hour => (dt.hour(), 0),
            _ => (0, 0),
        };

        naive_date
            .and_hms_opt(hour, minute, 0)
            .and_then(|naive| naive.and_local_timezone(dt.timezone()).earliest())
            .map(|local| local.timestamp())
            .unwrap_or_else(|| dt.timestamp())
    }
}

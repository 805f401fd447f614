use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static RELATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-(\d+)([hdwmy])$").expect("relative date pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("Unrecognized date expression: {0}")]
    Unrecognized(String),

    #[error("Date does not exist in timezone {tz}: {value}")]
    NonexistentLocalTime { tz: String, value: String },

    #[error("date_from {from} is after date_to {to}")]
    Inverted { from: String, to: String },
}

/// A date range pinned to concrete instants in one timezone. Both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDateRange {
    pub from: DateTime<Tz>,
    pub to: DateTime<Tz>,
}

impl ResolvedDateRange {
    pub fn timezone(&self) -> Tz {
        self.from.timezone()
    }

    pub fn from_date(&self) -> NaiveDate {
        self.from.date_naive()
    }

    pub fn to_date(&self) -> NaiveDate {
        self.to.date_naive()
    }

    /// Number of calendar days touched by the range.
    pub fn day_span(&self) -> i64 {
        (self.to_date() - self.from_date()).num_days() + 1
    }

    /// The same number of whole days, ending the second before `from`'s day starts.
    pub fn previous_period(&self) -> Result<ResolvedDateRange, DateRangeError> {
        let tz = self.timezone();
        let start = self
            .from_date()
            .checked_sub_days(Days::new(self.day_span().unsigned_abs()))
            .ok_or_else(|| DateRangeError::Unrecognized(self.from.to_rfc3339()))?;
        let from = start_of_day(start, tz)?;
        let to = start_of_day(self.from_date(), tz)? - Duration::seconds(1);
        Ok(ResolvedDateRange { from, to })
    }
}

/// Resolves request-level date strings against `now`.
///
/// Accepted forms: `YYYY-MM-DD`, RFC3339, `-N{h,d,w,m,y}`, `dStart`, `mStart`, `yStart`.
/// Date-only and day-granular relative values snap `from` to the start of the day and
/// `to` to its last second. A missing `date_to` means `now`.
pub fn resolve_date_range(
    date_from: Option<&str>,
    date_to: Option<&str>,
    default_from: &str,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<ResolvedDateRange, DateRangeError> {
    let now = now.with_timezone(&tz);
    let from = resolve_point(date_from.unwrap_or(default_from), tz, now, Edge::Start)?;
    let to = match date_to {
        Some(value) => resolve_point(value, tz, now, Edge::End)?,
        None => now,
    };

    if from > to {
        return Err(DateRangeError::Inverted {
            from: from.to_rfc3339(),
            to: to.to_rfc3339(),
        });
    }

    Ok(ResolvedDateRange { from, to })
}

#[derive(Clone, Copy)]
enum Edge {
    Start,
    End,
}

fn resolve_point(
    value: &str,
    tz: Tz,
    now: DateTime<Tz>,
    edge: Edge,
) -> Result<DateTime<Tz>, DateRangeError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&tz));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return snap(date, tz, edge);
    }

    match value {
        "dStart" => return snap(now.date_naive(), tz, edge),
        "mStart" => {
            let first = now.date_naive().with_day(1).unwrap_or(now.date_naive());
            return snap(first, tz, edge);
        }
        "yStart" => {
            let first = NaiveDate::from_ymd_opt(now.year(), 1, 1).unwrap_or(now.date_naive());
            return snap(first, tz, edge);
        }
        _ => {}
    }

    let caps = RELATIVE
        .captures(value)
        .ok_or_else(|| DateRangeError::Unrecognized(value.to_string()))?;
    let amount: u32 = caps[1]
        .parse()
        .map_err(|_| DateRangeError::Unrecognized(value.to_string()))?;

    let today = now.date_naive();
    let shifted = match &caps[2] {
        "h" => {
            return Duration::try_hours(i64::from(amount))
                .and_then(|delta| now.checked_sub_signed(delta))
                .ok_or_else(|| DateRangeError::Unrecognized(value.to_string()));
        }
        "d" => today.checked_sub_days(Days::new(u64::from(amount))),
        "w" => today.checked_sub_days(Days::new(u64::from(amount) * 7)),
        "m" => today.checked_sub_months(Months::new(amount)),
        "y" => amount
            .checked_mul(12)
            .and_then(|months| today.checked_sub_months(Months::new(months))),
        _ => None,
    };

    let shifted = shifted.ok_or_else(|| DateRangeError::Unrecognized(value.to_string()))?;
    snap(shifted, tz, edge)
}

fn snap(date: NaiveDate, tz: Tz, edge: Edge) -> Result<DateTime<Tz>, DateRangeError> {
    match edge {
        Edge::Start => start_of_day(date, tz),
        Edge::End => end_of_day(date, tz),
    }
}

pub fn start_of_day(date: NaiveDate, tz: Tz) -> Result<DateTime<Tz>, DateRangeError> {
    localize(date.and_time(NaiveTime::MIN), tz)
}

pub fn end_of_day(date: NaiveDate, tz: Tz) -> Result<DateTime<Tz>, DateRangeError> {
    let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    localize(date.and_time(last), tz)
}

fn localize(naive: chrono::NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>, DateRangeError> {
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| DateRangeError::NonexistentLocalTime {
            tz: tz.name().to_string(),
            value: naive.to_string(),
        })
}

use super::date_range::{DateRangeError, resolve_date_range};
use chrono::{NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 12, 15, 13, 45, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn absolute_dates_snap_to_day_edges() {
    let range = resolve_date_range(
        Some("2023-11-01"),
        Some("2023-11-30"),
        "-7d",
        Tz::UTC,
        now(),
    )
    .unwrap();

    assert_eq!(range.from_date(), date(2023, 11, 1));
    assert_eq!(range.to_date(), date(2023, 11, 30));
    assert_eq!(range.from.hour(), 0);
    assert_eq!((range.to.hour(), range.to.minute(), range.to.second()), (23, 59, 59));
    assert_eq!(range.day_span(), 30);
}

#[test]
fn relative_days_resolve_against_now() {
    let range = resolve_date_range(Some("-7d"), None, "-7d", Tz::UTC, now()).unwrap();
    assert_eq!(range.from_date(), date(2023, 12, 8));
    assert_eq!(range.to, now().with_timezone(&Tz::UTC));
}

#[test]
fn missing_date_from_uses_default() {
    let range = resolve_date_range(None, None, "-14d", Tz::UTC, now()).unwrap();
    assert_eq!(range.from_date(), date(2023, 12, 1));
}

#[test]
fn relative_units_and_anchors() {
    let hours = resolve_date_range(Some("-24h"), None, "-7d", Tz::UTC, now()).unwrap();
    assert_eq!(hours.from_date(), date(2023, 12, 14));
    assert_eq!(hours.from.hour(), 13);

    let weeks = resolve_date_range(Some("-2w"), None, "-7d", Tz::UTC, now()).unwrap();
    assert_eq!(weeks.from_date(), date(2023, 12, 1));

    let months = resolve_date_range(Some("-1m"), None, "-7d", Tz::UTC, now()).unwrap();
    assert_eq!(months.from_date(), date(2023, 11, 15));

    let month_start = resolve_date_range(Some("mStart"), None, "-7d", Tz::UTC, now()).unwrap();
    assert_eq!(month_start.from_date(), date(2023, 12, 1));

    let year_start = resolve_date_range(Some("yStart"), None, "-7d", Tz::UTC, now()).unwrap();
    assert_eq!(year_start.from_date(), date(2023, 1, 1));

    let today = resolve_date_range(Some("dStart"), None, "-7d", Tz::UTC, now()).unwrap();
    assert_eq!(today.from_date(), date(2023, 12, 15));
}

#[test]
fn relative_date_to_snaps_to_end_of_day() {
    let range = resolve_date_range(Some("-7d"), Some("-1d"), "-7d", Tz::UTC, now()).unwrap();
    assert_eq!(range.to_date(), date(2023, 12, 14));
    assert_eq!(range.to.hour(), 23);
}

#[test]
fn timezone_shifts_calendar_days() {
    let tz: Tz = "Asia/Tokyo".parse().unwrap();
    // 13:45 UTC is 22:45 in Tokyo, still the 15th; 16:00 UTC is the 16th.
    let late = Utc.with_ymd_and_hms(2023, 12, 15, 16, 0, 0).unwrap();
    let range = resolve_date_range(Some("dStart"), None, "-7d", tz, late).unwrap();
    assert_eq!(range.from_date(), date(2023, 12, 16));
}

#[test]
fn rejects_garbage_and_inverted_ranges() {
    let err = resolve_date_range(Some("yesterday-ish"), None, "-7d", Tz::UTC, now()).unwrap_err();
    assert!(matches!(err, DateRangeError::Unrecognized(_)));

    let err = resolve_date_range(
        Some("2023-12-10"),
        Some("2023-12-01"),
        "-7d",
        Tz::UTC,
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, DateRangeError::Inverted { .. }));
}

#[test]
fn previous_period_covers_same_number_of_days() {
    let range = resolve_date_range(
        Some("2023-11-01"),
        Some("2023-11-30"),
        "-7d",
        Tz::UTC,
        now(),
    )
    .unwrap();
    let previous = range.previous_period().unwrap();

    assert_eq!(previous.from_date(), date(2023, 10, 2));
    assert_eq!(previous.to_date(), date(2023, 10, 31));
    assert_eq!(previous.day_span(), range.day_span());
    assert!(previous.to < range.from);
}

#[test]
fn oversized_relative_offsets_are_rejected() {
    for value in ["-99999999d", "-99999999w", "-4000000000h", "-400000000y"] {
        assert_eq!(
            resolve_date_range(Some(value), None, "-7d", Tz::UTC, now()),
            Err(DateRangeError::Unrecognized(value.to_string())),
            "{value}"
        );
    }
}

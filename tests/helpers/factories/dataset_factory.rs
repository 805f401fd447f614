use std::collections::HashMap;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::types::ScalarValue;
use crate::test_helpers::factories::EventFactory;

const HOSTS: &[&str] = &["example.com", "shop.example.com"];
const DEVICES: &[&str] = &["Desktop", "Mobile", "Tablet"];
const BROWSERS: &[&str] = &["Chrome", "Firefox", "Safari"];
const OSES: &[&str] = &["Mac OS X", "Windows", "iOS", "Android"];
const COUNTRIES: &[&str] = &["US", "DE", "BR", ""];
const REFERRERS: &[&str] = &["$direct", "google.com", "news.ycombinator.com"];
const PATHS: &[&str] = &["/", "/pricing", "/docs", "/blog", ""];
const VIEWPORTS: &[&str] = &["1440x900", "390x844"];

/// Seeded synthetic sessions for one team. Every session stays within its day and
/// carries session-level fields on its first pageview.
pub struct DatasetFactory {
    seed: u64,
    team_id: i64,
    from: NaiveDate,
    to: NaiveDate,
    sessions_per_day: usize,
    persons: usize,
    purchase_event: String,
}

impl DatasetFactory {
    pub fn new() -> Self {
        Self {
            seed: 42,
            team_id: 1,
            from: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2023, 12, 15).unwrap(),
            sessions_per_day: 20,
            persons: 15,
            purchase_event: "purchase".into(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_team(mut self, team_id: i64) -> Self {
        self.team_id = team_id;
        self
    }

    pub fn with_days(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_sessions_per_day(mut self, sessions: usize) -> Self {
        self.sessions_per_day = sessions;
        self
    }

    pub fn with_persons(mut self, persons: usize) -> Self {
        self.persons = persons;
        self
    }

    pub fn create(self) -> Vec<HashMap<String, ScalarValue>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let pick = |rng: &mut StdRng, items: &[&'static str]| items[rng.gen_range(0..items.len())];
        let mut rows = Vec::new();

        let mut day = self.from;
        while day <= self.to {
            let midnight = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap());
            for s in 0..self.sessions_per_day {
                let person = format!("person-{}", rng.gen_range(0..self.persons));
                let session = format!("{day}-{s}");
                let host = pick(&mut rng, HOSTS);
                let device = pick(&mut rng, DEVICES);
                let browser = pick(&mut rng, BROWSERS);
                let os = pick(&mut rng, OSES);
                let country = pick(&mut rng, COUNTRIES);
                let referrer = pick(&mut rng, REFERRERS);
                let viewport = pick(&mut rng, VIEWPORTS);

                let pageviews = rng.gen_range(1..=4);
                let mut at = midnight + Duration::seconds(rng.gen_range(0..80_000));
                let mut visits = Vec::with_capacity(pageviews);
                for _ in 0..pageviews {
                    visits.push((at, pick(&mut rng, PATHS)));
                    at += Duration::seconds(rng.gen_range(5..600));
                }
                let (first_at, entry_path) = visits[0];
                let (last_at, exit_path) = visits[visits.len() - 1];
                let duration_ms = (last_at - first_at).num_milliseconds();

                let base = |at, path: &str| {
                    EventFactory::new()
                        .at(at)
                        .with("team_id", self.team_id)
                        .with("person_id", person.as_str())
                        .with("session_id", session.as_str())
                        .with("host", host)
                        .with("device_type", device)
                        .with("browser", browser)
                        .with("os", os)
                        .with("country_code", country)
                        .with("referring_domain", referrer)
                        .with("viewport", viewport)
                        .with("pathname", path)
                        .with("entry_pathname", entry_path)
                        .with("exit_pathname", exit_path)
                };

                for (i, &(at, path)) in visits.iter().enumerate() {
                    let event = base(at, path);
                    let event = if i == 0 {
                        event.session_entry(duration_ms, pageviews == 1)
                    } else {
                        event
                    };
                    rows.push(event.create());
                }

                if rng.gen_bool(0.2) {
                    let amount = rng.gen_range(5..200) as f64;
                    rows.push(
                        base(last_at + Duration::seconds(30), exit_path)
                            .with("event", self.purchase_event.as_str())
                            .with("revenue", amount)
                            .create(),
                    );
                }
            }
            day += Duration::days(1);
        }
        rows
    }
}

use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            stdout_level: "info".to_string(),
            file_level: "debug".to_string(),
        }
    }
}

/// What a ratio metric reports when its denominator (session count) is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ZeroDenominatorPolicy {
    /// Report `0`, matching the historical dashboards.
    #[default]
    Zero,
    /// Report `null`.
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    /// Mode argument understood by `toStartOfWeek`.
    pub fn mode(&self) -> i64 {
        match self {
            WeekStart::Sunday => 0,
            WeekStart::Monday => 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Raw event table queried by the live path
    pub events_table: String,
    /// Value substituted for missing, null or empty breakdown values
    pub breakdown_null_sentinel: String,
    pub zero_denominator: ZeroDenominatorPolicy,
    /// Used when a request carries no `date_from`
    pub default_date_from: String,
    pub default_breakdown_limit: usize,
    pub max_breakdown_limit: usize,
    pub week_start: WeekStart,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            events_table: "events".to_string(),
            breakdown_null_sentinel: "$$_breakdown_null_$$".to_string(),
            zero_denominator: ZeroDenominatorPolicy::Zero,
            default_date_from: "-7d".to_string(),
            default_breakdown_limit: 10,
            max_breakdown_limit: 1000,
            week_start: WeekStart::Monday,
        }
    }
}

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path =
        env::var("HYBRID_STATS_CONFIG").unwrap_or_else(|_| "hybrid_stats".to_string());

    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(&config_path).required(false))
        .add_source(config::Environment::with_prefix("HYBRID_STATS").separator("__"))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}

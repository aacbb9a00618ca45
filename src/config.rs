use std::env;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Dashboard settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Local path or HTTP(S) URL of the snapshot document.
    pub forecast_source: String,
    pub window_hours: usize,
    pub refresh_minutes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            forecast_source: env::var("FORECAST_SOURCE")
                .unwrap_or_else(|_| "data/latest.json".to_string()),
            window_hours: parse_var("WINDOW_HOURS", 8)?,
            refresh_minutes: parse_var("REFRESH_MINUTES", 15)?,
        })
    }
}

/// Settings for building a snapshot from Open-Meteo.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotConfig {
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub forecast_days: u32,
    pub api_base_url: String,
    pub output_path: String,
}

impl SnapshotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(SnapshotConfig {
            location: env::var("SNAPSHOT_LOCATION").unwrap_or_else(|_| "Schokkerhaven".to_string()),
            latitude: parse_var("SNAPSHOT_LATITUDE", 52.623)?,
            longitude: parse_var("SNAPSHOT_LONGITUDE", 5.783)?,
            forecast_days: parse_var("SNAPSHOT_FORECAST_DAYS", 3)?,
            api_base_url: env::var("OPEN_METEO_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com".to_string()),
            output_path: env::var("SNAPSHOT_OUTPUT")
                .unwrap_or_else(|_| "data/latest.json".to_string()),
        })
    }
}

/// Reads `name`, falling back to `default` when unset. A set but unparseable
/// value is an error rather than a silent default.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

//! Builds the snapshot document from the Open-Meteo forecast API.
//!
//! Each canonical model is requested under a list of provider aliases, the
//! first alias that returns an hourly series wins. The per-model series are
//! then merged onto one timeline of hour records.

use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, SubsecRound, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::SnapshotConfig;
use crate::forecast::{parse_timestamp, Forecast, ForecastMeta, HourlyRecord, ModelReading};

const HOURLY_VARIABLES: &str = "wind_speed_10m,wind_gusts_10m,wind_direction_10m";
const WIND_SPEED_UNIT: &str = "kn";

/// A canonical model and the provider names to try for it, in order.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    pub id: &'static str,
    pub aliases: &'static [&'static str],
}

pub const MODEL_SPECS: &[ModelSpec] = &[
    ModelSpec {
        id: "gfs",
        aliases: &["gfs"],
    },
    ModelSpec {
        id: "icon",
        aliases: &["icon_eu", "icon_seamless", "icon"],
    },
    ModelSpec {
        id: "ecmwf",
        aliases: &["ecmwf_ifs", "ecmwf"],
    },
    ModelSpec {
        id: "jma",
        aliases: &["jma_msm", "jma_seamless"],
    },
];

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Open-Meteo returned status {status} for model alias '{alias}'")]
    Status { alias: String, status: u16 },
    #[error("Failed to parse Open-Meteo response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("No models could be fetched")]
    NoModels,
    #[error("Failed to write snapshot to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SnapshotError {
    /// Transport failures and 5xx responses are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            SnapshotError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SnapshotError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    hourly: Option<HourlySeries>,
}

/// Hourly columns as returned by Open-Meteo. Missing values are `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_gusts_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_direction_10m: Vec<Option<f64>>,
}

impl HourlySeries {
    /// The reading at `index`, only when all three quantities are present.
    fn complete_reading(&self, index: usize) -> Option<ModelReading> {
        let wind = self.wind_speed_10m.get(index).copied().flatten()?;
        let gust = self.wind_gusts_10m.get(index).copied().flatten()?;
        let dir = self.wind_direction_10m.get(index).copied().flatten()?;
        Some(ModelReading::new(
            Some(round_tenth(wind)),
            Some(round_tenth(gust)),
            Some(dir.round_ties_even()),
        ))
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// The series fetched for one canonical model.
#[derive(Debug, Clone)]
pub struct ModelSeries {
    pub model_id: String,
    pub alias: String,
    pub series: HourlySeries,
}

#[derive(Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    forecast_days: u32,
    max_retries: usize,
    min_retry_delay: Duration,
}

impl OpenMeteoClient {
    pub fn new(config: &SnapshotConfig) -> Result<Self, SnapshotError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            latitude: config.latitude,
            longitude: config.longitude,
            forecast_days: config.forecast_days,
            max_retries: 2,
            min_retry_delay: Duration::from_secs(1),
        })
    }

    pub fn with_retry(mut self, max_retries: usize, min_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.min_retry_delay = min_delay;
        self
    }

    /// Fetches every model concurrently. The result keeps the order of
    /// `specs`; models for which no alias produced data are left out.
    /// `on_done` is called once per model as it finishes.
    pub async fn fetch_all<F>(&self, specs: &[ModelSpec], on_done: F) -> Vec<ModelSeries>
    where
        F: Fn(&ModelSpec, bool),
    {
        stream::iter(specs)
            .map(|spec| async move { (spec, self.fetch_model(spec).await) })
            .buffered(specs.len().max(1))
            .inspect(|(spec, result)| on_done(spec, result.is_some()))
            .filter_map(|(_, result)| async move { result })
            .collect()
            .await
    }

    /// Tries each alias of `spec` in order and returns the first non-empty series.
    #[instrument(skip(self, spec), fields(model = spec.id))]
    pub async fn fetch_model(&self, spec: &ModelSpec) -> Option<ModelSeries> {
        for alias in spec.aliases {
            match self.fetch_alias(alias).await {
                Ok(series) if !series.time.is_empty() => {
                    info!("Using alias '{}' for model {}", alias, spec.id);
                    return Some(ModelSeries {
                        model_id: spec.id.to_string(),
                        alias: (*alias).to_string(),
                        series,
                    });
                }
                Ok(_) => debug!("Alias '{}' returned no hourly data", alias),
                Err(e) => warn!("{}/{} failed: {}", spec.id, alias, e),
            }
        }
        warn!("No alias produced data for model {}", spec.id);
        None
    }

    async fn fetch_alias(&self, alias: &str) -> Result<HourlySeries, SnapshotError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.min_retry_delay)
            .with_max_times(self.max_retries)
            .with_jitter();

        (|| self.request_alias(alias))
            .retry(backoff)
            .when(SnapshotError::is_transient)
            .notify(|e: &SnapshotError, delay: Duration| {
                warn!("Retrying alias '{}' in {:?} after: {}", alias, delay, e);
            })
            .await
    }

    async fn request_alias(&self, alias: &str) -> Result<HourlySeries, SnapshotError> {
        let url = format!("{}/v1/forecast", self.base_url);
        debug!("Requesting {} for alias '{}'", url, alias);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                ("hourly", HOURLY_VARIABLES.to_string()),
                ("forecast_days", self.forecast_days.to_string()),
                ("wind_speed_unit", WIND_SPEED_UNIT.to_string()),
                ("models", alias.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnapshotError::Status {
                alias: alias.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: OpenMeteoResponse = serde_json::from_str(&body)?;
        Ok(parsed.hourly.unwrap_or_default())
    }
}

/// Describes where the snapshot is for.
#[derive(Debug, Clone)]
pub struct SnapshotLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Merges per-model series onto the union of their timestamps.
///
/// A model contributes to an hour only when it has wind, gust and direction
/// for that hour. Hours where no model contributes are kept with just a time.
pub fn merge_series(
    series: &[ModelSeries],
    location: &SnapshotLocation,
    generated_at: DateTime<Utc>,
) -> Forecast {
    let index_maps: Vec<HashMap<DateTime<Utc>, usize>> = series
        .iter()
        .map(|model| {
            model
                .series
                .time
                .iter()
                .enumerate()
                .filter_map(|(i, ts)| parse_timestamp(ts).map(|t| (t, i)))
                .collect()
        })
        .collect();

    let all_times: BTreeSet<DateTime<Utc>> = index_maps
        .iter()
        .flat_map(|map| map.keys().copied())
        .collect();

    let hours: Vec<HourlyRecord> = all_times
        .into_iter()
        .map(|time| {
            series
                .iter()
                .zip(&index_maps)
                .filter_map(|(model, index)| {
                    let i = *index.get(&time)?;
                    model.series.complete_reading(i).map(|r| (model, r))
                })
                .fold(HourlyRecord::new(time), |record, (model, reading)| {
                    record.with_reading(model.model_id.clone(), reading)
                })
        })
        .collect();

    let aliases: BTreeMap<String, String> = series
        .iter()
        .map(|m| (m.model_id.clone(), m.alias.clone()))
        .collect();

    Forecast {
        meta: Some(ForecastMeta {
            location: Some(location.name.clone()),
            lat: Some(location.latitude),
            lon: Some(location.longitude),
            models: Some(series.iter().map(|m| m.model_id.clone()).collect()),
            generated_at: Some(generated_at.trunc_subsecs(0)),
            aliases,
        }),
        hours,
    }
}

/// Writes the snapshot as pretty-printed JSON, creating parent directories.
pub async fn write_snapshot(forecast: &Forecast, path: &str) -> Result<(), SnapshotError> {
    let io_err = |source: std::io::Error| SnapshotError::Io {
        path: path.to_string(),
        source,
    };
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let json = forecast.to_json_pretty().map_err(SnapshotError::Serialize)?;
    tokio::fs::write(path, json).await.map_err(io_err)?;
    info!("Wrote snapshot with {} hours to {}", forecast.hours.len(), path);
    Ok(())
}

/// Fetches all models and merges them. Fails only when no model produced data.
pub async fn build_snapshot<F>(
    client: &OpenMeteoClient,
    location: &SnapshotLocation,
    on_done: F,
) -> Result<Forecast, SnapshotError>
where
    F: Fn(&ModelSpec, bool),
{
    let series = client.fetch_all(MODEL_SPECS, on_done).await;
    if series.is_empty() {
        return Err(SnapshotError::NoModels);
    }
    Ok(merge_series(&series, location, Utc::now()))
}

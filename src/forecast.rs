use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Key of the timestamp field inside an hour object. Every other key is a model id.
pub const TIME_KEY: &str = "time";

/// One model's values for one hour. Any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_degrees"
    )]
    pub dir: Option<f64>,
}

impl ModelReading {
    pub fn new(wind: Option<f64>, gust: Option<f64>, dir: Option<f64>) -> Self {
        Self { wind, gust, dir }
    }

    /// Builds a reading from a raw JSON value.
    ///
    /// Returns `None` when the value is not an object (a `null` model entry is
    /// treated the same as a missing one). Fields that are present but not
    /// numbers are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            wind: numeric(object.get("wind")),
            gust: numeric(object.get("gust")),
            dir: numeric(object.get("dir")),
        })
    }
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// A single forecast hour: when, and what each model said.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyRecord {
    pub time: DateTime<Utc>,
    readings: Vec<(String, ModelReading)>,
}

impl HourlyRecord {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            readings: Vec::new(),
        }
    }

    /// Adds (or replaces) the reading for `model_id`.
    pub fn with_reading(mut self, model_id: impl Into<String>, reading: ModelReading) -> Self {
        let model_id = model_id.into();
        match self.readings.iter_mut().find(|(id, _)| *id == model_id) {
            Some(slot) => slot.1 = reading,
            None => self.readings.push((model_id, reading)),
        }
        self
    }

    pub fn reading(&self, model_id: &str) -> Option<&ModelReading> {
        self.readings
            .iter()
            .find(|(id, _)| id == model_id)
            .map(|(_, reading)| reading)
    }

    /// Model ids in document order.
    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.readings.iter().map(|(id, _)| id.as_str())
    }

    pub fn readings(&self) -> &[(String, ModelReading)] {
        &self.readings
    }

    /// Parses one entry of the `hours` array.
    ///
    /// Returns `None` when the entry is not an object or has no usable
    /// timestamp; such entries cannot be placed on the timeline.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let time = object
            .get(TIME_KEY)
            .and_then(Value::as_str)
            .and_then(parse_timestamp)?;

        let mut record = HourlyRecord::new(time);
        for (key, raw) in object {
            if key == TIME_KEY {
                continue;
            }
            match ModelReading::from_value(raw) {
                Some(reading) => record.readings.push((key.clone(), reading)),
                None => debug!("Ignoring non-object entry for model '{}' at {}", key, time),
            }
        }
        Some(record)
    }
}

impl Serialize for HourlyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.readings.len() + 1))?;
        map.serialize_entry(TIME_KEY, &format_timestamp(&self.time))?;
        for (model_id, reading) in &self.readings {
            map.serialize_entry(model_id, reading)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HourlyRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        HourlyRecord::from_value(&value)
            .ok_or_else(|| D::Error::custom("hour record without a valid 'time' field"))
    }
}

/// Snapshot metadata written by the snapshot builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_timestamp"
    )]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
}

impl ForecastMeta {
    /// Reads a `meta` block one field at a time, so a malformed field only
    /// loses itself. Returns `None` when the block is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let Some(object) = value.as_object() else {
            warn!("Ignoring meta block that is not an object: {}", value);
            return None;
        };
        Some(ForecastMeta {
            location: meta_field(object, "location", |v| v.as_str().map(str::to_string)),
            lat: meta_field(object, "lat", Value::as_f64),
            lon: meta_field(object, "lon", Value::as_f64),
            models: meta_field(object, "models", model_list),
            generated_at: meta_field(object, "generated_at", |v| {
                v.as_str().and_then(parse_timestamp)
            }),
            aliases: meta_field(object, "aliases", alias_map).unwrap_or_default(),
        })
    }
}

fn meta_field<T>(
    object: &Map<String, Value>,
    key: &str,
    read: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = object.get(key).filter(|v| !v.is_null())?;
    let parsed = read(value);
    if parsed.is_none() {
        warn!("Ignoring malformed meta field '{}': {}", key, value);
    }
    parsed
}

/// Model ids as listed. Numbers name the same hour key as their decimal text;
/// other entries cannot name a model and are dropped.
fn model_list(value: &Value) -> Option<Vec<String>> {
    let entries = value.as_array()?;
    let models: Vec<String> = entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(id) => Some(id.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect();
    if models.len() < entries.len() {
        warn!(
            "Dropped {} meta.models entries that are not model ids",
            entries.len() - models.len()
        );
    }
    Some(models)
}

fn alias_map(value: &Value) -> Option<BTreeMap<String, String>> {
    let object = value.as_object()?;
    Some(
        object
            .iter()
            .filter_map(|(model, alias)| Some((model.clone(), alias.as_str()?.to_string())))
            .collect(),
    )
}

/// A parsed snapshot document. Treated as immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Forecast {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ForecastMeta>,
    pub hours: Vec<HourlyRecord>,
}

#[derive(Deserialize)]
struct RawForecast {
    #[serde(default)]
    meta: Option<Value>,
    #[serde(default)]
    hours: Vec<Value>,
}

impl Forecast {
    /// Parses a snapshot document.
    ///
    /// Only a document that is not JSON, or whose top level does not have the
    /// expected shape, is an error. Individual hour records that cannot be
    /// placed on the timeline are skipped with a warning.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawForecast = serde_json::from_str(json)?;

        let meta = match raw.meta {
            Some(Value::Null) | None => None,
            Some(value) => ForecastMeta::from_value(&value),
        };

        let total = raw.hours.len();
        let hours: Vec<HourlyRecord> = raw
            .hours
            .iter()
            .filter_map(HourlyRecord::from_value)
            .collect();

        if hours.len() < total {
            warn!(
                "Skipped {} hour records without a usable timestamp out of {}",
                total - hours.len(),
                total
            );
        }
        debug!("Parsed forecast with {} hour records", hours.len());

        Ok(Forecast { meta, hours })
    }

    /// The canonical model set: `meta.models` when present, otherwise the model
    /// keys of the first hour record.
    pub fn model_ids(&self) -> Vec<String> {
        if let Some(models) = self.meta.as_ref().and_then(|m| m.models.as_ref()) {
            return models.clone();
        }
        self.hours
            .first()
            .map(|hour| hour.model_ids().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.meta.as_ref().and_then(|m| m.generated_at)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Parses the timestamp formats found in snapshot documents.
///
/// Accepts RFC 3339 as well as minute-precision times such as
/// `2025-10-18T14:00Z` or `2025-10-18T14:00`; times without an offset are UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = value.strip_suffix('Z').unwrap_or(value);
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Whole degrees are written as JSON integers.
fn serialize_opt_degrees<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) if d.fract() == 0.0 && d.abs() < i64::MAX as f64 => serializer.serialize_i64(*d as i64),
        Some(d) => serializer.serialize_f64(*d),
        None => serializer.serialize_none(),
    }
}

fn serialize_opt_timestamp<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(dt) => serializer.serialize_str(&format_timestamp(dt)),
        None => serializer.serialize_none(),
    }
}

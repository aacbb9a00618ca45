//! Per-hour multi-model blending.
//!
//! Every function here is pure. Missing inputs degrade to neutral defaults
//! (zero magnitudes, no direction) instead of failing, so a partially filled
//! snapshot still produces a complete dashboard.

use serde::Serialize;

use crate::forecast::HourlyRecord;

/// IQR (knots) that alone saturates the spread penalty.
const IQR_SATURATION_KN: f64 = 10.0;
/// Min-max range (knots) that alone saturates the spread penalty.
const RANGE_SATURATION_KN: f64 = 20.0;
/// Number of contributing models that earns the full count boost.
const FULL_CONFIDENCE_MODELS: f64 = 4.0;
const SPREAD_WEIGHT: f64 = 0.65;
const COUNT_WEIGHT: f64 = 0.35;

/// Blended estimate for one hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlendResult {
    /// Mean sustained wind in knots, 0 when no model reported wind.
    pub wind_blend: f64,
    /// Mean gust speed in knots, 0 when no model reported gusts.
    pub gust_blend: f64,
    /// Circular mean direction in [0, 360), `None` when no model reported a direction.
    pub dir_blend: Option<f64>,
    /// Confidence score 0..=100.
    pub reliability: u8,
    /// Gust excess over sustained wind, in percent.
    pub gustiness: u32,
    pub iqr: f64,
    pub range: f64,
    /// Number of wind values that went into the blend.
    pub model_count: usize,
    /// Mean resultant length of the direction vectors (1 = all models agree,
    /// near 0 = directions cancel out and `dir_blend` is arbitrary).
    pub dir_consistency: Option<f64>,
}

impl BlendResult {
    /// True when the directions cancel out so thoroughly that the blended
    /// direction carries no information.
    pub fn direction_is_ambiguous(&self) -> bool {
        self.dir_consistency.is_some_and(|r| r < 1e-6)
    }
}

/// Blends the readings of `model_ids` for a single hour.
///
/// Ids without a reading in `hour` are skipped.
pub fn blend<S: AsRef<str>>(hour: &HourlyRecord, model_ids: &[S]) -> BlendResult {
    let mut winds = Vec::with_capacity(model_ids.len());
    let mut gusts = Vec::with_capacity(model_ids.len());
    let mut dirs = Vec::with_capacity(model_ids.len());

    for reading in model_ids.iter().filter_map(|id| hour.reading(id.as_ref())) {
        if let Some(wind) = reading.wind {
            winds.push(wind);
        }
        if let Some(gust) = reading.gust {
            gusts.push(gust);
        }
        if let Some(dir) = reading.dir {
            dirs.push(dir);
        }
    }

    let wind_blend = mean(&winds);
    let gust_blend = mean(&gusts);
    let direction = circular_mean(&dirs);

    let iqr = quantile(&winds, 0.75) - quantile(&winds, 0.25);
    let range = spread_range(&winds);

    BlendResult {
        wind_blend,
        gust_blend,
        dir_blend: direction.map(|d| d.degrees),
        reliability: reliability(iqr, range, winds.len()),
        gustiness: gustiness(wind_blend, gust_blend),
        iqr,
        range,
        model_count: winds.len(),
        dir_consistency: direction.map(|d| d.resultant_length),
    }
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Result of averaging angles on the unit circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularMean {
    /// Mean direction in [0, 360).
    pub degrees: f64,
    /// Length of the mean unit vector, 0..=1.
    pub resultant_length: f64,
}

/// Circular mean of directions given in degrees.
///
/// Averages the unit vectors and recovers the angle with `atan2`, so 350° and
/// 10° average to 0° rather than 180°. When the vectors cancel out the angle
/// is whatever `atan2` yields for the residue; check `resultant_length`.
pub fn circular_mean(degrees: &[f64]) -> Option<CircularMean> {
    if degrees.is_empty() {
        return None;
    }
    let n = degrees.len() as f64;
    let (sum_cos, sum_sin) = degrees
        .iter()
        .map(|d| d.to_radians())
        .fold((0.0, 0.0), |(c, s), rad| (c + rad.cos(), s + rad.sin()));
    let (x, y) = (sum_cos / n, sum_sin / n);

    let angle = y.atan2(x).to_degrees();
    Some(CircularMean {
        degrees: normalize_degrees(angle),
        resultant_length: x.hypot(y),
    })
}

fn normalize_degrees(angle: f64) -> f64 {
    let normalized = (angle + 360.0) % 360.0;
    // -1e-15 + 360 rounds to exactly 360.0
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Linear-interpolation quantile over the sorted values. Empty input yields 0.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = (sorted.len() - 1) as f64 * q;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;
    match sorted.get(base + 1) {
        Some(next) => sorted[base] + rest * (next - sorted[base]),
        None => sorted[base],
    }
}

/// `max - min`, 0 for fewer than two values.
pub fn spread_range(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}

/// Confidence 0..=100 from inter-model spread and the number of models.
pub fn reliability(iqr: f64, range: f64, count: usize) -> u8 {
    let spread_penalty = (iqr / IQR_SATURATION_KN + range / RANGE_SATURATION_KN).min(1.0);
    let count_boost = (count as f64 / FULL_CONFIDENCE_MODELS).min(1.0);
    let score = SPREAD_WEIGHT * (1.0 - spread_penalty) + COUNT_WEIGHT * count_boost;
    round_half_up(100.0 * score.max(0.0)).clamp(0.0, 100.0) as u8
}

/// Gust excess over sustained wind in percent. The denominator is floored at
/// 1 kn and gusts below the mean wind count as 0.
pub fn gustiness(wind_blend: f64, gust_blend: f64) -> u32 {
    let ratio = (gust_blend - wind_blend) / wind_blend.max(1.0);
    round_half_up(100.0 * ratio.max(0.0)) as u32
}

/// Rounds .5 towards positive infinity.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

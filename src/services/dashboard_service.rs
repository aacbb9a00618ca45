use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::blend::{round_half_up, BlendResult};
use crate::compass::{direction_to_compass_word, PLACEHOLDER};
use crate::forecast::Forecast;
use crate::load_error::LoadError;
use crate::loader::ForecastLoader;
use crate::selector::{blend_all, next_window, today_only};
use crate::view::{DashboardView, DayChart, Kpis, TableRow};

/// What the dashboard is currently showing.
///
/// Owned by whoever drives render cycles. The forecast is only ever replaced
/// wholesale after a successful load.
#[derive(Debug, Default)]
pub struct DashboardState {
    forecast: Option<Arc<Forecast>>,
    source: Option<String>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forecast(&self) -> Option<Arc<Forecast>> {
        self.forecast.clone()
    }

    /// Where the current forecast came from.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Swaps in a freshly loaded forecast and returns the shared handle to it.
    pub fn replace(&mut self, forecast: Forecast, source: &str) -> Arc<Forecast> {
        let forecast = Arc::new(forecast);
        self.forecast = Some(Arc::clone(&forecast));
        self.source = Some(source.to_string());
        forecast
    }
}

#[derive(Clone)]
pub struct DashboardService {
    loader: ForecastLoader,
    window_hours: usize,
}

impl DashboardService {
    pub fn new(loader: ForecastLoader, window_hours: usize) -> Self {
        Self {
            loader,
            window_hours,
        }
    }

    /// One full load-compute cycle against the viewer's local clock.
    pub async fn refresh(
        &self,
        state: &mut DashboardState,
        source: &str,
    ) -> Result<DashboardView, LoadError> {
        self.refresh_at(state, source, Local::now()).await
    }

    /// Like [`refresh`](Self::refresh) with an explicit "now" whose time zone
    /// decides what counts as today and how labels are formatted.
    ///
    /// A failed load leaves `state` untouched.
    #[instrument(skip(self, state, now))]
    pub async fn refresh_at<Tz>(
        &self,
        state: &mut DashboardState,
        source: &str,
        now: DateTime<Tz>,
    ) -> Result<DashboardView, LoadError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let forecast = match self.loader.load(source).await {
            Ok(forecast) => forecast,
            Err(e) => {
                warn!("Render cycle aborted, keeping previous forecast: {}", e);
                return Err(e);
            }
        };
        let forecast = state.replace(forecast, source);
        let view = build_view(&forecast, &now, self.window_hours);
        info!(
            "Rendered dashboard: {} window rows, {} chart points, reliability {}%",
            view.next_hours.len(),
            view.day_chart.labels.len(),
            view.average_reliability
        );
        Ok(view)
    }
}

const VARIABLE_DIRECTION: &str = "Variable";

/// Builds the complete view model for one forecast at `now`.
pub fn build_view<Tz>(forecast: &Forecast, now: &DateTime<Tz>, window_hours: usize) -> DashboardView
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let model_ids = forecast.model_ids();
    let zone = now.timezone();

    let window = next_window(&forecast.hours, now.with_timezone(&Utc), window_hours);
    let window_results = blend_all(window, &model_ids);

    let average_reliability = average_reliability(window_results.iter());

    let kpis = match window_results.first() {
        Some(first) => Kpis {
            wind: format!("{:.1} kn", first.wind_blend),
            direction: direction_label(first),
            gustiness: format!("{}%", first.gustiness),
        },
        None => Kpis {
            wind: format!("{PLACEHOLDER} kn"),
            direction: PLACEHOLDER.to_string(),
            gustiness: format!("{PLACEHOLDER}%"),
        },
    };

    let next_hours = window
        .iter()
        .zip(&window_results)
        .map(|(hour, result)| TableRow {
            time: hour.time,
            label: hour.time.with_timezone(&zone).format("%H:%M").to_string(),
            wind: format!("{:.1} kn", result.wind_blend),
            gust: format!("{:.1} kn", result.gust_blend),
            direction: direction_label(result),
            reliability: format!("{}%", result.reliability),
            blend: *result,
        })
        .collect();

    let today = today_only(&forecast.hours, now);
    let today_results = blend_all(today.iter().copied(), &model_ids);
    let mut day_chart = DayChart::default();
    for (hour, result) in today.iter().zip(&today_results) {
        day_chart
            .labels
            .push(hour.time.with_timezone(&zone).format("%H").to_string());
        day_chart.wind.push(result.wind_blend);
        day_chart.gust.push(result.gust_blend);
        day_chart.details.push(format!(
            "Direction: {}  •  Reliability: {}%",
            direction_label(result),
            result.reliability
        ));
    }

    let snapshot_badge = match forecast.generated_at() {
        Some(at) => format!(
            "Snapshot: {}",
            at.with_timezone(&zone).format("%Y-%m-%d %H:%M")
        ),
        None => "Snapshot: unknown".to_string(),
    };

    DashboardView {
        models_badge: format!("Models: {}", model_ids.join(", ")),
        snapshot_badge,
        reliability_badge: format!("Reliability ({window_hours}h): {average_reliability}%"),
        average_reliability,
        kpis,
        next_hours,
        day_chart,
    }
}

/// Compass word with rounded degrees, e.g. `Southwest (225°)`.
///
/// When the model directions cancel each other out the angle is arbitrary and
/// the word becomes `Variable`.
pub fn direction_label(result: &BlendResult) -> String {
    match result.dir_blend {
        Some(d) if d.is_finite() => {
            // 359.6 rounds to 360, which reads as 0
            let rounded = round_half_up(d) % 360.0;
            let word = if result.direction_is_ambiguous() {
                VARIABLE_DIRECTION
            } else {
                direction_to_compass_word(Some(d))
            };
            format!("{word} ({rounded}°)")
        }
        _ => PLACEHOLDER.to_string(),
    }
}

fn average_reliability<'a>(results: impl Iterator<Item = &'a BlendResult>) -> u8 {
    let (sum, count) = results.fold((0u32, 0u32), |(sum, count), r| {
        (sum + u32::from(r.reliability), count + 1)
    });
    if count == 0 {
        return 0;
    }
    round_half_up(f64::from(sum) / f64::from(count)) as u8
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::blend::BlendResult;

// Presentation DTOs, rebuilt from scratch on every render cycle.

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub models_badge: String,
    pub snapshot_badge: String,
    pub reliability_badge: String,
    /// Rounded mean reliability over the next-hours window, 0 for an empty window.
    pub average_reliability: u8,
    pub kpis: Kpis,
    pub next_hours: Vec<TableRow>,
    pub day_chart: DayChart,
}

/// Headline figures for the first hour of the window.
#[derive(Debug, Clone, Serialize)]
pub struct Kpis {
    pub wind: String,
    pub direction: String,
    pub gustiness: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    pub time: DateTime<Utc>,
    /// Local `HH:MM`.
    pub label: String,
    pub wind: String,
    pub gust: String,
    pub direction: String,
    pub reliability: String,
    pub blend: BlendResult,
}

/// Two series (blended wind and gust) over today's local hours.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DayChart {
    pub labels: Vec<String>,
    pub wind: Vec<f64>,
    pub gust: Vec<f64>,
    /// Per-point tooltip text: direction and reliability.
    pub details: Vec<String>,
}

impl DayChart {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

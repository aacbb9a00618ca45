use std::fmt::Write;

use crate::compass::PLACEHOLDER;
use crate::view::DashboardView;

/// Width of the longest bar in the day chart.
const CHART_WIDTH: usize = 40;

/// Renders the view model as a plain-text dashboard for a terminal.
pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "{}  |  {}  |  {}", view.models_badge, view.snapshot_badge, view.reliability_badge);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Now: {}   {}   Gustiness {}",
        view.kpis.wind, view.kpis.direction, view.kpis.gustiness
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Next hours");
    if view.next_hours.is_empty() {
        let _ = writeln!(out, "  {PLACEHOLDER}");
    } else {
        let _ = writeln!(
            out,
            "  {:<6} {:>9} {:>9}  {:<18} {:>11}",
            "Time", "Wind", "Gust", "Direction", "Reliability"
        );
        for row in &view.next_hours {
            let _ = writeln!(
                out,
                "  {:<6} {:>9} {:>9}  {:<18} {:>11}",
                row.label, row.wind, row.gust, row.direction, row.reliability
            );
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Today (wind = '#', gusts = '+')");
    if view.day_chart.is_empty() {
        let _ = writeln!(out, "  {PLACEHOLDER}");
        return out;
    }

    let peak = view
        .day_chart
        .gust
        .iter()
        .chain(&view.day_chart.wind)
        .copied()
        .fold(0.0_f64, f64::max);
    for (i, label) in view.day_chart.labels.iter().enumerate() {
        let wind = view.day_chart.wind[i];
        let gust = view.day_chart.gust[i];
        let _ = writeln!(
            out,
            "  {:>2}  {:<width$} {:>5.1} / {:<5.1} {}",
            label,
            bar(wind, gust, peak),
            wind,
            gust,
            view.day_chart.details[i],
            width = CHART_WIDTH
        );
    }
    out
}

fn bar(wind: f64, gust: f64, peak: f64) -> String {
    if peak <= 0.0 {
        return String::new();
    }
    let scale = |v: f64| ((v.max(0.0) / peak) * CHART_WIDTH as f64).round() as usize;
    let wind_len = scale(wind).min(CHART_WIDTH);
    let gust_len = scale(gust).clamp(wind_len, CHART_WIDTH);
    format!("{}{}", "#".repeat(wind_len), "+".repeat(gust_len - wind_len))
}

use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

use crate::services::dashboard_service::{DashboardService, DashboardState};
use crate::view::DashboardView;

/// Re-renders the dashboard every `interval_minutes`, starting immediately.
///
/// Refreshes run one at a time on this task. A tick that comes due while a
/// refresh is still running is skipped rather than queued. A failed refresh
/// is logged and the loop carries on with the previous forecast in `state`.
#[instrument(skip(service, state, on_view), fields(interval_minutes = %interval_minutes))]
pub async fn start_refresh_loop<F>(
    service: DashboardService,
    mut state: DashboardState,
    source: String,
    interval_minutes: u64,
    mut on_view: F,
) where
    F: FnMut(&DashboardView),
{
    let mut interval = time::interval(Duration::from_secs(interval_minutes.max(1) * 60));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Refresh loop started with {} minute interval", interval_minutes);

    loop {
        interval.tick().await;
        debug!("Scheduler tick - refreshing dashboard");

        match service.refresh(&mut state, &source).await {
            Ok(view) => on_view(&view),
            Err(e) => error!("Failed to refresh dashboard from {}: {}", source, e),
        }
    }
}

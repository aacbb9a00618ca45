use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::blend::{blend, BlendResult};
use crate::forecast::HourlyRecord;

/// Index of the first record at or after `now`.
///
/// Falls back to 0 when every record lies in the past, so a stale snapshot
/// still shows its earliest hours instead of nothing.
pub fn next_hour_index(hours: &[HourlyRecord], now: DateTime<Utc>) -> usize {
    match hours.iter().position(|hour| hour.time >= now) {
        Some(index) => index,
        None => {
            if !hours.is_empty() {
                warn!(
                    last_hour = %hours[hours.len() - 1].time,
                    now = %now,
                    "All forecast hours are in the past, snapshot is stale"
                );
            }
            0
        }
    }
}

/// The first `window_size` records from `now` onwards, in chronological order.
///
/// `hours` is assumed to be sorted already.
pub fn next_window(hours: &[HourlyRecord], now: DateTime<Utc>, window_size: usize) -> &[HourlyRecord] {
    let start = next_hour_index(hours, now);
    let end = start.saturating_add(window_size).min(hours.len());
    debug!("Selected window [{}, {}) of {} hours", start, end, hours.len());
    &hours[start..end]
}

/// Records whose calendar date in `reference`'s time zone matches the
/// calendar date of `reference`.
pub fn today_only<'a, Tz: TimeZone>(
    hours: &'a [HourlyRecord],
    reference: &DateTime<Tz>,
) -> Vec<&'a HourlyRecord> {
    let zone = reference.timezone();
    let today = reference.date_naive();
    hours
        .iter()
        .filter(|hour| hour.time.with_timezone(&zone).date_naive() == today)
        .collect()
}

/// Blends every record of a selection.
pub fn blend_all<'a, I, S>(records: I, model_ids: &[S]) -> Vec<BlendResult>
where
    I: IntoIterator<Item = &'a HourlyRecord>,
    S: AsRef<str>,
{
    records
        .into_iter()
        .map(|record| blend(record, model_ids))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::ModelReading;
    use chrono::FixedOffset;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 18, h, m, 0).unwrap()
    }

    fn records(times: &[DateTime<Utc>]) -> Vec<HourlyRecord> {
        times
            .iter()
            .map(|t| HourlyRecord::new(*t).with_reading("gfs", ModelReading::new(Some(10.0), None, None)))
            .collect()
    }

    #[test]
    fn test_next_window_starts_at_first_future_hour() {
        let hours = records(&[at(9, 0), at(10, 0), at(11, 0)]);
        let window = next_window(&hours, at(10, 30), 8);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].time, at(11, 0));
    }

    #[test]
    fn test_next_window_includes_exact_match() {
        let hours = records(&[at(9, 0), at(10, 0), at(11, 0)]);
        let window = next_window(&hours, at(10, 0), 8);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].time, at(10, 0));
    }

    #[test]
    fn test_next_window_limits_size() {
        let times: Vec<_> = (0..24).map(|h| at(h, 0)).collect();
        let hours = records(&times);
        let window = next_window(&hours, at(5, 10), 8);
        assert_eq!(window.len(), 8);
        assert_eq!(window[0].time, at(6, 0));
        assert_eq!(window[7].time, at(13, 0));
    }

    #[test]
    fn test_next_window_all_past_falls_back_to_start() {
        let hours = records(&[at(9, 0), at(10, 0), at(11, 0)]);
        let now = Utc.with_ymd_and_hms(2025, 10, 19, 0, 0, 0).unwrap();
        assert_eq!(next_hour_index(&hours, now), 0);
        let window = next_window(&hours, now, 2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].time, at(9, 0));
    }

    #[test]
    fn test_next_window_empty_and_zero_size() {
        assert!(next_window(&[], at(10, 0), 8).is_empty());
        let hours = records(&[at(9, 0), at(10, 0)]);
        assert!(next_window(&hours, at(8, 0), 0).is_empty());
    }

    #[test]
    fn test_today_only_filters_by_reference_date() {
        let hours = records(&[
            Utc.with_ymd_and_hms(2025, 10, 17, 22, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 10, 18, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 10, 18, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 10, 19, 0, 0, 0).unwrap(),
        ]);
        let reference = Utc.with_ymd_and_hms(2025, 10, 18, 12, 0, 0).unwrap();
        let today = today_only(&hours, &reference);
        assert_eq!(today.len(), 2);
        assert_eq!(today[0].time, Utc.with_ymd_and_hms(2025, 10, 18, 1, 0, 0).unwrap());
        assert_eq!(today[1].time, Utc.with_ymd_and_hms(2025, 10, 18, 23, 0, 0).unwrap());
    }

    #[test]
    fn test_today_only_uses_viewer_time_zone() {
        // 22:00 and 23:00 UTC on the 17th are already the 18th at UTC+2
        let hours = records(&[
            Utc.with_ymd_and_hms(2025, 10, 17, 21, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 10, 17, 22, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 10, 17, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 10, 18, 22, 0, 0).unwrap(),
        ]);
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        let reference = cest.with_ymd_and_hms(2025, 10, 18, 8, 0, 0).unwrap();
        let today = today_only(&hours, &reference);
        let times: Vec<_> = today.iter().map(|h| h.time).collect();
        assert_eq!(
            times,
            vec![
                Utc.with_ymd_and_hms(2025, 10, 17, 22, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 10, 17, 23, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_blend_all_maps_each_record() {
        let hours = records(&[at(9, 0), at(10, 0)]);
        let results = blend_all(&hours, &["gfs"]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.wind_blend == 10.0));
    }
}

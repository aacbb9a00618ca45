// Behavioural properties of the blend engine and forecast selection,
// exercised through the public API

use chrono::{DateTime, Duration, TimeZone, Utc};
use wind_blender::blend::{blend, quantile, reliability};
use wind_blender::compass::direction_to_compass_word;
use wind_blender::forecast::{Forecast, HourlyRecord, ModelReading};
use wind_blender::selector::{next_window, today_only};

const MODELS: [&str; 6] = ["m0", "m1", "m2", "m3", "m4", "m5"];

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 18, 12, 0, 0).unwrap()
}

fn winds_hour(winds: &[f64]) -> HourlyRecord {
    winds
        .iter()
        .zip(MODELS)
        .fold(HourlyRecord::new(noon()), |record, (wind, id)| {
            record.with_reading(id, ModelReading::new(Some(*wind), Some(wind + 4.0), Some(180.0)))
        })
}

#[test]
fn test_wind_blend_is_zero_without_wind_values() {
    let record = HourlyRecord::new(noon())
        .with_reading("gfs", ModelReading::new(None, Some(22.0), Some(270.0)))
        .with_reading("icon", ModelReading::new(None, None, None));
    for ids in [vec!["gfs", "icon"], vec!["jma"], vec![]] {
        assert_eq!(blend(&record, &ids).wind_blend, 0.0);
    }
}

#[test]
fn test_direction_wraps_around_north() {
    let record = HourlyRecord::new(noon())
        .with_reading("a", ModelReading::new(Some(10.0), None, Some(350.0)))
        .with_reading("b", ModelReading::new(Some(10.0), None, Some(10.0)));
    let dir = blend(&record, &["a", "b"]).dir_blend.unwrap();
    assert!(dir < 1e-6 || dir > 360.0 - 1e-6, "expected ~0, got {dir}");
}

#[test]
fn test_reliability_non_increasing_with_spread() {
    // Four models, widening symmetric spread around 15 kn
    let mut previous = u8::MAX;
    for step in 0..40 {
        let d = step as f64 * 0.5;
        let result = blend(&winds_hour(&[15.0 - d, 15.0, 15.0, 15.0 + d]), &MODELS[..4]);
        assert_eq!(result.model_count, 4);
        assert!(
            result.reliability <= previous,
            "spread {d}: {} > {previous}",
            result.reliability
        );
        previous = result.reliability;
    }
}

#[test]
fn test_reliability_non_decreasing_with_model_count() {
    // Identical values keep the spread at zero while the count grows
    let values = [12.0; 6];
    let mut previous = 0;
    for count in 0..=6 {
        let result = blend(&winds_hour(&values[..count]), &MODELS[..count]);
        assert!(result.reliability >= previous);
        previous = result.reliability;
    }
    assert_eq!(previous, 100);
}

#[test]
fn test_reliability_stays_in_bounds() {
    for iqr in [0.0, 0.5, 3.0, 10.0, 50.0, 1e6] {
        for range in [0.0, 1.0, 20.0, 1e9] {
            for count in [0, 1, 3, 4, 100] {
                let r = reliability(iqr, range, count);
                assert!(r <= 100, "iqr {iqr} range {range} count {count}: {r}");
            }
        }
    }
}

#[test]
fn test_gustiness_zero_when_gusts_do_not_exceed_wind() {
    for (wind, gust) in [(10.0, 10.0), (10.0, 4.0), (0.5, 0.2), (30.0, 29.9)] {
        let record = HourlyRecord::new(noon())
            .with_reading("a", ModelReading::new(Some(wind), Some(gust), None));
        assert_eq!(blend(&record, &["a"]).gustiness, 0);
    }
}

#[test]
fn test_quantile_reference_values() {
    assert_eq!(quantile(&[], 0.3), 0.0);
    assert_eq!(quantile(&[5.0], 0.9), 5.0);
    assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.25), 1.75);
}

#[test]
fn test_next_window_selection() {
    let hours: Vec<_> = [9, 10, 11]
        .iter()
        .map(|h| HourlyRecord::new(Utc.with_ymd_and_hms(2025, 10, 18, *h, 0, 0).unwrap()))
        .collect();

    let now = Utc.with_ymd_and_hms(2025, 10, 18, 10, 30, 0).unwrap();
    assert_eq!(next_window(&hours, now, 8)[0].time.format("%H:%M").to_string(), "11:00");

    let later = now + Duration::days(2);
    assert_eq!(next_window(&hours, later, 8).len(), 3);
    assert_eq!(next_window(&hours, later, 8)[0].time, hours[0].time);
}

#[test]
fn test_today_only_across_two_dates() {
    let start = Utc.with_ymd_and_hms(2025, 10, 18, 18, 0, 0).unwrap();
    let hours: Vec<_> = (0..12)
        .map(|i| HourlyRecord::new(start + Duration::hours(i)))
        .collect();
    let reference = Utc.with_ymd_and_hms(2025, 10, 19, 7, 0, 0).unwrap();
    let today = today_only(&hours, &reference);
    assert_eq!(today.len(), 6);
    assert!(today.iter().all(|h| h.time.format("%d").to_string() == "19"));
}

#[test]
fn test_single_model_single_hour_passes_values_through() {
    let json = r#"{
        "meta": {"models": ["gfs"]},
        "hours": [{"time": "2025-10-18T12:00:00Z", "gfs": {"wind": 13.7, "gust": 21.2, "dir": 213}}]
    }"#;
    let forecast = Forecast::from_json_str(json).unwrap();
    let result = blend(&forecast.hours[0], &forecast.model_ids());
    assert_eq!(result.wind_blend, 13.7);
    assert_eq!(result.gust_blend, 21.2);
    assert!((result.dir_blend.unwrap() - 213.0).abs() < 1e-9);
    assert_eq!(result.iqr, 0.0);
    assert_eq!(result.range, 0.0);
}

#[test]
fn test_compass_words() {
    assert_eq!(direction_to_compass_word(Some(0.0)), "North");
    assert_eq!(direction_to_compass_word(Some(22.0)), "North");
    // nearest point, not the sector the angle starts in
    assert_eq!(direction_to_compass_word(Some(44.0)), "Northeast");
    assert_eq!(direction_to_compass_word(Some(46.0)), "Northeast");
    assert_eq!(direction_to_compass_word(Some(359.0)), "North");
    assert_eq!(direction_to_compass_word(None), "—");
}

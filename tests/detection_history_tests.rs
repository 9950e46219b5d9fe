use chrono::{DateTime, Duration, TimeZone, Utc};

use tick_sentinel::history::DetectionHistory;
use tick_sentinel::model::anomaly::{Anomaly, AnomalyDetail, Severity};
use tick_sentinel::model::record::DetectionRecord;
use tick_sentinel::model::tick::Tick;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap()
}

fn record(symbol: &str, minutes: i64, severities: &[Severity]) -> DetectionRecord {
    let ts = t0() + Duration::minutes(minutes);
    let tick = Tick::new(symbol, 100.0, 1_000, 0.0, ts);
    let anomalies = severities
        .iter()
        .map(|s| {
            Anomaly::new(
                symbol,
                *s,
                0.8,
                "gap_detection",
                ts,
                AnomalyDetail::PriceGap {
                    gap_pct: 6.0,
                    current_price: 106.0,
                    previous_close: 100.0,
                },
            )
        })
        .collect();
    DetectionRecord::new(tick, anomalies, 10.0)
}

#[test]
fn capacity_evicts_oldest_records() {
    let mut history = DetectionHistory::new(3).unwrap();
    for i in 0..5 {
        history.record(record("X", i, &[]));
    }
    assert_eq!(history.len(), 3);
    let first = history.iter().next().unwrap();
    assert_eq!(first.timestamp(), t0() + Duration::minutes(2));
}

#[test]
/// Only records inside the lookback window count; the per-hour rate is
/// normalized by the window length.
fn stats_respect_the_window() {
    let mut history = DetectionHistory::default();
    history.record(record("X", 0, &[Severity::High]));
    history.record(record("X", 90, &[Severity::Medium, Severity::Low]));
    history.record(record("Y", 100, &[Severity::High, Severity::High]));

    let now = t0() + Duration::minutes(120);
    let stats = history.stats(Duration::hours(1), now);
    assert_eq!(stats.count, 2);
    assert_eq!(stats.anomaly_total, 4);
    assert_eq!(stats.high_severity_total, 2);
    assert!((stats.per_hour_rate - 4.0).abs() < 1e-9);

    let stats = history.stats(Duration::minutes(20), now);
    assert_eq!(stats.count, 1);
    assert_eq!(stats.anomaly_total, 2);
    assert!((stats.per_hour_rate - 6.0).abs() < 1e-9);
}

#[test]
/// Aggregate queries never change the log.
fn queries_do_not_mutate() {
    let mut history = DetectionHistory::default();
    history.record(record("X", 0, &[Severity::High]));
    let _ = history.stats(Duration::hours(1), t0());
    let _ = history.totals();
    assert_eq!(history.len(), 1);
}

#[test]
fn totals_and_latest() {
    let mut history = DetectionHistory::default();
    history.record(record("X", 0, &[Severity::High]));
    history.record(record("Y", 1, &[]));
    history.record(record("X", 2, &[Severity::Low, Severity::Low]));

    let totals = history.totals();
    assert_eq!(totals.total_scans, 3);
    assert_eq!(totals.total_anomalies, 3);
    assert_eq!(totals.high_severity_anomalies, 1);
    assert!((totals.detection_rate - 1.0).abs() < 1e-9);

    let latest = history.latest("X").unwrap();
    assert_eq!(latest.anomaly_count(), 2);
    assert!(history.latest("Z").is_none());
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(DetectionHistory::new(0).is_err());
}

#[test]
/// A window longer than the calendar can express counts every record.
fn oversized_window_covers_everything() {
    let mut history = DetectionHistory::new(10).unwrap();
    history.record(record("X", 0, &[Severity::High]));
    history.record(record("Y", 5, &[]));

    let stats = history.stats(Duration::days(1_000_000_000), t0() + Duration::minutes(10));
    assert_eq!(stats.count, 2);
    assert_eq!(stats.anomaly_total, 1);
    assert_eq!(stats.high_severity_total, 1);
}

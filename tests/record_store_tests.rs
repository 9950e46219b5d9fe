use chrono::{Duration, TimeZone, Utc};

use tick_sentinel::model::anomaly::{Anomaly, AnomalyDetail, Severity};
use tick_sentinel::model::record::DetectionRecord;
use tick_sentinel::model::tick::Tick;
use tick_sentinel::record_store::RecordStore;

fn record(symbol: &str, secs: i64, with_anomaly: bool) -> DetectionRecord {
    let ts = Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap() + Duration::seconds(secs);
    let tick = Tick::new(symbol, 130.0, 1_000_000, 30.0, ts);
    let anomalies = if with_anomaly {
        vec![Anomaly::new(
            symbol,
            Severity::High,
            0.9,
            "gap_detection",
            ts,
            AnomalyDetail::PriceGap {
                gap_pct: 30.0,
                current_price: 130.0,
                previous_close: 100.0,
            },
        )]
    } else {
        Vec::new()
    };
    DetectionRecord::new(tick, anomalies, 18.0)
}

#[test]
/// Records written to sqlite load back intact, newest first.
fn persist_and_load_recent() {
    let store = RecordStore::open_in_memory().unwrap();
    let first = record("X", 0, false);
    let second = record("X", 1, true);
    store.persist(&first).unwrap();
    store.persist(&second).unwrap();
    store.persist(&record("Y", 2, false)).unwrap();

    assert_eq!(store.count().unwrap(), 3);
    let loaded = store.load_recent("X", 10).unwrap();
    assert_eq!(loaded, vec![second.clone(), first]);
    assert_eq!(loaded[0].high_severity_count(), 1);

    assert_eq!(store.load_recent("X", 1).unwrap(), vec![second]);
    assert!(store.load_recent("Z", 10).unwrap().is_empty());
}

#[test]
/// Persisting the same record twice overwrites by id.
fn persist_is_an_upsert() {
    let store = RecordStore::open_in_memory().unwrap();
    let r = record("X", 0, true);
    store.persist(&r).unwrap();
    store.persist(&r).unwrap();
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn open_creates_parent_directories() {
    let dir = std::env::temp_dir().join(format!("tick-sentinel-{}", uuid::Uuid::new_v4()));
    let path = dir.join("nested").join("records.sqlite");
    {
        let store = RecordStore::open(&path).unwrap();
        store.persist(&record("X", 0, false)).unwrap();
    }
    let reopened = RecordStore::open(&path).unwrap();
    assert_eq!(reopened.count().unwrap(), 1);
    let _ = std::fs::remove_dir_all(dir);
}

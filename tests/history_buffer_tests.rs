use chrono::{DateTime, Duration, TimeZone, Utc};

use tick_sentinel::error::SentinelError;
use tick_sentinel::history::HistoryBuffer;
use tick_sentinel::model::tick::Tick;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap()
}

fn tick(symbol: &str, price: f64, secs: i64) -> Tick {
    Tick::new(symbol, price, 1_000, 0.0, t0() + Duration::seconds(secs))
}

#[test]
/// Appending capacity + k ticks keeps exactly `capacity`, dropping the k oldest
/// and preserving arrival order.
fn eviction_drops_oldest_first() {
    let mut buffer = HistoryBuffer::new(5).unwrap();
    for i in 0..8 {
        buffer.append(tick("X", 100.0 + i as f64, i)).unwrap();
    }
    assert_eq!(buffer.size("X"), 5);
    let prices: Vec<f64> = buffer.full_window("X").iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![103.0, 104.0, 105.0, 106.0, 107.0]);
}

#[test]
/// An older tick is rejected and the buffer is left exactly as it was.
fn out_of_order_tick_is_rejected_without_mutation() {
    let mut buffer = HistoryBuffer::new(10).unwrap();
    buffer.append(tick("X", 100.0, 10)).unwrap();
    buffer.append(tick("X", 101.0, 20)).unwrap();

    let err = buffer.append(tick("X", 99.0, 15)).unwrap_err();
    match err {
        SentinelError::OutOfOrderTick { symbol, last, received } => {
            assert_eq!(symbol, "X");
            assert_eq!(last, t0() + Duration::seconds(20));
            assert_eq!(received, t0() + Duration::seconds(15));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(buffer.size("X"), 2);
    assert!((buffer.last("X").unwrap().price - 101.0).abs() < f64::EPSILON);
}

#[test]
fn equal_timestamps_are_accepted() {
    let mut buffer = HistoryBuffer::new(10).unwrap();
    buffer.append(tick("X", 100.0, 5)).unwrap();
    buffer.append(tick("X", 100.5, 5)).unwrap();
    assert_eq!(buffer.size("X"), 2);
}

#[test]
fn window_tolerates_short_history() {
    let mut buffer = HistoryBuffer::new(10).unwrap();
    for i in 0..3 {
        buffer.append(tick("X", 100.0 + i as f64, i)).unwrap();
    }
    assert_eq!(buffer.window("X", 50).len(), 3);
    let last_two: Vec<f64> = buffer.window("X", 2).iter().map(|t| t.price).collect();
    assert_eq!(last_two, vec![101.0, 102.0]);
    assert!(buffer.window("MISSING", 5).is_empty());
}

#[test]
/// Ordering is enforced per symbol; another symbol's clock is irrelevant.
fn symbols_are_independent() {
    let mut buffer = HistoryBuffer::new(10).unwrap();
    buffer.append(tick("A", 10.0, 100)).unwrap();
    buffer.append(tick("B", 20.0, 1)).unwrap();
    assert_eq!(buffer.symbols(), vec!["A", "B"]);
    assert_eq!(buffer.total_points(), 2);
}

#[test]
fn zero_capacity_is_a_config_error() {
    assert!(matches!(
        HistoryBuffer::new(0),
        Err(SentinelError::Config(_))
    ));
}

use crate::detector::config::DetectorConfig;
use crate::detector::preceding;
use crate::model::anomaly::{Anomaly, AnomalyDetail, Severity};
use crate::model::tick::Tick;

pub const MODEL_NAME: &str = "gap_detection";
const GAP_CONFIDENCE: f64 = 0.90;

/// Jump between the previous tick's price and the current one.
pub fn detect_price_gap(tick: &Tick, window: &[&Tick], cfg: &DetectorConfig) -> Vec<Anomaly> {
    if window.len() < cfg.min_history_gap {
        return Vec::new();
    }
    let Some(previous) = preceding(tick, window).last() else {
        return Vec::new();
    };
    let previous_close = previous.price;
    if previous_close <= 0.0 {
        return Vec::new();
    }

    let gap_pct = ((tick.price - previous_close) / previous_close).abs() * 100.0;
    if gap_pct <= cfg.gap_threshold_pct {
        return Vec::new();
    }
    let severity = if gap_pct > cfg.gap_high_pct {
        Severity::High
    } else {
        Severity::Medium
    };
    vec![Anomaly::new(
        &tick.symbol,
        severity,
        GAP_CONFIDENCE,
        MODEL_NAME,
        tick.timestamp,
        AnomalyDetail::PriceGap {
            gap_pct,
            current_price: tick.price,
            previous_close,
        },
    )]
}

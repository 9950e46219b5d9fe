use crate::detector::config::DetectorConfig;
use crate::detector::preceding;
use crate::indicator::stats::linear_slope;
use crate::model::anomaly::{Anomaly, AnomalyDetail, Severity};
use crate::model::tick::Tick;

pub const MODEL_NAME: &str = "trend_analysis";

/// Extrapolates the recent least-squares trend one step and compares the
/// current price against it.
pub fn detect_trend_deviation(
    tick: &Tick,
    window: &[&Tick],
    cfg: &DetectorConfig,
) -> Vec<Anomaly> {
    if window.len() < cfg.min_history_trend {
        return Vec::new();
    }
    let history = preceding(tick, window);
    let recent = &history[history.len().saturating_sub(cfg.trend_lookback)..];
    let prices: Vec<f64> = recent.iter().map(|t| t.price).collect();
    let (Some(slope), Some(last)) = (linear_slope(&prices), prices.last().copied()) else {
        return Vec::new();
    };

    let predicted_price = last + slope;
    if predicted_price <= 0.0 {
        return Vec::new();
    }
    let deviation_pct = (tick.price - predicted_price).abs() / predicted_price * 100.0;
    if deviation_pct <= cfg.threshold_trend_deviation_pct {
        return Vec::new();
    }

    let severity = if deviation_pct > cfg.trend_high_pct {
        Severity::Medium
    } else {
        Severity::Low
    };
    vec![Anomaly::new(
        &tick.symbol,
        severity,
        (0.5 + deviation_pct / 20.0).min(0.85),
        MODEL_NAME,
        tick.timestamp,
        AnomalyDetail::TrendDeviation {
            predicted_price,
            actual_price: tick.price,
            deviation_pct,
        },
    )]
}

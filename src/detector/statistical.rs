use crate::detector::config::DetectorConfig;
use crate::detector::preceding;
use crate::indicator::stats::mean_and_std;
use crate::model::anomaly::{Anomaly, AnomalyDetail, Severity};
use crate::model::tick::Tick;

pub const MODEL_NAME: &str = "statistical_z_score";

/// Z-score of the current price and change-percent against the ticks that
/// precede it in the window.
pub fn detect_price_statistics(
    tick: &Tick,
    window: &[&Tick],
    cfg: &DetectorConfig,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    if window.len() < cfg.min_history_price {
        return anomalies;
    }

    let history = preceding(tick, window);
    let prices: Vec<f64> = history.iter().map(|t| t.price).collect();
    let changes: Vec<f64> = history.iter().map(|t| t.change_percent).collect();

    if let Some((z, historical_mean)) = z_score(tick.price, &prices, cfg.min_relative_std) {
        if z > cfg.threshold_price_volatility {
            anomalies.push(Anomaly::new(
                &tick.symbol,
                severity_for(z, cfg),
                z_confidence(z),
                MODEL_NAME,
                tick.timestamp,
                AnomalyDetail::PriceStatistical {
                    z_score: z,
                    current_price: tick.price,
                    historical_mean,
                },
            ));
        }
    }

    if let Some((z, historical_mean)) =
        z_score(tick.change_percent, &changes, cfg.min_relative_std)
    {
        if z > cfg.threshold_price_volatility {
            anomalies.push(Anomaly::new(
                &tick.symbol,
                severity_for(z, cfg),
                z_confidence(z),
                MODEL_NAME,
                tick.timestamp,
                AnomalyDetail::PriceChange {
                    z_score: z,
                    current_change: tick.change_percent,
                    historical_mean,
                },
            ));
        }
    }

    anomalies
}

/// Absolute z-score and the series mean; `None` for an empty series.
fn z_score(value: f64, series: &[f64], min_relative_std: f64) -> Option<(f64, f64)> {
    let (mean, std) = mean_and_std(series)?;
    let std = std.max(min_relative_std * mean.abs().max(1.0));
    Some((((value - mean) / std).abs(), mean))
}

fn severity_for(z: f64, cfg: &DetectorConfig) -> Severity {
    if z > cfg.price_high_z {
        Severity::High
    } else {
        Severity::Medium
    }
}

fn z_confidence(z: f64) -> f64 {
    (0.5 + z / 10.0).min(0.95)
}

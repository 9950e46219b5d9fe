use crate::detector::config::DetectorConfig;
use crate::detector::preceding;
use crate::indicator::stats::mean;
use crate::model::anomaly::{Anomaly, AnomalyDetail, Severity};
use crate::model::tick::Tick;

pub const MODEL_NAME: &str = "volume_ratio_analysis";
pub const DIVERGENCE_MODEL_NAME: &str = "pattern_analysis";

const DROUGHT_CONFIDENCE: f64 = 0.75;
const DIVERGENCE_CONFIDENCE: f64 = 0.75;

/// Spike or drought of the current volume against the mean volume of the
/// ticks preceding it.
///
/// Zero volumes are treated as missing, both in the history and for the
/// current tick. At most one finding is produced.
pub fn detect_volume_anomalies(
    tick: &Tick,
    window: &[&Tick],
    cfg: &DetectorConfig,
) -> Vec<Anomaly> {
    if window.len() < cfg.min_history_volume || tick.volume == 0 {
        return Vec::new();
    }
    let volumes: Vec<f64> = preceding(tick, window)
        .iter()
        .filter(|t| t.volume > 0)
        .map(|t| t.volume as f64)
        .collect();
    if volumes.len() < cfg.min_volume_samples {
        return Vec::new();
    }
    let Some(average_volume) = mean(&volumes) else {
        return Vec::new();
    };
    if average_volume <= 0.0 {
        return Vec::new();
    }

    let volume_ratio = tick.volume as f64 / average_volume;
    let (severity, confidence, detail) = if volume_ratio > cfg.threshold_volume_spike {
        let severity = if volume_ratio > cfg.volume_spike_high {
            Severity::High
        } else {
            Severity::Medium
        };
        (
            severity,
            (0.6 + volume_ratio / 20.0).min(0.95),
            AnomalyDetail::VolumeSpike {
                volume_ratio,
                current_volume: tick.volume,
                average_volume,
            },
        )
    } else if volume_ratio < cfg.volume_drought_ratio {
        (
            Severity::Medium,
            DROUGHT_CONFIDENCE,
            AnomalyDetail::VolumeDrought {
                volume_ratio,
                current_volume: tick.volume,
                average_volume,
            },
        )
    } else {
        return Vec::new();
    };

    vec![Anomaly::new(
        &tick.symbol,
        severity,
        confidence,
        MODEL_NAME,
        tick.timestamp,
        detail,
    )]
}

/// Large move on abnormally thin volume.
///
/// Stands in for the pattern model whenever that model cannot be fitted.
pub fn detect_price_volume_divergence(
    tick: &Tick,
    window: &[&Tick],
    cfg: &DetectorConfig,
) -> Vec<Anomaly> {
    let history = preceding(tick, window);
    let recent = &history[history.len().saturating_sub(cfg.divergence_lookback)..];
    let volumes: Vec<f64> = recent
        .iter()
        .filter(|t| t.volume > 0)
        .map(|t| t.volume as f64)
        .collect();
    let Some(average_volume) = mean(&volumes) else {
        return Vec::new();
    };

    let price_change = tick.change_percent.abs();
    let current_volume = tick.volume as f64;
    if price_change <= cfg.divergence_change_pct
        || current_volume >= average_volume * cfg.divergence_volume_ratio
    {
        return Vec::new();
    }
    vec![Anomaly::new(
        &tick.symbol,
        Severity::Medium,
        DIVERGENCE_CONFIDENCE,
        DIVERGENCE_MODEL_NAME,
        tick.timestamp,
        AnomalyDetail::PriceVolumeDivergence {
            price_change,
            volume_ratio: current_volume / average_volume,
        },
    )]
}

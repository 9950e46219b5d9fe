use serde::{Deserialize, Serialize};

use crate::error::SentinelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternModelKind {
    IsolationForest,
    StandardizedDistance,
}

/// Every threshold and minimum window the detectors use.
///
/// Minimum history lengths are kept per detector; they are counted over the
/// symbol's buffer including the tick under evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    // statistical price / change-percent z-scores
    pub threshold_price_volatility: f64,
    pub price_high_z: f64,
    pub min_history_price: usize,
    /// Floor on the historical standard deviation, relative to `max(|mean|, 1)`,
    /// so a flat history still yields a finite z-score.
    pub min_relative_std: f64,

    // gap against the previous tick
    pub gap_threshold_pct: f64,
    pub gap_high_pct: f64,
    pub min_history_gap: usize,

    // volume spike / drought
    pub threshold_volume_spike: f64,
    pub volume_spike_high: f64,
    pub volume_drought_ratio: f64,
    pub min_history_volume: usize,
    pub min_volume_samples: usize,

    // price-volume divergence fallback
    pub divergence_change_pct: f64,
    pub divergence_volume_ratio: f64,
    pub divergence_lookback: usize,

    // trend extrapolation
    pub threshold_trend_deviation_pct: f64,
    pub trend_high_pct: f64,
    pub min_history_trend: usize,
    pub trend_lookback: usize,

    // cross-symbol divergence
    pub threshold_correlation_divergence: f64,
    pub correlation_lookback: usize,

    // pattern model
    pub pattern_model: PatternModelKind,
    pub min_history_pattern: usize,
    pub pattern_lookback: usize,
    pub min_pattern_rows: usize,
    /// Decision scores below `-pattern_high_score` are HIGH severity.
    pub pattern_high_score: f64,
    pub contamination: f64,
    pub n_trees: usize,
    pub max_samples: usize,
    pub model_seed: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold_price_volatility: 3.0,
            price_high_z: 4.0,
            min_history_price: 20,
            min_relative_std: 1e-3,

            gap_threshold_pct: 5.0,
            gap_high_pct: 10.0,
            min_history_gap: 20,

            threshold_volume_spike: 5.0,
            volume_spike_high: 10.0,
            volume_drought_ratio: 0.2,
            min_history_volume: 10,
            min_volume_samples: 5,

            divergence_change_pct: 3.0,
            divergence_volume_ratio: 0.5,
            divergence_lookback: 20,

            threshold_trend_deviation_pct: 3.0,
            trend_high_pct: 5.0,
            min_history_trend: 30,
            trend_lookback: 20,

            threshold_correlation_divergence: 5.0,
            correlation_lookback: 10,

            pattern_model: PatternModelKind::IsolationForest,
            min_history_pattern: 50,
            pattern_lookback: 50,
            min_pattern_rows: 20,
            pattern_high_score: 0.5,
            contamination: 0.1,
            n_trees: 100,
            max_samples: 256,
            model_seed: 42,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), SentinelError> {
        let positive = [
            ("threshold_price_volatility", self.threshold_price_volatility),
            ("price_high_z", self.price_high_z),
            ("min_relative_std", self.min_relative_std),
            ("gap_threshold_pct", self.gap_threshold_pct),
            ("gap_high_pct", self.gap_high_pct),
            ("threshold_volume_spike", self.threshold_volume_spike),
            ("volume_spike_high", self.volume_spike_high),
            ("volume_drought_ratio", self.volume_drought_ratio),
            ("divergence_change_pct", self.divergence_change_pct),
            ("divergence_volume_ratio", self.divergence_volume_ratio),
            ("threshold_trend_deviation_pct", self.threshold_trend_deviation_pct),
            ("trend_high_pct", self.trend_high_pct),
            (
                "threshold_correlation_divergence",
                self.threshold_correlation_divergence,
            ),
            ("pattern_high_score", self.pattern_high_score),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SentinelError::Config(format!(
                    "detector.{} must be finite and > 0, got {}",
                    name, value
                )));
            }
        }
        if self.volume_drought_ratio >= self.threshold_volume_spike {
            return Err(SentinelError::Config(
                "detector.volume_drought_ratio must be below threshold_volume_spike".to_string(),
            ));
        }
        if !(self.contamination > 0.0 && self.contamination < 0.5) {
            return Err(SentinelError::Config(
                "detector.contamination must be in (0, 0.5)".to_string(),
            ));
        }
        let windows = [
            ("min_history_gap", self.min_history_gap, 2),
            ("min_history_volume", self.min_history_volume, 2),
            ("min_volume_samples", self.min_volume_samples, 1),
            ("divergence_lookback", self.divergence_lookback, 1),
            ("min_history_trend", self.min_history_trend, 3),
            ("trend_lookback", self.trend_lookback, 2),
            ("correlation_lookback", self.correlation_lookback, 1),
            ("min_history_price", self.min_history_price, 2),
            ("pattern_lookback", self.pattern_lookback, 2),
            ("min_pattern_rows", self.min_pattern_rows, 2),
            ("n_trees", self.n_trees, 1),
            ("max_samples", self.max_samples, 2),
        ];
        for (name, value, min) in windows {
            if value < min {
                return Err(SentinelError::Config(format!(
                    "detector.{} must be >= {}, got {}",
                    name, min, value
                )));
            }
        }
        if self.min_history_pattern < self.min_pattern_rows {
            return Err(SentinelError::Config(
                "detector.min_history_pattern must be >= min_pattern_rows".to_string(),
            ));
        }
        Ok(())
    }
}

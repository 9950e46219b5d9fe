//! Pluggable outlier model behind the pattern detector.
//!
//! The detector builds a feature matrix of `[price, volume, change%, high, low]`
//! from the recent window, standardizes it, fits the model and scores the
//! current tick. Any failure along the way surfaces as a [`ModelFitError`];
//! the engine decides what runs in its place.

use thiserror::Error;

use crate::detector::config::DetectorConfig;
use crate::model::anomaly::{Anomaly, AnomalyDetail, Severity};
use crate::model::tick::Tick;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelFitError {
    #[error("insufficient rows: got {rows}, need at least {required}")]
    InsufficientRows { rows: usize, required: usize },

    #[error("degenerate features: no column varies")]
    DegenerateFeatures,

    #[error("non-finite value in feature column {column}")]
    NonFinite { column: usize },

    #[error("dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("model has not been fitted")]
    NotFitted,
}

/// Result of scoring one point. Negative scores are more anomalous.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierScore {
    pub is_outlier: bool,
    pub score: f64,
}

pub trait OutlierModel: Send {
    fn name(&self) -> &str;

    fn fit(&mut self, rows: &[Vec<f64>]) -> Result<(), ModelFitError>;

    fn score(&self, point: &[f64]) -> Result<OutlierScore, ModelFitError>;
}

/// Checks shape and finiteness; returns the feature count.
pub(crate) fn check_rows(rows: &[Vec<f64>], required: usize) -> Result<usize, ModelFitError> {
    if rows.len() < required {
        return Err(ModelFitError::InsufficientRows {
            rows: rows.len(),
            required,
        });
    }
    let width = rows[0].len();
    for row in rows {
        check_point(row, width)?;
    }
    Ok(width)
}

pub(crate) fn check_point(point: &[f64], width: usize) -> Result<(), ModelFitError> {
    if point.len() != width {
        return Err(ModelFitError::DimensionMismatch {
            expected: width,
            got: point.len(),
        });
    }
    if let Some(column) = point.iter().position(|v| !v.is_finite()) {
        return Err(ModelFitError::NonFinite { column });
    }
    Ok(())
}

/// Per-column standardization. Zero-variance columns keep a scale of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ModelFitError> {
        let width = check_rows(rows, 1)?;
        let n = rows.len() as f64;
        let means: Vec<f64> = (0..width)
            .map(|f| rows.iter().map(|r| r[f]).sum::<f64>() / n)
            .collect();
        let mut scales: Vec<f64> = (0..width)
            .map(|f| {
                let var = rows.iter().map(|r| (r[f] - means[f]).powi(2)).sum::<f64>() / n;
                var.sqrt()
            })
            .collect();

        let mut varying = false;
        for (s, m) in scales.iter_mut().zip(&means) {
            // rounding noise on a constant column is not variance
            if *s > 1e-12 * m.abs().max(1.0) {
                varying = true;
            } else {
                *s = 1.0;
            }
        }
        if !varying {
            return Err(ModelFitError::DegenerateFeatures);
        }
        Ok(Self { means, scales })
    }

    pub fn transform(&self, point: &[f64]) -> Result<Vec<f64>, ModelFitError> {
        check_point(point, self.means.len())?;
        Ok(point
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

/// Fits `model` on the recent window and scores `tick`.
///
/// Returns `Ok(vec![])` below the minimum history; an `Err` means the model
/// could not be fitted or evaluated on this data.
pub fn detect_pattern_anomalies(
    tick: &Tick,
    window: &[&Tick],
    cfg: &DetectorConfig,
    model: &mut dyn OutlierModel,
) -> Result<Vec<Anomaly>, ModelFitError> {
    if window.len() < cfg.min_history_pattern {
        return Ok(Vec::new());
    }
    let recent = &window[window.len().saturating_sub(cfg.pattern_lookback)..];
    let rows: Vec<Vec<f64>> = recent.iter().map(|t| t.feature_row().to_vec()).collect();
    if rows.len() < cfg.min_pattern_rows {
        return Ok(Vec::new());
    }

    let scaler = StandardScaler::fit(&rows)?;
    let normalized = rows
        .iter()
        .map(|row| scaler.transform(row))
        .collect::<Result<Vec<_>, _>>()?;
    model.fit(&normalized)?;

    let current = scaler.transform(&tick.feature_row())?;
    let OutlierScore { is_outlier, score } = model.score(&current)?;
    if !is_outlier {
        return Ok(Vec::new());
    }

    let severity = if score < -cfg.pattern_high_score {
        Severity::High
    } else {
        Severity::Medium
    };
    Ok(vec![Anomaly::new(
        &tick.symbol,
        severity,
        (0.5 + score.abs()).min(0.9),
        model.name(),
        tick.timestamp,
        AnomalyDetail::PatternMl {
            anomaly_score: score,
        },
    )])
}

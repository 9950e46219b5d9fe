use crate::detector::pattern::{check_point, check_rows, ModelFitError, OutlierModel, OutlierScore};
use crate::indicator::stats::quantile;

pub const MODEL_NAME: &str = "standardized_distance";

/// Deterministic distance model: root-mean-square z-distance from the
/// training centroid, thresholded at the `1 - contamination` quantile of the
/// training distances.
#[derive(Debug, Clone)]
pub struct StandardizedDistance {
    contamination: f64,
    means: Vec<f64>,
    scales: Vec<f64>,
    threshold: Option<f64>,
}

impl StandardizedDistance {
    pub fn new(contamination: f64) -> Self {
        Self {
            contamination,
            means: Vec::new(),
            scales: Vec::new(),
            threshold: None,
        }
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    fn distance(&self, point: &[f64]) -> f64 {
        let sum: f64 = point
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .map(|((v, m), s)| {
                let z = (v - m) / s;
                z * z
            })
            .sum();
        (sum / point.len().max(1) as f64).sqrt()
    }
}

impl Default for StandardizedDistance {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl OutlierModel for StandardizedDistance {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn fit(&mut self, rows: &[Vec<f64>]) -> Result<(), ModelFitError> {
        let width = check_rows(rows, 2)?;
        let n = rows.len() as f64;
        let means: Vec<f64> = (0..width)
            .map(|f| rows.iter().map(|r| r[f]).sum::<f64>() / n)
            .collect();
        let stds: Vec<f64> = (0..width)
            .map(|f| {
                let var = rows.iter().map(|r| (r[f] - means[f]).powi(2)).sum::<f64>() / n;
                var.sqrt()
            })
            .collect();
        if stds.iter().all(|s| *s <= f64::EPSILON) {
            return Err(ModelFitError::DegenerateFeatures);
        }

        self.means = means;
        self.scales = stds
            .into_iter()
            .map(|s| if s <= f64::EPSILON { 1.0 } else { s })
            .collect();
        let distances: Vec<f64> = rows.iter().map(|r| self.distance(r)).collect();
        self.threshold = quantile(&distances, 1.0 - self.contamination);
        Ok(())
    }

    fn score(&self, point: &[f64]) -> Result<OutlierScore, ModelFitError> {
        let threshold = self.threshold.ok_or(ModelFitError::NotFitted)?;
        check_point(point, self.means.len())?;
        let decision = threshold - self.distance(point);
        Ok(OutlierScore {
            is_outlier: decision < 0.0,
            score: decision,
        })
    }
}

use crate::model::anomaly::{Anomaly, Severity};

pub const MAX_RISK_SCORE: f64 = 100.0;

/// Saturating aggregate of one evaluation's anomalies.
///
/// `score = min(100, scale * sum(weight(severity) * confidence))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScorer {
    pub high_weight: f64,
    pub medium_weight: f64,
    pub low_weight: f64,
    pub scale: f64,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self {
            high_weight: 1.0,
            medium_weight: 0.6,
            low_weight: 0.3,
            scale: 20.0,
        }
    }
}

impl RiskScorer {
    pub fn weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::High => self.high_weight,
            Severity::Medium => self.medium_weight,
            Severity::Low => self.low_weight,
        }
    }

    pub fn score<'a>(&self, anomalies: impl IntoIterator<Item = &'a Anomaly>) -> f64 {
        let total: f64 = anomalies
            .into_iter()
            .map(|a| self.weight(a.severity()) * a.confidence())
            .sum();
        (self.scale * total).clamp(0.0, MAX_RISK_SCORE)
    }
}

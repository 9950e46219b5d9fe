use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::anomaly::{Anomaly, Severity};
use crate::model::tick::Tick;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct AnomaliesBySeverity {
    pub high: Vec<Anomaly>,
    pub medium: Vec<Anomaly>,
    pub low: Vec<Anomaly>,
}

impl AnomaliesBySeverity {
    pub fn partition(anomalies: Vec<Anomaly>) -> Self {
        let mut out = Self::default();
        for anomaly in anomalies {
            match anomaly.severity() {
                Severity::High => out.high.push(anomaly),
                Severity::Medium => out.medium.push(anomaly),
                Severity::Low => out.low.push(anomaly),
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.medium.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// High first, then medium, then low.
    pub fn iter(&self) -> impl Iterator<Item = &Anomaly> {
        self.high
            .iter()
            .chain(self.medium.iter())
            .chain(self.low.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub models_used: Vec<String>,
    pub highest_confidence: f64,
    pub anomaly_count: usize,
}

impl DetectionSummary {
    pub fn from_anomalies<'a>(anomalies: impl IntoIterator<Item = &'a Anomaly>) -> Self {
        let mut models = BTreeSet::new();
        let mut highest_confidence: f64 = 0.0;
        let mut anomaly_count = 0;
        for a in anomalies {
            models.insert(a.model_used().to_string());
            highest_confidence = highest_confidence.max(a.confidence());
            anomaly_count += 1;
        }
        Self {
            models_used: models.into_iter().collect(),
            highest_confidence,
            anomaly_count,
        }
    }
}

/// Output of one evaluation cycle for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    record_id: Uuid,
    symbol: String,
    timestamp: DateTime<Utc>,
    tick: Tick,
    anomalies_by_severity: AnomaliesBySeverity,
    risk_score: f64,
    summary: DetectionSummary,
}

impl DetectionRecord {
    pub fn new(tick: Tick, anomalies: Vec<Anomaly>, risk_score: f64) -> Self {
        let summary = DetectionSummary::from_anomalies(&anomalies);
        Self {
            record_id: Uuid::new_v4(),
            symbol: tick.symbol.clone(),
            timestamp: tick.timestamp,
            anomalies_by_severity: AnomaliesBySeverity::partition(anomalies),
            risk_score: risk_score.clamp(0.0, 100.0),
            summary,
            tick,
        }
    }

    pub fn record_id(&self) -> Uuid {
        self.record_id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn tick(&self) -> &Tick {
        &self.tick
    }

    pub fn anomalies(&self) -> &AnomaliesBySeverity {
        &self.anomalies_by_severity
    }

    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }

    pub fn summary(&self) -> &DetectionSummary {
        &self.summary
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies_by_severity.len()
    }

    pub fn high_severity_count(&self) -> usize {
        self.anomalies_by_severity.high.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::anomaly::AnomalyDetail;

    fn anomaly(severity: Severity, confidence: f64, model: &str) -> Anomaly {
        Anomaly::new(
            "AMD",
            severity,
            confidence,
            model,
            Utc::now(),
            AnomalyDetail::PatternMl {
                anomaly_score: -0.2,
            },
        )
    }

    #[test]
    fn record_partitions_and_summarizes() {
        let tick = Tick::new("AMD", 150.0, 10, 0.0, Utc::now());
        let record = DetectionRecord::new(
            tick,
            vec![
                anomaly(Severity::Medium, 0.6, "b_model"),
                anomaly(Severity::High, 0.8, "a_model"),
                anomaly(Severity::Low, 0.55, "b_model"),
            ],
            42.0,
        );
        assert_eq!(record.anomaly_count(), 3);
        assert_eq!(record.high_severity_count(), 1);
        assert_eq!(record.anomalies().medium.len(), 1);
        assert_eq!(record.anomalies().low.len(), 1);
        assert_eq!(record.summary().models_used, vec!["a_model", "b_model"]);
        assert!((record.summary().highest_confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(
            record.anomalies().iter().next().map(|a| a.severity()),
            Some(Severity::High)
        );
    }

    #[test]
    fn serialized_keys_use_uppercase_severity_buckets() {
        let record = DetectionRecord::new(Tick::new("AMD", 1.0, 1, 0.0, Utc::now()), vec![], 0.0);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["anomalies_by_severity"]["HIGH"].is_array());
        assert_eq!(json["summary"]["anomaly_count"], 0);
    }
}

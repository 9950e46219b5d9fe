use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SentinelError;
use crate::model::record::DetectionRecord;

pub const DEFAULT_DETECTION_CAPACITY: usize = 1000;

/// Aggregates over the records that fall inside a lookback window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub count: usize,
    pub anomaly_total: usize,
    pub high_severity_total: usize,
    /// Anomalies per hour over the window.
    pub per_hour_rate: f64,
    /// Evaluations per hour over the window.
    pub scans_per_hour: f64,
}

/// Lifetime aggregates over everything still retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionTotals {
    pub total_scans: usize,
    pub total_anomalies: usize,
    pub high_severity_anomalies: usize,
    /// Mean anomalies per scan.
    pub detection_rate: f64,
}

/// Bounded append-only log of evaluation records.
#[derive(Debug, Clone)]
pub struct DetectionHistory {
    capacity: usize,
    records: VecDeque<DetectionRecord>,
}

impl Default for DetectionHistory {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_DETECTION_CAPACITY,
            records: VecDeque::with_capacity(DEFAULT_DETECTION_CAPACITY),
        }
    }
}

impl DetectionHistory {
    pub fn new(capacity: usize) -> Result<Self, SentinelError> {
        if capacity == 0 {
            return Err(SentinelError::Config(
                "detection history capacity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        })
    }

    pub fn record(&mut self, record: DetectionRecord) {
        if self.records.len() == self.capacity {
            let _ = self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectionRecord> {
        self.records.iter()
    }

    pub fn latest(&self, symbol: &str) -> Option<&DetectionRecord> {
        self.records.iter().rev().find(|r| r.symbol() == symbol)
    }

    /// Stats over records with `timestamp >= now - window`. A window reaching
    /// past the representable range covers every record.
    pub fn stats(&self, window: Duration, now: DateTime<Utc>) -> DetectionStats {
        let lower = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut stats = DetectionStats::default();
        for r in self.records.iter().filter(|r| r.timestamp() >= lower) {
            stats.count += 1;
            stats.anomaly_total += r.anomaly_count();
            stats.high_severity_total += r.high_severity_count();
        }
        let hours = window.num_milliseconds() as f64 / 3_600_000.0;
        if hours > f64::EPSILON {
            stats.per_hour_rate = stats.anomaly_total as f64 / hours;
            stats.scans_per_hour = stats.count as f64 / hours;
        }
        stats
    }

    pub fn totals(&self) -> DetectionTotals {
        let total_scans = self.records.len();
        let total_anomalies: usize = self.records.iter().map(|r| r.anomaly_count()).sum();
        let high_severity_anomalies: usize =
            self.records.iter().map(|r| r.high_severity_count()).sum();
        let detection_rate = if total_scans == 0 {
            0.0
        } else {
            total_anomalies as f64 / total_scans as f64
        };
        DetectionTotals {
            total_scans,
            total_anomalies,
            high_severity_anomalies,
            detection_rate,
        }
    }
}

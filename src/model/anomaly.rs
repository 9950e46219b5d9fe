use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    PriceStatistical,
    PriceChange,
    PriceGap,
    VolumeSpike,
    VolumeDrought,
    PatternMl,
    PriceVolumeDivergence,
    CorrelationDivergence,
    TrendDeviation,
}

impl AnomalyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceStatistical => "PRICE_STATISTICAL",
            Self::PriceChange => "PRICE_CHANGE",
            Self::PriceGap => "PRICE_GAP",
            Self::VolumeSpike => "VOLUME_SPIKE",
            Self::VolumeDrought => "VOLUME_DROUGHT",
            Self::PatternMl => "PATTERN_ML",
            Self::PriceVolumeDivergence => "PRICE_VOLUME_DIVERGENCE",
            Self::CorrelationDivergence => "CORRELATION_DIVERGENCE",
            Self::TrendDeviation => "TREND_DEVIATION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// Detector-specific evidence. Each variant carries only what its detector measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyDetail {
    PriceStatistical {
        z_score: f64,
        current_price: f64,
        historical_mean: f64,
    },
    PriceChange {
        z_score: f64,
        current_change: f64,
        historical_mean: f64,
    },
    PriceGap {
        gap_pct: f64,
        current_price: f64,
        previous_close: f64,
    },
    VolumeSpike {
        volume_ratio: f64,
        current_volume: u64,
        average_volume: f64,
    },
    VolumeDrought {
        volume_ratio: f64,
        current_volume: u64,
        average_volume: f64,
    },
    PatternMl {
        anomaly_score: f64,
    },
    PriceVolumeDivergence {
        price_change: f64,
        volume_ratio: f64,
    },
    CorrelationDivergence {
        stock_change: f64,
        market_average: f64,
        divergence: f64,
    },
    TrendDeviation {
        predicted_price: f64,
        actual_price: f64,
        deviation_pct: f64,
    },
}

impl AnomalyDetail {
    pub fn kind(&self) -> AnomalyKind {
        match self {
            Self::PriceStatistical { .. } => AnomalyKind::PriceStatistical,
            Self::PriceChange { .. } => AnomalyKind::PriceChange,
            Self::PriceGap { .. } => AnomalyKind::PriceGap,
            Self::VolumeSpike { .. } => AnomalyKind::VolumeSpike,
            Self::VolumeDrought { .. } => AnomalyKind::VolumeDrought,
            Self::PatternMl { .. } => AnomalyKind::PatternMl,
            Self::PriceVolumeDivergence { .. } => AnomalyKind::PriceVolumeDivergence,
            Self::CorrelationDivergence { .. } => AnomalyKind::CorrelationDivergence,
            Self::TrendDeviation { .. } => AnomalyKind::TrendDeviation,
        }
    }

    /// The headline statistic of the finding (z-score, ratio, percent...).
    pub fn metric_value(&self) -> f64 {
        match *self {
            Self::PriceStatistical { z_score, .. } | Self::PriceChange { z_score, .. } => z_score,
            Self::PriceGap { gap_pct, .. } => gap_pct,
            Self::VolumeSpike { volume_ratio, .. } | Self::VolumeDrought { volume_ratio, .. } => {
                volume_ratio
            }
            Self::PatternMl { anomaly_score } => anomaly_score,
            Self::PriceVolumeDivergence { price_change, .. } => price_change,
            Self::CorrelationDivergence { divergence, .. } => divergence,
            Self::TrendDeviation { deviation_pct, .. } => deviation_pct,
        }
    }

    fn describe(&self, symbol: &str) -> String {
        match *self {
            Self::PriceStatistical { z_score, .. } => {
                format!("Price {:.1} standard deviations from historical mean", z_score)
            }
            Self::PriceChange { z_score, .. } => {
                format!("Price change {:.1} standard deviations from normal", z_score)
            }
            Self::PriceGap { gap_pct, .. } => format!("Price gap of {:.1}% detected", gap_pct),
            Self::VolumeSpike { volume_ratio, .. } => {
                format!("Volume spike: {:.1}x average volume", volume_ratio)
            }
            Self::VolumeDrought { volume_ratio, .. } => format!(
                "Unusually low volume: {:.1}% of average",
                volume_ratio * 100.0
            ),
            Self::PatternMl { anomaly_score } => format!(
                "Pattern model detected unusual behaviour (score: {:.3})",
                anomaly_score
            ),
            Self::PriceVolumeDivergence { price_change, .. } => format!(
                "High price movement ({:.1}%) with unusually low volume",
                price_change
            ),
            Self::CorrelationDivergence { divergence, .. } => format!(
                "{} diverging from market trend by {:.1}%",
                symbol, divergence
            ),
            Self::TrendDeviation { deviation_pct, .. } => {
                format!("Price deviates {:.1}% from expected trend", deviation_pct)
            }
        }
    }
}

/// A single detector finding. Built once by its detector and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    kind: AnomalyKind,
    symbol: String,
    severity: Severity,
    confidence: f64,
    metric_value: f64,
    description: String,
    model_used: String,
    timestamp: DateTime<Utc>,
    detail: AnomalyDetail,
}

impl Anomaly {
    pub fn new(
        symbol: impl Into<String>,
        severity: Severity,
        confidence: f64,
        model_used: impl Into<String>,
        timestamp: DateTime<Utc>,
        detail: AnomalyDetail,
    ) -> Self {
        let symbol = symbol.into();
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            kind: detail.kind(),
            description: detail.describe(&symbol),
            metric_value: detail.metric_value(),
            symbol,
            severity,
            confidence,
            model_used: model_used.into(),
            timestamp,
            detail,
        }
    }

    pub fn kind(&self) -> AnomalyKind {
        self.kind
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn metric_value(&self) -> f64 {
        self.metric_value
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn model_used(&self) -> &str {
        &self.model_used
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn detail(&self) -> &AnomalyDetail {
        &self.detail
    }
}

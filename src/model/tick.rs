use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SentinelError;

/// One market observation for one symbol at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub volume: u64,
    pub change_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    pub fn new(
        symbol: impl Into<String>,
        price: f64,
        volume: u64,
        change_percent: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            change_percent,
            high: None,
            low: None,
            timestamp,
        }
    }

    pub fn with_range(mut self, high: f64, low: f64) -> Self {
        self.high = Some(high);
        self.low = Some(low);
        self
    }

    pub fn high_or_price(&self) -> f64 {
        self.high.unwrap_or(self.price)
    }

    pub fn low_or_price(&self) -> f64 {
        self.low.unwrap_or(self.price)
    }

    /// Feature row used by the pattern model: price, volume, change%, high, low.
    pub fn feature_row(&self) -> [f64; 5] {
        [
            self.price,
            self.volume as f64,
            self.change_percent,
            self.high_or_price(),
            self.low_or_price(),
        ]
    }

    /// Reject ticks that cannot be reasoned about before they reach any buffer.
    pub fn validate(&self) -> Result<(), SentinelError> {
        let reason = if self.symbol.trim().is_empty() {
            Some("symbol is empty".to_string())
        } else if !self.price.is_finite() || self.price <= 0.0 {
            Some(format!("price must be finite and > 0, got {}", self.price))
        } else if !self.change_percent.is_finite() {
            Some("change_percent is not finite".to_string())
        } else if self.high.is_some_and(|h| !h.is_finite())
            || self.low.is_some_and(|l| !l.is_finite())
        {
            Some("high/low must be finite when present".to_string())
        } else {
            None
        };
        match reason {
            Some(reason) => Err(SentinelError::InvalidTick {
                symbol: self.symbol.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

use serde::{Deserialize, Serialize};

use super::stats::{mean, std_dev};

pub const TECHNICAL_MIN_PRICES: usize = 20;
const RSI_PERIOD: usize = 14;
const TRADING_DAYS: f64 = 252.0;

/// Point-in-time indicator readings over a price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    /// `None` when there were no losing steps in the RSI window.
    pub rsi: Option<f64>,
    /// Annualized standard deviation of log returns.
    pub volatility: f64,
}

impl TechnicalSnapshot {
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        if prices.len() < TECHNICAL_MIN_PRICES || prices.iter().any(|p| *p <= 0.0) {
            return None;
        }
        let tail_mean = |n: usize| mean(&prices[prices.len() - n..]);
        let log_returns: Vec<f64> = prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
        Some(Self {
            ma5: tail_mean(5)?,
            ma10: tail_mean(10)?,
            ma20: tail_mean(20)?,
            rsi: rsi(prices, RSI_PERIOD),
            volatility: std_dev(&log_returns)? * TRADING_DAYS.sqrt(),
        })
    }
}

/// Simple-average RSI over the last `period` price changes.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }
    let deltas: Vec<f64> = prices[prices.len() - period - 1..]
        .windows(2)
        .map(|w| w[1] - w[0])
        .collect();
    let avg_gain = deltas.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
    let avg_loss = deltas.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;
    if avg_loss <= f64::EPSILON {
        return None;
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

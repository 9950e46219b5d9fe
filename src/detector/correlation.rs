use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detector::config::DetectorConfig;
use crate::model::anomaly::{Anomaly, AnomalyDetail, Severity};
use crate::model::tick::Tick;

pub const MODEL_NAME: &str = "correlation_analysis";
const CORRELATION_CONFIDENCE: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolMove {
    pub current_change_pct: f64,
    /// Mean change percent over the symbol's recent ticks.
    pub recent_mean_change_pct: f64,
}

/// Cross-sectional view of the market at one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub moves: BTreeMap<String, SymbolMove>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot from bare current change percents; each symbol's recent
    /// mean is its current change.
    pub fn from_current_changes<I, S>(changes: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let moves = changes
            .into_iter()
            .map(|(symbol, change)| {
                (
                    symbol.into(),
                    SymbolMove {
                        current_change_pct: change,
                        recent_mean_change_pct: change,
                    },
                )
            })
            .collect();
        Self { moves }
    }

    pub fn insert(&mut self, symbol: impl Into<String>, mv: SymbolMove) {
        self.moves.insert(symbol.into(), mv);
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Mean of every symbol's recent mean change; `None` below two symbols.
    pub fn market_direction(&self) -> Option<f64> {
        if self.moves.len() < 2 {
            return None;
        }
        let total: f64 = self.moves.values().map(|m| m.recent_mean_change_pct).sum();
        Some(total / self.moves.len() as f64)
    }
}

/// Flags `tick`'s symbol when its change diverges from the market direction.
pub fn detect_correlation_divergence(
    tick: &Tick,
    snapshot: &MarketSnapshot,
    cfg: &DetectorConfig,
) -> Vec<Anomaly> {
    let Some(market_average) = snapshot.market_direction() else {
        return Vec::new();
    };
    let stock_change = snapshot
        .moves
        .get(&tick.symbol)
        .map(|m| m.current_change_pct)
        .unwrap_or(tick.change_percent);

    let divergence = (stock_change - market_average).abs();
    if divergence <= cfg.threshold_correlation_divergence {
        return Vec::new();
    }
    vec![Anomaly::new(
        &tick.symbol,
        Severity::Medium,
        CORRELATION_CONFIDENCE,
        MODEL_NAME,
        tick.timestamp,
        AnomalyDetail::CorrelationDivergence {
            stock_change,
            market_average,
            divergence,
        },
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_needs_two_symbols() {
        let one = MarketSnapshot::from_current_changes([("A", 1.0)]);
        assert_eq!(one.market_direction(), None);

        let two = MarketSnapshot::from_current_changes([("A", 1.0), ("B", 3.0)]);
        assert!((two.market_direction().unwrap() - 2.0).abs() < 1e-12);
    }
}

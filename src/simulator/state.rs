use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SEED_VOLUME: u64 = 1_000_000;
/// Per-symbol volatility is capped at 5%.
pub const MAX_SYMBOL_VOLATILITY: f64 = 0.05;

/// Explicit starting point for one simulated symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSeed {
    pub symbol: String,
    pub base_price: f64,
    #[serde(default = "default_seed_volume")]
    pub volume: u64,
    /// Overrides the simulator's base volatility for this symbol.
    #[serde(default)]
    pub volatility: Option<f64>,
    /// Session open; defaults to `base_price`.
    #[serde(default)]
    pub open_price: Option<f64>,
}

fn default_seed_volume() -> u64 {
    DEFAULT_SEED_VOLUME
}

impl SymbolSeed {
    pub fn new(symbol: impl Into<String>, base_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            base_price,
            volume: DEFAULT_SEED_VOLUME,
            volatility: None,
            open_price: None,
        }
    }

    pub fn with_volume(mut self, volume: u64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }
}

/// Evolving process state for one symbol. Only the simulator mutates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatorState {
    pub symbol: String,
    pub base_price: f64,
    pub current_price: f64,
    pub open_price: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub volume: u64,
    /// Seed volume the process reverts toward.
    pub base_volume: u64,
    pub bid: f64,
    pub ask: f64,
    pub last_update: DateTime<Utc>,
}

impl SimulatorState {
    pub(crate) fn from_seed(seed: &SymbolSeed, base_volatility: f64, now: DateTime<Utc>) -> Self {
        let open_price = seed.open_price.unwrap_or(seed.base_price);
        let volatility = seed
            .volatility
            .unwrap_or(base_volatility)
            .clamp(0.0, MAX_SYMBOL_VOLATILITY);
        Self {
            symbol: seed.symbol.clone(),
            base_price: seed.base_price,
            current_price: seed.base_price,
            open_price,
            day_high: seed.base_price,
            day_low: seed.base_price,
            momentum: 0.0,
            volatility,
            volume: seed.volume,
            base_volume: seed.volume,
            bid: seed.base_price * 0.9995,
            ask: seed.base_price * 1.0005,
            last_update: now,
        }
    }

    pub fn day_change(&self) -> f64 {
        self.current_price - self.open_price
    }

    pub fn day_change_pct(&self) -> f64 {
        if self.open_price <= f64::EPSILON {
            return 0.0;
        }
        self.day_change() / self.open_price * 100.0
    }
}

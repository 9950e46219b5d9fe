//! Synthetic tick producer.
//!
//! Each step combines five additive return components: session-scaled
//! Gaussian noise, decayed momentum, mean reversion toward the base price, a
//! volume-scaled jitter and a rare jump. The resulting price is clamped to a
//! band around the base price. All randomness comes from one injected `Rng`.

pub mod session;
pub mod state;

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::SentinelError;
use crate::indicator::TechnicalSnapshot;
use crate::model::tick::Tick;

pub use session::{session_multiplier, SESSION_MULTIPLIERS};
pub use state::{SimulatorState, SymbolSeed};

pub const PRICE_HISTORY_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Per-sqrt-second return volatility before the session multiplier.
    pub base_volatility: f64,
    pub momentum_decay: f64,
    pub momentum_weight: f64,
    /// Amplification applied to a step return before it enters the momentum average.
    pub momentum_gain: f64,
    pub mean_reversion_weight: f64,
    pub reference_volume: f64,
    pub volume_factor_cap: f64,
    pub volume_noise: f64,
    pub jump_probability: f64,
    pub jump_magnitude: f64,
    /// Allowed excursion from the base price, in percent.
    pub band_pct: f64,
    /// Absolute step return above which volume inflates.
    pub big_move_threshold: f64,
    /// Fraction of the log distance to the seed volume closed each step.
    pub volume_reversion: f64,
    /// Volume stays within `[seed / m, seed * m]` for this multiple `m`.
    pub max_volume_multiple: f64,
    pub max_step_secs: f64,
    pub session_utc_offset_hours: i32,
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            base_volatility: 0.002,
            momentum_decay: 0.95,
            momentum_weight: 0.1,
            momentum_gain: 10.0,
            mean_reversion_weight: 0.05,
            reference_volume: 1_000_000.0,
            volume_factor_cap: 5.0,
            volume_noise: 0.001,
            jump_probability: 0.001,
            jump_magnitude: 0.02,
            band_pct: 20.0,
            big_move_threshold: 0.005,
            volume_reversion: 0.3,
            max_volume_multiple: 10.0,
            max_step_secs: 60.0,
            session_utc_offset_hours: -5,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), SentinelError> {
        let fail = |msg: String| Err(SentinelError::Config(msg));
        let non_negative = [
            ("base_volatility", self.base_volatility),
            ("momentum_weight", self.momentum_weight),
            ("momentum_gain", self.momentum_gain),
            ("mean_reversion_weight", self.mean_reversion_weight),
            ("volume_factor_cap", self.volume_factor_cap),
            ("volume_noise", self.volume_noise),
            ("jump_magnitude", self.jump_magnitude),
            ("big_move_threshold", self.big_move_threshold),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return fail(format!("simulator.{} must be finite and >= 0", name));
            }
        }
        if !(0.0..1.0).contains(&self.momentum_decay) {
            return fail("simulator.momentum_decay must be in [0, 1)".to_string());
        }
        if !(0.0..=1.0).contains(&self.jump_probability) {
            return fail("simulator.jump_probability must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.volume_reversion) {
            return fail("simulator.volume_reversion must be in [0, 1]".to_string());
        }
        if !(self.max_volume_multiple.is_finite() && self.max_volume_multiple >= 1.0) {
            return fail("simulator.max_volume_multiple must be finite and >= 1".to_string());
        }
        if !(self.band_pct > 0.0 && self.band_pct < 100.0) {
            return fail("simulator.band_pct must be in (0, 100)".to_string());
        }
        if !(self.reference_volume > 0.0) {
            return fail("simulator.reference_volume must be > 0".to_string());
        }
        if !(self.max_step_secs > 0.0) {
            return fail("simulator.max_step_secs must be > 0".to_string());
        }
        if !(-12..=14).contains(&self.session_utc_offset_hours) {
            return fail("simulator.session_utc_offset_hours must be in [-12, 14]".to_string());
        }
        Ok(())
    }

    pub fn band_fraction(&self) -> f64 {
        self.band_pct / 100.0
    }

    /// Allowed volume range around a symbol's seed volume.
    pub fn volume_bounds(&self, base_volume: u64) -> (u64, u64) {
        let base = base_volume.max(1) as f64;
        let lower = (base / self.max_volume_multiple).round().max(1.0);
        let upper = (base * self.max_volume_multiple).round();
        (lower as u64, upper as u64)
    }
}

/// Cross-symbol view of the simulated market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub average_change: f64,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub total_volume: u64,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Mixed,
}

#[derive(Debug)]
pub struct PriceSimulator<R: Rng = StdRng> {
    config: SimulatorConfig,
    rng: R,
    seeds: BTreeMap<String, SymbolSeed>,
    states: HashMap<String, SimulatorState>,
    price_history: HashMap<String, VecDeque<f64>>,
}

impl PriceSimulator<StdRng> {
    /// Seeded from `config.seed` when present, otherwise from OS entropy.
    pub fn new(config: SimulatorConfig) -> Result<Self, SentinelError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Result<Self, SentinelError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> PriceSimulator<R> {
    pub fn with_rng(config: SimulatorConfig, rng: R) -> Result<Self, SentinelError> {
        config.validate()?;
        Ok(Self {
            config,
            rng,
            seeds: BTreeMap::new(),
            states: HashMap::new(),
            price_history: HashMap::new(),
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn register(&mut self, seed: SymbolSeed) -> Result<(), SentinelError> {
        if seed.symbol.trim().is_empty() {
            return Err(SentinelError::Config("seed symbol is empty".to_string()));
        }
        if !seed.base_price.is_finite() || seed.base_price <= 0.0 {
            return Err(SentinelError::Config(format!(
                "base price for {} must be > 0",
                seed.symbol
            )));
        }
        self.seeds.insert(seed.symbol.clone(), seed);
        Ok(())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.seeds.keys().cloned().collect()
    }

    pub fn state(&self, symbol: &str) -> Option<&SimulatorState> {
        self.states.get(symbol)
    }

    /// Establish the process state for `symbol` from its registered seed.
    pub fn initialize(
        &mut self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<&SimulatorState, SentinelError> {
        let seed = self
            .seeds
            .get(symbol)
            .ok_or_else(|| SentinelError::UnknownSymbol(symbol.to_string()))?;
        let state = SimulatorState::from_seed(seed, self.config.base_volatility, now);
        let mut history = VecDeque::with_capacity(PRICE_HISTORY_LEN);
        history.push_back(state.current_price);
        self.price_history.insert(symbol.to_string(), history);
        tracing::debug!(symbol, base_price = state.base_price, "simulator symbol initialized");
        let slot = match self.states.entry(symbol.to_string()) {
            Entry::Occupied(mut e) => {
                e.insert(state);
                e.into_mut()
            }
            Entry::Vacant(e) => e.insert(state),
        };
        Ok(slot)
    }

    /// Advance `symbol` to `now` and emit its tick.
    ///
    /// The first call for a symbol initializes it and emits the opening tick.
    pub fn step(&mut self, symbol: &str, now: DateTime<Utc>) -> Result<Tick, SentinelError> {
        if !self.states.contains_key(symbol) {
            let state = self.initialize(symbol, now)?;
            return Ok(tick_from_state(state));
        }

        let cfg = &self.config;
        let rng = &mut self.rng;
        let state = self
            .states
            .get_mut(symbol)
            .ok_or_else(|| SentinelError::UnknownSymbol(symbol.to_string()))?;

        let timestamp = now.max(state.last_update);
        let dt = ((timestamp - state.last_update).num_milliseconds() as f64 / 1000.0)
            .clamp(0.0, cfg.max_step_secs);
        let multiplier = session_multiplier(timestamp, cfg.session_utc_offset_hours);

        let sigma = state.volatility * multiplier * dt.sqrt();
        let z: f64 = rng.sample(StandardNormal);
        let random_component = z * sigma;

        let momentum_component = state.momentum * cfg.momentum_weight * dt;

        let deviation = (state.current_price - state.base_price) / state.base_price;
        let reversion_component = -deviation * cfg.mean_reversion_weight * dt;

        let volume_factor = (state.volume as f64 / cfg.reference_volume).min(cfg.volume_factor_cap);
        let volume_component =
            rng.gen_range(-cfg.volume_noise..=cfg.volume_noise) * volume_factor;

        let jump_roll: f64 = rng.gen();
        let jump_size = rng.gen_range(-cfg.jump_magnitude..=cfg.jump_magnitude);
        let jump_component = if jump_roll < cfg.jump_probability {
            tracing::debug!(symbol, jump = jump_size, "simulated news shock");
            jump_size
        } else {
            0.0
        };

        let step_return = random_component
            + momentum_component
            + reversion_component
            + volume_component
            + jump_component;

        let band = cfg.band_fraction();
        let (lower, upper) = (state.base_price * (1.0 - band), state.base_price * (1.0 + band));
        let new_price = (state.current_price * (1.0 + step_return)).clamp(lower, upper);

        state.current_price = new_price;
        state.day_high = state.day_high.max(new_price);
        state.day_low = state.day_low.min(new_price);

        let spread = new_price * rng.gen_range(0.0001..0.001);
        state.bid = new_price - spread / 2.0;
        state.ask = new_price + spread / 2.0;

        state.momentum = state.momentum * cfg.momentum_decay
            + step_return * cfg.momentum_gain * (1.0 - cfg.momentum_decay);

        let mut volume_change = rng.gen_range(0.95..1.05);
        if step_return.abs() > cfg.big_move_threshold {
            volume_change *= rng.gen_range(1.5..3.0);
        }
        let base_volume = state.base_volume.max(1) as f64;
        let moved = (state.volume.max(1) as f64 * volume_change).max(1.0);
        let reverted = moved * (base_volume / moved).powf(cfg.volume_reversion);
        let (vol_lo, vol_hi) = cfg.volume_bounds(state.base_volume);
        state.volume = (reverted.round() as u64).clamp(vol_lo, vol_hi);
        state.last_update = timestamp;

        let history = self.price_history.entry(symbol.to_string()).or_default();
        history.push_back(new_price);
        while history.len() > PRICE_HISTORY_LEN {
            let _ = history.pop_front();
        }

        Ok(tick_from_state(state))
    }

    /// Step every registered symbol once, in symbol order.
    pub fn step_all(&mut self, now: DateTime<Utc>) -> Vec<Tick> {
        let symbols = self.symbols();
        let mut ticks = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.step(&symbol, now) {
                Ok(tick) => ticks.push(tick),
                Err(e) => tracing::warn!(symbol = %symbol, error = %e, "simulator step failed"),
            }
        }
        ticks
    }

    /// Apply an explicit shock (earnings, news) of relative size `impact`.
    pub fn inject_event(&mut self, symbol: &str, impact: f64) -> Result<(), SentinelError> {
        let band = self.config.band_fraction();
        let spike = self.rng.gen_range(2.0..5.0);
        let config = &self.config;
        let state = self
            .states
            .get_mut(symbol)
            .ok_or_else(|| SentinelError::UnknownSymbol(symbol.to_string()))?;
        let (lower, upper) = (state.base_price * (1.0 - band), state.base_price * (1.0 + band));
        state.current_price = (state.current_price * (1.0 + impact)).clamp(lower, upper);
        state.day_high = state.day_high.max(state.current_price);
        state.day_low = state.day_low.min(state.current_price);
        state.momentum += impact * 5.0;
        let (vol_lo, vol_hi) = config.volume_bounds(state.base_volume);
        state.volume = ((state.volume as f64 * spike).round() as u64).clamp(vol_lo, vol_hi);
        tracing::info!(symbol, impact, price = state.current_price, "market event injected");
        Ok(())
    }

    /// Most recent simulated prices for `symbol`, oldest first.
    pub fn price_history(&self, symbol: &str, limit: usize) -> Vec<f64> {
        match self.price_history.get(symbol) {
            Some(h) => h.iter().skip(h.len().saturating_sub(limit)).copied().collect(),
            None => Vec::new(),
        }
    }

    /// Indicators over the retained price history; `None` below 20 prices.
    pub fn technical_snapshot(&self, symbol: &str) -> Option<TechnicalSnapshot> {
        TechnicalSnapshot::from_prices(&self.price_history(symbol, PRICE_HISTORY_LEN))
    }

    pub fn market_summary(&self, symbols: &[&str]) -> MarketSummary {
        let mut total_change = 0.0;
        let mut positive = 0;
        let mut negative = 0;
        let mut total_volume: u64 = 0;
        for state in symbols.iter().filter_map(|s| self.states.get(*s)) {
            let pct = state.day_change_pct();
            total_change += pct;
            total_volume = total_volume.saturating_add(state.volume);
            if pct > 0.0 {
                positive += 1;
            } else if pct < 0.0 {
                negative += 1;
            }
        }
        let sentiment = match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Sentiment::Bullish,
            std::cmp::Ordering::Less => Sentiment::Bearish,
            std::cmp::Ordering::Equal => Sentiment::Mixed,
        };
        MarketSummary {
            average_change: if symbols.is_empty() {
                0.0
            } else {
                total_change / symbols.len() as f64
            },
            positive,
            negative,
            neutral: symbols.len() - positive - negative,
            total_volume,
            sentiment,
        }
    }
}

fn tick_from_state(state: &SimulatorState) -> Tick {
    Tick {
        symbol: state.symbol.clone(),
        price: state.current_price,
        volume: state.volume,
        change_percent: state.day_change_pct(),
        high: Some(state.day_high),
        low: Some(state.day_low),
        timestamp: state.last_update,
    }
}

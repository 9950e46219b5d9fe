use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::detector::pattern::ModelFitError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SentinelError {
    #[error("out-of-order tick for {symbol}: received {received} before last {last}")]
    OutOfOrderTick {
        symbol: String,
        last: DateTime<Utc>,
        received: DateTime<Utc>,
    },

    #[error("invalid tick for '{symbol}': {reason}")]
    InvalidTick { symbol: String, reason: String },

    #[error("unknown symbol {0}: no base price configured")]
    UnknownSymbol(String),

    #[error("pattern model fit failed: {0}")]
    ModelFit(#[from] ModelFitError),

    #[error("config error: {0}")]
    Config(String),
}

impl SentinelError {
    /// Per-tick errors leave every other symbol and the engine state untouched.
    pub fn is_per_tick(&self) -> bool {
        matches!(self, Self::OutOfOrderTick { .. } | Self::InvalidTick { .. })
    }
}

use std::collections::{HashMap, VecDeque};

use crate::error::SentinelError;
use crate::model::tick::Tick;

/// Fixed-capacity per-symbol tick history. Oldest ticks are evicted first.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    by_symbol: HashMap<String, VecDeque<Tick>>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Result<Self, SentinelError> {
        if capacity == 0 {
            return Err(SentinelError::Config(
                "history capacity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            by_symbol: HashMap::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a tick to its symbol's history.
    ///
    /// A tick strictly older than the symbol's last tick is rejected and the
    /// buffer is left untouched. Equal timestamps are accepted.
    pub fn append(&mut self, tick: Tick) -> Result<(), SentinelError> {
        let ring = self
            .by_symbol
            .entry(tick.symbol.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        if let Some(last) = ring.back() {
            if tick.timestamp < last.timestamp {
                return Err(SentinelError::OutOfOrderTick {
                    symbol: tick.symbol,
                    last: last.timestamp,
                    received: tick.timestamp,
                });
            }
        }
        if ring.len() == self.capacity {
            let _ = ring.pop_front();
        }
        ring.push_back(tick);
        Ok(())
    }

    /// Up to `n` most recent ticks, oldest first. Short histories are returned as-is.
    pub fn window(&self, symbol: &str, n: usize) -> Vec<&Tick> {
        match self.by_symbol.get(symbol) {
            Some(ring) => {
                let skip = ring.len().saturating_sub(n);
                ring.iter().skip(skip).collect()
            }
            None => Vec::new(),
        }
    }

    /// The whole retained history for `symbol`.
    pub fn full_window(&self, symbol: &str) -> Vec<&Tick> {
        self.window(symbol, self.capacity)
    }

    pub fn size(&self, symbol: &str) -> usize {
        self.by_symbol.get(symbol).map_or(0, VecDeque::len)
    }

    pub fn last(&self, symbol: &str) -> Option<&Tick> {
        self.by_symbol.get(symbol).and_then(VecDeque::back)
    }

    /// Tracked symbols in sorted order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.by_symbol.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }

    pub fn total_points(&self) -> usize {
        self.by_symbol.values().map(VecDeque::len).sum()
    }
}

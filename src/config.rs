use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::detector::DetectorConfig;
use crate::history::detection_log::DEFAULT_DETECTION_CAPACITY;
use crate::simulator::{SimulatorConfig, SymbolSeed};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_PATH_ENV: &str = "TICK_SENTINEL_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
    pub detector: DetectorConfig,
    pub simulator: SimulatorConfig,
    pub symbols: Vec<SymbolConfig>,
    pub runtime: RuntimeConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Ticks kept per symbol.
    pub capacity: usize,
    /// Detection records kept in memory.
    pub detection_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            detection_capacity: DEFAULT_DETECTION_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub symbol: String,
    pub base_price: f64,
    #[serde(default)]
    pub volume: Option<u64>,
    #[serde(default)]
    pub volatility: Option<f64>,
}

impl SymbolConfig {
    pub fn to_seed(&self) -> SymbolSeed {
        let mut seed = SymbolSeed::new(self.symbol.trim().to_ascii_uppercase(), self.base_price);
        if let Some(volume) = self.volume {
            seed = seed.with_volume(volume);
        }
        if let Some(volatility) = self.volatility {
            seed = seed.with_volatility(volatility);
        }
        seed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub tick_interval: String,
    pub staleness_threshold: String,
    pub staleness_check_interval: String,
    pub stats_interval: String,
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: "1s".to_string(),
            staleness_threshold: "30s".to_string(),
            staleness_check_interval: "10s".to_string(),
            stats_interval: "1m".to_string(),
            channel_capacity: 1024,
        }
    }
}

impl RuntimeConfig {
    pub fn tick_interval_ms(&self) -> Result<u64> {
        parse_duration_ms(&self.tick_interval)
    }

    pub fn staleness_threshold_ms(&self) -> Result<u64> {
        parse_duration_ms(&self.staleness_threshold)
    }

    pub fn staleness_check_interval_ms(&self) -> Result<u64> {
        parse_duration_ms(&self.staleness_check_interval)
    }

    pub fn stats_interval_ms(&self) -> Result<u64> {
        parse_duration_ms(&self.stats_interval)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("data/detections.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Parse a duration string ("500ms", "1s", "5m", "1h") into milliseconds.
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim();
    let (num_str, unit_ms) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        bail!(
            "invalid duration '{}': expected a suffix of ms/s/m/h, e.g. '500ms' or '5m'",
            s
        );
    };

    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid duration '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid duration '{}': quantity must be > 0", s);
    }
    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid duration '{}': value is too large", s))
}

impl Config {
    /// Resolve the config path: explicit argument, then `TICK_SENTINEL_CONFIG`,
    /// then `config/default.toml`.
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config toml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history.capacity == 0 {
            bail!("history.capacity must be > 0");
        }
        if self.history.detection_capacity == 0 {
            bail!("history.detection_capacity must be > 0");
        }
        self.detector
            .validate()
            .context("detector section is invalid")?;
        self.simulator
            .validate()
            .context("simulator section is invalid")?;

        if self.symbols.is_empty() {
            bail!("at least one [[symbols]] entry is required");
        }
        let mut seen = HashSet::new();
        for entry in &self.symbols {
            let symbol = entry.symbol.trim().to_ascii_uppercase();
            if symbol.is_empty() {
                bail!("symbols entry with an empty symbol");
            }
            if !entry.base_price.is_finite() || entry.base_price <= 0.0 {
                bail!("symbols.{}: base_price must be > 0", symbol);
            }
            if let Some(v) = entry.volatility {
                if !v.is_finite() || v <= 0.0 {
                    bail!("symbols.{}: volatility must be > 0", symbol);
                }
            }
            if !seen.insert(symbol.clone()) {
                bail!("symbols.{} is listed more than once", symbol);
            }
        }

        self.runtime
            .tick_interval_ms()
            .context("runtime.tick_interval is invalid")?;
        self.runtime
            .staleness_threshold_ms()
            .context("runtime.staleness_threshold is invalid")?;
        self.runtime
            .staleness_check_interval_ms()
            .context("runtime.staleness_check_interval is invalid")?;
        self.runtime
            .stats_interval_ms()
            .context("runtime.stats_interval is invalid")?;
        if self.runtime.channel_capacity == 0 {
            bail!("runtime.channel_capacity must be > 0");
        }
        Ok(())
    }

    pub fn seeds(&self) -> Vec<SymbolSeed> {
        self.symbols.iter().map(SymbolConfig::to_seed).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration_ms("500ms").unwrap(), 500);
        assert_eq!(parse_duration_ms("1s").unwrap(), 1_000);
        assert_eq!(parse_duration_ms("5m").unwrap(), 300_000);
        assert_eq!(parse_duration_ms("1h").unwrap(), 3_600_000);
    }

    #[test]
    fn parse_duration_rejects_bad_input() {
        assert!(parse_duration_ms("").is_err());
        assert!(parse_duration_ms("0s").is_err());
        assert!(parse_duration_ms("10").is_err());
        assert!(parse_duration_ms("xs").is_err());
        assert!(parse_duration_ms("2d").is_err());
    }
}

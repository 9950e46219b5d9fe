use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::detector::config::DetectorConfig;
use crate::detector::correlation::{self, MarketSnapshot, SymbolMove};
use crate::detector::pattern::{self, OutlierModel};
use crate::detector::{build_model, gap, statistical, trend, volume};
use crate::error::SentinelError;
use crate::history::{DetectionHistory, DetectionStats, DetectionTotals, HistoryBuffer};
use crate::indicator::stats::mean;
use crate::model::anomaly::Anomaly;
use crate::model::record::DetectionRecord;
use crate::model::tick::Tick;
use crate::scoring::RiskScorer;

/// Outcome of one multi-symbol evaluation cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub records: Vec<DetectionRecord>,
    pub rejected: Vec<SentinelError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatistics {
    pub totals: DetectionTotals,
    pub last_hour: DetectionStats,
    pub models_active: Vec<String>,
    pub thresholds: DetectorConfig,
    pub symbols_tracked: usize,
    pub buffered_points: usize,
    pub model_fit_failures: u64,
}

/// Owns the per-symbol history and runs every detector against each new tick.
pub struct AnomalyDetectorEngine {
    config: DetectorConfig,
    scorer: RiskScorer,
    history: HistoryBuffer,
    detections: DetectionHistory,
    model: Box<dyn OutlierModel>,
    model_fit_failures: u64,
}

impl AnomalyDetectorEngine {
    pub fn new(
        config: DetectorConfig,
        history_capacity: usize,
        detection_capacity: usize,
    ) -> Result<Self, SentinelError> {
        config.validate()?;
        let model = build_model(&config);
        Ok(Self {
            config,
            scorer: RiskScorer::default(),
            history: HistoryBuffer::new(history_capacity)?,
            detections: DetectionHistory::new(detection_capacity)?,
            model,
            model_fit_failures: 0,
        })
    }

    pub fn with_model(mut self, model: Box<dyn OutlierModel>) -> Self {
        self.model = model;
        self
    }

    pub fn with_scorer(mut self, scorer: RiskScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn detections(&self) -> &DetectionHistory {
        &self.detections
    }

    pub fn model_fit_failures(&self) -> u64 {
        self.model_fit_failures
    }

    /// Validate, append, scan and record one tick. The correlation snapshot
    /// is taken from the engine's own buffers.
    pub fn process_tick(&mut self, tick: Tick) -> Result<DetectionRecord, SentinelError> {
        self.admit(&tick)?;
        let snapshot = self.market_snapshot();
        Ok(self.evaluate(tick, &snapshot))
    }

    /// Like [`process_tick`](Self::process_tick) with an externally supplied snapshot.
    pub fn process_tick_with_snapshot(
        &mut self,
        tick: Tick,
        snapshot: &MarketSnapshot,
    ) -> Result<DetectionRecord, SentinelError> {
        self.admit(&tick)?;
        Ok(self.evaluate(tick, snapshot))
    }

    /// Appends every valid tick of the cycle first, then evaluates each one
    /// against the same cross-symbol snapshot. Rejections never stop the cycle.
    pub fn process_cycle(&mut self, ticks: Vec<Tick>) -> CycleReport {
        let mut report = CycleReport::default();
        let mut accepted = Vec::with_capacity(ticks.len());
        for tick in ticks {
            match self.admit(&tick) {
                Ok(()) => accepted.push(tick),
                Err(e) => {
                    tracing::warn!(symbol = %tick.symbol, error = %e, "Tick rejected");
                    report.rejected.push(e);
                }
            }
        }
        let snapshot = self.market_snapshot();
        report.records = accepted
            .into_iter()
            .map(|tick| self.evaluate(tick, &snapshot))
            .collect();
        report
    }

    /// Runs every detector for `tick` against its symbol's current buffer.
    ///
    /// The tick is expected to have been appended already; nothing is recorded.
    pub fn scan(&mut self, tick: &Tick, snapshot: Option<&MarketSnapshot>) -> Vec<Anomaly> {
        let window = self.history.full_window(&tick.symbol);
        let cfg = &self.config;

        let mut anomalies = statistical::detect_price_statistics(tick, &window, cfg);
        anomalies.extend(gap::detect_price_gap(tick, &window, cfg));
        anomalies.extend(volume::detect_volume_anomalies(tick, &window, cfg));

        match pattern::detect_pattern_anomalies(tick, &window, cfg, self.model.as_mut()) {
            Ok(found) => anomalies.extend(found),
            Err(e) => {
                self.model_fit_failures += 1;
                tracing::warn!(
                    symbol = %tick.symbol,
                    model = self.model.name(),
                    error = %e,
                    failures = self.model_fit_failures,
                    "Pattern model failed; running price-volume divergence instead"
                );
                anomalies.extend(volume::detect_price_volume_divergence(tick, &window, cfg));
            }
        }

        if let Some(snapshot) = snapshot {
            anomalies.extend(correlation::detect_correlation_divergence(
                tick, snapshot, cfg,
            ));
        }
        anomalies.extend(trend::detect_trend_deviation(tick, &window, cfg));
        anomalies
    }

    /// Current and recent-mean change percent for every tracked symbol.
    pub fn market_snapshot(&self) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::new();
        for symbol in self.history.symbols() {
            let window = self.history.window(symbol, self.config.correlation_lookback);
            let Some(last) = window.last() else {
                continue;
            };
            let changes: Vec<f64> = window.iter().map(|t| t.change_percent).collect();
            snapshot.insert(
                symbol,
                SymbolMove {
                    current_change_pct: last.change_percent,
                    recent_mean_change_pct: mean(&changes).unwrap_or(last.change_percent),
                },
            );
        }
        snapshot
    }

    /// Symbols whose last tick is older than `threshold`. Staleness is
    /// reported, never turned into an anomaly.
    pub fn stale_symbols(&self, now: DateTime<Utc>, threshold: Duration) -> Vec<String> {
        self.history
            .symbols()
            .into_iter()
            .filter(|symbol| {
                self.history
                    .last(symbol)
                    .is_some_and(|t| now - t.timestamp > threshold)
            })
            .map(str::to_string)
            .collect()
    }

    pub fn statistics(&self, now: DateTime<Utc>) -> EngineStatistics {
        EngineStatistics {
            totals: self.detections.totals(),
            last_hour: self.detections.stats(Duration::hours(1), now),
            models_active: self.models_active(),
            thresholds: self.config.clone(),
            symbols_tracked: self.history.symbols().len(),
            buffered_points: self.history.total_points(),
            model_fit_failures: self.model_fit_failures,
        }
    }

    pub fn models_active(&self) -> Vec<String> {
        let mut models = vec![
            statistical::MODEL_NAME.to_string(),
            gap::MODEL_NAME.to_string(),
            volume::MODEL_NAME.to_string(),
            self.model.name().to_string(),
            volume::DIVERGENCE_MODEL_NAME.to_string(),
            correlation::MODEL_NAME.to_string(),
            trend::MODEL_NAME.to_string(),
        ];
        models.sort();
        models
    }

    fn admit(&mut self, tick: &Tick) -> Result<(), SentinelError> {
        tick.validate()?;
        self.history.append(tick.clone())
    }

    fn evaluate(&mut self, tick: Tick, snapshot: &MarketSnapshot) -> DetectionRecord {
        let anomalies = self.scan(&tick, Some(snapshot));
        let risk_score = self.scorer.score(&anomalies);
        tracing::debug!(
            symbol = %tick.symbol,
            price = tick.price,
            anomalies = anomalies.len(),
            risk_score,
            "Tick evaluated"
        );
        let record = DetectionRecord::new(tick, anomalies, risk_score);
        self.detections.record(record.clone());
        record
    }
}

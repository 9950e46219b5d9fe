use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::clock::{Clock, SystemClock};
use crate::detector::AnomalyDetectorEngine;
use crate::model::record::DetectionRecord;
use crate::model::tick::Tick;

#[derive(Clone)]
pub struct LoopSettings {
    /// A symbol with no tick for longer than this is reported as stale.
    pub staleness_threshold: chrono::Duration,
    pub staleness_check_interval: Duration,
    pub stats_interval: Duration,
    pub clock: Arc<dyn Clock>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            staleness_threshold: chrono::Duration::seconds(30),
            staleness_check_interval: Duration::from_secs(10),
            stats_interval: Duration::from_secs(60),
            clock: Arc::new(SystemClock),
        }
    }
}

/// Consumes rounds of ticks in arrival order and forwards each evaluation's
/// record. Every round goes through one engine cycle, so all of its symbols
/// are scored against the same cross-symbol snapshot.
///
/// Stops on shutdown or when the tick channel closes, and returns the
/// engine so its buffers and detection history stay queryable.
pub async fn run_detection_loop(
    mut engine: AnomalyDetectorEngine,
    mut tick_rx: mpsc::Receiver<Vec<Tick>>,
    mut record_tx: Option<mpsc::Sender<DetectionRecord>>,
    mut shutdown: watch::Receiver<bool>,
    settings: LoopSettings,
) -> AnomalyDetectorEngine {
    let mut staleness = tokio::time::interval(settings.staleness_check_interval);
    staleness.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats = tokio::time::interval(settings.stats_interval);
    stats.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // both intervals fire immediately on the first tick
    staleness.tick().await;
    stats.tick().await;

    tracing::info!("Detection loop started");

    if *shutdown.borrow() {
        return engine;
    }

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                tracing::info!("Detection loop shutting down");
                break;
            }
            received = tick_rx.recv() => {
                let Some(round) = received else {
                    tracing::info!("Tick channel closed, detection loop exiting");
                    break;
                };
                let report = engine.process_cycle(round);
                for record in report.records {
                    if record.anomaly_count() > 0 {
                        tracing::info!(
                            symbol = %record.symbol(),
                            anomalies = record.anomaly_count(),
                            risk_score = record.risk_score(),
                            "Anomalies detected"
                        );
                    }
                    let sink_closed = match &record_tx {
                        Some(tx) => tx.send(record).await.is_err(),
                        None => false,
                    };
                    if sink_closed {
                        tracing::warn!("Record sink closed, records are kept in memory only");
                        record_tx = None;
                    }
                }
            }
            _ = staleness.tick() => {
                let stale = engine.stale_symbols(settings.clock.now(), settings.staleness_threshold);
                if !stale.is_empty() {
                    tracing::warn!(symbols = ?stale, "No recent ticks for symbols");
                }
            }
            _ = stats.tick() => {
                let s = engine.statistics(settings.clock.now());
                tracing::info!(
                    total_scans = s.totals.total_scans,
                    total_anomalies = s.totals.total_anomalies,
                    high_severity = s.totals.high_severity_anomalies,
                    last_hour_anomalies = s.last_hour.anomaly_total,
                    buffered_points = s.buffered_points,
                    model_fit_failures = s.model_fit_failures,
                    "Detection stats"
                );
            }
        }
    }
    engine
}

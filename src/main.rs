use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use tick_sentinel::config::{Config, LoggingConfig};
use tick_sentinel::detector::AnomalyDetectorEngine;
use tick_sentinel::feed::SimulatedFeed;
use tick_sentinel::model::record::DetectionRecord;
use tick_sentinel::model::tick::Tick;
use tick_sentinel::record_store::RecordStore;
use tick_sentinel::runtime::{run_detection_loop, LoopSettings};
use tick_sentinel::simulator::PriceSimulator;

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"))
    });
    let writer = match &logging.file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            BoxMakeWriter::new(file)
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .json()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let explicit_path = std::env::args().nth(1);
    let config_path = Config::resolve_path(explicit_path.as_deref());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Pass a config path or set TICK_SENTINEL_CONFIG");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging)?;
    tracing::info!(
        config = %config_path.display(),
        symbols = config.symbols.len(),
        model = ?config.detector.pattern_model,
        "Starting tick-sentinel"
    );

    let mut simulator = PriceSimulator::new(config.simulator.clone())?;
    for seed in config.seeds() {
        simulator.register(seed)?;
    }
    let engine = AnomalyDetectorEngine::new(
        config.detector.clone(),
        config.history.capacity,
        config.history.detection_capacity,
    )?;

    let runtime = &config.runtime;
    let settings = LoopSettings {
        staleness_threshold: chrono::Duration::milliseconds(runtime.staleness_threshold_ms()? as i64),
        staleness_check_interval: Duration::from_millis(runtime.staleness_check_interval_ms()?),
        stats_interval: Duration::from_millis(runtime.stats_interval_ms()?),
        ..LoopSettings::default()
    };

    // Channels
    let (tick_tx, tick_rx) = mpsc::channel::<Vec<Tick>>(runtime.channel_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (record_tx, sink_handle) = if config.storage.enabled {
        let store = RecordStore::open(&config.storage.path)?;
        let (record_tx, mut record_rx) = mpsc::channel::<DetectionRecord>(runtime.channel_capacity);
        let handle = tokio::spawn(async move {
            let mut persisted = 0u64;
            while let Some(record) = record_rx.recv().await {
                match store.persist(&record) {
                    Ok(()) => persisted += 1,
                    Err(e) => tracing::warn!(error = %e, "Failed to persist detection record"),
                }
            }
            tracing::info!(persisted, "Record sink closed");
        });
        (Some(record_tx), Some(handle))
    } else {
        (None, None)
    };

    let feed = SimulatedFeed::new(simulator, Duration::from_millis(runtime.tick_interval_ms()?));
    let feed_handle = tokio::spawn(feed.run(tick_tx, shutdown_rx.clone()));
    let detector_handle = tokio::spawn(run_detection_loop(
        engine,
        tick_rx,
        record_tx,
        shutdown_rx,
        settings,
    ));

    // Ctrl+C handler
    let ctrl_c_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received");
        let _ = ctrl_c_shutdown.send(true);
    });

    let engine = detector_handle
        .await
        .context("detection loop task panicked")?;
    let _ = shutdown_tx.send(true);
    let _simulator = feed_handle.await.context("feed task panicked")?;
    if let Some(handle) = sink_handle {
        handle.await.context("record sink task panicked")?;
    }

    let stats = engine.statistics(chrono::Utc::now());
    println!("{}", serde_json::to_string_pretty(&stats)?);
    tracing::info!("Shutdown complete");
    Ok(())
}

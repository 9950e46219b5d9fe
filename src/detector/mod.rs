pub mod config;
pub mod correlation;
pub mod distance;
pub mod engine;
pub mod gap;
pub mod isolation_forest;
pub mod pattern;
pub mod statistical;
pub mod trend;
pub mod volume;

pub use config::{DetectorConfig, PatternModelKind};
pub use correlation::{MarketSnapshot, SymbolMove};
pub use distance::StandardizedDistance;
pub use engine::{AnomalyDetectorEngine, CycleReport, EngineStatistics};
pub use isolation_forest::IsolationForest;
pub use pattern::{ModelFitError, OutlierModel, OutlierScore, StandardScaler};

use crate::model::tick::Tick;

/// The window without the tick under evaluation, when that tick is its last entry.
pub(crate) fn preceding<'w, 't>(tick: &Tick, window: &'w [&'t Tick]) -> &'w [&'t Tick] {
    match window.split_last() {
        Some((last, rest)) if **last == *tick => rest,
        _ => window,
    }
}

/// Builds the configured pattern model.
pub fn build_model(cfg: &DetectorConfig) -> Box<dyn OutlierModel> {
    match cfg.pattern_model {
        PatternModelKind::IsolationForest => Box::new(IsolationForest::new(
            cfg.n_trees,
            cfg.max_samples,
            cfg.contamination,
            cfg.model_seed,
        )),
        PatternModelKind::StandardizedDistance => {
            Box::new(StandardizedDistance::new(cfg.contamination))
        }
    }
}

pub mod anomaly;
pub mod record;
pub mod tick;

pub use anomaly::{Anomaly, AnomalyDetail, AnomalyKind, Severity};
pub use record::{AnomaliesBySeverity, DetectionRecord, DetectionSummary};
pub use tick::Tick;

pub mod buffer;
pub mod detection_log;

pub use buffer::HistoryBuffer;
pub use detection_log::{DetectionHistory, DetectionStats, DetectionTotals};

pub mod pipeline;

pub use pipeline::{run_detection_loop, LoopSettings};

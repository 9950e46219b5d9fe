pub mod stats;
pub mod technical;

pub use technical::TechnicalSnapshot;

pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod feed;
pub mod history;
pub mod indicator;
pub mod model;
pub mod record_store;
pub mod runtime;
pub mod scoring;
pub mod sim_cli;
pub mod simulator;

pub use error::SentinelError;

//! `tick-sim`: prints a reproducible simulated tick stream as JSON lines.
//!
//! ```text
//! tick-sim [SYMBOL=PRICE ...] [--steps N] [--seed S]
//! ```
//!
//! The clock starts at a fixed session open and advances one second per
//! step, so the same arguments always print the same stream.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::clock::ManualClock;
use crate::feed::SimulatedFeed;
use crate::simulator::{PriceSimulator, SimulatorConfig, SymbolSeed};

pub const DEFAULT_STEPS: usize = 20;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq)]
pub struct SimArgs {
    pub seeds: Vec<SymbolSeed>,
    pub steps: usize,
    pub seed: u64,
}

pub fn parse_args(args: &[String]) -> Result<SimArgs> {
    let mut seeds = Vec::new();
    let mut steps = DEFAULT_STEPS;
    let mut seed = DEFAULT_SEED;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--steps" => {
                let v = iter.next().context("--steps needs a value")?;
                steps = v
                    .parse()
                    .with_context(|| format!("invalid --steps '{}'", v))?;
            }
            "--seed" => {
                let v = iter.next().context("--seed needs a value")?;
                seed = v.parse().with_context(|| format!("invalid --seed '{}'", v))?;
            }
            other => {
                let Some((symbol, price)) = other.split_once('=') else {
                    bail!("unexpected argument '{}': expected SYMBOL=PRICE", other);
                };
                let symbol = symbol.trim().to_ascii_uppercase();
                if symbol.is_empty() {
                    bail!("empty symbol in '{}'", other);
                }
                let price: f64 = price
                    .parse()
                    .with_context(|| format!("invalid price in '{}'", other))?;
                if !price.is_finite() || price <= 0.0 {
                    bail!("price for {} must be > 0", symbol);
                }
                seeds.push(SymbolSeed::new(symbol, price));
            }
        }
    }

    if seeds.is_empty() {
        seeds = vec![
            SymbolSeed::new("AAPL", 175.0),
            SymbolSeed::new("MSFT", 380.0),
            SymbolSeed::new("NVDA", 480.0),
        ];
    }
    Ok(SimArgs { seeds, steps, seed })
}

fn session_open() -> Result<DateTime<Utc>> {
    // 09:30 at UTC-5
    Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0)
        .single()
        .context("invalid session open instant")
}

pub fn run_cli(args: &[String]) -> Result<()> {
    let sim_args = parse_args(args)?;
    let mut simulator = PriceSimulator::with_seed(SimulatorConfig::default(), sim_args.seed)?;
    for seed in sim_args.seeds {
        simulator.register(seed)?;
    }

    let clock = ManualClock::new(session_open()?);
    let mut feed = SimulatedFeed::with_clock(simulator, clock.clone(), std::time::Duration::from_secs(1));
    for _ in 0..sim_args.steps {
        for tick in feed.step_once() {
            println!("{}", serde_json::to_string(&tick)?);
        }
        clock.advance(Duration::seconds(1));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_symbols_and_flags() {
        let parsed = parse_args(&args(&["tsla=250", "--steps", "5", "--seed", "7"])).unwrap();
        assert_eq!(parsed.steps, 5);
        assert_eq!(parsed.seed, 7);
        assert_eq!(parsed.seeds.len(), 1);
        assert_eq!(parsed.seeds[0].symbol, "TSLA");
        assert!((parsed.seeds[0].base_price - 250.0).abs() < 1e-12);
    }

    #[test]
    fn falls_back_to_default_universe() {
        let parsed = parse_args(&[]).unwrap();
        assert_eq!(parsed.seeds.len(), 3);
        assert_eq!(parsed.steps, DEFAULT_STEPS);
        assert_eq!(parsed.seed, DEFAULT_SEED);
    }

    #[test]
    fn rejects_malformed_arguments() {
        assert!(parse_args(&args(&["AAPL"])).is_err());
        assert!(parse_args(&args(&["AAPL=-1"])).is_err());
        assert!(parse_args(&args(&["--steps"])).is_err());
        assert!(parse_args(&args(&["--seed", "x"])).is_err());
    }
}

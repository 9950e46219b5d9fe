use chrono::{DateTime, Duration, TimeZone, Utc};

use tick_sentinel::error::SentinelError;
use tick_sentinel::model::tick::Tick;
use tick_sentinel::simulator::{PriceSimulator, Sentiment, SimulatorConfig, SymbolSeed};

fn open() -> DateTime<Utc> {
    // 09:30 at UTC-5
    Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap()
}

fn simulator(config: SimulatorConfig, seed: u64) -> PriceSimulator {
    let mut sim = PriceSimulator::with_seed(config, seed).unwrap();
    sim.register(SymbolSeed::new("AAPL", 175.0)).unwrap();
    sim.register(SymbolSeed::new("MSFT", 380.0)).unwrap();
    sim
}

fn run(sim: &mut PriceSimulator, steps: i64) -> Vec<Tick> {
    let mut out = Vec::new();
    for i in 0..steps {
        out.extend(sim.step_all(open() + Duration::seconds(i)));
    }
    out
}

#[test]
/// Same seed, same clock: identical tick stream.
fn fixed_seed_is_reproducible() {
    let a = run(&mut simulator(SimulatorConfig::default(), 11), 200);
    let b = run(&mut simulator(SimulatorConfig::default(), 11), 200);
    assert_eq!(a.len(), 400);
    assert_eq!(a, b);

    let c = run(&mut simulator(SimulatorConfig::default(), 12), 200);
    assert_ne!(a, c);
}

#[test]
/// Even with violent noise and frequent jumps the price never leaves the band.
fn price_stays_inside_band() {
    let config = SimulatorConfig {
        base_volatility: 0.05,
        jump_probability: 0.5,
        jump_magnitude: 0.5,
        band_pct: 10.0,
        ..SimulatorConfig::default()
    };
    let mut sim = simulator(config, 3);
    for i in 0..2_000 {
        for tick in sim.step_all(open() + Duration::seconds(i * 30)) {
            let base = if tick.symbol == "AAPL" { 175.0 } else { 380.0 };
            assert!(tick.price >= base * 0.9 - 1e-9, "{} below band", tick.price);
            assert!(tick.price <= base * 1.1 + 1e-9, "{} above band", tick.price);
            assert!(tick.high_or_price() >= tick.low_or_price());
        }
    }
}

#[test]
fn first_step_emits_the_opening_tick() {
    let mut sim = simulator(SimulatorConfig::default(), 1);
    let tick = sim.step("AAPL", open()).unwrap();
    assert!((tick.price - 175.0).abs() < f64::EPSILON);
    assert!(tick.change_percent.abs() < f64::EPSILON);
    assert_eq!(tick.timestamp, open());
    assert_eq!(tick.volume, 1_000_000);
}

#[test]
fn timestamps_never_go_backwards() {
    let mut sim = simulator(SimulatorConfig::default(), 1);
    sim.step("AAPL", open() + Duration::seconds(10)).unwrap();
    let tick = sim.step("AAPL", open()).unwrap();
    assert_eq!(tick.timestamp, open() + Duration::seconds(10));
}

#[test]
/// No seed, no fabricated price.
fn unknown_symbol_fails_only_for_that_symbol() {
    let mut sim = simulator(SimulatorConfig::default(), 1);
    assert_eq!(
        sim.step("ZZZZ", open()).unwrap_err(),
        SentinelError::UnknownSymbol("ZZZZ".to_string())
    );
    assert!(sim.step("AAPL", open()).is_ok());
}

#[test]
fn inject_event_moves_price_and_volume() {
    let mut sim = simulator(SimulatorConfig::default(), 5);
    sim.step("AAPL", open()).unwrap();
    sim.inject_event("AAPL", 0.05).unwrap();
    let state = sim.state("AAPL").unwrap();
    assert!((state.current_price - 175.0 * 1.05).abs() < 1e-9);
    assert!((state.momentum - 0.25).abs() < 1e-12);
    assert!(state.volume >= 2_000_000 && state.volume <= 5_000_000);

    // clamped to the 20% band
    sim.inject_event("AAPL", 0.5).unwrap();
    assert!((sim.state("AAPL").unwrap().current_price - 175.0 * 1.2).abs() < 1e-9);

    assert!(matches!(
        sim.inject_event("MSFT", 0.01),
        Err(SentinelError::UnknownSymbol(_))
    ));
}

#[test]
/// Volume reverts toward the seed and never leaves the configured multiple of it.
fn volume_stays_bounded_from_the_open() {
    let config = SimulatorConfig::default();
    let mut sim = PriceSimulator::with_seed(config.clone(), 42).unwrap();
    sim.register(SymbolSeed::new("AAPL", 175.0)).unwrap();
    let (lower, upper) = config.volume_bounds(1_000_000);
    assert_eq!((lower, upper), (100_000, 10_000_000));

    let mut at_cap = 0;
    for i in 0..1_200 {
        let tick = sim.step("AAPL", open() + Duration::seconds(i)).unwrap();
        assert!(
            tick.volume >= lower && tick.volume <= upper,
            "step {i}: volume {} out of bounds",
            tick.volume
        );
        if tick.volume == upper {
            at_cap += 1;
        }
    }
    // the stream is not pegged at the ceiling
    assert!(at_cap < 100, "{at_cap} ticks at the volume ceiling");
}

#[test]
fn price_history_and_indicators() {
    let mut sim = simulator(SimulatorConfig::default(), 9);
    run(&mut sim, 150);
    assert_eq!(sim.price_history("AAPL", 500).len(), 100);
    assert_eq!(sim.price_history("AAPL", 10).len(), 10);
    assert!(sim.price_history("ZZZZ", 10).is_empty());

    let snapshot = sim.technical_snapshot("AAPL").unwrap();
    assert!(snapshot.ma5 > 0.0 && snapshot.ma20 > 0.0);
    assert!(snapshot.volatility >= 0.0);
}

#[test]
fn market_summary_counts_directions() {
    let mut sim = simulator(SimulatorConfig::default(), 2);
    run(&mut sim, 1);
    sim.inject_event("AAPL", 0.03).unwrap();
    sim.inject_event("MSFT", -0.03).unwrap();

    let summary = sim.market_summary(&["AAPL", "MSFT"]);
    assert_eq!(summary.positive, 1);
    assert_eq!(summary.negative, 1);
    assert_eq!(summary.neutral, 0);
    assert_eq!(summary.sentiment, Sentiment::Mixed);
    assert!(summary.average_change.abs() < 1e-9);
}

#[test]
fn invalid_config_fails_fast() {
    let config = SimulatorConfig {
        momentum_decay: 1.0,
        ..SimulatorConfig::default()
    };
    assert!(matches!(
        PriceSimulator::with_seed(config, 1),
        Err(SentinelError::Config(_))
    ));
}

#[test]
fn volume_limits_are_validated() {
    for config in [
        SimulatorConfig {
            max_volume_multiple: 0.5,
            ..SimulatorConfig::default()
        },
        SimulatorConfig {
            volume_reversion: 1.5,
            ..SimulatorConfig::default()
        },
    ] {
        assert!(matches!(
            PriceSimulator::with_seed(config, 1),
            Err(SentinelError::Config(_))
        ));
    }
}

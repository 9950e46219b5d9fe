use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::clock::{Clock, SystemClock};
use crate::model::tick::Tick;
use crate::simulator::PriceSimulator;

/// Drives a [`PriceSimulator`] on a fixed interval and pushes each round of
/// ticks into a channel, standing in for a live market-data feed.
pub struct SimulatedFeed<C: Clock = SystemClock> {
    simulator: PriceSimulator,
    clock: C,
    tick_interval: Duration,
}

impl SimulatedFeed<SystemClock> {
    pub fn new(simulator: PriceSimulator, tick_interval: Duration) -> Self {
        Self::with_clock(simulator, SystemClock, tick_interval)
    }
}

impl<C: Clock> SimulatedFeed<C> {
    pub fn with_clock(simulator: PriceSimulator, clock: C, tick_interval: Duration) -> Self {
        Self {
            simulator,
            clock,
            tick_interval: tick_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn simulator(&self) -> &PriceSimulator {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut PriceSimulator {
        &mut self.simulator
    }

    /// One step of every registered symbol at the clock's current instant.
    pub fn step_once(&mut self) -> Vec<Tick> {
        let now = self.clock.now();
        self.simulator.step_all(now)
    }

    /// Emits one round of ticks per interval, as a single batch, until
    /// shutdown is signalled or the receiving side goes away. Hands the
    /// simulator back on exit.
    pub async fn run(
        mut self,
        round_tx: mpsc::Sender<Vec<Tick>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> PriceSimulator {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            symbols = ?self.simulator.symbols(),
            interval_ms = self.tick_interval.as_millis() as u64,
            "Simulated feed started"
        );

        if *shutdown.borrow() {
            return self.simulator;
        }

        'feed: loop {
            tokio::select! {
                _ = interval.tick() => {
                    let round = self.step_once();
                    if round.is_empty() {
                        continue;
                    }
                    if round_tx.send(round).await.is_err() {
                        tracing::info!("Tick channel closed, feed exiting");
                        break 'feed;
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Simulated feed shutting down");
                    break;
                }
            }
        }
        self.simulator
    }
}

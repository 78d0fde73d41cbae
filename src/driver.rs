//! ==============================================================================
//! driver.rs - the feed loop
//! ==============================================================================
//!
//! purpose:
//!     generate -> report -> sleep 5..=15s -> repeat, until the process is
//!     killed. failures never break the loop.
//!
//!     ┌──────────┐    ┌──────────┐    ┌─────────────────┐
//!     │ generate │ -> │  report  │ -> │ sleep (5..=15s) │ ─┐
//!     └──────────┘    └──────────┘    └─────────────────┘  │
//!          ▲                                               │
//!          └───────────────────────────────────────────────┘
//!
//! relationships:
//!     - used by: main.rs
//!     - uses: generator.rs, reporter.rs
//!
//! ==============================================================================

use crate::generator::{Clock, ReadingGenerator, SystemClock};
use crate::reporter::{ReportOutcome, Reporter, Transport};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::ops::RangeInclusive;
use std::time::Duration;

/// pause between posts, whole seconds, inclusive
pub const DELAY_SECONDS: RangeInclusive<u64> = 5..=15;

/// how the loop waits between iterations
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

/// running totals, only used for diagnostics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub delivered: u64,
    pub rejected: u64,
    pub failed: u64,
}

impl FeedStats {
    fn record(&mut self, outcome: &ReportOutcome) {
        match outcome {
            ReportOutcome::Delivered(_) => self.delivered += 1,
            ReportOutcome::Rejected { .. } => self.rejected += 1,
            ReportOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn attempts(&self) -> u64 {
        self.delivered + self.rejected + self.failed
    }
}

pub struct Driver<T, S = TokioSleeper, R = StdRng, C = SystemClock> {
    generator: ReadingGenerator<R, C>,
    reporter: Reporter<T>,
    sleeper: S,
    delay_rng: StdRng,
    stats: FeedStats,
}

impl<T: Transport> Driver<T> {
    /// production wiring: entropy-seeded, real clock, tokio sleep
    pub fn new(reporter: Reporter<T>) -> Self {
        Self::with_parts(ReadingGenerator::new(), reporter, TokioSleeper, StdRng::from_entropy())
    }
}

impl<T, S, R, C> Driver<T, S, R, C>
where
    T: Transport,
    S: Sleeper,
    R: Rng,
    C: Clock,
{
    pub fn with_parts(
        generator: ReadingGenerator<R, C>,
        reporter: Reporter<T>,
        sleeper: S,
        delay_rng: StdRng,
    ) -> Self {
        Self {
            generator,
            reporter,
            sleeper,
            delay_rng,
            stats: FeedStats::default(),
        }
    }

    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    pub fn next_delay(&mut self) -> Duration {
        Duration::from_secs(self.delay_rng.gen_range(DELAY_SECONDS))
    }

    /// one generate + report, no sleep
    pub async fn tick(&mut self) -> ReportOutcome {
        let reading = self.generator.generate();
        let outcome = self.reporter.report(&reading).await;
        self.stats.record(&outcome);
        outcome
    }

    async fn step(&mut self) {
        self.tick().await;
        let delay = self.next_delay();
        tracing::debug!(
            delay_secs = delay.as_secs(),
            delivered = self.stats.delivered,
            rejected = self.stats.rejected,
            failed = self.stats.failed,
            "waiting before next reading"
        );
        self.sleeper.sleep(delay).await;
    }

    /// run forever
    pub async fn run(&mut self) {
        loop {
            self.step().await;
        }
    }

    /// run a fixed number of iterations, sleeping after each
    pub async fn run_for(&mut self, iterations: u64) -> FeedStats {
        for _ in 0..iterations {
            self.step().await;
        }
        self.stats
    }
}

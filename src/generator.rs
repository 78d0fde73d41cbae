//! ==============================================================================
//! generator.rs - synthetic reading source
//! ==============================================================================
//!
//! purpose:
//!     fabricates one SensorReading per call. there is no hardware behind it,
//!     the values are drawn uniformly from fixed ranges:
//!
//!         temperature  20.0 ..= 30.0  (rounded to 0.1)
//!         dust         50   ..= 150
//!         humidity     60   ..= 90
//!
//! relationships:
//!     - used by: driver.rs (one call per loop iteration)
//!     - produces: domain.rs (SensorReading)
//!
//! testing:
//!     both the clock and the random source are injected, so a seeded
//!     StdRng plus a FixedClock gives fully reproducible readings.
//!
//! ==============================================================================

use crate::domain::SensorReading;

use chrono::{DateTime, SubsecRound, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 20.0..=30.0;
pub const DUST_RANGE: RangeInclusive<u32> = 50..=150;
pub const HUMIDITY_RANGE: RangeInclusive<u32> = 60..=90;

/// source of wall-clock time for reading timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// the real utc clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// always returns the same instant (tests)
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub struct ReadingGenerator<R = StdRng, C = SystemClock> {
    rng: R,
    clock: C,
}

impl ReadingGenerator {
    /// entropy-seeded generator on the system clock
    pub fn new() -> Self {
        Self::with_parts(StdRng::from_entropy(), SystemClock)
    }

    /// reproducible generator on the system clock
    pub fn seeded(seed: u64) -> Self {
        Self::with_parts(StdRng::seed_from_u64(seed), SystemClock)
    }
}

impl Default for ReadingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng, C: Clock> ReadingGenerator<R, C> {
    pub fn with_parts(rng: R, clock: C) -> Self {
        Self { rng, clock }
    }

    /// produce a fresh reading
    pub fn generate(&mut self) -> SensorReading {
        // the wire format carries microseconds, drop the rest so a posted
        // reading reads back equal
        let timestamp = self.clock.now().trunc_subsecs(6);
        let raw_temp: f64 = self.rng.gen_range(TEMPERATURE_RANGE);

        SensorReading {
            timestamp,
            temperature: round_tenths(raw_temp),
            dust: self.rng.gen_range(DUST_RANGE),
            humidity: self.rng.gen_range(HUMIDITY_RANGE),
        }
    }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

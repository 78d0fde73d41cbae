//! sensor-feed: synthetic sensor readings pushed over http, and the
//! collector that receives them.

pub mod collector;
pub mod config;
pub mod domain;
pub mod driver;
pub mod generator;
pub mod reporter;

pub use config::{CliArgs, FeedConfig, Role};
pub use domain::SensorReading;
pub use driver::{Driver, FeedStats, Sleeper, TokioSleeper};
pub use generator::{Clock, ReadingGenerator, SystemClock};
pub use reporter::{HttpTransport, ReportOutcome, Reporter, Transport, TransportError};

//! ==============================================================================
//! main.rs - sensor feed entry point
//! ==============================================================================
//!
//! purpose:
//!     runs one of two roles:
//!     - generator: fabricates a reading, POSTs it to the collector, waits
//!       5-15 seconds, forever.
//!     - collector: serves /api/sensor and keeps every reading in a json file.
//!
//! relationships:
//!     - uses: config.rs (file + env + cli)
//!     - uses: driver.rs (generator loop)
//!     - uses: collector.rs (http server)
//!
//! architecture:
//!
//!     ┌───────────────────────┐   POST /api/sensor   ┌─────────────────────┐
//!     │ generator             │ ───────────────────> │ collector           │
//!     │ generate -> report -> │   application/json   │ append to           │
//!     │ sleep 5..=15s         │ <─────────────────── │ sensordata.json     │
//!     └───────────────────────┘     200 / non-200    └─────────────────────┘
//!
//! ==============================================================================

use anyhow::{Context, Result};
use sensor_feed::collector::{self, CollectorState, ReadingStore};
use sensor_feed::driver::DELAY_SECONDS;
use sensor_feed::{CliArgs, Driver, FeedConfig, Reporter, Role};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            eprintln!("{}", CliArgs::usage());
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{}", CliArgs::usage());
        return Ok(());
    }

    // startup banner
    println!("===========================================================");
    println!("  Sensor Feed");
    println!("===========================================================");

    // step 1: load configuration
    let config = FeedConfig::resolve(&args)?;
    init_tracing(&config.logging.level);
    config.print_summary();

    // step 2: run the selected role
    match config.role {
        Role::Generator => run_generator(&config).await,
        Role::Collector => run_collector(&config).await,
    }
}

fn init_tracing(level: &str) {
    // RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn run_generator(config: &FeedConfig) -> Result<()> {
    let endpoint = config.endpoint_url()?;
    let reporter = Reporter::new(endpoint).context("failed to build http client")?;

    println!(
        "\n[RUNTIME] Posting readings to {} ({}-{}s interval)",
        reporter.endpoint(),
        DELAY_SECONDS.start(),
        DELAY_SECONDS.end()
    );
    println!("────────────────────────────────────────────────────────────");

    let mut driver = Driver::new(reporter);
    driver.run().await;
    Ok(())
}

async fn run_collector(config: &FeedConfig) -> Result<()> {
    let store = ReadingStore::new(&config.collector.data_file);
    let state = CollectorState::new(store, config.logging.show_sensor_data);

    println!("\n[STARTUP] ✓ Collector live at http://{}/api/sensor", config.collector.bind_address);
    println!("────────────────────────────────────────────────────────────");

    collector::serve(&config.collector.bind_address, state).await
}

//! End-to-end tests: the generator loop posting over real http to a live
//! collector on a loopback port.

use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::Url;
use sensor_feed::collector::{serve_on, CollectorState, ReadingStore};
use sensor_feed::{Driver, FeedStats, ReadingGenerator, ReportOutcome, Reporter, SensorReading, Sleeper};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

/// skips the pause between posts
struct NoSleep;

impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

async fn spawn_collector(dir: &tempfile::TempDir) -> SocketAddr {
    let store = ReadingStore::new(dir.path().join("sensordata.json"));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_on(listener, CollectorState::new(store, false)));
    addr
}

fn driver_for(url: Url) -> Driver<sensor_feed::HttpTransport, NoSleep> {
    Driver::with_parts(
        ReadingGenerator::seeded(2024),
        Reporter::new(url).unwrap(),
        NoSleep,
        StdRng::seed_from_u64(2024),
    )
}

#[tokio::test]
async fn readings_arrive_at_collector_intact() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_collector(&dir).await;
    let url = Url::parse(&format!("http://{}/api/sensor", addr)).unwrap();

    let mut driver = driver_for(url.clone());
    let mut sent = Vec::new();
    for _ in 0..3 {
        match driver.tick().await {
            ReportOutcome::Delivered(reading) => sent.push(reading),
            other => panic!("post failed: {other}"),
        }
    }

    let stored: Vec<SensorReading> = reqwest::get(url).await.unwrap().json().await.unwrap();
    assert_eq!(stored, sent);
}

#[tokio::test]
async fn run_for_posts_once_per_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_collector(&dir).await;
    let url = Url::parse(&format!("http://{}/api/sensor", addr)).unwrap();

    let stats = driver_for(url.clone()).run_for(5).await;
    assert_eq!(stats, FeedStats { delivered: 5, rejected: 0, failed: 0 });

    let stored: Vec<SensorReading> = reqwest::get(url).await.unwrap().json().await.unwrap();
    assert_eq!(stored.len(), 5);
    for pair in stored.windows(2) {
        assert!(pair[1].timestamp >= pair[0].timestamp);
    }
}

#[tokio::test]
async fn wrong_path_is_a_logged_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_collector(&dir).await;
    let url = Url::parse(&format!("http://{}/api/nowhere", addr)).unwrap();

    let outcome = driver_for(url).tick().await;
    assert!(matches!(outcome, ReportOutcome::Rejected { status: 404, .. }), "{outcome:?}");
}

#[tokio::test]
async fn dead_endpoint_keeps_the_loop_going() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let url = Url::parse(&format!("http://{}/api/sensor", addr)).unwrap();

    let stats = driver_for(url).run_for(3).await;
    assert_eq!(stats.failed, 3);
    assert_eq!(stats.attempts(), 3);
}

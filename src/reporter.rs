//! ==============================================================================
//! reporter.rs - pushes readings to the collector endpoint
//! ==============================================================================
//!
//! purpose:
//!     serializes a SensorReading to json and POSTs it to the configured
//!     endpoint, then prints one console line describing what happened.
//!
//! outcomes:
//!     - 200              -> "Data posted successfully: ..."
//!     - any other status -> "Failed to post data. Status code: N, Response: ..."
//!     - transport error  -> "Failed to post data. Transport error: ..."
//!
//!     none of these stop the feed loop. there is no retry; the next reading
//!     goes out after the usual randomized pause.
//!
//! relationships:
//!     - used by: driver.rs (one report per loop iteration)
//!     - uses: reqwest (through HttpTransport)
//!
//! ==============================================================================

use crate::domain::SensorReading;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// raw status and body handed back by a transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error(transparent)]
    Http(reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Http(e)
        }
    }
}

/// the network call behind a report, swappable for tests
pub trait Transport {
    fn post_json(
        &self,
        endpoint: &Url,
        body: String,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// reqwest-backed transport
///
/// the client is built once and reused, so connection pooling is left to
/// reqwest. no request timeout is set.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn post_json(&self, endpoint: &Url, body: String) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

/// what happened to one reading
#[derive(Clone, Debug, PartialEq)]
pub enum ReportOutcome {
    Delivered(SensorReading),
    Rejected { status: u16, body: String },
    Failed { error: String },
}

impl ReportOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ReportOutcome::Delivered(_))
    }
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportOutcome::Delivered(reading) => {
                write!(f, "Data posted successfully: {}", reading)
            }
            ReportOutcome::Rejected { status, body } => {
                write!(f, "Failed to post data. Status code: {}, Response: {}", status, body)
            }
            ReportOutcome::Failed { error } => {
                write!(f, "Failed to post data. Transport error: {}", error)
            }
        }
    }
}

pub struct Reporter<T = HttpTransport> {
    endpoint: Url,
    transport: T,
}

impl Reporter<HttpTransport> {
    /// reporter posting over http to `endpoint`
    pub fn new(endpoint: Url) -> Result<Self, TransportError> {
        Ok(Self::with_transport(endpoint, HttpTransport::new()?))
    }
}

impl<T: Transport> Reporter<T> {
    pub fn with_transport(endpoint: Url, transport: T) -> Self {
        Self { endpoint, transport }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// post the reading and classify the result, without printing
    pub async fn submit(&self, reading: &SensorReading) -> ReportOutcome {
        let body = match reading.to_json() {
            Ok(body) => body,
            Err(e) => return ReportOutcome::Failed { error: format!("encode failed: {}", e) },
        };

        tracing::debug!(endpoint = %self.endpoint, %body, "posting reading");

        match self.transport.post_json(&self.endpoint, body).await {
            Ok(resp) if resp.status == StatusCode::OK.as_u16() => ReportOutcome::Delivered(reading.clone()),
            Ok(resp) => ReportOutcome::Rejected { status: resp.status, body: resp.body },
            Err(e) => ReportOutcome::Failed { error: e.to_string() },
        }
    }

    /// post the reading and print the outcome line
    pub async fn report(&self, reading: &SensorReading) -> ReportOutcome {
        let outcome = self.submit(reading).await;
        println!("{}", outcome);
        outcome
    }
}

//! ==============================================================================
//! domain.rs - the sensor reading and its wire format
//! ==============================================================================
//!
//! purpose:
//!     defines the one record this crate moves around. the generator builds
//!     it, the reporter posts it, the collector stores it.
//!
//! wire format:
//!     {"timestamp": "2024-05-01T12:00:00.123456+00:00", "temp": 25.3, "dust": 100, "humidity": 70}
//!
//!     note the key is `temp`, not `temperature`.
//!
//! ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// a single synthetic sensor observation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// creation time, always utc
    #[serde(with = "rfc3339_offset")]
    pub timestamp: DateTime<Utc>,

    /// temperature in celsius, one decimal place
    #[serde(rename = "temp")]
    pub temperature: f64,

    /// dust concentration (ug/m3)
    pub dust: u32,

    /// relative humidity (%)
    pub humidity: u32,
}

impl SensorReading {
    /// serialize to the json body sent to the collector
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{timestamp: {}, temp: {:.1}, dust: {}, humidity: {}}}",
            rfc3339_offset::format(&self.timestamp),
            self.temperature,
            self.dust,
            self.humidity
        )
    }
}

/// timestamps go out as `+00:00` rather than chrono's default `Z`
mod rfc3339_offset {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, false)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

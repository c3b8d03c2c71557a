//! Bridge configuration
//!
//! Every knob has a usable default, so an empty JSON object (or
//! `BridgeConfig::default()`) is a complete configuration. Durations are
//! written in milliseconds.
//!
//! ```
//! use gnss_relay::config::BridgeConfig;
//!
//! let config = BridgeConfig::from_json_str(r#"{ "tcp_port": 2323, "flush": { "debounce": 15 } }"#)?;
//! assert_eq!(config.tcp_port, 2323);
//! assert_eq!(config.flush.debounce.as_millis(), 15);
//! assert_eq!(config.flush.high_water, 500);
//! # Ok::<(), gnss_relay::error::GnssRelayError>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use crate::{Result, error::GnssRelayError};

/// Smallest ATT MTU a BLE link may negotiate
pub const BLE_MIN_MTU: u16 = 23;

/// Maximum timezone offset accepted, in minutes
const MAX_TZ_OFFSET_MINUTES: i32 = 14 * 60;

/// Top-level configuration of the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Storage of the receiver-to-radio ring buffer, in bytes
    pub relay_buffer_size: usize,
    /// Storage of the radio-to-receiver ring buffer, in bytes
    pub uplink_buffer_size: usize,
    /// Line assembler buffer, in bytes
    pub line_buffer_size: usize,
    /// TCP relay listen port
    pub tcp_port: u16,
    /// Concurrent TCP clients served; extra connections are refused
    pub max_tcp_clients: usize,
    /// Largest span handed to TCP clients per send
    pub tcp_chunk_size: usize,
    /// MTU the BLE side asks for during negotiation
    pub ble_mtu: u16,
    /// Offset applied to UTC for the local time shown on the display
    pub timezone_offset_minutes: i32,
    pub flush: FlushPolicy,
    pub staleness: Staleness,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            relay_buffer_size: 16384,
            uplink_buffer_size: 4096,
            line_buffer_size: 256,
            tcp_port: 23,
            max_tcp_clients: 4,
            tcp_chunk_size: 512,
            ble_mtu: 517,
            timezone_offset_minutes: 0,
            flush: FlushPolicy::default(),
            staleness: Staleness::default(),
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: BridgeConfig =
            serde_json::from_str(json).map_err(GnssRelayError::SerdeError)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration document
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let config: BridgeConfig =
            serde_json::from_reader(reader).map_err(GnssRelayError::SerdeError)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable
    pub fn validate(&self) -> Result<()> {
        if self.relay_buffer_size < 2 || self.uplink_buffer_size < 2 {
            return Err(GnssRelayError::InvalidConfig(
                "ring buffers need at least two bytes of storage",
            ));
        }
        if self.line_buffer_size < 2 {
            return Err(GnssRelayError::InvalidConfig(
                "line buffer needs at least two bytes",
            ));
        }
        if self.max_tcp_clients == 0 {
            return Err(GnssRelayError::InvalidConfig(
                "at least one TCP client must be allowed",
            ));
        }
        if self.tcp_chunk_size == 0 {
            return Err(GnssRelayError::InvalidConfig("TCP chunk size is zero"));
        }
        if self.ble_mtu < BLE_MIN_MTU {
            return Err(GnssRelayError::InvalidConfig("BLE MTU below 23"));
        }
        let tz_range = -MAX_TZ_OFFSET_MINUTES..=MAX_TZ_OFFSET_MINUTES;
        if !tz_range.contains(&self.timezone_offset_minutes) {
            return Err(GnssRelayError::InvalidConfig(
                "timezone offset beyond 14 hours",
            ));
        }
        Ok(())
    }

    /// Sets the TCP relay listen port
    pub fn with_tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = port;
        self
    }

    /// Sets the relay ring buffer size
    pub fn with_relay_buffer_size(mut self, size: usize) -> Self {
        self.relay_buffer_size = size;
        self
    }

    /// Sets the local timezone offset in minutes east of UTC
    pub fn with_timezone_offset_minutes(mut self, minutes: i32) -> Self {
        self.timezone_offset_minutes = minutes;
        self
    }

    pub fn with_flush(mut self, flush: FlushPolicy) -> Self {
        self.flush = flush;
        self
    }

    pub fn with_staleness(mut self, staleness: Staleness) -> Self {
        self.staleness = staleness;
        self
    }
}

/// When buffered bytes are pushed to the radio
///
/// `high_water` approximates one full BLE payload at the preferred MTU.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlushPolicy {
    /// Send immediately once this many bytes are waiting
    pub high_water: usize,
    /// Send whatever is waiting once this long has passed since the last send
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub debounce: Duration,
    /// Upper bound on how long waiting bytes are held back
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub backstop: Duration,
    /// Polling period of the radio context
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        FlushPolicy {
            high_water: 500,
            debounce: Duration::from_millis(20),
            backstop: Duration::from_millis(50),
            tick: Duration::from_millis(10),
        }
    }
}

/// How long facts stay valid without being refreshed
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Staleness {
    /// Per-constellation visible/used counts
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub satellites: Duration,
    /// Accuracy under an ordinary fix
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub accuracy: Duration,
    /// Accuracy under an RTK fixed or float fix
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub rtk_accuracy: Duration,
    /// Position age after which the display treats the fix as lost
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub position: Duration,
    /// Period of the timeout sweep
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub sweep_interval: Duration,
    /// Period of the status log line
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub status_interval: Duration,
}

impl Default for Staleness {
    fn default() -> Self {
        Staleness {
            satellites: Duration::from_secs(5),
            accuracy: Duration::from_secs(10),
            rtk_accuracy: Duration::from_secs(30),
            position: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(1),
            status_interval: Duration::from_secs(5),
        }
    }
}

/// Duration as whole milliseconds, saturating
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

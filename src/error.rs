//! Error types for the GNSS relay
//!
//! Parsing never fails loudly: malformed or implausible NMEA input is dropped
//! where it is found. The errors in this module only come from the outer
//! boundaries of the crate, namely I/O, configuration and radio transports.

/// Main error type for relay operations
///
/// This enum represents all possible errors that can occur while moving
/// bytes between the receiver and the radio transports.
#[derive(Debug)]
pub enum GnssRelayError {
    /// I/O error occurred on the serial stream or a TCP socket
    ///
    /// This typically happens when the receiver stream is closed, a
    /// listening port cannot be bound, or a client connection breaks.
    IoError(std::io::Error),

    /// JSON serialization/deserialization error
    ///
    /// Occurs when a configuration document is malformed or when a state
    /// snapshot cannot be encoded.
    SerdeError(serde_json::Error),

    /// A radio transport rejected a payload
    ///
    /// Raised by [`Transport`](crate::relay::Transport) implementations,
    /// e.g. when a BLE notification could not be queued.
    TransportError(&'static str),

    /// Configuration value out of its accepted range
    InvalidConfig(&'static str),
}

impl core::fmt::Display for GnssRelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GnssRelayError::IoError(err) => write!(f, "IoError: {}", err),
            GnssRelayError::SerdeError(err) => write!(f, "SerdeError: {}", err),
            GnssRelayError::TransportError(msg) => write!(f, "TransportError: {}", msg),
            GnssRelayError::InvalidConfig(msg) => write!(f, "InvalidConfig: {}", msg),
        }
    }
}

impl core::error::Error for GnssRelayError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            GnssRelayError::IoError(err) => Some(err),
            GnssRelayError::SerdeError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GnssRelayError {
    fn from(err: std::io::Error) -> Self {
        GnssRelayError::IoError(err)
    }
}

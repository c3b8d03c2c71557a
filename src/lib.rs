//! # gnss-relay
//!
//! Core of a GNSS-to-wireless bridge: it takes the raw NMEA 0183 byte stream
//! of a multi-constellation receiver, forwards it unchanged to BLE and TCP
//! clients, and decodes enough of it to keep a live picture of the fix.
//!
//! ## Overview
//!
//! The receiver typically talks at 460800 baud and emits GSV, GSA, GST, GGA
//! and GNS sentences for GPS, GLONASS, Galileo, BeiDou and QZSS. Two things
//! happen to every byte:
//!
//! * it is written to a relay [`RingBuffer`](ring_buffer::RingBuffer), from
//!   which the [`Relay`](relay::Relay) flushes MTU-sized chunks to every
//!   ready [`Transport`](relay::Transport);
//! * it is fed to the NMEA [`assembler`](nmea::assembler), and every decoded
//!   sentence is folded into the [`SharedState`](state::SharedState).
//!
//! A [`Sweeper`](sweeper::Sweeper) expires satellite counts and accuracy
//! values the receiver stopped refreshing.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use gnss_relay::{ingest::Ingestor, ring_buffer::RingBuffer, state::SharedState};
//!
//! let relay_buffer = Arc::new(RingBuffer::new(16384));
//! let state = SharedState::new();
//! let mut ingestor = Ingestor::new(state.clone(), 256).with_relay_buffer(relay_buffer.clone());
//!
//! let bytes = b"$GNGGA,123519,4807.038,N,01131.000,E,4,08,0.9,545.4,M,46.9,M,,*47\r\n";
//! ingestor.feed(bytes, 0);
//!
//! assert_eq!(relay_buffer.available(), bytes.len());
//! assert!(state.snapshot().fix.valid);
//! ```

use crate::error::GnssRelayError;

/// Monotonic millisecond timestamps
pub mod clock;

/// Bridge configuration and timing constants
pub mod config;

/// Error types used throughout the library
pub mod error;

/// Receiver-side byte handling: relay tee, parsing and uplink
pub mod ingest;

/// NMEA 0183 framing and sentence decoding
pub mod nmea;

/// Flush policy and radio transports
pub mod relay;

/// Overwrite-oldest byte FIFO
pub mod ring_buffer;

/// Fix and satellite state
pub mod state;

/// Staleness sweep
pub mod sweeper;

/// Convenience type alias for Results with GnssRelayError
pub type Result<T> = core::result::Result<T, GnssRelayError>;

//! Radio side: draining the relay ring buffer into transports
//!
//! On every tick the [`Relay`] looks at how much is buffered and how long ago
//! it last sent, and decides whether to flush. A flush reads the buffer in
//! chunks no larger than the smallest payload any ready transport accepts and
//! hands each chunk to every ready transport, so BLE and TCP clients see the
//! same byte spans from a single read.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use gnss_relay::{config::FlushPolicy, relay::{Relay, Transport}, ring_buffer::RingBuffer};
//!
//! struct Collect(Vec<u8>);
//!
//! impl Transport for Collect {
//!     fn name(&self) -> &'static str { "collect" }
//!     fn is_ready(&self) -> bool { true }
//!     fn max_payload(&self) -> usize { 182 }
//!     fn send(&mut self, data: &[u8]) -> gnss_relay::Result<()> {
//!         self.0.extend_from_slice(data);
//!         Ok(())
//!     }
//! }
//!
//! let buffer = Arc::new(RingBuffer::new(1024));
//! buffer.write(&[b'x'; 600]);
//!
//! let mut relay = Relay::new(buffer.clone(), FlushPolicy::default()).with_transport(Collect(Vec::new()));
//! let flush = relay.tick(0).unwrap();
//! assert_eq!(flush.chunks, 4);
//! assert!(buffer.is_empty());
//! ```

use std::sync::Arc;

use log::{debug, info, warn};

use crate::{Result, clock::elapsed_ms, config::FlushPolicy, config::millis, ring_buffer::RingBuffer};

/// BLE notification transport
pub mod ble;
/// TCP broadcast transport
#[cfg(feature = "tokio")]
pub mod tcp;

/// Interval between "nobody is listening" warnings
const IDLE_WARN_INTERVAL_MS: u64 = 5_000;

/// A radio sink for relayed bytes
///
/// Implementations must not block: `send` either queues the payload or
/// returns an error.
pub trait Transport {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Whether a client is connected and wants data
    fn is_ready(&self) -> bool;

    /// Largest payload accepted by a single [`send`](Transport::send)
    fn max_payload(&self) -> usize;

    /// Delivers one payload of at most [`max_payload`](Transport::max_payload) bytes
    fn send(&mut self, data: &[u8]) -> Result<()>;
}

/// Which trigger caused a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Enough bytes for a full payload
    HighWater,
    /// Data waiting and the debounce interval has passed
    Debounce,
    /// Data waiting past the latency bound
    Backstop,
}

impl FlushPolicy {
    /// Decides whether `available` bytes should go out now
    ///
    /// # Arguments
    /// * `available` - bytes currently buffered
    /// * `since_last_send_ms` - time since the previous flush
    pub fn decide(&self, available: usize, since_last_send_ms: u64) -> Option<FlushReason> {
        if available == 0 {
            None
        } else if available >= self.high_water {
            Some(FlushReason::HighWater)
        } else if since_last_send_ms > millis(self.debounce) {
            Some(FlushReason::Debounce)
        } else if since_last_send_ms > millis(self.backstop) {
            Some(FlushReason::Backstop)
        } else {
            None
        }
    }
}

/// Outcome of one flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flush {
    pub reason: FlushReason,
    /// Reads taken from the ring buffer, one send per ready transport each
    pub chunks: usize,
    pub bytes: usize,
}

/// Drains a ring buffer into a set of transports
pub struct Relay {
    buffer: Arc<RingBuffer>,
    policy: FlushPolicy,
    transports: Vec<Box<dyn Transport + Send>>,
    last_send_ms: u64,
    was_ready: bool,
    last_idle_warn_ms: Option<u64>,
}

impl core::fmt::Debug for Relay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Relay")
            .field("policy", &self.policy)
            .field(
                "transports",
                &self.transports.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("last_send_ms", &self.last_send_ms)
            .field("was_ready", &self.was_ready)
            .finish()
    }
}

impl Relay {
    pub fn new(buffer: Arc<RingBuffer>, policy: FlushPolicy) -> Self {
        Relay {
            buffer,
            policy,
            transports: Vec::new(),
            last_send_ms: 0,
            was_ready: false,
            last_idle_warn_ms: None,
        }
    }

    /// Adds a transport, builder style
    pub fn with_transport(mut self, transport: impl Transport + Send + 'static) -> Self {
        self.add_transport(transport);
        self
    }

    pub fn add_transport(&mut self, transport: impl Transport + Send + 'static) {
        self.transports.push(Box::new(transport));
    }

    pub fn buffer(&self) -> &Arc<RingBuffer> {
        &self.buffer
    }

    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }

    /// Runs one scheduling step; returns the flush performed, if any
    ///
    /// With no ready transport nothing is read, so a client that connects
    /// later still gets the buffered bytes. The tick that first sees the last
    /// ready transport gone clears the buffer, so the next client does not
    /// replay data from the previous session. Bytes written after that tick
    /// are held for the next client like any other.
    pub fn tick(&mut self, now_ms: u64) -> Option<Flush> {
        let ready: Vec<usize> = self
            .transports
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_ready())
            .map(|(index, _)| index)
            .collect();

        if ready.is_empty() {
            self.idle(now_ms);
            return None;
        }
        if !self.was_ready {
            info!("relay transports ready, {} bytes buffered", self.buffer.available());
            self.was_ready = true;
        }

        let available = self.buffer.available();
        let reason = self
            .policy
            .decide(available, elapsed_ms(now_ms, self.last_send_ms))?;
        Some(self.flush(reason, available, ready, now_ms))
    }

    fn idle(&mut self, now_ms: u64) {
        if self.was_ready {
            self.was_ready = false;
            self.buffer.clear();
            info!("relay transports gone, buffer cleared");
            return;
        }

        let available = self.buffer.available();
        if available == 0 {
            return;
        }
        let due = match self.last_idle_warn_ms {
            Some(last) => elapsed_ms(now_ms, last) > IDLE_WARN_INTERVAL_MS,
            None => true,
        };
        if due {
            warn!("no transport subscribed, holding {} bytes", available);
            self.last_idle_warn_ms = Some(now_ms);
        }
    }

    fn flush(
        &mut self,
        reason: FlushReason,
        available: usize,
        mut ready: Vec<usize>,
        now_ms: u64,
    ) -> Flush {
        if self.buffer.overflowed() {
            warn!("relay buffer overflowed, oldest bytes were dropped");
        }

        let chunk_size = ready
            .iter()
            .map(|index| self.transports[*index].max_payload())
            .min()
            .unwrap_or(1)
            .max(1);
        let mut chunk = vec![0u8; chunk_size];

        // Bounded by what was buffered when the flush started, so a writer
        // that keeps up cannot hold the radio context here.
        let mut remaining = available;
        let mut flush = Flush {
            reason,
            chunks: 0,
            bytes: 0,
        };
        while remaining > 0 && !ready.is_empty() {
            let read = self.buffer.read_into(&mut chunk[..chunk_size.min(remaining)]);
            if read == 0 {
                break;
            }
            remaining -= read;
            flush.chunks += 1;
            flush.bytes += read;

            let payload = &chunk[..read];
            ready.retain(|index| {
                let transport = &mut self.transports[*index];
                match transport.send(payload) {
                    Ok(()) => true,
                    Err(err) => {
                        warn!("{} send of {} bytes failed: {}", transport.name(), read, err);
                        false
                    }
                }
            });
        }

        debug!(
            "flushed {} bytes in {} chunks ({:?})",
            flush.bytes, flush.chunks, reason
        );
        self.last_send_ms = now_ms;
        flush
    }
}

/// Ticks `relay` forever at the policy's tick period
#[cfg(feature = "tokio")]
pub async fn run(mut relay: Relay, clock: crate::clock::MonotonicClock) {
    let period = relay.policy.tick;
    loop {
        relay.tick(clock.now_ms());
        tokio::time::sleep(period).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::error::GnssRelayError;

    #[derive(Clone, Default)]
    struct Probe {
        ready: Arc<Mutex<bool>>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        fail: bool,
    }

    impl Probe {
        fn ready() -> Self {
            let probe = Probe::default();
            *probe.ready.lock().unwrap() = true;
            probe
        }

        fn set_ready(&self, ready: bool) {
            *self.ready.lock().unwrap() = ready;
        }

        fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }
    }

    struct ProbeTransport {
        probe: Probe,
        max_payload: usize,
    }

    impl Transport for ProbeTransport {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn is_ready(&self) -> bool {
            *self.probe.ready.lock().unwrap()
        }

        fn max_payload(&self) -> usize {
            self.max_payload
        }

        fn send(&mut self, data: &[u8]) -> Result<()> {
            if self.probe.fail {
                return Err(GnssRelayError::TransportError("probe failure"));
            }
            assert!(data.len() <= self.max_payload);
            self.probe.sent.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }

    fn relay_with(buffer: &Arc<RingBuffer>, probe: &Probe, max_payload: usize) -> Relay {
        Relay::new(buffer.clone(), FlushPolicy::default()).with_transport(ProbeTransport {
            probe: probe.clone(),
            max_payload,
        })
    }

    #[test]
    fn policy_triggers() {
        let policy = FlushPolicy::default();
        assert_eq!(policy.decide(0, 1_000), None);
        assert_eq!(policy.decide(500, 0), Some(FlushReason::HighWater));
        assert_eq!(policy.decide(10, 20), None);
        assert_eq!(policy.decide(10, 21), Some(FlushReason::Debounce));

        let slow_debounce = FlushPolicy {
            debounce: Duration::from_millis(100),
            ..FlushPolicy::default()
        };
        assert_eq!(slow_debounce.decide(10, 51), Some(FlushReason::Backstop));
    }

    #[test]
    fn small_amounts_wait_for_debounce() {
        let buffer = Arc::new(RingBuffer::new(1024));
        let probe = Probe::ready();
        let mut relay = relay_with(&buffer, &probe, 182);

        buffer.write(b"$GNGGA,1*00\r\n");
        assert_eq!(relay.tick(5), None);
        assert_eq!(relay.tick(15), None);

        let flush = relay.tick(25).unwrap();
        assert_eq!(flush.reason, FlushReason::Debounce);
        assert_eq!(probe.sent(), vec![b"$GNGGA,1*00\r\n".to_vec()]);
    }

    #[test]
    fn bytes_held_until_a_transport_is_ready() {
        let buffer = Arc::new(RingBuffer::new(1024));
        let probe = Probe::default();
        let mut relay = relay_with(&buffer, &probe, 182);

        buffer.write(&[7u8; 100]);
        assert_eq!(relay.tick(100), None);
        assert_eq!(buffer.available(), 100);

        probe.set_ready(true);
        let flush = relay.tick(200).unwrap();
        assert_eq!(flush.bytes, 100);
        assert!(buffer.is_empty());
    }

    #[test]
    fn disconnect_clears_buffer() {
        let buffer = Arc::new(RingBuffer::new(1024));
        let probe = Probe::ready();
        let mut relay = relay_with(&buffer, &probe, 182);
        relay.tick(0);

        probe.set_ready(false);
        buffer.write(&[1u8; 50]);
        assert_eq!(relay.tick(100), None);
        assert!(buffer.is_empty());

        buffer.write(&[2u8; 50]);
        assert_eq!(relay.tick(200), None);
        assert_eq!(buffer.available(), 50);
    }

    #[test]
    fn chunk_size_is_smallest_ready_payload() {
        let buffer = Arc::new(RingBuffer::new(1024));
        let wide = Probe::ready();
        let narrow = Probe::ready();
        let mut relay = relay_with(&buffer, &wide, 512).with_transport(ProbeTransport {
            probe: narrow.clone(),
            max_payload: 20,
        });

        buffer.write(&[9u8; 50]);
        let flush = relay.tick(100).unwrap();
        assert_eq!(flush.chunks, 3);
        assert_eq!(wide.sent(), narrow.sent());

        narrow.set_ready(false);
        buffer.write(&[9u8; 50]);
        let flush = relay.tick(200).unwrap();
        assert_eq!(flush.chunks, 1);
    }

    #[test]
    fn backstop_flushes_when_debounce_is_longer() {
        let buffer = Arc::new(RingBuffer::new(1024));
        let probe = Probe::ready();
        let policy = FlushPolicy {
            debounce: Duration::from_millis(100),
            ..FlushPolicy::default()
        };
        let mut relay = Relay::new(buffer.clone(), policy).with_transport(ProbeTransport {
            probe: probe.clone(),
            max_payload: 182,
        });

        buffer.write(b"$GNGST,1*00\r\n");
        assert_eq!(relay.tick(30), None);
        assert_eq!(relay.tick(50), None);

        let flush = relay.tick(60).unwrap();
        assert_eq!(flush.reason, FlushReason::Backstop);
        assert_eq!(probe.sent(), vec![b"$GNGST,1*00\r\n".to_vec()]);

        buffer.write(b"$GNGST,2*00\r\n");
        assert_eq!(relay.tick(100), None);
        assert_eq!(relay.tick(111).unwrap().reason, FlushReason::Backstop);
    }

    #[test]
    fn failing_transport_does_not_starve_others() {
        let buffer = Arc::new(RingBuffer::new(1024));
        let healthy = Probe::ready();
        let broken = Probe {
            fail: true,
            ..Probe::ready()
        };
        let mut relay = relay_with(&buffer, &broken, 10).with_transport(ProbeTransport {
            probe: healthy.clone(),
            max_payload: 10,
        });

        buffer.write(&[3u8; 35]);
        let flush = relay.tick(100).unwrap();
        assert_eq!(flush.bytes, 35);
        assert_eq!(healthy.sent().concat(), vec![3u8; 35]);
    }
}

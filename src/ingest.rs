//! Receiver-side ingestion
//!
//! Every byte coming from the receiver is copied verbatim into the relay
//! ring buffer and, in the same pass, framed and decoded into the shared
//! fix state. Parsing never holds up relaying: a byte lands in the ring
//! before it reaches the assembler.

use std::sync::Arc;

use futures_util::{AsyncReadExt, AsyncWriteExt};
use log::{debug, trace};

use crate::{
    Result,
    clock::MonotonicClock,
    error::GnssRelayError,
    nmea::{Sentence, assembler::LineAssembler, types::SentenceKind},
    ring_buffer::RingBuffer,
    state::SharedState,
};

/// Read size used by [`run`]
const READ_CHUNK: usize = 256;

/// Bytes moved per write by [`forward_uplink`]
const UPLINK_CHUNK: usize = 256;

#[derive(Debug)]
pub struct Ingestor {
    assembler: LineAssembler,
    state: SharedState,
    relay_buffer: Option<Arc<RingBuffer>>,
    sentences: u64,
    skipped: u64,
}

impl Ingestor {
    pub fn new(state: SharedState, line_capacity: usize) -> Self {
        Ingestor {
            assembler: LineAssembler::with_capacity(line_capacity),
            state,
            relay_buffer: None,
            sentences: 0,
            skipped: 0,
        }
    }

    /// Also tees every received byte into `buffer`
    pub fn with_relay_buffer(mut self, buffer: Arc<RingBuffer>) -> Self {
        self.relay_buffer = Some(buffer);
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Sentences decoded and applied so far
    pub fn sentences(&self) -> u64 {
        self.sentences
    }

    /// Complete lines that were not interpreted
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Relays then parses a chunk of received bytes
    ///
    /// Returns the number of sentences applied.
    pub fn feed(&mut self, bytes: &[u8], now_ms: u64) -> usize {
        if let Some(buffer) = &self.relay_buffer {
            buffer.write(bytes);
        }
        bytes
            .iter()
            .filter_map(|byte| self.parse_byte(*byte, now_ms))
            .count()
    }

    /// Feeds one byte to the parser only
    ///
    /// Returns the kind of the sentence it completed, if that sentence was
    /// decoded and applied.
    pub fn parse_byte(&mut self, byte: u8, now_ms: u64) -> Option<SentenceKind> {
        let line = self.assembler.feed(byte)?;
        match Sentence::parse(line) {
            Some(sentence) => {
                trace!("{:?} applied: {}", sentence.kind(), line);
                self.state.apply(&sentence, now_ms);
                self.sentences += 1;
                Some(sentence.kind())
            }
            None => {
                trace!("skipped: {}", line);
                self.skipped += 1;
                None
            }
        }
    }
}

/// Pumps `reader` into `ingestor` until end of stream
///
/// Returns the total number of bytes read.
pub async fn run<R>(mut reader: R, ingestor: &mut Ingestor, clock: &MonotonicClock) -> Result<u64>
where
    R: futures_io::AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_CHUNK];
    let mut total = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(GnssRelayError::IoError)?;
        if n == 0 {
            debug!(
                "receiver stream ended after {} bytes, {} sentences",
                total,
                ingestor.sentences()
            );
            return Ok(total);
        }
        ingestor.feed(&buf[..n], clock.now_ms());
        total += n as u64;
    }
}

/// Drains `uplink` into `writer`, the receiver's input
///
/// Returns the number of bytes written.
pub async fn forward_uplink<W>(uplink: &RingBuffer, writer: &mut W) -> Result<usize>
where
    W: futures_io::AsyncWrite + Unpin,
{
    let mut buf = [0u8; UPLINK_CHUNK];
    let mut written = 0;
    loop {
        let n = uplink.read_into(&mut buf);
        if n == 0 {
            break;
        }
        writer
            .write_all(&buf[..n])
            .await
            .map_err(GnssRelayError::IoError)?;
        written += n;
    }
    if written > 0 {
        writer.flush().await.map_err(GnssRelayError::IoError)?;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::types::FixQuality;

    #[test]
    fn bytes_reach_ring_before_parsing() {
        let ring = Arc::new(RingBuffer::new(1024));
        let mut ingestor = Ingestor::new(SharedState::new(), 256).with_relay_buffer(ring.clone());

        let line = b"$GNGGA,123519,4807.038,N,01131.000,E,4,08,0.9,545.4,M,46.9,M,,*47\r\n";
        let (head, tail) = line.split_at(20);
        assert_eq!(ingestor.feed(head, 0), 0);
        assert_eq!(ring.available(), 20);
        assert_eq!(ingestor.feed(tail, 10), 1);

        assert_eq!(ring.read(1024), line.to_vec());
        assert_eq!(
            ingestor.state().snapshot().fix.fix_quality,
            FixQuality::RtkFixed
        );
    }

    #[test]
    fn uninterpreted_lines_are_counted() {
        let mut ingestor = Ingestor::new(SharedState::new(), 256);
        ingestor.feed(b"$GNRMC,123519,A\r\n$GPGSV,3,1,11,01,40,083,46*00\r\n", 0);
        assert_eq!(ingestor.sentences(), 1);
        assert_eq!(ingestor.skipped(), 1);
        assert_eq!(ingestor.state().snapshot().satellites.gps.visible_count, 11);
    }

    #[tokio::test]
    async fn run_reads_until_eof() {
        let data = b"$GLGSV,2,1,07,65,45,120,40*00\n$GAGSV,2,1,05,02,40,100,38*00\n";
        let mut ingestor = Ingestor::new(SharedState::new(), 256);
        let clock = MonotonicClock::new();

        let total = run(&data[..], &mut ingestor, &clock).await.unwrap();
        assert_eq!(total, data.len() as u64);
        assert_eq!(ingestor.sentences(), 2);
    }

    #[tokio::test]
    async fn uplink_is_drained_in_order() {
        let uplink = RingBuffer::new(64);
        uplink.write(b"\xb5\x62\x06\x08");
        let mut out = futures_util::io::Cursor::new(Vec::new());

        let written = forward_uplink(&uplink, &mut out).await.unwrap();
        assert_eq!(written, 4);
        assert_eq!(out.into_inner(), b"\xb5\x62\x06\x08".to_vec());
        assert!(uplink.is_empty());
    }
}

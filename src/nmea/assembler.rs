//! Byte-at-a-time line framing for the serial NMEA stream

/// Default line buffer size, longer than any legal NMEA sentence
pub const DEFAULT_LINE_CAPACITY: usize = 256;

/// Accumulates bytes into `$`-prefixed lines
///
/// `\r` is dropped, `\n` terminates. A line that outgrows the buffer is
/// discarded without notice and assembly restarts after the next `\n`.
#[derive(Debug, Clone)]
pub struct LineAssembler {
    buf: Vec<u8>,
    line: String,
    capacity: usize,
    overflowed: bool,
    dropped: u64,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LINE_CAPACITY)
    }

    /// One byte of `capacity` is reserved for the terminator, so lines of up
    /// to `capacity - 1` bytes are accepted.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        LineAssembler {
            buf: Vec::with_capacity(capacity),
            line: String::with_capacity(capacity),
            capacity,
            overflowed: false,
            dropped: 0,
        }
    }

    /// Feeds one byte; returns the finished line when `byte` completes one
    ///
    /// Lines that are empty, not `$`-prefixed, or not valid UTF-8 are
    /// swallowed.
    pub fn feed(&mut self, byte: u8) -> Option<&str> {
        match byte {
            b'\n' => {
                let overflowed = std::mem::take(&mut self.overflowed);
                let accepted = !overflowed && self.buf.first() == Some(&b'$');

                self.line.clear();
                if accepted {
                    match std::str::from_utf8(&self.buf) {
                        Ok(text) => self.line.push_str(text),
                        Err(_) => log::debug!("non UTF-8 NMEA line dropped"),
                    }
                }
                self.buf.clear();

                if self.line.is_empty() {
                    None
                } else {
                    Some(&self.line)
                }
            }
            b'\r' => None,
            _ => {
                if self.overflowed {
                    return None;
                }
                if self.buf.len() < self.capacity - 1 {
                    self.buf.push(byte);
                } else {
                    log::debug!("NMEA line exceeded {} bytes, dropped", self.capacity - 1);
                    self.buf.clear();
                    self.overflowed = true;
                    self.dropped += 1;
                }
                None
            }
        }
    }

    /// Lines discarded for exceeding the buffer
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Discards any partial line
    pub fn reset(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

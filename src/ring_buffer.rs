//! Fixed-capacity byte queue shared between the ingestion and radio contexts
//!
//! The ingestion side writes every byte received from the receiver; the radio
//! side drains what it can send. Neither side ever waits: a full buffer drops
//! its oldest bytes, an empty buffer reads nothing.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Overwrite-oldest byte ring protected by a single mutex
///
/// One slot is kept free so that `head == tail` always means empty; a buffer
/// created with capacity `N` therefore holds at most `N - 1` bytes.
///
/// # Example
/// ```
/// use gnss_relay::ring_buffer::RingBuffer;
///
/// let rb = RingBuffer::new(8);
/// assert_eq!(rb.write(b"$GNGGA"), 6);
/// assert_eq!(rb.available(), 6);
/// assert_eq!(rb.read(4), b"$GNG".to_vec());
/// assert_eq!(rb.available(), 2);
/// ```
#[derive(Debug)]
pub struct RingBuffer {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    data: Box<[u8]>,
    head: usize,
    tail: usize,
    overflow: bool,
}

impl Inner {
    fn available(&self) -> usize {
        let size = self.data.len();
        (self.head + size - self.tail) % size
    }
}

impl RingBuffer {
    /// Creates an empty ring buffer with `capacity` bytes of storage
    ///
    /// # Panics
    /// Panics if `capacity` is smaller than 2, since one slot is always
    /// reserved to tell a full buffer from an empty one.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring buffer needs at least two slots");
        RingBuffer {
            inner: Mutex::new(Inner {
                data: vec![0; capacity].into_boxed_slice(),
                head: 0,
                tail: 0,
                overflow: false,
            }),
        }
    }

    // A panic while holding the lock cannot leave the indices torn, so a
    // poisoned mutex is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total storage in bytes; usable capacity is one less
    pub fn capacity(&self) -> usize {
        self.lock().data.len()
    }

    /// Appends `bytes`, evicting the oldest unread bytes when full
    ///
    /// Always returns `bytes.len()`. The whole slice is copied under one lock
    /// acquisition.
    pub fn write(&self, bytes: &[u8]) -> usize {
        if bytes.is_empty() {
            return 0;
        }

        let mut inner = self.lock();
        let size = inner.data.len();
        for &byte in bytes {
            let next_head = (inner.head + 1) % size;
            if next_head == inner.tail {
                inner.tail = (inner.tail + 1) % size;
                inner.overflow = true;
            }
            let head = inner.head;
            inner.data[head] = byte;
            inner.head = next_head;
        }
        bytes.len()
    }

    /// Moves up to `out.len()` bytes into `out`, returning how many were read
    ///
    /// A non-empty read clears the overflow flag.
    pub fn read_into(&self, out: &mut [u8]) -> usize {
        if out.is_empty() {
            return 0;
        }

        let mut inner = self.lock();
        let size = inner.data.len();
        let mut read = 0;
        while inner.tail != inner.head && read < out.len() {
            out[read] = inner.data[inner.tail];
            inner.tail = (inner.tail + 1) % size;
            read += 1;
        }

        if read > 0 {
            inner.overflow = false;
        }
        read
    }

    /// Removes and returns up to `max_len` bytes
    pub fn read(&self, max_len: usize) -> Vec<u8> {
        let len = max_len.min(self.available());
        let mut out = vec![0; len];
        let read = self.read_into(&mut out);
        out.truncate(read);
        out
    }

    /// Number of bytes ready to read
    pub fn available(&self) -> usize {
        self.lock().available()
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Whether bytes were evicted since the last non-empty read
    pub fn overflowed(&self) -> bool {
        self.lock().overflow
    }

    /// Drops all buffered bytes and resets the overflow flag
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.head = 0;
        inner.tail = 0;
        inner.overflow = false;
    }
}

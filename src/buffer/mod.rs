//! Per-connection inbound staging buffer
//!
//! A growable circular byte buffer. The connection writes whatever the
//! socket produced, the protocol parser peeks at a contiguous window, and
//! only whole frames are ever consumed. Raw indices never leave this type.

use std::borrow::Cow;

const INITIAL_CAPACITY: usize = 1024;

/// Growable circular byte buffer.
///
/// Bytes live in a `Vec<u8>` addressed by a head index plus an occupancy
/// count; the write position is derived, so a full buffer is never
/// ambiguous with an empty one.
pub struct RingBuffer {
    buf: Vec<u8>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        RingBuffer {
            buf: vec![0; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    /// Number of unconsumed bytes.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Free space left before the next resize.
    pub fn available(&self) -> usize {
        self.buf.len() - self.len
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append bytes, growing the backing storage if needed.
    ///
    /// Growth at least doubles the capacity and always fits the incoming
    /// data; unconsumed bytes are preserved in order.
    pub fn write(&mut self, data: &[u8]) {
        if data.len() > self.available() {
            let new_capacity = (self.buf.len() * 2).max(self.buf.len() + data.len());
            self.resize(new_capacity);
        }

        let capacity = self.buf.len();
        let tail = (self.head + self.len) % capacity;
        let space_to_end = capacity - tail;
        if data.len() <= space_to_end {
            self.buf[tail..tail + data.len()].copy_from_slice(data);
        } else {
            self.buf[tail..].copy_from_slice(&data[..space_to_end]);
            self.buf[..data.len() - space_to_end].copy_from_slice(&data[space_to_end..]);
        }
        self.len += data.len();
    }

    /// Contiguous read-only window of `len` bytes starting `offset` bytes
    /// past the head, or `None` if that many bytes are not buffered.
    ///
    /// Allocates a copy only when the window wraps the physical end of the
    /// backing storage.
    pub fn peek(&self, offset: usize, len: usize) -> Option<Cow<'_, [u8]>> {
        if offset + len > self.len {
            return None;
        }
        let capacity = self.buf.len();
        let pos = (self.head + offset) % capacity;
        if pos + len <= capacity {
            Some(Cow::Borrowed(&self.buf[pos..pos + len]))
        } else {
            let first = capacity - pos;
            let mut tmp = Vec::with_capacity(len);
            tmp.extend_from_slice(&self.buf[pos..]);
            tmp.extend_from_slice(&self.buf[..len - first]);
            Some(Cow::Owned(tmp))
        }
    }

    /// Drop up to `len` bytes from the front.
    ///
    /// When the buffer drains completely the head snaps back to the origin
    /// so indices stay bounded.
    pub fn consume(&mut self, len: usize) {
        let len = len.min(self.len);
        self.head = (self.head + len) % self.buf.len();
        self.len -= len;
        if self.len == 0 {
            self.head = 0;
        }
    }

    fn resize(&mut self, new_capacity: usize) {
        let mut new_buf = vec![0; new_capacity];
        if self.len > 0 {
            let capacity = self.buf.len();
            let first = (capacity - self.head).min(self.len);
            new_buf[..first].copy_from_slice(&self.buf[self.head..self.head + first]);
            new_buf[first..self.len].copy_from_slice(&self.buf[..self.len - first]);
        }
        self.buf = new_buf;
        self.head = 0;
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(rb: &RingBuffer) -> Vec<u8> {
        rb.peek(0, rb.size()).unwrap().into_owned()
    }

    #[test]
    fn test_write_peek_consume() {
        let mut rb = RingBuffer::with_capacity(16);
        rb.write(b"hello world");
        assert_eq!(rb.size(), 11);
        assert_eq!(rb.peek(0, 5).unwrap().as_ref(), b"hello");
        assert_eq!(rb.peek(6, 5).unwrap().as_ref(), b"world");

        rb.consume(6);
        assert_eq!(rb.size(), 5);
        assert_eq!(contents(&rb), b"world");
    }

    #[test]
    fn test_peek_beyond_size() {
        let mut rb = RingBuffer::with_capacity(16);
        rb.write(b"abc");
        assert!(rb.peek(0, 4).is_none());
        assert!(rb.peek(3, 1).is_none());
        assert!(rb.peek(0, 3).is_some());
    }

    #[test]
    fn test_wrap_around() {
        let mut rb = RingBuffer::with_capacity(8);
        rb.write(b"abcdef");
        rb.consume(5);
        // Head sits at 5 of 8; these 4 bytes straddle the physical end.
        rb.write(b"ghi");
        assert_eq!(rb.size(), 4);
        let window = rb.peek(0, 4).unwrap();
        assert_eq!(window.as_ref(), b"fghi");
        assert!(matches!(window, Cow::Owned(_)));
    }

    #[test]
    fn test_growth_preserves_order() {
        let mut rb = RingBuffer::with_capacity(4);
        rb.write(b"abcd");
        rb.consume(2);
        rb.write(b"efgh");
        assert!(rb.capacity() >= 6);
        assert_eq!(contents(&rb), b"cdefgh");
    }

    #[test]
    fn test_size_available_invariant() {
        let mut rb = RingBuffer::with_capacity(8);
        let ops: &[(&[u8], usize)] = &[
            (b"abc", 0),
            (b"defgh", 2),
            (b"ijklmnop", 4),
            (b"", 100),
            (b"qrstuv", 1),
        ];
        for (data, consume) in ops {
            rb.write(data);
            assert_eq!(rb.size() + rb.available(), rb.capacity());
            rb.consume(*consume);
            assert_eq!(rb.size() + rb.available(), rb.capacity());
        }
    }

    #[test]
    fn test_consume_clamps_and_resets() {
        let mut rb = RingBuffer::with_capacity(8);
        rb.write(b"abcde");
        rb.consume(2);
        rb.consume(100);
        assert_eq!(rb.size(), 0);
        // After a full drain the next write starts at the origin again.
        rb.write(b"xyz");
        assert!(matches!(rb.peek(0, 3).unwrap(), Cow::Borrowed(_)));
        assert_eq!(contents(&rb), b"xyz");
    }

    #[test]
    fn test_interleaved_roundtrip() {
        let mut rb = RingBuffer::with_capacity(4);
        let mut expected: Vec<u8> = Vec::new();
        let mut drained: Vec<u8> = Vec::new();
        for round in 0u8..32 {
            let chunk: Vec<u8> = (0..(round % 7 + 1)).map(|i| round.wrapping_mul(13) + i).collect();
            rb.write(&chunk);
            expected.extend_from_slice(&chunk);

            let take = (round as usize % 5).min(rb.size());
            drained.extend_from_slice(rb.peek(0, take).unwrap().as_ref());
            rb.consume(take);
        }
        drained.extend_from_slice(&contents(&rb));
        assert_eq!(drained, expected);
    }
}

//! Byte sinks shared by the text and binary formatters.
//!
//! The binary encoder walks a record twice: once into a [`CountingSink`] to
//! learn the payload length, then into a [`CrcSink`] wrapping an
//! [`OutputBuffer`] to emit it. Both passes run the same traversal code.

use crate::codec::crc8_update;

/// Raw output function: receives rendered bytes, returns how many it took.
///
/// Must be safe to call from several threads at once.
pub type OutputFn = fn(&[u8]) -> usize;

/// Destination for formatter output.
pub trait ByteSink {
    fn put(&mut self, byte: u8);

    fn put_slice(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.put(b);
        }
    }
}

impl ByteSink for Vec<u8> {
    fn put(&mut self, byte: u8) {
        self.push(byte);
    }

    fn put_slice(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Counts bytes without storing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingSink {
    pub count: usize,
}

impl ByteSink for CountingSink {
    #[inline]
    fn put(&mut self, _byte: u8) {
        self.count += 1;
    }

    #[inline]
    fn put_slice(&mut self, bytes: &[u8]) {
        self.count += bytes.len();
    }
}

/// Folds every byte into a CRC-8 before forwarding it.
pub struct CrcSink<'s, S: ByteSink> {
    inner: &'s mut S,
    crc: u8,
}

impl<'s, S: ByteSink> CrcSink<'s, S> {
    pub fn new(inner: &'s mut S) -> Self {
        Self { inner, crc: 0 }
    }

    pub fn crc(&self) -> u8 {
        self.crc
    }
}

impl<S: ByteSink> ByteSink for CrcSink<'_, S> {
    #[inline]
    fn put(&mut self, byte: u8) {
        self.crc = crc8_update(self.crc, byte);
        self.inner.put(byte);
    }
}

/// Stack buffer in front of an [`OutputFn`]; flushes when full and on drop.
///
/// Keeps formatter output allocation free while avoiding one sink call per
/// byte.
pub struct OutputBuffer<const N: usize = 128> {
    out: OutputFn,
    buf: [u8; N],
    len: usize,
    written: usize,
}

impl<const N: usize> OutputBuffer<N> {
    pub fn new(out: OutputFn) -> Self {
        Self {
            out,
            buf: [0; N],
            len: 0,
            written: 0,
        }
    }

    pub fn flush(&mut self) {
        if self.len > 0 {
            self.written += (self.out)(&self.buf[..self.len]);
            self.len = 0;
        }
    }

    /// Bytes accepted by the output function so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl<const N: usize> ByteSink for OutputBuffer<N> {
    #[inline]
    fn put(&mut self, byte: u8) {
        if self.len == N {
            self.flush();
        }
        self.buf[self.len] = byte;
        self.len += 1;
    }
}

impl<const N: usize> Drop for OutputBuffer<N> {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Fixed-capacity buffer that silently drops what does not fit.
pub struct StackBuf<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> StackBuf<N> {
    pub const fn new() -> Self {
        Self { buf: [0; N], len: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Contents as text, cut back to the last complete UTF-8 character.
    pub fn as_str(&self) -> &str {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(s) => s,
            Err(e) => std::str::from_utf8(&self.buf[..e.valid_up_to()]).unwrap_or_default(),
        }
    }
}

impl<const N: usize> Default for StackBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteSink for StackBuf<N> {
    #[inline]
    fn put(&mut self, byte: u8) {
        if self.len < N {
            self.buf[self.len] = byte;
            self.len += 1;
        }
    }
}

impl<const N: usize> std::fmt::Write for StackBuf<N> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.put_slice(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static CHUNKS: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
    }

    fn record_chunk(bytes: &[u8]) -> usize {
        CHUNKS.with(|c| c.borrow_mut().push(bytes.to_vec()));
        bytes.len()
    }

    #[test]
    fn test_output_buffer_chunks() {
        {
            let mut out = OutputBuffer::<4>::new(record_chunk);
            out.put_slice(b"abcdefghij");
        }
        let chunks = CHUNKS.with(|c| c.borrow().clone());
        assert_eq!(chunks, vec![b"abcd".to_vec(), b"efgh".to_vec(), b"ij".to_vec()]);
    }

    #[test]
    fn test_crc_sink_matches_crc8() {
        let mut bytes = Vec::new();
        let crc = {
            let mut sink = CrcSink::new(&mut bytes);
            sink.put_slice(b"123456789");
            sink.crc()
        };
        assert_eq!(bytes, b"123456789");
        assert_eq!(crc, crate::codec::crc8(b"123456789"));
    }

    #[test]
    fn test_stack_buf_truncates_on_char_boundary() {
        let mut buf = StackBuf::<4>::new();
        buf.put_slice("abé!".as_bytes());
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.as_str(), "abé");

        let mut buf = StackBuf::<3>::new();
        buf.put_slice("abé".as_bytes());
        assert_eq!(buf.as_str(), "ab");
    }
}

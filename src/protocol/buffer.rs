//! Read/write byte buffer with on-demand refill
//!
//! All chunk and AMF0 parsing runs over this buffer. Reads never pull
//! from the transport themselves: callers `ensure` the bytes they need
//! first, so the primitive readers only fail on a caller bug and report
//! it as `ShortRead` instead of panicking.

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncRead;

use crate::error::{ProtocolError, Result};
use crate::protocol::constants::SOCKET_READ_SIZE;
use crate::protocol::transport::Transport;

/// Append-and-consume byte region with a movable cursor
#[derive(Debug, Default)]
pub struct ByteBuffer {
    buf: BytesMut,
    pos: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            pos: 0,
        }
    }

    /// Buffer over an existing payload, cursor at 0 (used to decode
    /// packet payloads after chunk reassembly)
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            buf: BytesMut::from(data),
            pos: 0,
        }
    }

    /// Unconsumed bytes remaining
    pub fn len(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cursor offset from the start of the region
    pub fn position(&self) -> usize {
        self.pos
    }

    /// True iff `n` bytes are already buffered
    pub fn require(&self, n: usize) -> bool {
        self.len() >= n
    }

    /// Block until at least `n` bytes are buffered, pulling from the
    /// transport in 4096-byte refills.
    pub async fn ensure<T: AsyncRead + Unpin>(
        &mut self,
        io: &mut Transport<T>,
        n: usize,
    ) -> Result<()> {
        while self.len() < n {
            let mut chunk = [0u8; SOCKET_READ_SIZE];
            let nread = io.read(&mut chunk).await?;
            if nread == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                )
                .into());
            }
            self.buf.extend_from_slice(&chunk[..nread]);
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.len() < n {
            return Err(ProtocolError::ShortRead {
                needed: n,
                have: self.len(),
            }
            .into());
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..self.pos])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u24_be(&mut self) -> Result<u32> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f64_be(&mut self) -> Result<f64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(f64::from_be_bytes(raw))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(self.take(n)?))
    }

    /// Read `n` bytes as a string. The wire is not required to be valid
    /// UTF-8 (historical clients send Latin-1); bytes above 0x7F fall
    /// back to a Latin-1 interpretation rather than failing.
    pub fn read_string(&mut self, n: usize) -> Result<String> {
        let raw = self.take(n)?;
        match std::str::from_utf8(raw) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Ok(raw.iter().map(|&b| b as char).collect()),
        }
    }

    /// Read a big-endian u32 without advancing the cursor
    pub fn peek_u32_be(&self) -> Result<u32> {
        if self.len() < 4 {
            return Err(ProtocolError::ShortRead {
                needed: 4,
                have: self.len(),
            }
            .into());
        }
        let b = &self.buf[self.pos..self.pos + 4];
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n)?;
        Ok(())
    }

    /// Move the cursor back by `n`, never past the start of the region
    pub fn rewind(&mut self, n: usize) {
        self.pos = self.pos.saturating_sub(n);
    }

    /// Put the cursor at an absolute offset (used to restart packet
    /// decoding at offset 0, or 1 for AMF3-wrapped commands)
    pub fn reset(&mut self, pos: usize) {
        debug_assert!(pos <= self.buf.len());
        self.pos = pos.min(self.buf.len());
    }

    fn put(&mut self, src: &[u8]) {
        let end = self.pos + src.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(src);
        self.pos = end;
    }

    pub fn write_u8(&mut self, v: u8) {
        self.put(&[v]);
    }

    pub fn write_u16_be(&mut self, v: u16) {
        self.put(&v.to_be_bytes());
    }

    pub fn write_u24_be(&mut self, v: u32) {
        self.put(&v.to_be_bytes()[1..]);
    }

    pub fn write_u32_be(&mut self, v: u32) {
        self.put(&v.to_be_bytes());
    }

    pub fn write_u32_le(&mut self, v: u32) {
        self.put(&v.to_le_bytes());
    }

    pub fn write_f64_be(&mut self, v: f64) {
        self.put(&v.to_be_bytes());
    }

    pub fn write_bytes(&mut self, src: &[u8]) {
        self.put(src);
    }

    /// Drop the consumed prefix; afterwards the cursor is at 0 and the
    /// length equals the unconsumed suffix. Called between messages to
    /// bound memory.
    pub fn compact(&mut self) {
        let _ = self.buf.split_to(self.pos);
        self.pos = 0;
    }

    /// The unconsumed suffix
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Everything written/buffered, regardless of cursor
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

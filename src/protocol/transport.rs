//! Byte-counting transport wrapper
//!
//! The ACK window is measured against raw socket byte counts, so every
//! read and write goes through this wrapper and is tallied.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};

/// Wraps the connection, counting bytes in each direction
#[derive(Debug)]
pub struct Transport<T> {
    io: T,
    recv_bytes: u64,
    send_bytes: u64,
}

impl<T> Transport<T> {
    pub fn new(io: T) -> Self {
        Self {
            io,
            recv_bytes: 0,
            send_bytes: 0,
        }
    }

    /// Total bytes read from the peer
    pub fn recv_bytes(&self) -> u64 {
        self.recv_bytes
    }

    /// Total bytes written to the peer
    pub fn send_bytes(&self) -> u64 {
        self.send_bytes
    }

    /// Give back the underlying connection
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: AsyncRead + Unpin> Transport<T> {
    /// Read up to `buf.len()` bytes. Returns 0 on EOF.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.io.read(buf).await?;
        self.recv_bytes += n as u64;
        Ok(n)
    }
}

impl<T: AsyncWrite + Unpin> Transport<T> {
    /// Write all of `data`, failing with `PartialWrite` if the
    /// connection stops accepting bytes.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < data.len() {
            let n = self.io.write(&data[written..]).await?;
            if n == 0 {
                return Err(ProtocolError::PartialWrite {
                    expected: data.len(),
                    written,
                }
                .into());
            }
            written += n;
            self.send_bytes += n as u64;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.io.flush().await?;
        Ok(())
    }
}

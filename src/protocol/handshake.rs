//! RTMP handshake, simple variant, server side
//!
//! ```text
//! Client                                   Server
//!   |                                        |
//!   |------- C0 (1 byte: version) --------->|
//!   |------- C1 (1536 bytes: time+random) ->|
//!   |                                        |
//!   |<------ S0 (1 byte: version) ----------|
//!   |<------ S1 (1536 bytes: echo C1) ------|
//!   |<------ S2 (1536 bytes: echo C1) ------|
//!   |                                        |
//!   |------- C2 (1536 bytes) -------------->|  (discarded)
//!   |                                        |
//!   |          [Handshake Complete]          |
//! ```
//!
//! Echoing C1 as both S1 and S2 is legal and what every mainstream
//! encoder accepts. The complex (HMAC-digest) variant is a collaborator
//! concern and not handled here.
//!
//! Reference: RTMP Specification Section 5.2

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, HandshakeError, Result};
use crate::protocol::buffer::ByteBuffer;
use crate::protocol::constants::{HANDSHAKE_SIZE, RTMP_VERSION};
use crate::protocol::transport::Transport;

/// Run the server side of the simple handshake
pub(crate) async fn serve<T>(buf: &mut ByteBuffer, io: &mut Transport<T>) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    buf.ensure(io, 1 + HANDSHAKE_SIZE)
        .await
        .map_err(truncated)?;

    let version = buf.read_u8()?;
    if version != RTMP_VERSION {
        return Err(HandshakeError::BadVersion(version).into());
    }
    let c1 = buf.read_bytes(HANDSHAKE_SIZE)?;

    let mut response = BytesMut::with_capacity(1 + 2 * HANDSHAKE_SIZE);
    response.put_u8(RTMP_VERSION);
    response.extend_from_slice(&c1);
    response.extend_from_slice(&c1);
    io.write(&response).await?;
    io.flush().await?;

    buf.ensure(io, HANDSHAKE_SIZE).await.map_err(truncated)?;
    buf.skip(HANDSHAKE_SIZE)?;
    buf.compact();

    tracing::debug!("simple handshake complete");
    Ok(())
}

fn truncated(err: Error) -> Error {
    match err {
        Error::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            HandshakeError::TruncatedExchange.into()
        }
        other => other,
    }
}

//! RTMP chunk stream codec
//!
//! RTMP messages are split into chunks for multiplexing. Each chunk has a
//! header that identifies the chunk stream and the message being carried.
//!
//! ```text
//! Chunk Format:
//! +--------------+-----------------+--------------------+
//! | Basic Header | Message Header  | Chunk Data         |
//! | (1-3 bytes)  | (0,3,7,11 bytes)| (variable)         |
//! +--------------+-----------------+--------------------+
//!
//! Basic Header forms:
//! - 1 byte:  fmt(2) + cid(6)         for cid 2-63
//! - 2 bytes: fmt(2) + 0 + cid(8)     for cid 64-319
//! - 3 bytes: fmt(2) + 1 + cid(16)    for cid 64-65599
//!
//! Message Header forms (selected by fmt):
//! - Type 0 (11 bytes): timestamp(3) + length(3) + type(1) + stream_id(4, LE)
//! - Type 1 (7 bytes):  timestamp_delta(3) + length(3) + type(1)
//! - Type 2 (3 bytes):  timestamp_delta(3)
//! - Type 3 (0 bytes):  everything inherited from the previous chunk
//!
//! A 24-bit timestamp field of 0xFFFFFF means a 4-byte extended
//! timestamp follows the message header.
//! ```
//!
//! Reference: RTMP Specification Section 5.3

use std::collections::HashMap;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{ProtocolError, Result};
use crate::protocol::buffer::ByteBuffer;
use crate::protocol::constants::*;
use crate::protocol::message::{Message, MessageHeader};
use crate::protocol::transport::Transport;

/// Per-chunk-stream decoder state
///
/// The cached header is what lets fmt 1/2/3 chunks inherit fields from
/// the previous chunk on the same CID.
#[derive(Debug)]
struct ChunkStream {
    /// Chunk stream id
    cid: u32,
    /// Last-seen basic header fmt
    fmt: u8,
    /// Cached message header, carried across chunks
    header: MessageHeader,
    /// Sticky flag: the previous chunk on this CID used an extended
    /// timestamp
    extended_timestamp: bool,
    /// Partial message being reassembled; empty between messages
    msg: Option<BytesMut>,
    /// Messages completed on this CID; the first chunk of a fresh CID
    /// must be fmt 0
    msg_count: u64,
}

impl ChunkStream {
    fn new(cid: u32) -> Self {
        Self {
            cid,
            fmt: 0,
            header: MessageHeader::default(),
            extended_timestamp: false,
            msg: None,
            msg_count: 0,
        }
    }
}

/// Inbound chunk demultiplexer
///
/// Reads one chunk per call, reassembling payloads per CID until a
/// message completes.
#[derive(Debug)]
pub struct ChunkDecoder {
    streams: HashMap<u32, ChunkStream>,
    in_chunk_size: u32,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self {
            streams: HashMap::new(),
            in_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Apply an inbound SetChunkSize. The wire value is a u32 whose top
    /// bit must be clear; zero and negative-as-signed values are
    /// rejected.
    pub fn set_chunk_size(&mut self, size: u32) -> Result<()> {
        if size == 0 || size > MAX_CHUNK_SIZE {
            return Err(ProtocolError::InvalidMsgSize(size as i32 as i64).into());
        }
        self.in_chunk_size = size;
        Ok(())
    }

    pub fn chunk_size(&self) -> u32 {
        self.in_chunk_size
    }

    /// Read exactly one chunk from the buffer (topping up from the
    /// transport as needed). Returns the completed message when this
    /// chunk was the last one of it.
    pub async fn read_message<T: AsyncRead + Unpin>(
        &mut self,
        buf: &mut ByteBuffer,
        io: &mut Transport<T>,
    ) -> Result<Option<Message>> {
        let (fmt, cid) = read_basic_header(buf, io).await?;
        let in_chunk_size = self.in_chunk_size;

        let chunk = self
            .streams
            .entry(cid)
            .or_insert_with(|| ChunkStream::new(cid));

        read_message_header(chunk, fmt, buf, io).await?;
        read_payload(chunk, in_chunk_size, buf, io).await
    }

    #[cfg(test)]
    fn partial_len(&self, cid: u32) -> Option<usize> {
        self.streams.get(&cid)?.msg.as_ref().map(|m| m.len())
    }
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the 1/2/3-byte basic header: 2-bit fmt plus the chunk stream id
async fn read_basic_header<T: AsyncRead + Unpin>(
    buf: &mut ByteBuffer,
    io: &mut Transport<T>,
) -> Result<(u8, u32)> {
    buf.ensure(io, 1).await?;
    let first = buf.read_u8()?;
    let fmt = (first >> 6) & 0x03;
    let cid = (first & 0x3F) as u32;

    match cid {
        0 => {
            buf.ensure(io, 1).await?;
            Ok((fmt, 64 + buf.read_u8()? as u32))
        }
        1 => {
            buf.ensure(io, 2).await?;
            let b0 = buf.read_u8()? as u32;
            let b1 = buf.read_u8()? as u32;
            Ok((fmt, 64 + b0 + b1 * 256))
        }
        _ => Ok((fmt, cid)),
    }
}

/// Read the fmt-dependent message header, folding inherited fields and
/// the timestamp accumulation into the CID's cached header.
async fn read_message_header<T: AsyncRead + Unpin>(
    chunk: &mut ChunkStream,
    fmt: u8,
    buf: &mut ByteBuffer,
    io: &mut Transport<T>,
) -> Result<()> {
    // A fresh message may legally open with fmt 3: FMLE sends a bare
    // 0xC4 for some audio packets, meaning "previous header again" with
    // the previous delta applied once more.
    let is_fresh_message = chunk.msg.is_none();

    if chunk.msg_count == 0 && fmt != CHUNK_FMT_0 {
        return Err(ProtocolError::ChunkStart("fmt of the first chunk on a CID must be 0").into());
    }
    if chunk.msg.is_some() && fmt == CHUNK_FMT_0 {
        return Err(ProtocolError::ChunkStart("unexpected start of a new message").into());
    }

    buf.ensure(io, MESSAGE_HEADER_SIZES[fmt as usize]).await?;

    if fmt <= CHUNK_FMT_2 {
        let delta = buf.read_u24_be()?;
        chunk.extended_timestamp = delta == EXTENDED_TIMESTAMP;
        if !chunk.extended_timestamp {
            chunk.header.timestamp_delta = delta;
            if fmt == CHUNK_FMT_0 {
                chunk.header.timestamp = delta as u64;
            } else {
                chunk.header.timestamp += delta as u64;
            }
        }

        if fmt <= CHUNK_FMT_1 {
            let payload_length = buf.read_u24_be()?;
            if !is_fresh_message && payload_length != chunk.header.payload_length {
                return Err(ProtocolError::PacketSize {
                    expected: chunk.header.payload_length,
                    actual: payload_length,
                }
                .into());
            }
            chunk.header.payload_length = payload_length;
            chunk.header.message_type = buf.read_u8()?;

            if fmt == CHUNK_FMT_0 {
                chunk.header.stream_id = buf.read_u32_le()?;
            }
        }
    } else if is_fresh_message && !chunk.extended_timestamp {
        chunk.header.timestamp += chunk.header.timestamp_delta as u64;
    }

    if chunk.extended_timestamp {
        buf.ensure(io, 4).await?;
        let t = buf.peek_u32_be()?;
        // Some encoders omit the extended timestamp on fmt-3
        // continuation chunks. If the established timestamp is already
        // past the 24-bit range and the peeked word does not echo it,
        // these 4 bytes are payload: leave them in the buffer.
        let omitted = fmt == CHUNK_FMT_3
            && chunk.header.timestamp > EXTENDED_TIMESTAMP as u64
            && t as u64 != chunk.header.timestamp;
        if !omitted {
            buf.skip(4)?;
            match fmt {
                CHUNK_FMT_0 => {
                    chunk.header.timestamp = t as u64;
                    chunk.header.timestamp_delta = t;
                }
                // for fmt 1/2 the extended field is still a delta
                CHUNK_FMT_1 | CHUNK_FMT_2 => {
                    chunk.header.timestamp_delta = t;
                    chunk.header.timestamp += t as u64;
                }
                _ => chunk.header.timestamp = t as u64,
            }
        }
    }

    chunk.fmt = fmt;
    Ok(())
}

/// Append this chunk's payload slice; hand the message up once
/// `received == payload_length`, clearing the CID's partial slot.
async fn read_payload<T: AsyncRead + Unpin>(
    chunk: &mut ChunkStream,
    in_chunk_size: u32,
    buf: &mut ByteBuffer,
    io: &mut Transport<T>,
) -> Result<Option<Message>> {
    let payload_length = chunk.header.payload_length as usize;

    let complete = {
        let msg = chunk
            .msg
            .get_or_insert_with(|| BytesMut::with_capacity(payload_length));
        let n = (payload_length - msg.len()).min(in_chunk_size as usize);
        if n > 0 {
            buf.ensure(io, n).await?;
            let slice = buf.read_bytes(n)?;
            msg.extend_from_slice(&slice);
        }
        msg.len() == payload_length
    };

    if !complete {
        return Ok(None);
    }

    let payload = chunk.msg.take().unwrap_or_default().freeze();
    chunk.msg_count += 1;
    tracing::trace!(
        cid = chunk.cid,
        fmt = chunk.fmt,
        message_type = chunk.header.message_type,
        payload_length = chunk.header.payload_length,
        "message complete"
    );

    Ok(Some(Message {
        header: chunk.header.clone(),
        payload,
        preferred_cid: chunk.cid,
    }))
}

/// Outbound chunk framer
///
/// Splits a message into one fmt-0 chunk followed by fmt-3
/// continuations. Header bytes are assembled in two fixed scratch
/// regions so steady-state sending allocates nothing.
#[derive(Debug)]
pub struct ChunkEncoder {
    out_chunk_size: u32,
    header_fmt0: [u8; MAX_FMT0_HEADER_SIZE],
    header_fmt3: [u8; MAX_FMT3_HEADER_SIZE],
}

impl ChunkEncoder {
    pub fn new() -> Self {
        Self {
            out_chunk_size: DEFAULT_CHUNK_SIZE,
            header_fmt0: [0; MAX_FMT0_HEADER_SIZE],
            header_fmt3: [0; MAX_FMT3_HEADER_SIZE],
        }
    }

    /// Switch the outbound chunk size. Callers must announce the change
    /// to the peer with a SetChunkSize message first.
    pub fn set_chunk_size(&mut self, size: u32) -> Result<()> {
        if size == 0 || size > MAX_CHUNK_SIZE {
            return Err(ProtocolError::InvalidMsgSize(size as i32 as i64).into());
        }
        self.out_chunk_size = size;
        Ok(())
    }

    pub fn chunk_size(&self) -> u32 {
        self.out_chunk_size
    }

    /// Frame and write one message. Chunks of one message are never
    /// interleaved with another's.
    pub async fn write_message<T: AsyncWrite + Unpin>(
        &mut self,
        io: &mut Transport<T>,
        msg: &Message,
    ) -> Result<()> {
        // the scratch headers only hold the single-byte basic form
        let cid = match msg.preferred_cid {
            cid @ 2..=63 => cid as u8,
            _ => CID_OVER_CONNECTION as u8,
        };

        let extended = msg.header.timestamp >= EXTENDED_TIMESTAMP as u64;
        let timestamp = msg.header.timestamp as u32;
        let payload = &msg.payload;
        let mut sent = 0usize;

        loop {
            if sent == 0 {
                let mut n = 0;
                self.header_fmt0[n] = (CHUNK_FMT_0 << 6) | cid;
                n += 1;
                let ts_field = if extended { EXTENDED_TIMESTAMP } else { timestamp };
                self.header_fmt0[n..n + 3].copy_from_slice(&ts_field.to_be_bytes()[1..]);
                n += 3;
                self.header_fmt0[n..n + 3]
                    .copy_from_slice(&msg.header.payload_length.to_be_bytes()[1..]);
                n += 3;
                self.header_fmt0[n] = msg.header.message_type;
                n += 1;
                self.header_fmt0[n..n + 4].copy_from_slice(&msg.header.stream_id.to_le_bytes());
                n += 4;
                if extended {
                    self.header_fmt0[n..n + 4].copy_from_slice(&timestamp.to_be_bytes());
                    n += 4;
                }
                io.write(&self.header_fmt0[..n]).await?;
            } else {
                let mut n = 0;
                self.header_fmt3[n] = (CHUNK_FMT_3 << 6) | cid;
                n += 1;
                if extended {
                    self.header_fmt3[n..n + 4].copy_from_slice(&timestamp.to_be_bytes());
                    n += 4;
                }
                io.write(&self.header_fmt3[..n]).await?;
            }

            let take = (payload.len() - sent).min(self.out_chunk_size as usize);
            if take > 0 {
                io.write(&payload[sent..sent + take]).await?;
                sent += take;
            }
            if sent >= payload.len() {
                return Ok(());
            }
        }
    }
}

impl Default for ChunkEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use bytes::Bytes;
    use tokio::io::AsyncReadExt;

    /// Transport whose read side is already closed; tests preload the
    /// buffer instead, so ensure() must never actually pull.
    fn closed_transport() -> Transport<tokio::io::DuplexStream> {
        let (client, server) = tokio::io::duplex(16);
        drop(client);
        Transport::new(server)
    }

    fn fmt0_header(
        cid: u8,
        timestamp: u32,
        payload_length: u32,
        message_type: u8,
        stream_id: u32,
    ) -> Vec<u8> {
        let mut v = vec![cid & 0x3F];
        v.extend_from_slice(&timestamp.to_be_bytes()[1..]);
        v.extend_from_slice(&payload_length.to_be_bytes()[1..]);
        v.push(message_type);
        v.extend_from_slice(&stream_id.to_le_bytes());
        v
    }

    #[tokio::test]
    async fn test_single_chunk_message() {
        let mut stream = fmt0_header(3, 0, 5, MSG_COMMAND_AMF0, 0);
        stream.extend_from_slice(b"hello");

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&stream);
        let mut io = closed_transport();

        let msg = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(msg.header.message_type, MSG_COMMAND_AMF0);
        assert_eq!(msg.header.payload_length, 5);
        assert_eq!(msg.header.timestamp, 0);
        assert_eq!(msg.payload, Bytes::from_static(b"hello"));
        assert_eq!(msg.preferred_cid, 3);
        assert!(decoder.partial_len(3).is_none());
    }

    #[tokio::test]
    async fn test_three_chunk_reassembly() {
        // 300-byte payload at the default 128-byte chunk size:
        // fmt0 + 128, fmt3 + 128, fmt3 + 44
        let payload: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        let mut stream = fmt0_header(4, 1000, 300, MSG_VIDEO, 1);
        stream.extend_from_slice(&payload[..128]);
        stream.push(0xC4);
        stream.extend_from_slice(&payload[128..256]);
        stream.push(0xC4);
        stream.extend_from_slice(&payload[256..]);

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&stream);
        let mut io = closed_transport();

        assert!(decoder.read_message(&mut buf, &mut io).await.unwrap().is_none());
        assert_eq!(decoder.partial_len(4), Some(128));
        assert!(decoder.read_message(&mut buf, &mut io).await.unwrap().is_none());
        let msg = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();

        assert_eq!(msg.payload.len(), 300);
        assert_eq!(&msg.payload[..], &payload[..]);
        assert_eq!(msg.header.timestamp, 1000);
        assert!(decoder.partial_len(4).is_none());
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_first_chunk_must_be_fmt0() {
        for first in [0x43u8, 0x83, 0xC3] {
            let mut decoder = ChunkDecoder::new();
            let mut buf = ByteBuffer::from_slice(&[first, 0, 0, 0, 0, 0, 0, 0]);
            let mut io = closed_transport();
            let err = decoder.read_message(&mut buf, &mut io).await.unwrap_err();
            assert!(
                matches!(err, Error::Protocol(ProtocolError::ChunkStart(_))),
                "fmt {} must be rejected on a fresh CID",
                first >> 6
            );
        }
    }

    #[tokio::test]
    async fn test_fmt0_on_inflight_message_rejected() {
        // start a 200-byte message on CID 4, deliver one full chunk,
        // then open another fmt-0 chunk on the same CID
        let mut stream = fmt0_header(4, 0, 200, MSG_AUDIO, 1);
        stream.extend_from_slice(&[0u8; 128]);
        stream.extend_from_slice(&fmt0_header(4, 0, 200, MSG_AUDIO, 1));

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&stream);
        let mut io = closed_transport();

        assert!(decoder.read_message(&mut buf, &mut io).await.unwrap().is_none());
        let err = decoder.read_message(&mut buf, &mut io).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::ChunkStart(_))));
    }

    #[tokio::test]
    async fn test_fmt1_length_change_mid_message_rejected() {
        let mut stream = fmt0_header(4, 0, 200, MSG_AUDIO, 1);
        stream.extend_from_slice(&[0u8; 128]);
        // fmt1 continuation announcing a different payload length
        stream.push(0x44);
        stream.extend_from_slice(&[0, 0, 0]); // delta
        stream.extend_from_slice(&150u32.to_be_bytes()[1..]);
        stream.push(MSG_AUDIO);

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&stream);
        let mut io = closed_transport();

        assert!(decoder.read_message(&mut buf, &mut io).await.unwrap().is_none());
        let err = decoder.read_message(&mut buf, &mut io).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::PacketSize { expected: 200, actual: 150 })
        ));
    }

    #[tokio::test]
    async fn test_fmt3_fresh_message_replays_delta() {
        // FMLE pattern: fmt0 with delta 26, then a bare 0xC4 opening the
        // next message; the second message's timestamp is 26 + 26
        let mut stream = fmt0_header(4, 26, 2, MSG_AUDIO, 1);
        stream.extend_from_slice(&[0xAA, 0xBB]);
        stream.push(0xC4);
        stream.extend_from_slice(&[0xCC, 0xDD]);

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&stream);
        let mut io = closed_transport();

        let first = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(first.header.timestamp, 26);
        let second = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(second.header.timestamp, 52);
        assert_eq!(second.header.payload_length, 2);
        assert_eq!(second.header.message_type, MSG_AUDIO);
        assert_eq!(second.header.stream_id, 1);
    }

    #[tokio::test]
    async fn test_extended_timestamp_decode() {
        let mut stream = vec![0x03];
        stream.extend_from_slice(&[0xFF, 0xFF, 0xFF]); // sentinel
        stream.extend_from_slice(&4u32.to_be_bytes()[1..]); // length
        stream.push(MSG_COMMAND_AMF0);
        stream.extend_from_slice(&0u32.to_le_bytes()); // stream id
        stream.extend_from_slice(&0x0100_0000u32.to_be_bytes()); // extended
        stream.extend_from_slice(&[1, 2, 3, 4]);

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&stream);
        let mut io = closed_transport();

        let msg = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(msg.header.timestamp, 0x0100_0000);
    }

    #[tokio::test]
    async fn test_fmt1_extended_delta_accumulates() {
        // second message opens with fmt 1 whose 24-bit delta field is
        // the sentinel; the extended field carries the real delta and
        // must accumulate, not replace
        let mut stream = fmt0_header(4, 100, 2, MSG_AUDIO, 1);
        stream.extend_from_slice(&[0x01, 0x02]);

        stream.push(0x44); // fmt 1, cid 4
        stream.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        stream.extend_from_slice(&2u32.to_be_bytes()[1..]);
        stream.push(MSG_AUDIO);
        stream.extend_from_slice(&0x0100_0000u32.to_be_bytes());
        stream.extend_from_slice(&[0x03, 0x04]);

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&stream);
        let mut io = closed_transport();

        let first = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(first.header.timestamp, 100);

        let second = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(second.header.timestamp, 100 + 0x0100_0000);
        assert_eq!(second.header.timestamp_delta, 0x0100_0000);
        assert_eq!(second.payload, Bytes::from_static(&[0x03, 0x04]));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_fmt3_omitted_extended_timestamp_is_payload() {
        // message 1 establishes timestamp 0x01000000 with the extended
        // field; message 2 opens with fmt 3 and its first 4 payload
        // bytes do not echo the timestamp, so they must stay payload
        let mut stream = vec![0x03];
        stream.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        stream.extend_from_slice(&4u32.to_be_bytes()[1..]);
        stream.push(MSG_VIDEO);
        stream.extend_from_slice(&1u32.to_le_bytes());
        stream.extend_from_slice(&0x0100_0000u32.to_be_bytes());
        stream.extend_from_slice(&[9, 9, 9, 9]);

        stream.push(0xC3);
        stream.extend_from_slice(&[0x12, 0x34, 0x56, 0x78]);

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&stream);
        let mut io = closed_transport();

        let first = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(first.header.timestamp, 0x0100_0000);

        let second = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(second.payload, Bytes::from_static(&[0x12, 0x34, 0x56, 0x78]));
        assert_eq!(second.header.timestamp, 0x0100_0000);
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_fmt3_echoed_extended_timestamp_is_consumed() {
        let mut stream = vec![0x03];
        stream.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        stream.extend_from_slice(&2u32.to_be_bytes()[1..]);
        stream.push(MSG_VIDEO);
        stream.extend_from_slice(&1u32.to_le_bytes());
        stream.extend_from_slice(&0x0100_0000u32.to_be_bytes());
        stream.extend_from_slice(&[7, 7]);

        // next message: fmt 3 echoing the extended timestamp
        stream.push(0xC3);
        stream.extend_from_slice(&0x0100_0000u32.to_be_bytes());
        stream.extend_from_slice(&[8, 8]);

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&stream);
        let mut io = closed_transport();

        decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        let second = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(second.payload, Bytes::from_static(&[8, 8]));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_wide_basic_headers() {
        // 2-byte form: cid 64 + 10
        let mut stream = vec![0x00, 10];
        stream.extend_from_slice(&fmt0_header(0, 0, 1, MSG_AUDIO, 1)[1..]);
        stream.push(0xEE);
        // 3-byte form: cid 64 + 4 + 256
        stream.extend_from_slice(&[0x01, 4, 1]);
        stream.extend_from_slice(&fmt0_header(0, 0, 1, MSG_AUDIO, 1)[1..]);
        stream.push(0xEF);

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&stream);
        let mut io = closed_transport();

        let first = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(first.preferred_cid, 74);
        let second = decoder.read_message(&mut buf, &mut io).await.unwrap().unwrap();
        assert_eq!(second.preferred_cid, 64 + 4 + 256);
    }

    #[tokio::test]
    async fn test_set_chunk_size_bounds() {
        let mut decoder = ChunkDecoder::new();
        assert!(decoder.set_chunk_size(0).is_err());
        assert!(decoder.set_chunk_size(0x8000_0000).is_err());
        decoder.set_chunk_size(60_000).unwrap();
        assert_eq!(decoder.chunk_size(), 60_000);
    }

    async fn encode_to_bytes(encoder: &mut ChunkEncoder, msg: &Message) -> Vec<u8> {
        let (near, far) = tokio::io::duplex(1 << 20);
        let mut io = Transport::new(near);
        encoder.write_message(&mut io, msg).await.unwrap();
        drop(io);

        let mut out = Vec::new();
        let mut far = far;
        far.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_encode_single_chunk_layout() {
        let mut encoder = ChunkEncoder::new();
        let msg = Message::for_packet(MSG_COMMAND_AMF0, 3, 0, Bytes::from_static(b"abc"));
        let out = encode_to_bytes(&mut encoder, &msg).await;

        let mut expected = fmt0_header(3, 0, 3, MSG_COMMAND_AMF0, 0);
        expected.extend_from_slice(b"abc");
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_encode_decode_roundtrip_multichunk() {
        let payload: Vec<u8> = (0..300u32).map(|i| (i % 251) as u8).collect();
        let mut msg = Message::for_packet(MSG_VIDEO, 6, 1, Bytes::from(payload.clone()));
        msg.header.timestamp = 1234;

        let mut encoder = ChunkEncoder::new();
        let out = encode_to_bytes(&mut encoder, &msg).await;

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&out);
        let mut io = closed_transport();

        let mut decoded = None;
        while decoded.is_none() {
            decoded = decoder.read_message(&mut buf, &mut io).await.unwrap();
        }
        let decoded = decoded.unwrap();
        assert_eq!(decoded.header.timestamp, 1234);
        assert_eq!(decoded.header.stream_id, 1);
        assert_eq!(&decoded.payload[..], &payload[..]);
    }

    #[tokio::test]
    async fn test_encode_extended_timestamp_roundtrip() {
        let payload: Vec<u8> = vec![0x5A; 200];
        let mut msg = Message::for_packet(MSG_VIDEO, 6, 1, Bytes::from(payload.clone()));
        msg.header.timestamp = 0x0100_0005;

        let mut encoder = ChunkEncoder::new();
        let out = encode_to_bytes(&mut encoder, &msg).await;

        // sentinel in the 24-bit field, extended value after the header
        assert_eq!(&out[1..4], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&out[12..16], &0x0100_0005u32.to_be_bytes());

        let mut decoder = ChunkDecoder::new();
        let mut buf = ByteBuffer::from_slice(&out);
        let mut io = closed_transport();

        let mut decoded = None;
        while decoded.is_none() {
            decoded = decoder.read_message(&mut buf, &mut io).await.unwrap();
        }
        let decoded = decoded.unwrap();
        assert_eq!(decoded.header.timestamp, 0x0100_0005);
        assert_eq!(&decoded.payload[..], &payload[..]);
    }

    #[tokio::test]
    async fn test_encode_respects_new_chunk_size() {
        let payload = vec![1u8; 300];
        let msg = Message::for_packet(MSG_VIDEO, 6, 1, Bytes::from(payload));

        let mut encoder = ChunkEncoder::new();
        encoder.set_chunk_size(1000).unwrap();
        let out = encode_to_bytes(&mut encoder, &msg).await;

        // one fmt-0 header (12 bytes), single chunk, no 0xC6 marker
        assert_eq!(out.len(), 12 + 300);
        assert!(!out[12..].contains(&0xC6));
    }
}

//! The RTMP protocol engine
//!
//! `Protocol` owns the transport, the read buffer, both chunk codecs and
//! the session-wide negotiation state (chunk sizes, ACK window,
//! outstanding requests). One `Protocol` per accepted connection; it is
//! strictly sequential and shares nothing.
//!
//! The receive path auto-processes protocol control traffic: chunk-size
//! renegotiation, window updates, acknowledgements and ping requests
//! never surface to the caller. Everything else comes back as a raw
//! `Message`, with `decode_packet` / `expect_message` layering types on
//! top.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, ProtocolError, Result};
use crate::protocol::buffer::ByteBuffer;
use crate::protocol::chunk::{ChunkDecoder, ChunkEncoder};
use crate::protocol::constants::*;
use crate::protocol::handshake;
use crate::protocol::message::{Message, MessageHeader};
use crate::protocol::packet::{AcknowledgementPacket, RtmpPacket, UserControlPacket};
use crate::protocol::transport::Transport;

/// ACK-window bookkeeping: once the peer announces a window, every
/// window's worth of received bytes is acknowledged exactly once.
#[derive(Debug, Default)]
struct AckWindow {
    window_size: u32,
    acked_size: u64,
}

/// Single-connection RTMP protocol state machine
#[derive(Debug)]
pub struct Protocol<T> {
    io: Transport<T>,
    buffer: ByteBuffer,
    decoder: ChunkDecoder,
    encoder: ChunkEncoder,
    in_ack_window: AckWindow,
    /// transaction id -> command name, for typing `_result`/`_error`
    requests: HashMap<u64, String>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Protocol<T> {
    /// Bind the engine to a freshly-accepted connection
    pub fn new(io: T) -> Self {
        Self {
            io: Transport::new(io),
            buffer: ByteBuffer::new(),
            decoder: ChunkDecoder::new(),
            encoder: ChunkEncoder::new(),
            in_ack_window: AckWindow::default(),
            requests: HashMap::new(),
        }
    }

    /// Run the server side of the simple handshake. Must complete
    /// before any message traffic.
    pub async fn handshake(&mut self) -> Result<()> {
        handshake::serve(&mut self.buffer, &mut self.io).await
    }

    /// Receive the next application-level message
    ///
    /// Loops over inbound chunks until one completes a message.
    /// Zero-length messages are skipped, protocol control messages are
    /// absorbed, and the ACK window is serviced along the way.
    pub async fn recv_message(&mut self) -> Result<Message> {
        loop {
            let completed = self
                .decoder
                .read_message(&mut self.buffer, &mut self.io)
                .await?;
            self.buffer.compact();

            let Some(msg) = completed else { continue };

            if msg.header.payload_length == 0 {
                tracing::trace!("ignore empty message");
                continue;
            }
            if self.on_recv_message(&msg).await? {
                continue;
            }
            return Ok(msg);
        }
    }

    /// Handle a completed message before it surfaces. Returns true when
    /// the message was consumed internally.
    async fn on_recv_message(&mut self, msg: &Message) -> Result<bool> {
        self.send_ack_if_needed().await?;

        match msg.header.message_type {
            MSG_SET_CHUNK_SIZE => {
                let mut buf = ByteBuffer::from_slice(&msg.payload);
                let size = buf.read_u32_be()?;
                self.decoder.set_chunk_size(size)?;
                tracing::debug!(size, "peer set chunk size");
                Ok(true)
            }
            MSG_WINDOW_ACK_SIZE => {
                let mut buf = ByteBuffer::from_slice(&msg.payload);
                let size = buf.read_u32_be()?;
                self.in_ack_window.window_size = size;
                tracing::debug!(size, "peer set ack window");
                Ok(true)
            }
            MSG_ACKNOWLEDGEMENT => {
                let mut buf = ByteBuffer::from_slice(&msg.payload);
                let sequence = buf.read_u32_be()?;
                tracing::trace!(sequence, "peer acknowledged");
                Ok(true)
            }
            MSG_USER_CONTROL => {
                let mut buf = ByteBuffer::from_slice(&msg.payload);
                let event = UserControlPacket::decode(&mut buf)?;
                if event.event_type == UC_PING_REQUEST {
                    let pong = UserControlPacket::ping_response(event.event_data);
                    self.send_packet(&RtmpPacket::UserControl(pong), 0).await?;
                    tracing::trace!(timestamp = event.event_data, "ping answered");
                    return Ok(true);
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    async fn send_ack_if_needed(&mut self) -> Result<()> {
        let window = self.in_ack_window.window_size as u64;
        if window == 0 {
            return Ok(());
        }
        let received = self.io.recv_bytes();
        if received - self.in_ack_window.acked_size > window {
            let ack = AcknowledgementPacket {
                sequence_number: received as u32,
            };
            self.send_packet(&RtmpPacket::Acknowledgement(ack), 0).await?;
            self.in_ack_window.acked_size = received;
            tracing::debug!(received, "acknowledgement sent");
        }
        Ok(())
    }

    /// Receive messages until one decodes to the wanted packet type,
    /// dropping everything else
    pub async fn expect_message<P>(&mut self) -> Result<(Message, P)>
    where
        P: TryFrom<RtmpPacket, Error = Error>,
    {
        loop {
            let msg = self.recv_message().await?;
            let packet = self.decode_packet(&msg.header, &msg.payload)?;
            match P::try_from(packet) {
                Ok(wanted) => return Ok((msg, wanted)),
                Err(Error::Protocol(ProtocolError::ReflectMismatch(_))) => {
                    tracing::trace!(
                        message_type = msg.header.message_type,
                        "drop message while expecting another"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Decode a message payload against the packet registry
    pub fn decode_packet(&self, header: &MessageHeader, payload: &[u8]) -> Result<RtmpPacket> {
        RtmpPacket::decode(header, payload, &self.requests)
    }

    /// Encode a packet and send it on its preferred chunk stream
    pub async fn send_packet(&mut self, packet: &RtmpPacket, stream_id: u32) -> Result<()> {
        let size = packet.size();
        let mut payload = ByteBuffer::with_capacity(size);
        packet.encode(&mut payload)?;
        let payload = payload.into_bytes();
        debug_assert_eq!(payload.len(), size);

        // requests that elicit a _result are remembered so the response
        // can be typed later
        match packet {
            RtmpPacket::ConnectApp(p) => {
                self.requests
                    .insert(p.transaction_id.to_bits(), CMD_CONNECT.to_string());
            }
            RtmpPacket::CreateStream(p) => {
                self.requests
                    .insert(p.transaction_id.to_bits(), CMD_CREATE_STREAM.to_string());
            }
            _ => {}
        }

        let msg = Message::for_packet(
            packet.message_type(),
            packet.preferred_cid(),
            stream_id,
            payload,
        );
        self.send_message(&msg).await
    }

    /// Send an already-assembled message (used to relay raw payloads)
    pub async fn send_message(&mut self, msg: &Message) -> Result<()> {
        self.encoder.write_message(&mut self.io, msg).await?;
        self.io.flush().await
    }

    /// Announce and switch to a larger outbound chunk size
    pub async fn set_out_chunk_size(&mut self, size: u32) -> Result<()> {
        let packet = RtmpPacket::SetChunkSize(crate::protocol::packet::SetChunkSizePacket {
            chunk_size: size,
        });
        self.send_packet(&packet, 0).await?;
        self.encoder.set_chunk_size(size)?;
        tracing::debug!(size, "outbound chunk size switched");
        Ok(())
    }

    pub fn in_chunk_size(&self) -> u32 {
        self.decoder.chunk_size()
    }

    pub fn out_chunk_size(&self) -> u32 {
        self.encoder.chunk_size()
    }

    pub fn recv_bytes(&self) -> u64 {
        self.io.recv_bytes()
    }

    pub fn send_bytes(&self) -> u64 {
        self.io.send_bytes()
    }
}

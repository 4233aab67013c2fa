//! RTMP message and message header
//!
//! A message is the application-level unit: a header plus an opaque
//! payload. On the wire it is split into chunks; the chunk codec
//! reassembles inbound chunks into messages and splits outbound
//! messages back into chunks.

use bytes::Bytes;

use crate::protocol::constants::*;

/// Per-message protocol header
///
/// RTMP spec section 4.1. `timestamp_delta` only matters while decoding
/// chunk types 0/1/2; `timestamp` is the accumulated absolute time,
/// widened to 64 bits so downstream jitter math never wraps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHeader {
    /// One-byte message type (1-6 protocol control, 8 audio, 9 video,
    /// 15/18 data, 17/20 command)
    pub message_type: u8,
    /// 24-bit payload byte count
    pub payload_length: u32,
    /// 24-bit timestamp delta, decode-side scratch
    pub timestamp_delta: u32,
    /// Stream id, transmitted little-endian in fmt-0 chunks only
    pub stream_id: u32,
    /// Absolute timestamp, accumulated during decode
    pub timestamp: u64,
}

impl MessageHeader {
    pub fn is_amf0_command(&self) -> bool {
        self.message_type == MSG_COMMAND_AMF0
    }

    pub fn is_amf3_command(&self) -> bool {
        self.message_type == MSG_COMMAND_AMF3
    }

    pub fn is_amf0_data(&self) -> bool {
        self.message_type == MSG_DATA_AMF0
    }

    pub fn is_amf3_data(&self) -> bool {
        self.message_type == MSG_DATA_AMF3
    }

    pub fn is_audio(&self) -> bool {
        self.message_type == MSG_AUDIO
    }

    pub fn is_video(&self) -> bool {
        self.message_type == MSG_VIDEO
    }

    pub fn is_set_chunk_size(&self) -> bool {
        self.message_type == MSG_SET_CHUNK_SIZE
    }

    pub fn is_acknowledgement(&self) -> bool {
        self.message_type == MSG_ACKNOWLEDGEMENT
    }

    pub fn is_window_ack_size(&self) -> bool {
        self.message_type == MSG_WINDOW_ACK_SIZE
    }

    pub fn is_user_control(&self) -> bool {
        self.message_type == MSG_USER_CONTROL
    }
}

/// A complete RTMP message
///
/// `preferred_cid` is the chunk stream the message arrived on (decode)
/// or the one its packet prefers (encode), so a message can be re-sent
/// without re-examining the payload.
#[derive(Debug, Clone)]
pub struct Message {
    pub header: MessageHeader,
    pub payload: Bytes,
    pub preferred_cid: u32,
}

impl Message {
    /// Build an outbound message for an encoded packet payload
    pub fn for_packet(
        message_type: u8,
        preferred_cid: u32,
        stream_id: u32,
        payload: Bytes,
    ) -> Self {
        Self {
            header: MessageHeader {
                message_type,
                payload_length: payload.len() as u32,
                timestamp_delta: 0,
                stream_id,
                timestamp: 0,
            },
            payload,
            preferred_cid,
        }
    }
}

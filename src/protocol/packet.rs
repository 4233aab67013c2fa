//! Typed RTMP packets
//!
//! A packet is the decoded form of a message payload. The registry is a
//! closed sum: decoding dispatches on the message type and, for AMF0/AMF3
//! commands, on the command name peeked from the first AMF0 value.
//! Message types and commands the registry does not recognise surface as
//! `Raw` rather than failing the session.
//!
//! Every packet knows the chunk stream it prefers, its message type, its
//! serialized size, and how to encode itself; `encode` must produce
//! exactly `size()` bytes.

use std::collections::HashMap;

use bytes::Bytes;

use crate::amf::{Amf0Codec, Amf0Object, Amf0Value};
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::buffer::ByteBuffer;
use crate::protocol::constants::*;
use crate::protocol::message::MessageHeader;

const AMF0_NUMBER_SIZE: usize = 9;
const AMF0_BOOLEAN_SIZE: usize = 2;
const AMF0_NULL_SIZE: usize = 1;

fn amf0_string_size(s: &str) -> usize {
    3 + s.len()
}

fn amf0_object_size(o: &Amf0Object) -> usize {
    1 + o.body_size() + 3
}

/// 4.1.1. connect
///
/// The client requests connection to a server application instance. The
/// command object is surfaced raw; tcUrl/vhost resolution is the
/// caller's business.
#[derive(Debug, Clone)]
pub struct ConnectAppPacket {
    pub transaction_id: f64,
    pub command_object: Amf0Object,
}

impl ConnectAppPacket {
    pub fn new(command_object: Amf0Object) -> Self {
        Self {
            transaction_id: 1.0,
            command_object,
        }
    }

    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        let command = codec.read_string()?;
        if command != CMD_CONNECT {
            return Err(crate::error::Amf0Error::Decode("connect command name mismatch").into());
        }
        let transaction_id = codec.read_number()?;
        if transaction_id != 1.0 {
            return Err(crate::error::Amf0Error::Decode("connect transaction id must be 1.0").into());
        }
        let command_object = codec.read_object()?;
        Ok(Self {
            transaction_id,
            command_object,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(CMD_CONNECT)?;
        codec.write_number(self.transaction_id)?;
        codec.write_object(&self.command_object)
    }

    pub fn size(&self) -> usize {
        amf0_string_size(CMD_CONNECT) + AMF0_NUMBER_SIZE + amf0_object_size(&self.command_object)
    }
}

/// Response for connect
#[derive(Debug, Clone)]
pub struct ConnectAppResPacket {
    pub command_name: String,
    pub transaction_id: f64,
    pub props: Amf0Object,
    pub info: Amf0Object,
}

impl ConnectAppResPacket {
    pub fn new() -> Self {
        Self {
            command_name: CMD_RESULT.to_string(),
            transaction_id: 1.0,
            props: Amf0Object::new(),
            info: Amf0Object::new(),
        }
    }

    /// Add a property to the `_result` properties object, skipping
    /// empty values the way the reference server does
    pub fn props_set(&mut self, name: &str, value: impl Into<Amf0Value>) -> &mut Self {
        let value = value.into();
        if !value_is_empty(&value) {
            self.props.set(name, value);
        }
        self
    }

    /// Add a field to the information object
    pub fn info_set(&mut self, name: &str, value: impl Into<Amf0Value>) -> &mut Self {
        let value = value.into();
        if !value_is_empty(&value) {
            self.info.set(name, value);
        }
        self
    }

    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        let command_name = codec.read_string()?;
        let transaction_id = codec.read_number()?;
        let props = codec.read_object()?;
        let info = codec.read_object()?;
        Ok(Self {
            command_name,
            transaction_id,
            props,
            info,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(&self.command_name)?;
        codec.write_number(self.transaction_id)?;
        if !self.props.is_empty() {
            codec.write_object(&self.props)?;
        }
        if !self.info.is_empty() {
            codec.write_object(&self.info)?;
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        let mut size = amf0_string_size(&self.command_name) + AMF0_NUMBER_SIZE;
        if !self.props.is_empty() {
            size += amf0_object_size(&self.props);
        }
        if !self.info.is_empty() {
            size += amf0_object_size(&self.info);
        }
        size
    }
}

impl Default for ConnectAppResPacket {
    fn default() -> Self {
        Self::new()
    }
}

fn value_is_empty(value: &Amf0Value) -> bool {
    match value {
        Amf0Value::String(s) | Amf0Value::LongString(s) => s.is_empty(),
        Amf0Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// createStream: the client asks for a message stream id
#[derive(Debug, Clone)]
pub struct CreateStreamPacket {
    pub transaction_id: f64,
}

impl CreateStreamPacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        codec.read_string()?;
        let transaction_id = codec.read_number()?;
        codec.read_null()?;
        Ok(Self { transaction_id })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(CMD_CREATE_STREAM)?;
        codec.write_number(self.transaction_id)?;
        codec.write_null()
    }

    pub fn size(&self) -> usize {
        amf0_string_size(CMD_CREATE_STREAM) + AMF0_NUMBER_SIZE + AMF0_NULL_SIZE
    }
}

/// Response for createStream, carrying the allotted stream id
#[derive(Debug, Clone)]
pub struct CreateStreamResPacket {
    pub transaction_id: f64,
    pub stream_id: f64,
}

impl CreateStreamResPacket {
    pub fn new(transaction_id: f64) -> Self {
        Self {
            transaction_id,
            stream_id: DEFAULT_STREAM_ID as f64,
        }
    }

    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        codec.read_string()?;
        let transaction_id = codec.read_number()?;
        codec.read_null()?;
        let stream_id = codec.read_number()?;
        Ok(Self {
            transaction_id,
            stream_id,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(CMD_RESULT)?;
        codec.write_number(self.transaction_id)?;
        codec.write_null()?;
        codec.write_number(self.stream_id)
    }

    pub fn size(&self) -> usize {
        amf0_string_size(CMD_RESULT) + AMF0_NUMBER_SIZE + AMF0_NULL_SIZE + AMF0_NUMBER_SIZE
    }
}

/// play: start playback of a named stream
#[derive(Debug, Clone)]
pub struct PlayPacket {
    pub transaction_id: f64,
    pub stream_name: String,
    /// -2 live-or-recorded, -1 live only, >= 0 seek offset
    pub start: f64,
}

impl PlayPacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        codec.read_string()?;
        let transaction_id = codec.read_number()?;
        codec.read_null()?;
        let stream_name = codec.read_string()?;
        let start = if buf.is_empty() {
            -2.0
        } else {
            Amf0Codec::new(buf).read_number()?
        };
        Ok(Self {
            transaction_id,
            stream_name,
            start,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(CMD_PLAY)?;
        codec.write_number(self.transaction_id)?;
        codec.write_null()?;
        codec.write_string(&self.stream_name)?;
        codec.write_number(self.start)
    }

    pub fn size(&self) -> usize {
        amf0_string_size(CMD_PLAY)
            + AMF0_NUMBER_SIZE
            + AMF0_NULL_SIZE
            + amf0_string_size(&self.stream_name)
            + AMF0_NUMBER_SIZE
    }
}

/// pause: toggle playback on a stream
#[derive(Debug, Clone)]
pub struct PausePacket {
    pub transaction_id: f64,
    pub is_pause: bool,
    pub time_ms: f64,
}

impl PausePacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        codec.read_string()?;
        let transaction_id = codec.read_number()?;
        codec.read_null()?;
        let is_pause = codec.read_boolean()?;
        let time_ms = codec.read_number()?;
        Ok(Self {
            transaction_id,
            is_pause,
            time_ms,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(CMD_PAUSE)?;
        codec.write_number(self.transaction_id)?;
        codec.write_null()?;
        codec.write_boolean(self.is_pause)?;
        codec.write_number(self.time_ms)
    }

    pub fn size(&self) -> usize {
        amf0_string_size(CMD_PAUSE)
            + AMF0_NUMBER_SIZE
            + AMF0_NULL_SIZE
            + AMF0_BOOLEAN_SIZE
            + AMF0_NUMBER_SIZE
    }
}

/// publish: start publishing to a named stream
#[derive(Debug, Clone)]
pub struct PublishPacket {
    pub transaction_id: f64,
    pub stream_name: String,
    /// "live", "record" or "append"
    pub publish_type: String,
}

impl PublishPacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        codec.read_string()?;
        let transaction_id = codec.read_number()?;
        codec.read_null()?;
        let stream_name = codec.read_string()?;
        let publish_type = if buf.is_empty() {
            "live".to_string()
        } else {
            Amf0Codec::new(buf).read_string()?
        };
        Ok(Self {
            transaction_id,
            stream_name,
            publish_type,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(CMD_PUBLISH)?;
        codec.write_number(self.transaction_id)?;
        codec.write_null()?;
        codec.write_string(&self.stream_name)?;
        codec.write_string(&self.publish_type)
    }

    pub fn size(&self) -> usize {
        amf0_string_size(CMD_PUBLISH)
            + AMF0_NUMBER_SIZE
            + AMF0_NULL_SIZE
            + amf0_string_size(&self.stream_name)
            + amf0_string_size(&self.publish_type)
    }
}

/// closeStream
#[derive(Debug, Clone)]
pub struct CloseStreamPacket {
    pub transaction_id: f64,
}

impl CloseStreamPacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        codec.read_string()?;
        let transaction_id = codec.read_number()?;
        codec.read_null()?;
        Ok(Self { transaction_id })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(CMD_CLOSE_STREAM)?;
        codec.write_number(self.transaction_id)?;
        codec.write_null()
    }

    pub fn size(&self) -> usize {
        amf0_string_size(CMD_CLOSE_STREAM) + AMF0_NUMBER_SIZE + AMF0_NULL_SIZE
    }
}

/// releaseStream / FCPublish / FCUnpublish share one wire shape:
/// name, transaction id, null, stream name
#[derive(Debug, Clone)]
pub struct FmleStartPacket {
    pub command_name: String,
    pub transaction_id: f64,
    pub stream_name: String,
}

impl FmleStartPacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        let command_name = codec.read_string()?;
        let transaction_id = codec.read_number()?;
        codec.read_null()?;
        let stream_name = if buf.is_empty() {
            String::new()
        } else {
            Amf0Codec::new(buf).read_string()?
        };
        Ok(Self {
            command_name,
            transaction_id,
            stream_name,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(&self.command_name)?;
        codec.write_number(self.transaction_id)?;
        codec.write_null()?;
        codec.write_string(&self.stream_name)
    }

    pub fn size(&self) -> usize {
        amf0_string_size(&self.command_name)
            + AMF0_NUMBER_SIZE
            + AMF0_NULL_SIZE
            + amf0_string_size(&self.stream_name)
    }
}

/// onStatus: server-to-client status notification
#[derive(Debug, Clone)]
pub struct OnStatusPacket {
    pub transaction_id: f64,
    pub data: Amf0Object,
}

impl OnStatusPacket {
    pub fn new() -> Self {
        Self {
            transaction_id: 0.0,
            data: Amf0Object::new(),
        }
    }

    /// level/code/description triple most callers want
    pub fn status(level: &str, code: &str, description: &str) -> Self {
        let mut packet = Self::new();
        packet
            .data
            .set(STATUS_LEVEL, level)
            .set(STATUS_CODE, code)
            .set(STATUS_DESCRIPTION, description);
        packet
    }

    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        codec.read_string()?;
        let transaction_id = codec.read_number()?;
        codec.read_null()?;
        let data = codec.read_object()?;
        Ok(Self {
            transaction_id,
            data,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(CMD_ON_STATUS)?;
        codec.write_number(self.transaction_id)?;
        codec.write_null()?;
        codec.write_object(&self.data)
    }

    pub fn size(&self) -> usize {
        amf0_string_size(CMD_ON_STATUS)
            + AMF0_NUMBER_SIZE
            + AMF0_NULL_SIZE
            + amf0_object_size(&self.data)
    }
}

impl Default for OnStatusPacket {
    fn default() -> Self {
        Self::new()
    }
}

/// onBWDone: the server finished its bandwidth probe
#[derive(Debug, Clone)]
pub struct OnBWDonePacket {
    pub transaction_id: f64,
}

impl OnBWDonePacket {
    pub fn new() -> Self {
        Self { transaction_id: 0.0 }
    }

    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        codec.read_string()?;
        let transaction_id = codec.read_number()?;
        codec.read_null()?;
        Ok(Self { transaction_id })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(CMD_ON_BW_DONE)?;
        codec.write_number(self.transaction_id)?;
        codec.write_null()
    }

    pub fn size(&self) -> usize {
        amf0_string_size(CMD_ON_BW_DONE) + AMF0_NUMBER_SIZE + AMF0_NULL_SIZE
    }
}

impl Default for OnBWDonePacket {
    fn default() -> Self {
        Self::new()
    }
}

/// onMetaData / @setDataFrame: stream metadata as an AMF0 data message
#[derive(Debug, Clone)]
pub struct OnMetaDataPacket {
    pub name: String,
    /// Object or EcmaArray, kept as received
    pub metadata: Amf0Value,
}

impl OnMetaDataPacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let mut codec = Amf0Codec::new(buf);
        let mut name = codec.read_string()?;
        // FMLE wraps metadata: @setDataFrame("onMetaData", {...})
        if name == CMD_SET_DATA_FRAME {
            name = codec.read_string()?;
        }
        let metadata = codec.read_value()?;
        Ok(Self { name, metadata })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        let mut codec = Amf0Codec::new(buf);
        codec.write_string(&self.name)?;
        codec.write_value(&self.metadata)
    }

    pub fn size(&self) -> usize {
        amf0_string_size(&self.name) + self.metadata.size()
    }
}

/// 5.1. Set Chunk Size (1)
#[derive(Debug, Clone)]
pub struct SetChunkSizePacket {
    pub chunk_size: u32,
}

impl SetChunkSizePacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        Ok(Self {
            chunk_size: buf.read_u32_be()?,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        buf.write_u32_be(self.chunk_size);
        Ok(())
    }

    pub fn size(&self) -> usize {
        4
    }
}

/// 5.3. Acknowledgement (3): bytes received so far
#[derive(Debug, Clone)]
pub struct AcknowledgementPacket {
    pub sequence_number: u32,
}

impl AcknowledgementPacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        Ok(Self {
            sequence_number: buf.read_u32_be()?,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        buf.write_u32_be(self.sequence_number);
        Ok(())
    }

    pub fn size(&self) -> usize {
        4
    }
}

/// 5.4. User Control Message (4)
#[derive(Debug, Clone)]
pub struct UserControlPacket {
    pub event_type: u16,
    pub event_data: u32,
    /// Only present for SetBufferLength
    pub extra_data: u32,
}

impl UserControlPacket {
    pub fn ping_response(timestamp: u32) -> Self {
        Self {
            event_type: UC_PING_RESPONSE,
            event_data: timestamp,
            extra_data: 0,
        }
    }

    pub fn stream_begin(stream_id: u32) -> Self {
        Self {
            event_type: UC_STREAM_BEGIN,
            event_data: stream_id,
            extra_data: 0,
        }
    }

    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        let event_type = buf.read_u16_be()?;
        let event_data = buf.read_u32_be()?;
        let extra_data = if event_type == UC_SET_BUFFER_LENGTH {
            buf.read_u32_be()?
        } else {
            0
        };
        Ok(Self {
            event_type,
            event_data,
            extra_data,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        buf.write_u16_be(self.event_type);
        buf.write_u32_be(self.event_data);
        if self.event_type == UC_SET_BUFFER_LENGTH {
            buf.write_u32_be(self.extra_data);
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        if self.event_type == UC_SET_BUFFER_LENGTH {
            10
        } else {
            6
        }
    }
}

/// 5.5. Window Acknowledgement Size (5)
#[derive(Debug, Clone)]
pub struct SetWindowAckSizePacket {
    pub ack_window_size: u32,
}

impl SetWindowAckSizePacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        Ok(Self {
            ack_window_size: buf.read_u32_be()?,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        buf.write_u32_be(self.ack_window_size);
        Ok(())
    }

    pub fn size(&self) -> usize {
        4
    }
}

/// 5.6. Set Peer Bandwidth (6)
#[derive(Debug, Clone)]
pub struct SetPeerBandwidthPacket {
    pub bandwidth: u32,
    /// hard (0), soft (1) or dynamic (2)
    pub limit_type: u8,
}

impl SetPeerBandwidthPacket {
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self> {
        Ok(Self {
            bandwidth: buf.read_u32_be()?,
            limit_type: buf.read_u8()?,
        })
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        buf.write_u32_be(self.bandwidth);
        buf.write_u8(self.limit_type);
        Ok(())
    }

    pub fn size(&self) -> usize {
        5
    }
}

/// Payload the registry does not recognise, kept opaque
#[derive(Debug, Clone)]
pub struct RawPacket {
    pub message_type: u8,
    pub payload: Bytes,
}

impl RawPacket {
    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        buf.write_bytes(&self.payload);
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// The packet registry: a closed sum of everything the engine decodes
#[derive(Debug, Clone)]
pub enum RtmpPacket {
    ConnectApp(ConnectAppPacket),
    ConnectAppRes(ConnectAppResPacket),
    CreateStream(CreateStreamPacket),
    CreateStreamRes(CreateStreamResPacket),
    Play(PlayPacket),
    Pause(PausePacket),
    Publish(PublishPacket),
    CloseStream(CloseStreamPacket),
    ReleaseStream(FmleStartPacket),
    FcPublish(FmleStartPacket),
    FcUnpublish(FmleStartPacket),
    OnStatus(OnStatusPacket),
    OnBWDone(OnBWDonePacket),
    OnMetaData(OnMetaDataPacket),
    SetChunkSize(SetChunkSizePacket),
    Acknowledgement(AcknowledgementPacket),
    UserControl(UserControlPacket),
    SetWindowAckSize(SetWindowAckSizePacket),
    SetPeerBandwidth(SetPeerBandwidthPacket),
    Raw(RawPacket),
}

impl RtmpPacket {
    /// Chunk stream this packet prefers on the way out. A hint: the
    /// peer may put its own traffic on other CIDs.
    pub fn preferred_cid(&self) -> u32 {
        match self {
            RtmpPacket::ConnectApp(_)
            | RtmpPacket::ConnectAppRes(_)
            | RtmpPacket::CreateStream(_)
            | RtmpPacket::CreateStreamRes(_)
            | RtmpPacket::ReleaseStream(_)
            | RtmpPacket::FcPublish(_)
            | RtmpPacket::FcUnpublish(_)
            | RtmpPacket::OnBWDone(_)
            | RtmpPacket::Raw(_) => CID_OVER_CONNECTION,
            RtmpPacket::Play(_)
            | RtmpPacket::Pause(_)
            | RtmpPacket::Publish(_)
            | RtmpPacket::CloseStream(_)
            | RtmpPacket::OnStatus(_) => CID_OVER_STREAM,
            RtmpPacket::OnMetaData(_) => CID_OVER_CONNECTION2,
            RtmpPacket::SetChunkSize(_)
            | RtmpPacket::Acknowledgement(_)
            | RtmpPacket::UserControl(_)
            | RtmpPacket::SetWindowAckSize(_)
            | RtmpPacket::SetPeerBandwidth(_) => CID_PROTOCOL_CONTROL,
        }
    }

    pub fn message_type(&self) -> u8 {
        match self {
            RtmpPacket::ConnectApp(_)
            | RtmpPacket::ConnectAppRes(_)
            | RtmpPacket::CreateStream(_)
            | RtmpPacket::CreateStreamRes(_)
            | RtmpPacket::Play(_)
            | RtmpPacket::Pause(_)
            | RtmpPacket::Publish(_)
            | RtmpPacket::CloseStream(_)
            | RtmpPacket::ReleaseStream(_)
            | RtmpPacket::FcPublish(_)
            | RtmpPacket::FcUnpublish(_)
            | RtmpPacket::OnStatus(_)
            | RtmpPacket::OnBWDone(_) => MSG_COMMAND_AMF0,
            RtmpPacket::OnMetaData(_) => MSG_DATA_AMF0,
            RtmpPacket::SetChunkSize(_) => MSG_SET_CHUNK_SIZE,
            RtmpPacket::Acknowledgement(_) => MSG_ACKNOWLEDGEMENT,
            RtmpPacket::UserControl(_) => MSG_USER_CONTROL,
            RtmpPacket::SetWindowAckSize(_) => MSG_WINDOW_ACK_SIZE,
            RtmpPacket::SetPeerBandwidth(_) => MSG_SET_PEER_BANDWIDTH,
            RtmpPacket::Raw(p) => p.message_type,
        }
    }

    /// Serialized payload size; `encode` writes exactly this many bytes
    pub fn size(&self) -> usize {
        match self {
            RtmpPacket::ConnectApp(p) => p.size(),
            RtmpPacket::ConnectAppRes(p) => p.size(),
            RtmpPacket::CreateStream(p) => p.size(),
            RtmpPacket::CreateStreamRes(p) => p.size(),
            RtmpPacket::Play(p) => p.size(),
            RtmpPacket::Pause(p) => p.size(),
            RtmpPacket::Publish(p) => p.size(),
            RtmpPacket::CloseStream(p) => p.size(),
            RtmpPacket::ReleaseStream(p) => p.size(),
            RtmpPacket::FcPublish(p) => p.size(),
            RtmpPacket::FcUnpublish(p) => p.size(),
            RtmpPacket::OnStatus(p) => p.size(),
            RtmpPacket::OnBWDone(p) => p.size(),
            RtmpPacket::OnMetaData(p) => p.size(),
            RtmpPacket::SetChunkSize(p) => p.size(),
            RtmpPacket::Acknowledgement(p) => p.size(),
            RtmpPacket::UserControl(p) => p.size(),
            RtmpPacket::SetWindowAckSize(p) => p.size(),
            RtmpPacket::SetPeerBandwidth(p) => p.size(),
            RtmpPacket::Raw(p) => p.size(),
        }
    }

    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<()> {
        match self {
            RtmpPacket::ConnectApp(p) => p.encode(buf),
            RtmpPacket::ConnectAppRes(p) => p.encode(buf),
            RtmpPacket::CreateStream(p) => p.encode(buf),
            RtmpPacket::CreateStreamRes(p) => p.encode(buf),
            RtmpPacket::Play(p) => p.encode(buf),
            RtmpPacket::Pause(p) => p.encode(buf),
            RtmpPacket::Publish(p) => p.encode(buf),
            RtmpPacket::CloseStream(p) => p.encode(buf),
            RtmpPacket::ReleaseStream(p) => p.encode(buf),
            RtmpPacket::FcPublish(p) => p.encode(buf),
            RtmpPacket::FcUnpublish(p) => p.encode(buf),
            RtmpPacket::OnStatus(p) => p.encode(buf),
            RtmpPacket::OnBWDone(p) => p.encode(buf),
            RtmpPacket::OnMetaData(p) => p.encode(buf),
            RtmpPacket::SetChunkSize(p) => p.encode(buf),
            RtmpPacket::Acknowledgement(p) => p.encode(buf),
            RtmpPacket::UserControl(p) => p.encode(buf),
            RtmpPacket::SetWindowAckSize(p) => p.encode(buf),
            RtmpPacket::SetPeerBandwidth(p) => p.encode(buf),
            RtmpPacket::Raw(p) => p.encode(buf),
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            RtmpPacket::ConnectApp(_) => "connect",
            RtmpPacket::ConnectAppRes(_) => "connect response",
            RtmpPacket::CreateStream(_) => "createStream",
            RtmpPacket::CreateStreamRes(_) => "createStream response",
            RtmpPacket::Play(_) => "play",
            RtmpPacket::Pause(_) => "pause",
            RtmpPacket::Publish(_) => "publish",
            RtmpPacket::CloseStream(_) => "closeStream",
            RtmpPacket::ReleaseStream(_) => "releaseStream",
            RtmpPacket::FcPublish(_) => "FCPublish",
            RtmpPacket::FcUnpublish(_) => "FCUnpublish",
            RtmpPacket::OnStatus(_) => "onStatus",
            RtmpPacket::OnBWDone(_) => "onBWDone",
            RtmpPacket::OnMetaData(_) => "onMetaData",
            RtmpPacket::SetChunkSize(_) => "SetChunkSize",
            RtmpPacket::Acknowledgement(_) => "Acknowledgement",
            RtmpPacket::UserControl(_) => "UserControl",
            RtmpPacket::SetWindowAckSize(_) => "SetWindowAckSize",
            RtmpPacket::SetPeerBandwidth(_) => "SetPeerBandwidth",
            RtmpPacket::Raw(_) => "Raw",
        }
    }

    /// Decode a message payload into a typed packet
    ///
    /// `requests` maps outstanding transaction ids to the command that
    /// opened them, so `_result`/`_error` resolve to the right response
    /// packet. Unknown commands and message types come back as `Raw`.
    pub fn decode(
        header: &MessageHeader,
        payload: &[u8],
        requests: &HashMap<u64, String>,
    ) -> Result<RtmpPacket> {
        let mut buf = ByteBuffer::from_slice(payload);

        if header.is_amf0_command()
            || header.is_amf3_command()
            || header.is_amf0_data()
            || header.is_amf3_data()
        {
            // AMF3 command payloads carry a one-byte format prefix
            if header.is_amf3_command() && buf.require(1) {
                buf.skip(1)?;
            }

            let command = Amf0Codec::new(&mut buf).read_string()?;

            // responses resolve against the outstanding-request table
            let response_to = if command == CMD_RESULT || command == CMD_ERROR {
                let transaction_id = Amf0Codec::new(&mut buf).read_number()?;
                requests.get(&transaction_id.to_bits()).cloned()
            } else {
                None
            };

            // restart the packet decoder from the top of the payload
            buf.reset(if header.is_amf3_command() { 1 } else { 0 });

            if let Some(origin) = response_to {
                return match origin.as_str() {
                    CMD_CONNECT => Ok(RtmpPacket::ConnectAppRes(ConnectAppResPacket::decode(
                        &mut buf,
                    )?)),
                    CMD_CREATE_STREAM => Ok(RtmpPacket::CreateStreamRes(
                        CreateStreamResPacket::decode(&mut buf)?,
                    )),
                    _ => {
                        tracing::trace!(origin = %origin, "response to untyped request");
                        Ok(RtmpPacket::Raw(RawPacket {
                            message_type: header.message_type,
                            payload: Bytes::copy_from_slice(payload),
                        }))
                    }
                };
            }

            return match command.as_str() {
                CMD_CONNECT => Ok(RtmpPacket::ConnectApp(ConnectAppPacket::decode(&mut buf)?)),
                CMD_CREATE_STREAM => Ok(RtmpPacket::CreateStream(CreateStreamPacket::decode(
                    &mut buf,
                )?)),
                CMD_PLAY => Ok(RtmpPacket::Play(PlayPacket::decode(&mut buf)?)),
                CMD_PAUSE => Ok(RtmpPacket::Pause(PausePacket::decode(&mut buf)?)),
                CMD_PUBLISH => Ok(RtmpPacket::Publish(PublishPacket::decode(&mut buf)?)),
                CMD_CLOSE_STREAM => Ok(RtmpPacket::CloseStream(CloseStreamPacket::decode(
                    &mut buf,
                )?)),
                CMD_RELEASE_STREAM => {
                    Ok(RtmpPacket::ReleaseStream(FmleStartPacket::decode(&mut buf)?))
                }
                CMD_FC_PUBLISH => Ok(RtmpPacket::FcPublish(FmleStartPacket::decode(&mut buf)?)),
                CMD_FC_UNPUBLISH => {
                    Ok(RtmpPacket::FcUnpublish(FmleStartPacket::decode(&mut buf)?))
                }
                CMD_ON_STATUS => Ok(RtmpPacket::OnStatus(OnStatusPacket::decode(&mut buf)?)),
                CMD_ON_BW_DONE => Ok(RtmpPacket::OnBWDone(OnBWDonePacket::decode(&mut buf)?)),
                CMD_ON_METADATA | CMD_SET_DATA_FRAME => {
                    Ok(RtmpPacket::OnMetaData(OnMetaDataPacket::decode(&mut buf)?))
                }
                other => {
                    tracing::trace!(command = %other, "unknown command surfaces as raw");
                    Ok(RtmpPacket::Raw(RawPacket {
                        message_type: header.message_type,
                        payload: Bytes::copy_from_slice(payload),
                    }))
                }
            };
        }

        match Self::decode_control(header, &mut buf) {
            Ok(packet) => Ok(packet),
            Err(Error::Protocol(ProtocolError::UnknownMessageType(t))) => {
                tracing::trace!(message_type = t, "unknown message type surfaces as raw");
                Ok(RtmpPacket::Raw(RawPacket {
                    message_type: header.message_type,
                    payload: Bytes::copy_from_slice(payload),
                }))
            }
            Err(e) => Err(e),
        }
    }

    fn decode_control(header: &MessageHeader, buf: &mut ByteBuffer) -> Result<RtmpPacket> {
        match header.message_type {
            MSG_SET_CHUNK_SIZE => Ok(RtmpPacket::SetChunkSize(SetChunkSizePacket::decode(buf)?)),
            MSG_ACKNOWLEDGEMENT => Ok(RtmpPacket::Acknowledgement(
                AcknowledgementPacket::decode(buf)?,
            )),
            MSG_USER_CONTROL => Ok(RtmpPacket::UserControl(UserControlPacket::decode(buf)?)),
            MSG_WINDOW_ACK_SIZE => Ok(RtmpPacket::SetWindowAckSize(
                SetWindowAckSizePacket::decode(buf)?,
            )),
            MSG_SET_PEER_BANDWIDTH => Ok(RtmpPacket::SetPeerBandwidth(
                SetPeerBandwidthPacket::decode(buf)?,
            )),
            other => Err(ProtocolError::UnknownMessageType(other).into()),
        }
    }
}

macro_rules! impl_try_from_packet {
    ($variant:ident, $ty:ty) => {
        impl TryFrom<RtmpPacket> for $ty {
            type Error = Error;

            fn try_from(packet: RtmpPacket) -> std::result::Result<Self, Error> {
                match packet {
                    RtmpPacket::$variant(p) => Ok(p),
                    _ => Err(ProtocolError::ReflectMismatch(stringify!($ty)).into()),
                }
            }
        }
    };
}

impl_try_from_packet!(ConnectApp, ConnectAppPacket);
impl_try_from_packet!(ConnectAppRes, ConnectAppResPacket);
impl_try_from_packet!(CreateStream, CreateStreamPacket);
impl_try_from_packet!(CreateStreamRes, CreateStreamResPacket);
impl_try_from_packet!(Play, PlayPacket);
impl_try_from_packet!(Pause, PausePacket);
impl_try_from_packet!(Publish, PublishPacket);
impl_try_from_packet!(CloseStream, CloseStreamPacket);
impl_try_from_packet!(OnStatus, OnStatusPacket);
impl_try_from_packet!(OnBWDone, OnBWDonePacket);
impl_try_from_packet!(OnMetaData, OnMetaDataPacket);
impl_try_from_packet!(SetChunkSize, SetChunkSizePacket);
impl_try_from_packet!(Acknowledgement, AcknowledgementPacket);
impl_try_from_packet!(UserControl, UserControlPacket);
impl_try_from_packet!(SetWindowAckSize, SetWindowAckSizePacket);
impl_try_from_packet!(SetPeerBandwidth, SetPeerBandwidthPacket);
impl_try_from_packet!(Raw, RawPacket);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Amf0Error;

    fn encode_to_vec(packet: &RtmpPacket) -> Vec<u8> {
        let mut buf = ByteBuffer::with_capacity(packet.size());
        packet.encode(&mut buf).unwrap();
        let bytes = buf.into_bytes();
        assert_eq!(bytes.len(), packet.size(), "encode must produce size() bytes");
        bytes.to_vec()
    }

    fn command_header(message_type: u8) -> MessageHeader {
        let mut header = MessageHeader::default();
        header.message_type = message_type;
        header
    }

    fn no_requests() -> HashMap<u64, String> {
        HashMap::new()
    }

    #[test]
    fn test_connect_decode() {
        let mut object = Amf0Object::new();
        object
            .set("app", "live")
            .set("tcUrl", "rtmp://1.2.3.4:1935/live");
        let packet = RtmpPacket::ConnectApp(ConnectAppPacket::new(object));
        let payload = encode_to_vec(&packet);

        let decoded = RtmpPacket::decode(
            &command_header(MSG_COMMAND_AMF0),
            &payload,
            &no_requests(),
        )
        .unwrap();

        let connect = ConnectAppPacket::try_from(decoded).unwrap();
        assert_eq!(connect.transaction_id, 1.0);
        assert_eq!(connect.command_object.get_str("app"), Some("live"));
        assert_eq!(
            connect.command_object.get_str("tcUrl"),
            Some("rtmp://1.2.3.4:1935/live")
        );
    }

    #[test]
    fn test_connect_rejects_wrong_transaction_id() {
        let mut buf = ByteBuffer::new();
        let mut codec = Amf0Codec::new(&mut buf);
        codec.write_string("connect").unwrap();
        codec.write_number(7.0).unwrap();
        codec.write_object(&Amf0Object::new()).unwrap();
        buf.reset(0);

        let err = ConnectAppPacket::decode(&mut buf).unwrap_err();
        assert!(matches!(err, Error::Amf0(Amf0Error::Decode(_))));
    }

    #[test]
    fn test_amf3_command_skips_format_prefix() {
        let mut object = Amf0Object::new();
        object.set("app", "vod");
        let inner = encode_to_vec(&RtmpPacket::ConnectApp(ConnectAppPacket::new(object)));
        let mut payload = vec![0x00];
        payload.extend_from_slice(&inner);

        let decoded = RtmpPacket::decode(
            &command_header(MSG_COMMAND_AMF3),
            &payload,
            &no_requests(),
        )
        .unwrap();
        let connect = ConnectAppPacket::try_from(decoded).unwrap();
        assert_eq!(connect.command_object.get_str("app"), Some("vod"));
    }

    #[test]
    fn test_result_resolves_against_requests() {
        let mut requests = HashMap::new();
        requests.insert(2.0f64.to_bits(), CMD_CREATE_STREAM.to_string());

        let res = CreateStreamResPacket {
            transaction_id: 2.0,
            stream_id: 1.0,
        };
        let payload = encode_to_vec(&RtmpPacket::CreateStreamRes(res));

        let decoded =
            RtmpPacket::decode(&command_header(MSG_COMMAND_AMF0), &payload, &requests).unwrap();
        let res = CreateStreamResPacket::try_from(decoded).unwrap();
        assert_eq!(res.stream_id, 1.0);

        // without the table the same payload is opaque
        let decoded =
            RtmpPacket::decode(&command_header(MSG_COMMAND_AMF0), &payload, &no_requests())
                .unwrap();
        assert!(matches!(decoded, RtmpPacket::Raw(_)));
    }

    #[test]
    fn test_unknown_command_is_raw() {
        let mut buf = ByteBuffer::new();
        let mut codec = Amf0Codec::new(&mut buf);
        codec.write_string("totallyMadeUp").unwrap();
        codec.write_number(9.0).unwrap();
        let payload = buf.into_bytes();

        let decoded = RtmpPacket::decode(
            &command_header(MSG_COMMAND_AMF0),
            &payload,
            &no_requests(),
        )
        .unwrap();
        match decoded {
            RtmpPacket::Raw(raw) => assert_eq!(raw.payload, payload),
            other => panic!("expected raw, got {}", other.kind()),
        }
    }

    #[test]
    fn test_unknown_message_type_is_raw() {
        let decoded = RtmpPacket::decode(
            &command_header(MSG_AUDIO),
            &[0xAF, 0x01, 0x02],
            &no_requests(),
        )
        .unwrap();
        match decoded {
            RtmpPacket::Raw(raw) => {
                assert_eq!(raw.message_type, MSG_AUDIO);
                assert_eq!(&raw.payload[..], &[0xAF, 0x01, 0x02]);
            }
            other => panic!("expected raw, got {}", other.kind()),
        }
    }

    #[test]
    fn test_control_packets_roundtrip() {
        let cases: Vec<(RtmpPacket, u8, u32)> = vec![
            (
                RtmpPacket::SetChunkSize(SetChunkSizePacket { chunk_size: 60_000 }),
                MSG_SET_CHUNK_SIZE,
                CID_PROTOCOL_CONTROL,
            ),
            (
                RtmpPacket::Acknowledgement(AcknowledgementPacket { sequence_number: 12345 }),
                MSG_ACKNOWLEDGEMENT,
                CID_PROTOCOL_CONTROL,
            ),
            (
                RtmpPacket::SetWindowAckSize(SetWindowAckSizePacket {
                    ack_window_size: 2_500_000,
                }),
                MSG_WINDOW_ACK_SIZE,
                CID_PROTOCOL_CONTROL,
            ),
            (
                RtmpPacket::SetPeerBandwidth(SetPeerBandwidthPacket {
                    bandwidth: 2_500_000,
                    limit_type: BANDWIDTH_LIMIT_DYNAMIC,
                }),
                MSG_SET_PEER_BANDWIDTH,
                CID_PROTOCOL_CONTROL,
            ),
        ];

        for (packet, message_type, cid) in cases {
            assert_eq!(packet.message_type(), message_type);
            assert_eq!(packet.preferred_cid(), cid);

            let payload = encode_to_vec(&packet);
            let decoded = RtmpPacket::decode(
                &command_header(message_type),
                &payload,
                &no_requests(),
            )
            .unwrap();
            assert_eq!(encode_to_vec(&decoded), payload);
        }
    }

    #[test]
    fn test_user_control_buffer_length_is_longer() {
        let ping = UserControlPacket::ping_response(77);
        assert_eq!(ping.size(), 6);

        let buffer_length = UserControlPacket {
            event_type: UC_SET_BUFFER_LENGTH,
            event_data: 1,
            extra_data: 3000,
        };
        assert_eq!(buffer_length.size(), 10);

        let payload = encode_to_vec(&RtmpPacket::UserControl(buffer_length));
        let decoded = RtmpPacket::decode(
            &command_header(MSG_USER_CONTROL),
            &payload,
            &no_requests(),
        )
        .unwrap();
        let decoded = UserControlPacket::try_from(decoded).unwrap();
        assert_eq!(decoded.extra_data, 3000);
    }

    #[test]
    fn test_command_packets_decode() {
        let play = RtmpPacket::Play(PlayPacket {
            transaction_id: 4.0,
            stream_name: "livestream".into(),
            start: -2.0,
        });
        let payload = encode_to_vec(&play);
        let decoded = RtmpPacket::decode(
            &command_header(MSG_COMMAND_AMF0),
            &payload,
            &no_requests(),
        )
        .unwrap();
        let play = PlayPacket::try_from(decoded).unwrap();
        assert_eq!(play.stream_name, "livestream");
        assert_eq!(play.start, -2.0);

        let publish = RtmpPacket::Publish(PublishPacket {
            transaction_id: 5.0,
            stream_name: "key".into(),
            publish_type: "live".into(),
        });
        let payload = encode_to_vec(&publish);
        let decoded = RtmpPacket::decode(
            &command_header(MSG_COMMAND_AMF0),
            &payload,
            &no_requests(),
        )
        .unwrap();
        let publish = PublishPacket::try_from(decoded).unwrap();
        assert_eq!(publish.stream_name, "key");
        assert_eq!(publish.publish_type, "live");

        let fc = RtmpPacket::FcPublish(FmleStartPacket {
            command_name: CMD_FC_PUBLISH.into(),
            transaction_id: 3.0,
            stream_name: "key".into(),
        });
        let payload = encode_to_vec(&fc);
        let decoded = RtmpPacket::decode(
            &command_header(MSG_COMMAND_AMF0),
            &payload,
            &no_requests(),
        )
        .unwrap();
        assert!(matches!(decoded, RtmpPacket::FcPublish(_)));
    }

    #[test]
    fn test_metadata_unwraps_set_data_frame() {
        let mut metadata = Amf0Object::new();
        metadata.set("width", 1920.0).set("height", 1080.0);

        let mut buf = ByteBuffer::new();
        let mut codec = Amf0Codec::new(&mut buf);
        codec.write_string(CMD_SET_DATA_FRAME).unwrap();
        codec.write_string(CMD_ON_METADATA).unwrap();
        codec.write_ecma_array(&metadata).unwrap();
        let payload = buf.into_bytes();

        let decoded = RtmpPacket::decode(
            &command_header(MSG_DATA_AMF0),
            &payload,
            &no_requests(),
        )
        .unwrap();
        let meta = OnMetaDataPacket::try_from(decoded).unwrap();
        assert_eq!(meta.name, CMD_ON_METADATA);
        assert_eq!(meta.metadata.as_object().unwrap().get_number("width"), Some(1920.0));
    }

    #[test]
    fn test_on_status_helper_order() {
        let packet = OnStatusPacket::status(
            STATUS_LEVEL_STATUS,
            NS_PUBLISH_START,
            "Started publishing stream.",
        );
        let keys: Vec<&str> = packet.data.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![STATUS_LEVEL, STATUS_CODE, STATUS_DESCRIPTION]);
        encode_to_vec(&RtmpPacket::OnStatus(packet));
    }

    #[test]
    fn test_reflect_mismatch() {
        let packet = RtmpPacket::OnBWDone(OnBWDonePacket::new());
        let err = ConnectAppPacket::try_from(packet).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::ReflectMismatch(_))
        ));
    }

    #[test]
    fn test_connect_res_skips_empty_sections() {
        let mut packet = ConnectAppResPacket::new();
        packet.props_set("fmsVer", format!("FMS/{}", SIG_FMS_VERSION));
        packet.props_set("ignored", ""); // empty value never encoded
        packet.info_set(STATUS_CODE, NC_CONNECT_SUCCESS);

        assert_eq!(packet.props.len(), 1);
        let payload = encode_to_vec(&RtmpPacket::ConnectAppRes(packet));

        let mut buf = ByteBuffer::from_slice(&payload);
        let decoded = ConnectAppResPacket::decode(&mut buf).unwrap();
        assert_eq!(decoded.command_name, CMD_RESULT);
        assert_eq!(decoded.props.get_str("fmsVer"), Some("FMS/3,5,3,888"));
        assert_eq!(decoded.info.get_str(STATUS_CODE), Some(NC_CONNECT_SUCCESS));
    }
}

//! Unified error types for rtmp-core

use std::fmt;
use std::io;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all RTMP operations
#[derive(Debug)]
pub enum Error {
    /// I/O error during network operations
    Io(io::Error),
    /// RTMP protocol violation
    Protocol(ProtocolError),
    /// AMF0 encoding/decoding error
    Amf0(Amf0Error),
    /// Handshake failure
    Handshake(HandshakeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Amf0(e) => write!(f, "AMF0 error: {}", e),
            Error::Handshake(e) => write!(f, "Handshake error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<Amf0Error> for Error {
    fn from(err: Amf0Error) -> Self {
        Error::Amf0(err)
    }
}

impl From<HandshakeError> for Error {
    fn from(err: HandshakeError) -> Self {
        Error::Handshake(err)
    }
}

/// Protocol-level errors
///
/// Only `UnknownMessageType` is recovered internally (the message surfaces
/// as a `Raw` packet); everything else terminates the session.
#[derive(Debug)]
pub enum ProtocolError {
    /// Buffer exhausted before a required field
    ShortRead { needed: usize, have: usize },
    /// Chunk fmt/CID invariant violated
    ChunkStart(&'static str),
    /// Payload length changed mid-message
    PacketSize { expected: u32, actual: u32 },
    /// Message or chunk size outside the accepted range
    InvalidMsgSize(i64),
    /// Message type the packet registry does not recognise
    UnknownMessageType(u8),
    /// Socket write made no progress
    PartialWrite { expected: usize, written: usize },
    /// Expected packet type does not match the decoded packet
    ReflectMismatch(&'static str),
    /// Connect request carried no tcUrl
    MissingTcUrl,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::ShortRead { needed, have } => {
                write!(f, "short read: need {} bytes, have {}", needed, have)
            }
            ProtocolError::ChunkStart(msg) => write!(f, "chunk start: {}", msg),
            ProtocolError::PacketSize { expected, actual } => {
                write!(f, "payload length mismatch: expected {}, got {}", expected, actual)
            }
            ProtocolError::InvalidMsgSize(size) => write!(f, "invalid message size: {}", size),
            ProtocolError::UnknownMessageType(t) => write!(f, "unknown message type: {}", t),
            ProtocolError::PartialWrite { expected, written } => {
                write!(f, "partial write: expected {}, wrote {}", expected, written)
            }
            ProtocolError::ReflectMismatch(wanted) => {
                write!(f, "packet is not a {}", wanted)
            }
            ProtocolError::MissingTcUrl => write!(f, "connect request must specify tcUrl"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// AMF0 encoding/decoding errors
#[derive(Debug)]
pub enum Amf0Error {
    /// Unknown or unsupported AMF0 marker
    Invalid(u8),
    /// Marker or structure mismatch while decoding a value
    Decode(&'static str),
    /// Length mismatch or unsupported value while encoding
    Encode(&'static str),
}

impl fmt::Display for Amf0Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amf0Error::Invalid(m) => write!(f, "unsupported AMF0 marker: 0x{:02x}", m),
            Amf0Error::Decode(msg) => write!(f, "decode failed: {}", msg),
            Amf0Error::Encode(msg) => write!(f, "encode failed: {}", msg),
        }
    }
}

impl std::error::Error for Amf0Error {}

/// Handshake-specific errors
#[derive(Debug)]
pub enum HandshakeError {
    /// C0 carried a version other than 0x03
    BadVersion(u8),
    /// Peer closed the connection mid-exchange
    TruncatedExchange,
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::BadVersion(v) => write!(f, "invalid RTMP version: {}", v),
            HandshakeError::TruncatedExchange => write!(f, "connection closed during handshake"),
        }
    }
}

impl std::error::Error for HandshakeError {}

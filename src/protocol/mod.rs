//! RTMP protocol machinery: buffer, transport, handshake, chunk codec,
//! packet registry and the engine tying them together

pub mod buffer;
pub mod chunk;
pub mod constants;
pub mod engine;
pub mod handshake;
pub mod message;
pub mod packet;
pub mod transport;

pub use buffer::ByteBuffer;
pub use chunk::{ChunkDecoder, ChunkEncoder};
pub use engine::Protocol;
pub use message::{Message, MessageHeader};
pub use packet::RtmpPacket;
pub use transport::Transport;

//! rtmp-core: RTMP server-side protocol engine
//!
//! This library turns a raw byte-oriented connection into a stream of
//! typed RTMP messages, and back:
//! - Chunk stream codec: inbound demultiplexer with per-CID state and
//!   partial-message reassembly, outbound framer
//! - AMF0 value codec with insertion-ordered objects
//! - Message layer: packet registry, ACK-window bookkeeping,
//!   `expect_message` for typed receives
//! - Simple handshake (the digest variant is a caller concern)
//!
//! The engine is generic over any `AsyncRead + AsyncWrite` transport and
//! is strictly single-task per connection. Listening, authentication,
//! tcUrl resolution and media semantics all live with the caller.
//!
//! # Example: accepting a publisher
//!
//! ```no_run
//! use rtmp_core::{Result, ServerSession};
//! use rtmp_core::protocol::constants::BANDWIDTH_LIMIT_DYNAMIC;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let listener = TcpListener::bind("0.0.0.0:1935").await?;
//!     let (socket, _) = listener.accept().await?;
//!
//!     let mut session = ServerSession::new(socket);
//!     session.handshake().await?;
//!     let request = session.connect_app().await?;
//!     println!("client connecting to {}", request.tc_url);
//!
//!     session.set_window_ack_size(2_500_000).await?;
//!     session.set_peer_bandwidth(2_500_000, BANDWIDTH_LIMIT_DYNAMIC).await?;
//!     session.response_connect_app(&request, None, &[]).await?;
//!
//!     // past this point, drive session.protocol() directly
//!     loop {
//!         let msg = session.protocol().recv_message().await?;
//!         println!("message type {}", msg.header.message_type);
//!     }
//! }
//! ```

pub mod amf;
pub mod error;
pub mod protocol;
pub mod session;

pub use amf::{Amf0Codec, Amf0Object, Amf0Value};
pub use error::{Error, Result};
pub use protocol::engine::Protocol;
pub use protocol::message::{Message, MessageHeader};
pub use protocol::packet::RtmpPacket;
pub use session::{ConnectRequest, ServerSession};

//! RTMP protocol constants
//!
//! Reference: Adobe RTMP Specification (December 2012)
//! Reference: RFC 7425 - Adobe's RTMP (Informational)

/// RTMP version number (always 3 for standard RTMP)
pub const RTMP_VERSION: u8 = 3;

/// Default RTMP port
pub const RTMP_PORT: u16 = 1935;

/// Handshake packet size (C1/C2/S1/S2)
pub const HANDSHAKE_SIZE: usize = 1536;

/// Default chunk size (per RTMP spec)
pub const DEFAULT_CHUNK_SIZE: u32 = 128;

/// Chunk size the server proposes for outbound data
pub const OUT_CHUNK_SIZE: u32 = 60_000;

/// Maximum chunk size a SetChunkSize message may carry
pub const MAX_CHUNK_SIZE: u32 = 0x7FFF_FFFF;

/// Timestamp sentinel: a 24-bit field of this value means a 4-byte
/// extended timestamp follows the message header
pub const EXTENDED_TIMESTAMP: u32 = 0xFF_FFFF;

/// Bytes pulled from the transport per refill of the read buffer
pub const SOCKET_READ_SIZE: usize = 4096;

/// Max encoded chunk header: 1-byte basic + 11-byte message header
/// + 4-byte extended timestamp
pub const MAX_FMT0_HEADER_SIZE: usize = 16;

/// Max fmt-3 chunk header: 1-byte basic + 4-byte extended timestamp
pub const MAX_FMT3_HEADER_SIZE: usize = 5;

/// Message header sizes indexed by chunk fmt
pub const MESSAGE_HEADER_SIZES: [usize; 4] = [11, 7, 3, 0];

// ============================================================================
// Chunk Stream IDs (CID)
// RTMP spec section 5.3.1.1; hints only, the peer may pick its own
// ============================================================================

/// Protocol control messages (SetChunkSize, Acknowledgement, etc.)
pub const CID_PROTOCOL_CONTROL: u32 = 2;

/// Commands over the NetConnection (connect, createStream, etc.)
pub const CID_OVER_CONNECTION: u32 = 3;

/// Second connection-level channel (metadata and the like)
pub const CID_OVER_CONNECTION2: u32 = 4;

/// Commands over a NetStream (play, publish, onStatus)
pub const CID_OVER_STREAM: u32 = 5;

/// Video data
pub const CID_VIDEO: u32 = 6;

/// Audio data
pub const CID_AUDIO: u32 = 7;

// ============================================================================
// Chunk header format types (fmt field)
// RTMP spec section 5.3.1.2
// ============================================================================

/// Type 0: full header (11 bytes) - timestamp, length, type, stream ID
pub const CHUNK_FMT_0: u8 = 0;

/// Type 1: no stream ID (7 bytes)
pub const CHUNK_FMT_1: u8 = 1;

/// Type 2: timestamp delta only (3 bytes)
pub const CHUNK_FMT_2: u8 = 2;

/// Type 3: no header fields (0 bytes)
pub const CHUNK_FMT_3: u8 = 3;

// ============================================================================
// Message type IDs
// RTMP spec section 5.4
// ============================================================================

/// Set Chunk Size (1) - protocol control
pub const MSG_SET_CHUNK_SIZE: u8 = 1;

/// Abort Message (2) - protocol control
pub const MSG_ABORT: u8 = 2;

/// Acknowledgement (3) - protocol control
pub const MSG_ACKNOWLEDGEMENT: u8 = 3;

/// User Control Message (4) - protocol control
pub const MSG_USER_CONTROL: u8 = 4;

/// Window Acknowledgement Size (5) - protocol control
pub const MSG_WINDOW_ACK_SIZE: u8 = 5;

/// Set Peer Bandwidth (6) - protocol control
pub const MSG_SET_PEER_BANDWIDTH: u8 = 6;

/// Audio Message (8)
pub const MSG_AUDIO: u8 = 8;

/// Video Message (9)
pub const MSG_VIDEO: u8 = 9;

/// AMF3 Data Message (15)
pub const MSG_DATA_AMF3: u8 = 15;

/// AMF3 Command Message (17)
pub const MSG_COMMAND_AMF3: u8 = 17;

/// AMF0 Data Message (18) - @setDataFrame, onMetaData
pub const MSG_DATA_AMF0: u8 = 18;

/// AMF0 Command Message (20) - connect, play, publish, etc.
pub const MSG_COMMAND_AMF0: u8 = 20;

// ============================================================================
// User Control event types
// RTMP spec section 5.4.1
// ============================================================================

/// Stream Begin - server sends when stream becomes functional
pub const UC_STREAM_BEGIN: u16 = 0;

/// Stream EOF - server sends when playback ends
pub const UC_STREAM_EOF: u16 = 1;

/// Stream Dry - no more data available
pub const UC_STREAM_DRY: u16 = 2;

/// Set Buffer Length - client tells server buffer size
pub const UC_SET_BUFFER_LENGTH: u16 = 3;

/// Stream Is Recorded
pub const UC_STREAM_IS_RECORDED: u16 = 4;

/// Ping Request - server pings client
pub const UC_PING_REQUEST: u16 = 6;

/// Ping Response - client responds to ping
pub const UC_PING_RESPONSE: u16 = 7;

// ============================================================================
// Peer bandwidth limit types
// RTMP spec section 5.4.5
// ============================================================================

/// Hard limit - peer should limit output to this bandwidth
pub const BANDWIDTH_LIMIT_HARD: u8 = 0;

/// Soft limit - peer can exceed if it has excess bandwidth
pub const BANDWIDTH_LIMIT_SOFT: u8 = 1;

/// Dynamic - hard or soft depending on prior state
pub const BANDWIDTH_LIMIT_DYNAMIC: u8 = 2;

// ============================================================================
// Command names
// ============================================================================

pub const CMD_CONNECT: &str = "connect";
pub const CMD_CREATE_STREAM: &str = "createStream";
pub const CMD_CLOSE_STREAM: &str = "closeStream";
pub const CMD_PLAY: &str = "play";
pub const CMD_PAUSE: &str = "pause";
pub const CMD_PUBLISH: &str = "publish";
pub const CMD_RELEASE_STREAM: &str = "releaseStream";
pub const CMD_FC_PUBLISH: &str = "FCPublish";
pub const CMD_FC_UNPUBLISH: &str = "FCUnpublish";

/// Response commands
pub const CMD_RESULT: &str = "_result";
pub const CMD_ERROR: &str = "_error";

/// Status notifications
pub const CMD_ON_STATUS: &str = "onStatus";
pub const CMD_ON_BW_DONE: &str = "onBWDone";

/// Data commands
pub const CMD_SET_DATA_FRAME: &str = "@setDataFrame";
pub const CMD_ON_METADATA: &str = "onMetaData";

// ============================================================================
// onStatus field names and status codes
// ============================================================================

pub const STATUS_LEVEL: &str = "level";
pub const STATUS_CODE: &str = "code";
pub const STATUS_DESCRIPTION: &str = "description";
pub const STATUS_DETAILS: &str = "details";
pub const STATUS_CLIENT_ID: &str = "clientid";

pub const STATUS_LEVEL_STATUS: &str = "status";
pub const STATUS_LEVEL_ERROR: &str = "error";

pub const NC_CONNECT_SUCCESS: &str = "NetConnection.Connect.Success";
pub const NC_CONNECT_REJECTED: &str = "NetConnection.Connect.Rejected";
pub const NS_PLAY_RESET: &str = "NetStream.Play.Reset";
pub const NS_PLAY_START: &str = "NetStream.Play.Start";
pub const NS_PAUSE_NOTIFY: &str = "NetStream.Pause.Notify";
pub const NS_UNPAUSE_NOTIFY: &str = "NetStream.Unpause.Notify";
pub const NS_PUBLISH_START: &str = "NetStream.Publish.Start";
pub const NS_DATA_START: &str = "NetStream.Data.Start";
pub const NS_UNPUBLISH_SUCCESS: &str = "NetStream.Unpublish.Success";

// ============================================================================
// Signatures the server advertises
// ============================================================================

/// FMS version string sent in the connect response
pub const SIG_FMS_VERSION: &str = "3,5,3,888";

/// AMF version the server speaks
pub const SIG_AMF0_VERSION: u8 = 0;

/// Default client id string
pub const SIG_CLIENT_ID: &str = "ASAICiss";

/// Stream id the server hands out for createStream
pub const DEFAULT_STREAM_ID: u32 = 1;

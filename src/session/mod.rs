//! Server-facing session helpers
//!
//! `ServerSession` drives the opening sequence every RTMP server runs
//! after accepting a connection: handshake, connect request, window and
//! bandwidth setup, connect response. It owns the `Protocol` engine and
//! exposes it for everything past the opening exchange.
//!
//! tcUrl/vhost/app resolution is deliberately not here: the raw fields
//! of the connect object are surfaced and the caller does its own URL
//! munging.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::amf::{Amf0Object, Amf0Value};
use crate::error::{ProtocolError, Result};
use crate::protocol::constants::*;
use crate::protocol::engine::Protocol;
use crate::protocol::packet::{
    ConnectAppPacket, ConnectAppResPacket, OnBWDonePacket, RtmpPacket, SetPeerBandwidthPacket,
    SetWindowAckSizePacket,
};

/// The client's connect request, fields lifted verbatim from the
/// command object
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// rtmp://host:port/app, always present
    pub tc_url: String,
    pub page_url: Option<String>,
    pub swf_url: Option<String>,
    /// 0 for AMF0, 3 for AMF3
    pub object_encoding: u8,
    /// The full command object, for fields the caller wants itself
    pub command_object: Amf0Object,
}

/// Server side of one RTMP connection
#[derive(Debug)]
pub struct ServerSession<T> {
    protocol: Protocol<T>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> ServerSession<T> {
    pub fn new(io: T) -> Self {
        Self {
            protocol: Protocol::new(io),
        }
    }

    /// Handshake with the client (simple variant)
    pub async fn handshake(&mut self) -> Result<()> {
        self.protocol.handshake().await
    }

    /// Wait for the client's connect request and lift out its fields.
    /// A connect without tcUrl is rejected.
    pub async fn connect_app(&mut self) -> Result<ConnectRequest> {
        let (_, packet) = self.protocol.expect_message::<ConnectAppPacket>().await?;
        let object = packet.command_object;

        let tc_url = object
            .get_str("tcUrl")
            .ok_or(ProtocolError::MissingTcUrl)?
            .to_string();
        let page_url = object.get_str("pageUrl").map(str::to_string);
        let swf_url = object.get_str("swfUrl").map(str::to_string);
        let object_encoding = object
            .get_number("objectEncoding")
            .unwrap_or(SIG_AMF0_VERSION as f64) as u8;

        tracing::debug!(tc_url = %tc_url, object_encoding, "client connect");

        Ok(ConnectRequest {
            tc_url,
            page_url,
            swf_url,
            object_encoding,
            command_object: object,
        })
    }

    /// Tell the client our acknowledgement window
    pub async fn set_window_ack_size(&mut self, ack_size: u32) -> Result<()> {
        let packet = RtmpPacket::SetWindowAckSize(SetWindowAckSizePacket {
            ack_window_size: ack_size,
        });
        self.protocol.send_packet(&packet, 0).await
    }

    /// Cap the client's outbound bandwidth
    pub async fn set_peer_bandwidth(&mut self, bandwidth: u32, limit_type: u8) -> Result<()> {
        let packet = RtmpPacket::SetPeerBandwidth(SetPeerBandwidthPacket {
            bandwidth,
            limit_type,
        });
        self.protocol.send_packet(&packet, 0).await
    }

    /// Answer the connect request with `_result`
    ///
    /// Property order matters on the wire: FMLE hangs when it differs
    /// from the reference layout (fmsVer, capabilities, mode / level,
    /// code, description, objectEncoding, data).
    pub async fn response_connect_app(
        &mut self,
        request: &ConnectRequest,
        server_ip: Option<&str>,
        extra_data: &[(&str, &str)],
    ) -> Result<()> {
        let mut data = Amf0Object::new();
        data.set("version", SIG_FMS_VERSION);
        if let Some(ip) = server_ip {
            data.set("server_ip", ip);
        }
        for (key, value) in extra_data {
            data.set(*key, *value);
        }

        let mut packet = ConnectAppResPacket::new();
        packet
            .props_set("fmsVer", format!("FMS/{}", SIG_FMS_VERSION))
            .props_set("capabilities", 127.0)
            .props_set("mode", 1.0);
        packet
            .info_set(STATUS_LEVEL, STATUS_LEVEL_STATUS)
            .info_set(STATUS_CODE, NC_CONNECT_SUCCESS)
            .info_set(STATUS_DESCRIPTION, "Connection succeeded")
            .info_set("objectEncoding", request.object_encoding as f64)
            .info_set("data", Amf0Value::EcmaArray(data));

        self.protocol
            .send_packet(&RtmpPacket::ConnectAppRes(packet), 0)
            .await
    }

    /// Tell the client the bandwidth probe is over
    pub async fn on_bw_done(&mut self) -> Result<()> {
        self.protocol
            .send_packet(&RtmpPacket::OnBWDone(OnBWDonePacket::new()), 0)
            .await
    }

    /// The underlying engine, for everything past the opening exchange
    pub fn protocol(&mut self) -> &mut Protocol<T> {
        &mut self.protocol
    }

    pub fn into_protocol(self) -> Protocol<T> {
        self.protocol
    }
}

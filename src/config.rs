//! Runtime configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::{HEADER_SIZE, MAX_PACKET_SIZE};

/// When packet payloads are zlib-compressed.
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    pub enabled: bool,
    /// Payloads shorter than this go out raw. Default: 256.
    pub threshold: usize,
    /// zlib level 0-9. Default: 1.
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 256,
            level: 1,
        }
    }
}

/// Per-connection framing and liveness settings.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Bound on a whole packet, header included.
    pub max_packet_size: usize,
    /// Bytes pulled from the socket per `recv` call.
    pub max_receive_size: usize,
    /// Bound on an inflated packet payload.
    pub max_decompressed_size: usize,
    pub compression: CompressionConfig,
    /// Send a heartbeat after this long without outbound traffic.
    pub heartbeat_interval: Option<Duration>,
    /// Drop the peer after this long without inbound traffic.
    pub idle_timeout: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_packet_size: MAX_PACKET_SIZE,
            max_receive_size: 8192,
            max_decompressed_size: 64 * 1024,
            compression: CompressionConfig::default(),
            heartbeat_interval: Some(Duration::from_secs(5)),
            idle_timeout: None,
        }
    }
}

impl ChannelConfig {
    /// Largest encoded envelope that fits a packet on its own.
    #[inline]
    pub fn max_envelope_size(&self) -> usize {
        self.max_packet_size.saturating_sub(HEADER_SIZE + 2)
    }
}

/// Multiplexer settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub max_connections: usize,
    pub events_capacity: usize,
    /// SO_SNDBUF/SO_RCVBUF for accepted sockets (unix only).
    pub socket_buffer_size: Option<usize>,
    pub channel: ChannelConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9999)),
            max_connections: 1024,
            events_capacity: 1024,
            socket_buffer_size: Some(256 * 1024),
            channel: ChannelConfig::default(),
        }
    }
}

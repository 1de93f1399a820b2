//! Network Layer: channels dan non-blocking multiplexer
//!
//! Menggunakan mio untuk readiness polling (epoll/kqueue/IOCP).
//!
//! Fitur:
//! - Satu loop kooperatif untuk banyak koneksi
//! - Packet batching (`MULTI_DATA`) untuk mengurangi syscall overhead
//! - Heartbeat dan idle timeout per channel

mod channel;
mod client;
mod handoff;
mod server;
mod socket;

pub use channel::{Channel, ChannelStats};
pub use client::{Client, ClientEvent, ConnectionState};
pub use handoff::OutboundHandle;
pub use server::{Server, ServerEvent, ServerStats};

use crate::error::ChannelError;

/// Identifies one live connection for its whole lifetime.
pub type ConnectionId = usize;

/// Why a channel was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Zero-byte read or write.
    PeerClosed,
    /// Idle timeout expired.
    TimedOut,
    /// Framing error on the inbound stream.
    ProtocolError,
    /// Socket error.
    TransportError,
    /// Our side closed it.
    Local,
}

impl DisconnectReason {
    pub fn from_error(err: &ChannelError) -> Self {
        match err {
            ChannelError::Disconnected => Self::PeerClosed,
            ChannelError::TimedOut => Self::TimedOut,
            ChannelError::Protocol(_) | ChannelError::EnvelopeTooLarge { .. } => {
                Self::ProtocolError
            }
            ChannelError::Io(_) => Self::TransportError,
        }
    }
}

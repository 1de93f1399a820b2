//! Error taxonomy.
//!
//! Framing and transport errors end a channel; capacity errors end one send;
//! routing errors end one request. None of them escape the multiplexer.

use std::io;

use crate::core::BufferError;

/// Framing errors: the byte stream cannot be trusted any more.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    #[error("bad packet type {0}")]
    BadPacketType(u8),

    #[error("bad compression method {0}")]
    BadCompressionMethod(u8),

    #[error("packet length mismatch: declared {declared} bytes, got {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("decompressed payload exceeds {max} bytes")]
    DecompressedTooLarge { max: usize },

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Capacity error: the packet cannot fit the size bound.
    #[error("packet of {size} bytes exceeds maximum {max}")]
    PacketTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Per-channel failures.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Peer closed or zero-byte I/O.
    #[error("peer disconnected")]
    Disconnected,

    /// Nothing received within the idle timeout.
    #[error("peer timed out")]
    TimedOut,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The envelope can never be sent; the channel stays usable.
    #[error("envelope of {size} bytes exceeds per-packet maximum {max}")]
    EnvelopeTooLarge { size: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ChannelError {
    /// Whether this error ends the channel.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ChannelError::EnvelopeTooLarge { .. })
    }
}

/// Startup-time registration failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("route uri must not be empty")]
    EmptyUri,

    #[error("route {0:?} is already registered")]
    DuplicateRoute(String),
}

/// A handler could not produce a result. Answered with status 500.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// Request arguments do not match the handler's signature. Answered with 400.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("arguments must be a JSON object")]
    NotAnObject,

    #[error("invalid arg {0:?}")]
    UnknownArgument(String),

    #[error("missing arg {0:?}")]
    MissingArgument(String),
}

//! Hexlink - message channels dan RPC untuk game backend
//!
//! Arsitektur:
//! - Core: bounded byte buffers (`ReadBuffer`, `WriteBuffer`)
//! - Protocol: packet framing, zlib, packing `MULTI_DATA`, envelope
//! - Network: `Channel` per koneksi, multiplexer `Server`/`Client` (mio)
//! - RPC: `Router` URI dengan status 200/400/404/500

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod network;
pub mod protocol;
pub mod rpc;

pub use config::{ChannelConfig, CompressionConfig, ServerConfig};
pub use error::{BindError, ChannelError, HandlerError, ProtocolError, RouterError};
pub use network::{Channel, Client, ConnectionId, DisconnectReason, Server};
pub use protocol::{status, Envelope};
pub use rpc::{Request, Router, RpcClient, RpcServer, Service, Signature};

//! RPC Layer: URI-routed request/reply di atas multiplexer
//!
//! Alur:
//! - Client mengirim envelope dengan `id` dan `uri`
//! - `Router` memilih handler dan selalu menghasilkan tepat satu reply
//! - Reply membawa `reply_to` dan `status_code`, tidak pernah di-route lagi

mod client;
mod request;
mod router;
mod server;
mod service;
mod signature;

pub use crate::error::{BindError, HandlerError, RouterError};
pub use client::{Reply, RpcClient, RpcEvent};
pub use request::Request;
pub use router::{DuplicatePolicy, Handler, HandlerResult, Router};
pub use server::RpcServer;
pub use service::Service;
pub use signature::Signature;

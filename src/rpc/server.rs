//! RPC server: multiplexer + router dalam satu loop
//!
//! Setiap envelope masuk di-dispatch langsung di loop poll, reply-nya
//! diantrekan ke Channel asal lalu di-flush di cycle yang sama.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::router::Router;
use super::service::Service;
use crate::config::ServerConfig;
use crate::error::{ChannelError, RouterError};
use crate::network::{ConnectionId, Server, ServerEvent};
use crate::protocol::{status, Envelope};

/// Multiplexer plus router: every inbound envelope is dispatched in the
/// poll loop and its reply queued on the originating channel.
pub struct RpcServer {
    server: Server,
    router: Router,
}

impl RpcServer {
    pub fn bind(config: ServerConfig) -> io::Result<Self> {
        Ok(Self::with_router(Server::bind(config)?, Router::new()))
    }

    pub fn with_router(server: Server, router: Router) -> Self {
        Self { server, router }
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut Server {
        &mut self.server
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn add_service<S: Service>(&mut self, service: &S) -> Result<(), RouterError> {
        service.register(&mut self.router)
    }

    /// One cycle: poll, dispatch, queue replies, flush.
    ///
    /// Returns the connect/disconnect events; messages are consumed here.
    pub fn poll(&mut self, timeout: Option<Duration>) -> io::Result<Vec<ServerEvent>> {
        let mut lifecycle = Vec::new();
        let mut replies = 0usize;

        for event in self.server.poll(timeout)? {
            match event {
                ServerEvent::Message { id, envelope } => {
                    let Some(reply) = self.router.dispatch(id, envelope) else {
                        continue;
                    };
                    match self.queue_reply(id, &reply) {
                        Ok(()) => replies += 1,
                        Err(ChannelError::Disconnected) => {
                            debug!(id, "Reply dropped, connection gone")
                        }
                        Err(e) => warn!(id, error = %e, "Reply could not be queued"),
                    }
                }
                other => lifecycle.push(other),
            }
        }

        if replies > 0 {
            lifecycle.extend(self.server.flush());
        }
        Ok(lifecycle)
    }

    /// Queue a reply. One that can never fit a packet is replaced by a 500
    /// carrying the capacity error.
    fn queue_reply(&mut self, id: ConnectionId, reply: &Envelope) -> Result<(), ChannelError> {
        match self.server.send(id, reply) {
            Err(e @ ChannelError::EnvelopeTooLarge { .. }) => {
                error!(id, reply_to = ?reply.reply_to, error = %e, "Reply too large");
                let reply_to = reply.reply_to.unwrap_or_default();
                let fallback = Envelope::reply(
                    reply_to,
                    status::HANDLER_FAILED,
                    Some(e.to_string().into_bytes()),
                );
                self.server.send(id, &fallback)
            }
            other => other,
        }
    }

    /// Poll until `running` is cleared, then shut the server down.
    pub fn run(&mut self, running: &AtomicBool, poll_interval: Duration) -> io::Result<()> {
        info!(routes = self.router.len(), "RPC server running");
        while running.load(Ordering::Relaxed) {
            self.poll(Some(poll_interval))?;
        }
        self.server.shutdown();
        Ok(())
    }
}

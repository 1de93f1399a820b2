//! Server multiplexer dengan event-driven I/O
//!
//! Menggunakan mio untuk non-blocking readiness polling atas listener dan
//! semua socket client dalam satu loop kooperatif. Tidak ada operasi yang
//! blocking: socket yang belum siap dicoba lagi di cycle berikutnya.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use tracing::{debug, error, info, warn};

use super::channel::Channel;
use super::handoff::{HandoffReceiver, OutboundHandle};
use super::socket::tune_stream;
use super::{ConnectionId, DisconnectReason};
use crate::config::ServerConfig;
use crate::error::ChannelError;
use crate::protocol::Envelope;

const SERVER_TOKEN: Token = Token(0);
const WAKER_TOKEN: Token = Token(1);
const FIRST_CONNECTION_TOKEN: usize = 2;

/// Lifecycle and traffic events from one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Connected {
        id: ConnectionId,
        addr: SocketAddr,
    },
    Disconnected {
        id: ConnectionId,
        reason: DisconnectReason,
    },
    Message {
        id: ConnectionId,
        envelope: Envelope,
    },
}

/// Aggregate counters across all connections.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServerStats {
    pub connections_total: u64,
    pub connections_active: u64,
    pub connections_rejected: u64,
    pub envelopes_received: u64,
    pub envelopes_queued: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

/// One live client socket.
struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
    channel: Channel,
    /// Last write did not hit `WouldBlock`
    writable: bool,
}

/// Multi-client multiplexer.
///
/// Owns the connection registry; only its own accept/poll/disconnect logic
/// mutates it.
pub struct Server {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    config: ServerConfig,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    waker: Arc<Waker>,
    handoff_tx: mpsc::Sender<(ConnectionId, Envelope)>,
    handoff_rx: HandoffReceiver,
    /// Events raised outside `poll` (owner-initiated disconnects)
    pending_events: Vec<ServerEvent>,
    stats: ServerStats,
}

impl Server {
    /// Bind and start listening.
    pub fn bind(config: ServerConfig) -> io::Result<Self> {
        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(config.bind_addr)?;
        poll.registry()
            .register(&mut listener, SERVER_TOKEN, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER_TOKEN)?);
        let (handoff_tx, handoff_rx) = mpsc::channel();

        info!(addr = %listener.local_addr()?, "Server listening");

        Ok(Self {
            poll,
            events: Events::with_capacity(config.events_capacity),
            listener,
            connections: HashMap::with_capacity(config.max_connections),
            config,
            next_token: FIRST_CONNECTION_TOKEN,
            waker,
            handoff_tx,
            handoff_rx,
            pending_events: Vec::new(),
            stats: ServerStats::default(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn stats(&self) -> ServerStats {
        self.stats
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&Token(id))
    }

    pub fn connection_ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.keys().map(|token| token.0)
    }

    pub fn peer_addr(&self, id: ConnectionId) -> Option<SocketAddr> {
        self.connections.get(&Token(id)).map(|conn| conn.addr)
    }

    /// Read-only view of a connection's channel.
    pub fn channel(&self, id: ConnectionId) -> Option<&Channel> {
        self.connections.get(&Token(id)).map(|conn| &conn.channel)
    }

    /// Handle for queueing envelopes from worker threads.
    pub fn outbound_handle(&self) -> OutboundHandle {
        OutboundHandle::new(self.handoff_tx.clone(), Arc::clone(&self.waker))
    }

    /// One cooperative cycle.
    ///
    /// Waits at most `timeout` for readiness (not at all if output is
    /// already sendable), accepts pending clients, pumps every ready
    /// direction of every ready socket, applies hand-offs and heartbeats, and
    /// flushes writable channels.
    pub fn poll(&mut self, timeout: Option<Duration>) -> io::Result<Vec<ServerEvent>> {
        let mut out = std::mem::take(&mut self.pending_events);

        let timeout = if self.has_sendable_output() || !out.is_empty() {
            Some(Duration::ZERO)
        } else {
            timeout
        };
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(out),
            Err(e) => return Err(e),
        }

        let mut accept = false;
        let mut ready = Vec::new();
        for event in self.events.iter() {
            match event.token() {
                SERVER_TOKEN => accept = true,
                WAKER_TOKEN => {}
                token => ready.push((
                    token,
                    event.is_readable() || event.is_read_closed() || event.is_error(),
                    event.is_writable() || event.is_error(),
                )),
            }
        }

        if accept {
            self.accept_connections(&mut out);
        }

        for (token, readable, writable) in ready {
            if readable {
                self.handle_read(token, &mut out);
            }
            if writable {
                if let Some(conn) = self.connections.get_mut(&token) {
                    conn.writable = true;
                }
            }
        }

        self.apply_handoffs();
        self.tick(Instant::now(), &mut out);
        self.flush_into(&mut out);
        Ok(out)
    }

    /// Push queued output of every writable channel to its socket.
    ///
    /// Returns disconnect events for channels whose socket failed.
    pub fn flush(&mut self) -> Vec<ServerEvent> {
        let mut out = Vec::new();
        self.flush_into(&mut out);
        out
    }

    fn has_sendable_output(&self) -> bool {
        self.connections
            .values()
            .any(|conn| conn.writable && conn.channel.has_pending_output())
    }

    fn accept_connections(&mut self, out: &mut Vec<ServerEvent>) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    if self.connections.len() >= self.config.max_connections {
                        warn!(%addr, "Max connections reached, rejecting");
                        self.stats.connections_rejected += 1;
                        continue;
                    }
                    if let Err(e) = tune_stream(&stream, self.config.socket_buffer_size) {
                        warn!(%addr, error = %e, "Failed to tune socket");
                    }

                    let token = Token(self.next_token);
                    self.next_token += 1;
                    if let Err(e) = self.poll.registry().register(
                        &mut stream,
                        token,
                        Interest::READABLE | Interest::WRITABLE,
                    ) {
                        warn!(%addr, error = %e, "Failed to register socket, dropping");
                        continue;
                    }

                    self.connections.insert(
                        token,
                        Connection {
                            stream,
                            addr,
                            channel: Channel::new(self.config.channel.clone()),
                            writable: false,
                        },
                    );
                    self.stats.connections_total += 1;
                    self.stats.connections_active += 1;
                    info!(id = token.0, %addr, "Client connected");
                    out.push(ServerEvent::Connected { id: token.0, addr });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "Accept error");
                    break;
                }
            }
        }
    }

    fn handle_read(&mut self, token: Token, out: &mut Vec<ServerEvent>) {
        let conn = match self.connections.get_mut(&token) {
            Some(c) => c,
            None => return,
        };

        match conn.channel.pump_receive(&mut conn.stream) {
            Ok(n) => {
                self.stats.bytes_received += n as u64;
                for envelope in conn.channel.drain_inbound() {
                    self.stats.envelopes_received += 1;
                    out.push(ServerEvent::Message {
                        id: token.0,
                        envelope,
                    });
                }
            }
            Err(e) => {
                if let ChannelError::Protocol(ref err) = e {
                    error!(id = token.0, error = %err, "Framing error, closing channel");
                }
                self.drop_connection(token, DisconnectReason::from_error(&e), out);
            }
        }
    }

    fn apply_handoffs(&mut self) {
        while let Ok((id, envelope)) = self.handoff_rx.try_recv() {
            match self.connections.get_mut(&Token(id)) {
                Some(conn) => {
                    if let Err(e) = conn.channel.enqueue_outbound(&envelope) {
                        warn!(id, error = %e, "Dropping handed-off envelope");
                    } else {
                        self.stats.envelopes_queued += 1;
                    }
                }
                None => warn!(id, "Hand-off for unknown connection dropped"),
            }
        }
    }

    fn tick(&mut self, now: Instant, out: &mut Vec<ServerEvent>) {
        let mut expired = Vec::new();
        for (token, conn) in self.connections.iter_mut() {
            if let Err(e) = conn.channel.tick(now) {
                expired.push((*token, DisconnectReason::from_error(&e)));
            }
        }
        for (token, reason) in expired {
            self.drop_connection(token, reason, out);
        }
    }

    fn flush_into(&mut self, out: &mut Vec<ServerEvent>) {
        let mut broken = Vec::new();
        for (token, conn) in self.connections.iter_mut() {
            if !conn.writable || !conn.channel.has_pending_output() {
                continue;
            }
            match conn.channel.pump_send(&mut conn.stream) {
                Ok(n) => {
                    self.stats.bytes_sent += n as u64;
                    // Leftover output means WouldBlock; wait for the next writable event
                    if conn.channel.has_pending_output() {
                        conn.writable = false;
                    }
                }
                Err(e) => broken.push((*token, DisconnectReason::from_error(&e))),
            }
        }
        for (token, reason) in broken {
            self.drop_connection(token, reason, out);
        }
    }

    /// Remove a connection from the registry, exactly once.
    fn drop_connection(
        &mut self,
        token: Token,
        reason: DisconnectReason,
        out: &mut Vec<ServerEvent>,
    ) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
            self.stats.connections_active = self.stats.connections_active.saturating_sub(1);
            let stats = conn.channel.stats();
            info!(
                id = token.0,
                addr = %conn.addr,
                ?reason,
                discarded = conn.channel.queued_outbound(),
                envelopes_in = stats.envelopes_received,
                envelopes_out = stats.envelopes_sent,
                "Client disconnected"
            );
            out.push(ServerEvent::Disconnected {
                id: token.0,
                reason,
            });
        }
    }

    /// Queue an envelope for one connection.
    ///
    /// Fails with [`ChannelError::Disconnected`] if the connection is gone and
    /// with [`ChannelError::EnvelopeTooLarge`] if it can never be sent.
    pub fn send(&mut self, id: ConnectionId, envelope: &Envelope) -> Result<(), ChannelError> {
        let conn = self
            .connections
            .get_mut(&Token(id))
            .ok_or(ChannelError::Disconnected)?;
        conn.channel.enqueue_outbound(envelope)?;
        self.stats.envelopes_queued += 1;
        Ok(())
    }

    /// Queue the same envelope on every live connection.
    ///
    /// Fails with [`ChannelError::EnvelopeTooLarge`] before touching any
    /// channel if the envelope can never be sent. Otherwise each channel is
    /// handled independently; returns how many accepted it.
    pub fn broadcast(&mut self, envelope: &Envelope) -> Result<usize, ChannelError> {
        let encoded = envelope.encode()?;
        let max = self.config.channel.max_envelope_size();
        if encoded.len() > max {
            return Err(ChannelError::EnvelopeTooLarge {
                size: encoded.len(),
                max,
            });
        }
        let mut delivered = 0;
        for (token, conn) in self.connections.iter_mut() {
            match conn.channel.enqueue_encoded(encoded.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => debug!(id = token.0, error = %e, "Broadcast skipped connection"),
            }
        }
        self.stats.envelopes_queued += delivered as u64;
        Ok(delivered)
    }

    /// Owner-initiated disconnect. The event is reported by the next `poll`.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let mut events = Vec::new();
        self.drop_connection(Token(id), DisconnectReason::Local, &mut events);
        let dropped = !events.is_empty();
        self.pending_events.extend(events);
        dropped
    }

    /// Disconnect everyone, best-effort flushing what is writable first.
    pub fn shutdown(&mut self) -> Vec<ServerEvent> {
        let mut out = std::mem::take(&mut self.pending_events);
        self.flush_into(&mut out);
        let tokens: Vec<Token> = self.connections.keys().copied().collect();
        for token in tokens {
            self.drop_connection(token, DisconnectReason::Local, &mut out);
        }
        info!("Server shut down");
        out
    }
}

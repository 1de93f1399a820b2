//! Client multiplexer: cermin dari Server dengan tepat satu Channel.
//!
//! State: `Connecting -> Connected -> Disconnected` (terminal). Tidak ada
//! reconnect otomatis; caller yang memutuskan.

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use super::channel::Channel;
use super::socket::tune_stream;
use super::DisconnectReason;
use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::protocol::Envelope;

const CLIENT_TOKEN: Token = Token(0);
const EVENTS_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected,
    Disconnected(DisconnectReason),
    Message(Envelope),
}

pub struct Client {
    poll: Poll,
    events: Events,
    stream: TcpStream,
    channel: Channel,
    state: ConnectionState,
    writable: bool,
    pending_events: Vec<ClientEvent>,
}

impl Client {
    /// Start a non-blocking connect; completion is reported by `poll`.
    ///
    /// Envelopes sent while still connecting are queued.
    pub fn connect(addr: SocketAddr, config: ChannelConfig) -> io::Result<Self> {
        info!(%addr, "Connecting to server");
        let poll = Poll::new()?;
        let mut stream = TcpStream::connect(addr)?;
        poll.registry().register(
            &mut stream,
            CLIENT_TOKEN,
            Interest::READABLE | Interest::WRITABLE,
        )?;

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            stream,
            channel: Channel::new(config),
            state: ConnectionState::Connecting,
            writable: false,
            pending_events: Vec::new(),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn send(&mut self, envelope: &Envelope) -> Result<(), ChannelError> {
        if self.state == ConnectionState::Disconnected {
            return Err(ChannelError::Disconnected);
        }
        self.channel.enqueue_outbound(envelope)
    }

    /// One cooperative cycle, see [`crate::network::Server::poll`].
    pub fn poll(&mut self, timeout: Option<Duration>) -> io::Result<Vec<ClientEvent>> {
        let mut out = std::mem::take(&mut self.pending_events);
        if self.state == ConnectionState::Disconnected {
            return Ok(out);
        }

        let sendable = self.writable && self.channel.has_pending_output();
        let timeout = if sendable || !out.is_empty() {
            Some(Duration::ZERO)
        } else {
            timeout
        };
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(out),
            Err(e) => return Err(e),
        }

        let mut readable = false;
        let mut writable = false;
        for event in self.events.iter() {
            if event.token() == CLIENT_TOKEN {
                readable |= event.is_readable() || event.is_read_closed() || event.is_error();
                writable |= event.is_writable() || event.is_error();
            }
        }

        if self.state == ConnectionState::Connecting && (readable || writable) {
            self.finish_connect(&mut out);
        }
        if self.state != ConnectionState::Connected {
            return Ok(out);
        }

        if readable {
            match self.channel.pump_receive(&mut self.stream) {
                Ok(_) => out.extend(self.channel.drain_inbound().map(ClientEvent::Message)),
                Err(e) => {
                    self.close(DisconnectReason::from_error(&e), &mut out);
                    return Ok(out);
                }
            }
        }
        if writable {
            self.writable = true;
        }

        if let Err(e) = self.channel.tick(Instant::now()) {
            self.close(DisconnectReason::from_error(&e), &mut out);
            return Ok(out);
        }
        self.flush_into(&mut out);
        Ok(out)
    }

    fn finish_connect(&mut self, out: &mut Vec<ClientEvent>) {
        match self.stream.take_error() {
            Ok(None) => {}
            Ok(Some(e)) | Err(e) => {
                warn!(error = %e, "Failed to connect");
                self.close(DisconnectReason::TransportError, out);
                return;
            }
        }
        match self.stream.peer_addr() {
            Ok(addr) => {
                if let Err(e) = tune_stream(&self.stream, None) {
                    warn!(error = %e, "Failed to tune socket");
                }
                self.state = ConnectionState::Connected;
                info!(%addr, "Connected to server");
                out.push(ClientEvent::Connected);
            }
            Err(ref e) if e.kind() == io::ErrorKind::NotConnected => {
                debug!("Connect still in progress");
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect");
                self.close(DisconnectReason::TransportError, out);
            }
        }
    }

    /// Push queued output to the socket if it is writable.
    pub fn flush(&mut self) -> Vec<ClientEvent> {
        let mut out = Vec::new();
        self.flush_into(&mut out);
        out
    }

    fn flush_into(&mut self, out: &mut Vec<ClientEvent>) {
        if self.state != ConnectionState::Connected
            || !self.writable
            || !self.channel.has_pending_output()
        {
            return;
        }
        match self.channel.pump_send(&mut self.stream) {
            Ok(_) => {
                if self.channel.has_pending_output() {
                    self.writable = false;
                }
            }
            Err(e) => self.close(DisconnectReason::from_error(&e), out),
        }
    }

    fn close(&mut self, reason: DisconnectReason, out: &mut Vec<ClientEvent>) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        let _ = self.poll.registry().deregister(&mut self.stream);
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        self.state = ConnectionState::Disconnected;
        info!(
            ?reason,
            discarded = self.channel.queued_outbound(),
            "Disconnected from server"
        );
        out.push(ClientEvent::Disconnected(reason));
    }

    /// Client-initiated disconnect; reported by the next `poll`.
    pub fn disconnect(&mut self) {
        let mut events = Vec::new();
        self.close(DisconnectReason::Local, &mut events);
        self.pending_events.extend(events);
    }
}

//! RPC client: alokasi id, tabel pending, korelasi reply.
//!
//! Reply yang id-nya tidak dikenal dibuang; envelope tanpa `reply_to`
//! diteruskan sebagai notifikasi.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::network::{Client, ClientEvent, DisconnectReason};
use crate::protocol::{status, Envelope};

/// Answer to one call made through [`RpcClient::call`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub request_id: u32,
    pub status_code: u16,
    pub payload: Option<Vec<u8>>,
    /// Round trip, measured from `call`.
    pub elapsed: Duration,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Payload as JSON; an absent payload is `null`.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        match self.payload.as_deref() {
            None | Some([]) => Ok(Value::Null),
            Some(bytes) => serde_json::from_slice(bytes),
        }
    }

    /// Payload as text, for error replies.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.payload.as_deref().unwrap_or_default()).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcEvent {
    Connected,
    Reply(Reply),
    /// Server-initiated envelope that answers nothing.
    Notification(Envelope),
    /// The ids of calls that will never be answered.
    Disconnected {
        reason: DisconnectReason,
        abandoned: Vec<u32>,
    },
}

struct PendingCall {
    uri: String,
    sent_at: Instant,
}

/// Request/reply client on top of [`Client`].
pub struct RpcClient {
    client: Client,
    next_id: u32,
    pending: HashMap<u32, PendingCall>,
}

impl RpcClient {
    pub fn connect(addr: SocketAddr, config: ChannelConfig) -> io::Result<Self> {
        Ok(Self::new(Client::connect(addr, config)?))
    }

    pub fn new(client: Client) -> Self {
        Self {
            client,
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Send `args` (a JSON object) to `uri`. Returns the request id the
    /// reply will carry in `reply_to`.
    pub fn call(&mut self, uri: &str, args: &Value) -> Result<u32, ChannelError> {
        self.call_raw(uri, args.to_string().into_bytes())
    }

    pub fn call_raw(&mut self, uri: &str, payload: Vec<u8>) -> Result<u32, ChannelError> {
        let id = self.allocate_id();
        self.client.send(&Envelope::request(id, uri, payload))?;
        debug!(id, uri, "Call queued");
        self.pending.insert(
            id,
            PendingCall {
                uri: uri.to_string(),
                sent_at: Instant::now(),
            },
        );
        Ok(id)
    }

    /// Fire-and-forget: no id, no reply.
    pub fn notify(&mut self, uri: &str, args: &Value) -> Result<(), ChannelError> {
        self.client
            .send(&Envelope::message(uri, args.to_string().into_bytes()))
    }

    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }

    pub fn poll(&mut self, timeout: Option<Duration>) -> io::Result<Vec<RpcEvent>> {
        let mut out = Vec::new();
        for event in self.client.poll(timeout)? {
            match event {
                ClientEvent::Connected => out.push(RpcEvent::Connected),
                ClientEvent::Message(envelope) => {
                    if let Some(event) = self.correlate(envelope) {
                        out.push(event);
                    }
                }
                ClientEvent::Disconnected(reason) => {
                    let abandoned: Vec<u32> = self.pending.drain().map(|(id, _)| id).collect();
                    if !abandoned.is_empty() {
                        info!(count = abandoned.len(), "Pending calls abandoned");
                    }
                    out.push(RpcEvent::Disconnected { reason, abandoned });
                }
            }
        }
        Ok(out)
    }

    fn correlate(&mut self, envelope: Envelope) -> Option<RpcEvent> {
        let Some(request_id) = envelope.reply_to else {
            return Some(RpcEvent::Notification(envelope));
        };
        let Some(call) = self.pending.remove(&request_id) else {
            warn!(request_id, "Reply to unknown request dropped");
            return None;
        };
        let status_code = envelope.status_code.unwrap_or(status::OK);
        debug!(request_id, uri = %call.uri, status_code, "Reply received");
        Some(RpcEvent::Reply(Reply {
            request_id,
            status_code,
            payload: envelope.payload,
            elapsed: call.sent_at.elapsed(),
        }))
    }

    fn allocate_id(&mut self) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1).max(1);
            if !self.pending.contains_key(&id) {
                return id;
            }
        }
    }
}

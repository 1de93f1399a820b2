//! Request: satu panggilan masuk dengan flag reply tepat sekali.

use tracing::warn;

use crate::network::ConnectionId;
use crate::protocol::Envelope;

/// One inbound request as seen by a handler.
///
/// The `replied` flag enforces a single reply: whichever of the handler's
/// explicit [`Request::reply`] or the router's automatic one comes first
/// wins, later attempts are ignored.
#[derive(Debug)]
pub struct Request {
    connection_id: ConnectionId,
    envelope: Envelope,
    replied: bool,
    reply: Option<Envelope>,
}

impl Request {
    pub fn new(connection_id: ConnectionId, envelope: Envelope) -> Self {
        Self {
            connection_id,
            envelope,
            replied: false,
            reply: None,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn uri(&self) -> &str {
        self.envelope.uri.as_deref().unwrap_or("")
    }

    /// Correlation id; `None` for fire-and-forget messages.
    pub fn id(&self) -> Option<u32> {
        self.envelope.id
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.envelope.payload.as_deref()
    }

    pub fn has_replied(&self) -> bool {
        self.replied
    }

    /// Answer the request. Returns `false` if it was already answered.
    ///
    /// Messages without an id are marked answered but produce no envelope,
    /// there is nothing to correlate it with.
    pub fn reply(&mut self, status_code: u16, payload: Option<Vec<u8>>) -> bool {
        if self.replied {
            warn!(
                uri = self.uri(),
                connection_id = self.connection_id,
                "Duplicate reply ignored"
            );
            return false;
        }
        self.replied = true;
        self.reply = self
            .envelope
            .id
            .map(|id| Envelope::reply(id, status_code, payload));
        true
    }

    pub fn into_reply(self) -> Option<Envelope> {
        self.reply
    }
}

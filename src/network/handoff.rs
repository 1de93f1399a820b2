//! Thread-safe route back into the multiplexer.
//!
//! Worker thread tidak pernah menyentuh socket atau registry; mereka hanya
//! menitipkan envelope lewat `OutboundHandle`, lalu loop utama yang
//! memasukkannya ke outbox Channel pemiliknya.

use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use mio::Waker;

use super::ConnectionId;
use crate::protocol::Envelope;

/// Cloneable, `Send` handle for queueing envelopes from other threads.
#[derive(Clone)]
pub struct OutboundHandle {
    tx: Sender<(ConnectionId, Envelope)>,
    waker: Arc<Waker>,
}

impl OutboundHandle {
    pub(crate) fn new(tx: Sender<(ConnectionId, Envelope)>, waker: Arc<Waker>) -> Self {
        Self { tx, waker }
    }

    /// Queue `envelope` for `connection_id` and wake the poll loop.
    ///
    /// Fails with `BrokenPipe` once the multiplexer is gone. Delivery to a
    /// connection that has meanwhile closed is silently impossible.
    pub fn send(&self, connection_id: ConnectionId, envelope: Envelope) -> io::Result<()> {
        self.tx
            .send((connection_id, envelope))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "multiplexer stopped"))?;
        self.waker.wake()
    }
}

pub(crate) type HandoffReceiver = Receiver<(ConnectionId, Envelope)>;

//! Channel: framing dan sequencing state per koneksi
//!
//! Satu Channel memiliki:
//! - outbox envelope yang belum di-packetize
//! - output buffer berisi packet siap kirim
//! - input buffer + packet yang sedang dirakit
//! - inbox envelope hasil decode
//!
//! Channel tidak tahu socket apa yang dipakai; `pump_send`/`pump_receive`
//! menerima `Write`/`Read` non-blocking apa saja.

use std::collections::vec_deque::Drain;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Instant;

use tracing::{debug, error, trace};

use crate::config::ChannelConfig;
use crate::core::{ReadBuffer, WriteBuffer};
use crate::error::{ChannelError, ProtocolError};
use crate::protocol::{
    decode_payload, next_packet_id, serialize_packet, Envelope, PacketHeader, PacketType,
    FIRST_PACKET_ID, HEADER_SIZE, NO_PACKET_ID,
};

/// Traffic counters for one channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub envelopes_sent: u64,
    pub envelopes_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

pub struct Channel {
    config: ChannelConfig,
    output: WriteBuffer,
    input: ReadBuffer,
    /// Reused for every socket read
    recv_scratch: Box<[u8]>,
    /// Id stamped on the next outbound packet
    send_packet_id: u16,
    /// Header of the packet currently being assembled
    recv_header: Option<PacketHeader>,
    /// Last packet id seen from the peer, echoed as our ack
    last_recv_packet_id: u16,
    /// Last of our packet ids the peer acknowledged
    peer_ack: u16,
    outbox: VecDeque<Vec<u8>>,
    inbox: VecDeque<Envelope>,
    last_send: Instant,
    last_recv: Instant,
    stats: ChannelStats,
}

impl Channel {
    pub fn new(config: ChannelConfig) -> Self {
        let now = Instant::now();
        let recv_scratch = vec![0u8; config.max_receive_size.max(1)].into_boxed_slice();
        Self {
            config,
            output: WriteBuffer::new(),
            input: ReadBuffer::new(),
            recv_scratch,
            send_packet_id: FIRST_PACKET_ID,
            recv_header: None,
            last_recv_packet_id: NO_PACKET_ID,
            peer_ack: NO_PACKET_ID,
            outbox: VecDeque::new(),
            inbox: VecDeque::new(),
            last_send: now,
            last_recv: now,
            stats: ChannelStats::default(),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Largest encoded envelope that fits a packet on its own.
    #[inline]
    pub fn max_envelope_size(&self) -> usize {
        self.config.max_envelope_size()
    }

    #[inline]
    pub fn send_packet_id(&self) -> u16 {
        self.send_packet_id
    }

    /// Id of the packet being assembled, if one is in flight.
    #[inline]
    pub fn recv_packet_id(&self) -> Option<u16> {
        self.recv_header.map(|h| h.packet_id)
    }

    /// Last packet id received from the peer ([`NO_PACKET_ID`] if none).
    #[inline]
    pub fn last_recv_packet_id(&self) -> u16 {
        self.last_recv_packet_id
    }

    /// Last of our packets the peer said it has seen.
    #[inline]
    pub fn peer_ack(&self) -> u16 {
        self.peer_ack
    }

    #[inline]
    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Framed bytes not yet accepted by the socket.
    #[inline]
    pub fn pending_output(&self) -> &[u8] {
        self.output.as_bytes()
    }

    #[inline]
    pub fn has_pending_output(&self) -> bool {
        !self.output.is_empty() || !self.outbox.is_empty()
    }

    #[inline]
    pub fn queued_outbound(&self) -> usize {
        self.outbox.len()
    }

    /// Queue an envelope for the next flush.
    ///
    /// An envelope too big for any packet is refused here; the channel
    /// itself stays usable.
    pub fn enqueue_outbound(&mut self, envelope: &Envelope) -> Result<(), ChannelError> {
        let encoded = envelope.encode()?;
        self.enqueue_encoded(encoded)
    }

    /// Queue an already-encoded envelope.
    pub fn enqueue_encoded(&mut self, encoded: Vec<u8>) -> Result<(), ChannelError> {
        let max = self.max_envelope_size();
        if encoded.len() > max {
            return Err(ChannelError::EnvelopeTooLarge {
                size: encoded.len(),
                max,
            });
        }
        self.outbox.push_back(encoded);
        Ok(())
    }

    /// Pack queued envelopes into packets and append them to the output.
    ///
    /// Consecutive envelopes share a packet until the next one would overflow
    /// it; then the packet is sealed and the envelope retried on a fresh one.
    /// Returns the number of packets emitted.
    pub fn flush_outbound(&mut self) -> Result<usize, ChannelError> {
        let capacity = self.config.max_packet_size.saturating_sub(HEADER_SIZE);
        let mut batch = WriteBuffer::with_max_size(capacity);
        let mut batch_items: Vec<Vec<u8>> = Vec::new();
        let mut packets = 0;
        let mut rejected = None;

        while let Some(encoded) = self.outbox.pop_front() {
            if !batch.can_write_string(&encoded) {
                if !batch_items.is_empty() {
                    self.seal_batch(&mut batch, &mut batch_items)?;
                    packets += 1;
                }
                if !batch.can_write_string(&encoded) {
                    error!(
                        size = encoded.len(),
                        max = self.max_envelope_size(),
                        "Envelope can never fit a packet"
                    );
                    if rejected.is_none() {
                        rejected = Some(ChannelError::EnvelopeTooLarge {
                            size: encoded.len(),
                            max: self.max_envelope_size(),
                        });
                    }
                    continue;
                }
            }
            batch.write_string(&encoded).map_err(ProtocolError::from)?;
            batch_items.push(encoded);
        }

        if !batch_items.is_empty() {
            self.seal_batch(&mut batch, &mut batch_items)?;
            packets += 1;
        }

        match rejected {
            Some(err) => Err(err),
            None => Ok(packets),
        }
    }

    fn seal_batch(
        &mut self,
        batch: &mut WriteBuffer,
        items: &mut Vec<Vec<u8>>,
    ) -> Result<(), ChannelError> {
        let count = items.len() as u64;
        if items.len() == 1 {
            self.write_packet(PacketType::Data, &items[0])?;
        } else {
            self.write_packet(PacketType::MultiData, batch.as_bytes())?;
        }
        self.stats.envelopes_sent += count;
        batch.clear();
        items.clear();
        Ok(())
    }

    fn write_packet(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<(), ChannelError> {
        let packet = serialize_packet(
            self.config.max_packet_size,
            packet_type,
            self.send_packet_id,
            self.last_recv_packet_id,
            payload,
            &self.config.compression,
        )?;
        trace!(
            packet_id = self.send_packet_id,
            ?packet_type,
            size = packet.len(),
            "Packet framed"
        );
        self.output.write_raw(&packet).map_err(ProtocolError::from)?;
        self.send_packet_id = next_packet_id(self.send_packet_id);
        self.stats.packets_sent += 1;
        self.last_send = Instant::now();
        Ok(())
    }

    pub fn send_heartbeat(&mut self) -> Result<(), ChannelError> {
        self.write_packet(PacketType::Heartbeat, &[])
    }

    /// Periodic liveness work.
    ///
    /// Emits a heartbeat when nothing was sent for `heartbeat_interval`, and
    /// fails with [`ChannelError::TimedOut`] when nothing was received for
    /// `idle_timeout`.
    pub fn tick(&mut self, now: Instant) -> Result<(), ChannelError> {
        if let Some(timeout) = self.config.idle_timeout {
            if now.saturating_duration_since(self.last_recv) >= timeout {
                return Err(ChannelError::TimedOut);
            }
        }
        if let Some(interval) = self.config.heartbeat_interval {
            if !self.has_pending_output()
                && now.saturating_duration_since(self.last_send) >= interval
            {
                debug!(packet_id = self.send_packet_id, "Sending heartbeat");
                self.send_heartbeat()?;
            }
        }
        Ok(())
    }

    /// Write as much pending output as the socket takes right now.
    ///
    /// Queued envelopes are packetized first. Stops at `WouldBlock`; a
    /// zero-byte write or a socket error means the peer is gone.
    pub fn pump_send<W: Write>(&mut self, socket: &mut W) -> Result<usize, ChannelError> {
        if !self.outbox.is_empty() {
            if let Err(e) = self.flush_outbound() {
                if e.is_fatal() {
                    return Err(e);
                }
            }
        }

        let mut written = 0;
        while !self.output.is_empty() {
            match socket.write(self.output.as_bytes()) {
                Ok(0) => return Err(ChannelError::Disconnected),
                Ok(n) => {
                    self.output.skip(n);
                    written += n;
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ChannelError::Io(e)),
            }
        }
        self.stats.bytes_sent += written as u64;
        Ok(written)
    }

    /// Read whatever the socket has and decode every complete packet.
    ///
    /// Reads until `WouldBlock`. A zero-byte read means the peer closed.
    pub fn pump_receive<R: Read>(&mut self, socket: &mut R) -> Result<usize, ChannelError> {
        let mut scratch = std::mem::take(&mut self.recv_scratch);
        let result = self.receive_with(socket, &mut scratch);
        self.recv_scratch = scratch;
        result
    }

    fn receive_with<R: Read>(
        &mut self,
        socket: &mut R,
        chunk: &mut [u8],
    ) -> Result<usize, ChannelError> {
        let mut received = 0;
        loop {
            match socket.read(chunk) {
                Ok(0) => return Err(ChannelError::Disconnected),
                Ok(n) => {
                    received += n;
                    self.feed(&chunk[..n])?;
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ChannelError::Io(e)),
            }
        }
        Ok(received)
    }

    /// Append received bytes and decode every complete packet.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.stats.bytes_received += data.len() as u64;
        self.last_recv = Instant::now();
        self.input.feed(data);
        self.process_input()
    }

    fn process_input(&mut self) -> Result<(), ChannelError> {
        loop {
            let header = match self.recv_header {
                Some(header) => header,
                None => match PacketHeader::read(&mut self.input)? {
                    Some(header) => {
                        if header.total_size() > self.config.max_packet_size {
                            return Err(ProtocolError::PacketTooLarge {
                                size: header.total_size(),
                                max: self.config.max_packet_size,
                            }
                            .into());
                        }
                        self.recv_header = Some(header);
                        header
                    }
                    None => return Ok(()),
                },
            };

            let payload_len = header.payload_len as usize;
            if !self.input.can_read(payload_len) {
                return Ok(());
            }
            let payload = self
                .input
                .read_raw(payload_len)
                .map_err(ProtocolError::from)?;
            let packet = decode_payload(&header, payload, self.config.max_decompressed_size)?;

            for message in &packet.messages {
                self.inbox.push_back(Envelope::decode(message)?);
            }
            trace!(
                packet_id = packet.packet_id,
                envelopes = packet.messages.len(),
                "Packet received"
            );
            self.stats.packets_received += 1;
            self.stats.envelopes_received += packet.messages.len() as u64;
            self.last_recv_packet_id = packet.packet_id;
            self.peer_ack = packet.ack_packet_id;
            self.recv_header = None;
        }
    }

    /// Decoded envelopes in arrival order; each is yielded exactly once.
    pub fn drain_inbound(&mut self) -> Drain<'_, Envelope> {
        self.inbox.drain(..)
    }

    #[inline]
    pub fn inbound_len(&self) -> usize {
        self.inbox.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompressionConfig;
    use crate::protocol::{deserialize_packet, Packet, MAX_PACKET_SIZE, PACKET_ID_MODULUS};
    use std::time::Duration;

    fn raw_config() -> ChannelConfig {
        ChannelConfig {
            compression: CompressionConfig {
                enabled: false,
                ..CompressionConfig::default()
            },
            ..ChannelConfig::default()
        }
    }

    /// Split a channel's output into decoded packets.
    fn packets_of(bytes: &[u8]) -> Vec<Packet> {
        let mut packets = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let len = HEADER_SIZE + u16::from_be_bytes([rest[6], rest[7]]) as usize;
            packets.push(deserialize_packet(&rest[..len], 1 << 20).unwrap());
            rest = &rest[len..];
        }
        packets
    }

    /// Envelope whose encoding is exactly `size` bytes.
    fn envelope_of_size(size: usize) -> Envelope {
        let base = Envelope::message("bulk", Vec::new()).encoded_len();
        Envelope::message("bulk", vec![0xAB; size - base])
    }

    struct ScriptedSocket {
        reads: VecDeque<io::Result<Vec<u8>>>,
        accept_per_write: usize,
        written: Vec<u8>,
    }

    impl Read for ScriptedSocket {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(data)) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::ErrorKind::WouldBlock.into()),
            }
        }
    }

    impl Write for ScriptedSocket {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.accept_per_write == 0 {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.accept_per_write);
            self.written.extend_from_slice(&buf[..n]);
            self.accept_per_write = 0;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn socket(reads: Vec<io::Result<Vec<u8>>>) -> ScriptedSocket {
        ScriptedSocket {
            reads: reads.into(),
            accept_per_write: 0,
            written: Vec::new(),
        }
    }

    #[test]
    fn test_flush_roundtrip_preserves_order() {
        let mut channel = Channel::new(raw_config());
        let sent: Vec<Envelope> = (0..50)
            .map(|i| Envelope::request(i, format!("svc/item/{i}"), vec![i as u8; 300]))
            .collect();
        for env in &sent {
            channel.enqueue_outbound(env).unwrap();
        }
        let emitted = channel.flush_outbound().unwrap();
        assert!(emitted > 1);

        let packets = packets_of(channel.pending_output());
        assert_eq!(packets.len(), emitted);
        let received: Vec<Envelope> = packets
            .iter()
            .flat_map(|p| p.messages.iter())
            .map(|m| Envelope::decode(m).unwrap())
            .collect();
        assert_eq!(received, sent);
    }

    #[test]
    fn test_packet_ids_are_sequential_and_wrap() {
        let mut channel = Channel::new(raw_config());
        let total = 300u16;
        for i in 0..total {
            channel
                .enqueue_outbound(&Envelope::message("tick", vec![i as u8]))
                .unwrap();
            assert_eq!(channel.flush_outbound().unwrap(), 1);
        }

        let ids: Vec<u16> = packets_of(channel.pending_output())
            .iter()
            .map(|p| p.packet_id)
            .collect();
        let expected: Vec<u16> = (1..=total).map(|n| n % PACKET_ID_MODULUS).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_oversized_envelope_is_rejected() {
        let mut channel = Channel::new(raw_config());
        let max = channel.max_envelope_size();
        assert_eq!(max, MAX_PACKET_SIZE - HEADER_SIZE - 2);

        let result = channel.enqueue_outbound(&envelope_of_size(max + 1));
        assert!(matches!(
            result,
            Err(ChannelError::EnvelopeTooLarge { size, max: m }) if size == max + 1 && m == max
        ));
        assert_eq!(channel.queued_outbound(), 0);

        // Exactly at the bound still goes out as one packet
        channel.enqueue_outbound(&envelope_of_size(max)).unwrap();
        assert_eq!(channel.flush_outbound().unwrap(), 1);
        assert_eq!(channel.pending_output().len(), MAX_PACKET_SIZE - 2);
    }

    #[test]
    fn test_packing_respects_packet_bound() {
        let mut channel = Channel::new(raw_config());
        for _ in 0..2 {
            channel.enqueue_outbound(&envelope_of_size(4000)).unwrap();
        }
        assert_eq!(channel.flush_outbound().unwrap(), 1);
        let first = packets_of(channel.pending_output());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].packet_type, PacketType::MultiData);
        assert_eq!(first[0].messages.len(), 2);

        let mut channel = Channel::new(raw_config());
        for _ in 0..3 {
            channel.enqueue_outbound(&envelope_of_size(4000)).unwrap();
        }
        assert_eq!(channel.flush_outbound().unwrap(), 2);
        let bytes = channel.pending_output();
        let packets = packets_of(bytes);
        assert_eq!(packets[0].messages.len(), 2);
        assert_eq!(packets[1].packet_type, PacketType::Data);
        assert_eq!(packets[1].messages.len(), 1);
        assert_eq!(bytes.len(), (HEADER_SIZE + 2 * 4002) + (HEADER_SIZE + 4000));
        assert!(HEADER_SIZE + 2 * 4002 <= MAX_PACKET_SIZE);
    }

    #[test]
    fn test_compressed_packets_decode_through_channel() {
        let mut sender = Channel::new(ChannelConfig::default());
        let mut receiver = Channel::new(ChannelConfig::default());
        let env = Envelope::message("world/tiles", vec![b'.'; 6000]);
        sender.enqueue_outbound(&env).unwrap();
        sender.flush_outbound().unwrap();
        assert!(sender.pending_output().len() < 6000);

        let bytes = sender.pending_output().to_vec();
        receiver.feed(&bytes).unwrap();
        assert_eq!(receiver.drain_inbound().collect::<Vec<_>>(), vec![env]);
    }

    #[test]
    fn test_receive_reassembles_split_packets() {
        let mut sender = Channel::new(raw_config());
        let first = Envelope::request(1, "svc/echo", b"{}".to_vec());
        let second = Envelope::reply(1, 200, Some(b"ok".to_vec()));
        sender.enqueue_outbound(&first).unwrap();
        sender.flush_outbound().unwrap();
        sender.enqueue_outbound(&second).unwrap();
        sender.flush_outbound().unwrap();
        let bytes = sender.pending_output().to_vec();

        let mut receiver = Channel::new(raw_config());
        receiver.feed(&bytes[..3]).unwrap();
        assert_eq!(receiver.recv_packet_id(), None);
        receiver.feed(&bytes[3..HEADER_SIZE + 1]).unwrap();
        assert_eq!(receiver.recv_packet_id(), Some(1));
        assert_eq!(receiver.inbound_len(), 0);
        receiver.feed(&bytes[HEADER_SIZE + 1..]).unwrap();

        assert_eq!(receiver.recv_packet_id(), None);
        assert_eq!(receiver.last_recv_packet_id(), 2);
        let inbound: Vec<Envelope> = receiver.drain_inbound().collect();
        assert_eq!(inbound, vec![first, second]);
        assert_eq!(receiver.drain_inbound().count(), 0);
    }

    #[test]
    fn test_ack_is_echoed_to_peer() {
        let mut a = Channel::new(raw_config());
        let mut b = Channel::new(raw_config());

        a.enqueue_outbound(&Envelope::message("x", vec![])).unwrap();
        a.flush_outbound().unwrap();
        let bytes = a.pending_output().to_vec();
        b.feed(&bytes).unwrap();

        b.send_heartbeat().unwrap();
        let reply = b.pending_output().to_vec();
        a.feed(&reply).unwrap();
        assert_eq!(a.peer_ack(), 1);
        assert_eq!(a.inbound_len(), 0);
        assert_eq!(b.peer_ack(), NO_PACKET_ID);
    }

    #[test]
    fn test_garbage_is_framing_error() {
        let mut channel = Channel::new(raw_config());
        let result = channel.feed(&[0x7F, 0, 1, 0, 0, 0, 0, 0]);
        assert!(matches!(
            result,
            Err(ChannelError::Protocol(ProtocolError::BadPacketType(0x7F)))
        ));
        assert!(result.unwrap_err().is_fatal());
    }

    #[test]
    fn test_zero_byte_read_is_disconnect() {
        let mut channel = Channel::new(raw_config());
        let mut sock = socket(vec![Ok(Vec::new())]);
        assert!(matches!(
            channel.pump_receive(&mut sock),
            Err(ChannelError::Disconnected)
        ));
    }

    #[test]
    fn test_pump_receive_stops_at_would_block() {
        let mut sender = Channel::new(raw_config());
        sender
            .enqueue_outbound(&Envelope::message("a", b"1".to_vec()))
            .unwrap();
        sender.flush_outbound().unwrap();
        let bytes = sender.pending_output().to_vec();

        let mut channel = Channel::new(raw_config());
        let mut sock = socket(vec![Ok(bytes[..4].to_vec()), Ok(bytes[4..].to_vec())]);
        assert_eq!(channel.pump_receive(&mut sock).unwrap(), bytes.len());
        assert_eq!(channel.inbound_len(), 1);
    }

    #[test]
    fn test_receive_buffer_is_reused_across_calls() {
        let mut sender = Channel::new(raw_config());
        for text in ["first", "second"] {
            sender
                .enqueue_outbound(&Envelope::message("evt/a", text.as_bytes().to_vec()))
                .unwrap();
            sender.flush_outbound().unwrap();
        }
        let bytes = sender.pending_output().to_vec();

        let config = ChannelConfig {
            max_receive_size: 16,
            ..raw_config()
        };
        let mut channel = Channel::new(config);
        let chunks: Vec<io::Result<Vec<u8>>> =
            bytes.chunks(16).map(|c| Ok(c.to_vec())).collect();
        let half = chunks.len() / 2;
        let mut chunks = chunks.into_iter();

        let mut sock = socket(chunks.by_ref().take(half).collect());
        channel.pump_receive(&mut sock).unwrap();
        assert_eq!(channel.recv_scratch.len(), 16);

        let mut sock = socket(chunks.collect());
        channel.pump_receive(&mut sock).unwrap();
        assert_eq!(channel.recv_scratch.len(), 16);
        assert_eq!(channel.inbound_len(), 2);

        let mut sock = socket(vec![Ok(Vec::new())]);
        assert!(channel.pump_receive(&mut sock).is_err());
        assert_eq!(channel.recv_scratch.len(), 16);
    }

    #[test]
    fn test_partial_write_drains_only_accepted_bytes() {
        let mut channel = Channel::new(raw_config());
        channel
            .enqueue_outbound(&Envelope::message("svc/a", vec![1, 2, 3]))
            .unwrap();
        let mut sock = socket(Vec::new());
        sock.accept_per_write = 5;

        assert_eq!(channel.pump_send(&mut sock).unwrap(), 5);
        let total = sock.written.len() + channel.pending_output().len();
        assert!(channel.has_pending_output());

        sock.accept_per_write = usize::MAX;
        channel.pump_send(&mut sock).unwrap();
        assert!(!channel.has_pending_output());
        assert_eq!(sock.written.len(), total);
        assert_eq!(packets_of(&sock.written).len(), 1);
    }

    #[test]
    fn test_zero_byte_write_is_disconnect() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let mut channel = Channel::new(raw_config());
        channel.send_heartbeat().unwrap();
        assert!(matches!(
            channel.pump_send(&mut Closed),
            Err(ChannelError::Disconnected)
        ));
    }

    #[test]
    fn test_heartbeat_on_idle_tick() {
        let mut channel = Channel::new(ChannelConfig {
            heartbeat_interval: Some(Duration::from_secs(5)),
            ..raw_config()
        });
        channel.tick(Instant::now()).unwrap();
        assert!(!channel.has_pending_output());

        channel
            .tick(Instant::now() + Duration::from_secs(6))
            .unwrap();
        let packets = packets_of(channel.pending_output());
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].packet_type, PacketType::Heartbeat);
        assert_eq!(channel.send_packet_id(), 2);
    }

    #[test]
    fn test_idle_timeout() {
        let mut channel = Channel::new(ChannelConfig {
            heartbeat_interval: None,
            idle_timeout: Some(Duration::from_secs(30)),
            ..raw_config()
        });
        channel.tick(Instant::now()).unwrap();
        let result = channel.tick(Instant::now() + Duration::from_secs(31));
        assert!(matches!(result, Err(ChannelError::TimedOut)));
    }
}

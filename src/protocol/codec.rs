//! Packet Encoder/Decoder
//!
//! `serialize_packet` menulis header + payload (opsional dikompres) ke
//! buffer yang dibatasi `max_size`. `deserialize_packet` kebalikannya dan
//! memecah payload `MULTI_DATA` menjadi message-message logis.

use tracing::warn;

use super::compression;
use super::packet::{CompressionMethod, PacketHeader, PacketType, HEADER_SIZE};
use super::ProtocolError;
use crate::config::CompressionConfig;
use crate::core::{BufferError, ReadBuffer, WriteBuffer};

/// A decoded packet: sequencing fields plus its logical messages in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: PacketType,
    pub packet_id: u16,
    pub ack_packet_id: u16,
    pub messages: Vec<Vec<u8>>,
}

/// Frame one packet.
///
/// The payload is zlib-compressed when `compression` allows it and it pays
/// off. Fails with [`ProtocolError::PacketTooLarge`] if header plus payload
/// does not fit `max_size`; the caller must split the payload instead.
pub fn serialize_packet(
    max_size: usize,
    packet_type: PacketType,
    packet_id: u16,
    ack_packet_id: u16,
    payload: &[u8],
    compression: &CompressionConfig,
) -> Result<Vec<u8>, ProtocolError> {
    let compressed = compression::maybe_compress(payload, compression);
    let (method, body) = match &compressed {
        Some(data) => (CompressionMethod::Zlib, data.as_slice()),
        None => (CompressionMethod::None, payload),
    };

    let too_large = ProtocolError::PacketTooLarge {
        size: HEADER_SIZE + body.len(),
        max: max_size,
    };
    let payload_len = u16::try_from(body.len()).map_err(|_| too_large.clone())?;

    let header = PacketHeader {
        packet_type,
        packet_id,
        ack_packet_id,
        compression: method,
        payload_len,
    };
    let mut out = WriteBuffer::with_max_size(max_size);
    let written = header.write(&mut out).and_then(|_| out.write_raw(body));
    match written {
        Ok(()) => Ok(out.into_inner()),
        Err(BufferError::Overflow { .. }) => Err(too_large),
        Err(e) => Err(e.into()),
    }
}

/// Parse exactly one packet.
///
/// `bytes` must hold the header and precisely the payload it declares; any
/// difference is a framing error.
pub fn deserialize_packet(bytes: &[u8], max_decompressed: usize) -> Result<Packet, ProtocolError> {
    let mut input = ReadBuffer::from_bytes(bytes);
    let header = PacketHeader::read(&mut input)?.ok_or(ProtocolError::LengthMismatch {
        declared: HEADER_SIZE,
        actual: bytes.len(),
    })?;
    if header.total_size() != bytes.len() {
        return Err(ProtocolError::LengthMismatch {
            declared: header.total_size(),
            actual: bytes.len(),
        });
    }
    decode_payload(&header, input.readable(), max_decompressed)
}

/// Decompress and split the payload of an already-parsed header.
pub fn decode_payload(
    header: &PacketHeader,
    payload: &[u8],
    max_decompressed: usize,
) -> Result<Packet, ProtocolError> {
    if payload.len() != header.payload_len as usize {
        return Err(ProtocolError::LengthMismatch {
            declared: header.payload_len as usize,
            actual: payload.len(),
        });
    }

    let payload = match header.compression {
        CompressionMethod::None => payload.to_vec(),
        CompressionMethod::Zlib => compression::decompress(payload, max_decompressed)?,
    };

    let messages = match header.packet_type {
        PacketType::Data => vec![payload],
        PacketType::MultiData => split_multi_data(&payload, header.packet_id),
        PacketType::Heartbeat => Vec::new(),
    };

    Ok(Packet {
        packet_type: header.packet_type,
        packet_id: header.packet_id,
        ack_packet_id: header.ack_packet_id,
        messages,
    })
}

fn split_multi_data(payload: &[u8], packet_id: u16) -> Vec<Vec<u8>> {
    let mut reader = ReadBuffer::from_bytes(payload);
    let mut messages = Vec::new();
    while !reader.is_empty() {
        match reader.read_string() {
            Ok(message) => messages.push(message),
            Err(_) => break,
        }
    }
    if !reader.is_empty() {
        warn!(
            packet_id,
            unparsed = reader.remaining(),
            "Trailing bytes in multi-data packet"
        );
    }
    messages
}

//! Packet format
//!
//! Layout (big-endian):
//! ┌──────────────────────────────────────────────────────────────┐
//! │ PacketHeader (8 bytes, fixed)                                │
//! │   u8 type | u16 packet_id | u16 ack_packet_id |              │
//! │   u8 compression | u16 payload_len                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (payload_len bytes, optionally zlib-compressed)      │
//! └──────────────────────────────────────────────────────────────┘
//!
//! Stream berisi packet back-to-back; `payload_len` membatasi tiap packet.

use crate::core::{BufferError, ReadBuffer, WriteBuffer};

use super::ProtocolError;

pub const HEADER_SIZE: usize = 8;

/// Whole-packet bound, header included.
pub const MAX_PACKET_SIZE: usize = 8192;

/// Packet ids run `1, 2, ..., 255, 0, 1, ...`.
pub const PACKET_ID_MODULUS: u16 = 256;

/// First id stamped by a fresh channel.
pub const FIRST_PACKET_ID: u16 = 1;

/// `ack_packet_id` value meaning "nothing received from the peer yet".
pub const NO_PACKET_ID: u16 = 0xFFFF;

/// Tipe packet di wire
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// One envelope, payload is its encoding
    Data = 1,
    /// Several envelopes, each u16-length-prefixed
    MultiData = 2,
    /// Keep-alive, carries no envelope
    Heartbeat = 3,
}

impl PacketType {
    #[inline(always)]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Data),
            2 => Some(Self::MultiData),
            3 => Some(Self::Heartbeat),
            _ => None,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    None = 0,
    Zlib = 1,
}

impl CompressionMethod {
    #[inline(always)]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::Zlib),
            _ => None,
        }
    }
}

/// Advance a packet id modulo [`PACKET_ID_MODULUS`].
#[inline(always)]
pub fn next_packet_id(id: u16) -> u16 {
    (id + 1) % PACKET_ID_MODULUS
}

/// Fixed packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub packet_type: PacketType,
    pub packet_id: u16,
    pub ack_packet_id: u16,
    pub compression: CompressionMethod,
    pub payload_len: u16,
}

impl PacketHeader {
    pub fn write(&self, out: &mut WriteBuffer) -> Result<(), BufferError> {
        out.write_uint8(self.packet_type as u8)?;
        out.write_uint16(self.packet_id)?;
        out.write_uint16(self.ack_packet_id)?;
        out.write_uint8(self.compression as u8)?;
        out.write_uint16(self.payload_len)
    }

    /// Parse a header from the front of `input`.
    ///
    /// Returns `Ok(None)` while fewer than [`HEADER_SIZE`] bytes are buffered;
    /// nothing is consumed in that case. Unknown type or compression bytes
    /// are framing errors.
    pub fn read(input: &mut ReadBuffer) -> Result<Option<Self>, ProtocolError> {
        if !input.can_read(HEADER_SIZE) {
            return Ok(None);
        }
        let raw_type = input.read_uint8()?;
        let packet_id = input.read_uint16()?;
        let ack_packet_id = input.read_uint16()?;
        let raw_compression = input.read_uint8()?;
        let payload_len = input.read_uint16()?;

        let packet_type =
            PacketType::from_u8(raw_type).ok_or(ProtocolError::BadPacketType(raw_type))?;
        let compression = CompressionMethod::from_u8(raw_compression)
            .ok_or(ProtocolError::BadCompressionMethod(raw_compression))?;

        Ok(Some(Self {
            packet_type,
            packet_id,
            ack_packet_id,
            compression,
            payload_len,
        }))
    }

    /// Header plus payload.
    #[inline(always)]
    pub fn total_size(&self) -> usize {
        HEADER_SIZE + self.payload_len as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = PacketHeader {
            packet_type: PacketType::MultiData,
            packet_id: 7,
            ack_packet_id: NO_PACKET_ID,
            compression: CompressionMethod::Zlib,
            payload_len: 0x0102,
        };
        let mut out = WriteBuffer::new();
        header.write(&mut out).unwrap();
        assert_eq!(out.len(), HEADER_SIZE);
        assert_eq!(
            out.as_bytes(),
            &[2, 0x00, 0x07, 0xFF, 0xFF, 1, 0x01, 0x02]
        );

        let mut input = ReadBuffer::from_bytes(out.as_bytes());
        let parsed = PacketHeader::read(&mut input).unwrap().unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.total_size(), HEADER_SIZE + 0x0102);
    }

    #[test]
    fn test_partial_header_is_not_an_error() {
        let mut input = ReadBuffer::from_bytes(&[1, 0, 1]);
        assert!(PacketHeader::read(&mut input).unwrap().is_none());
        assert_eq!(input.remaining(), 3);
    }

    #[test]
    fn test_unknown_type_is_framing_error() {
        let mut input = ReadBuffer::from_bytes(&[9, 0, 1, 0, 0, 0, 0, 0]);
        assert!(matches!(
            PacketHeader::read(&mut input),
            Err(ProtocolError::BadPacketType(9))
        ));
    }

    #[test]
    fn test_packet_id_wraps() {
        assert_eq!(next_packet_id(1), 2);
        assert_eq!(next_packet_id(254), 255);
        assert_eq!(next_packet_id(255), 0);
        assert_eq!(next_packet_id(0), 1);
    }
}

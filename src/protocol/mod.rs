//! Protocol Layer: typed packet framing
//!
//! Prinsip desain:
//! - Fixed 8-byte header, big-endian
//! - Sequence id per packet, ack id piggyback
//! - Banyak envelope bisa dikemas dalam satu packet `MULTI_DATA`

pub mod codec;
pub mod compression;
mod envelope;
mod packet;

pub use crate::error::ProtocolError;
pub use codec::{decode_payload, deserialize_packet, serialize_packet, Packet};
pub use envelope::{status, Envelope};
pub use packet::{
    next_packet_id, CompressionMethod, PacketHeader, PacketType, FIRST_PACKET_ID, HEADER_SIZE,
    MAX_PACKET_SIZE, NO_PACKET_ID, PACKET_ID_MODULUS,
};

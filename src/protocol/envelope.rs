//! Application message record carried inside packets.
//!
//! Layout: `u8 flags` lalu field yang ada, urutan tetap:
//! `id u32 | uri string | reply_to u32 | status_code u16 | payload string`.

use crate::core::{ReadBuffer, WriteBuffer};

use super::ProtocolError;

const FLAG_ID: u8 = 0x01;
const FLAG_URI: u8 = 0x02;
const FLAG_REPLY_TO: u8 = 0x04;
const FLAG_STATUS: u8 = 0x08;
const FLAG_PAYLOAD: u8 = 0x10;
const KNOWN_FLAGS: u8 = FLAG_ID | FLAG_URI | FLAG_REPLY_TO | FLAG_STATUS | FLAG_PAYLOAD;

/// Reply status codes.
pub mod status {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const HANDLER_FAILED: u16 = 500;
}

/// One logical message.
///
/// Requests carry a `uri` and, when they expect an answer, an `id`.
/// Replies carry `reply_to` (the request's id) and a `status_code`; a reply
/// is terminal and never routed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub id: Option<u32>,
    pub uri: Option<String>,
    pub reply_to: Option<u32>,
    pub payload: Option<Vec<u8>>,
    pub status_code: Option<u16>,
}

impl Envelope {
    /// Fire-and-forget message to `uri`.
    pub fn message(uri: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            uri: Some(uri.into()),
            payload: Some(payload),
            ..Self::default()
        }
    }

    /// Request to `uri` expecting a reply correlated by `id`.
    pub fn request(id: u32, uri: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: Some(id),
            ..Self::message(uri, payload)
        }
    }

    pub fn reply(reply_to: u32, status_code: u16, payload: Option<Vec<u8>>) -> Self {
        Self {
            reply_to: Some(reply_to),
            status_code: Some(status_code),
            payload,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.id.is_some() {
            flags |= FLAG_ID;
        }
        if self.uri.is_some() {
            flags |= FLAG_URI;
        }
        if self.reply_to.is_some() {
            flags |= FLAG_REPLY_TO;
        }
        if self.status_code.is_some() {
            flags |= FLAG_STATUS;
        }
        if self.payload.is_some() {
            flags |= FLAG_PAYLOAD;
        }
        flags
    }

    /// Size of [`Envelope::encode`]'s output.
    pub fn encoded_len(&self) -> usize {
        1 + self.id.map_or(0, |_| 4)
            + self.uri.as_ref().map_or(0, |u| 2 + u.len())
            + self.reply_to.map_or(0, |_| 4)
            + self.status_code.map_or(0, |_| 2)
            + self.payload.as_ref().map_or(0, |p| 2 + p.len())
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = WriteBuffer::new();
        out.write_uint8(self.flags())?;
        if let Some(id) = self.id {
            out.write_uint32(id)?;
        }
        if let Some(uri) = &self.uri {
            out.write_string(uri.as_bytes())?;
        }
        if let Some(reply_to) = self.reply_to {
            out.write_uint32(reply_to)?;
        }
        if let Some(status_code) = self.status_code {
            out.write_uint16(status_code)?;
        }
        if let Some(payload) = &self.payload {
            out.write_string(payload)?;
        }
        Ok(out.into_inner())
    }

    /// Decode exactly one envelope; trailing bytes are malformed.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = ReadBuffer::from_bytes(data);
        let malformed = |reason: &str| ProtocolError::MalformedEnvelope(reason.to_string());

        let flags = input.read_uint8().map_err(|_| malformed("empty envelope"))?;
        if flags & !KNOWN_FLAGS != 0 {
            return Err(malformed("unknown flag bits"));
        }

        let mut envelope = Envelope::default();
        if flags & FLAG_ID != 0 {
            envelope.id = Some(input.read_uint32().map_err(|_| malformed("truncated id"))?);
        }
        if flags & FLAG_URI != 0 {
            let raw = input.read_string().map_err(|_| malformed("truncated uri"))?;
            envelope.uri = Some(String::from_utf8(raw).map_err(|_| malformed("uri is not utf-8"))?);
        }
        if flags & FLAG_REPLY_TO != 0 {
            envelope.reply_to = Some(
                input
                    .read_uint32()
                    .map_err(|_| malformed("truncated reply_to"))?,
            );
        }
        if flags & FLAG_STATUS != 0 {
            envelope.status_code = Some(
                input
                    .read_uint16()
                    .map_err(|_| malformed("truncated status_code"))?,
            );
        }
        if flags & FLAG_PAYLOAD != 0 {
            envelope.payload = Some(
                input
                    .read_string()
                    .map_err(|_| malformed("truncated payload"))?,
            );
        }
        if !input.is_empty() {
            return Err(malformed("trailing bytes"));
        }
        Ok(envelope)
    }
}

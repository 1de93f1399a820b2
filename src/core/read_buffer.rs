//! Append-then-consume input buffer.
//!
//! Data masuk lewat `feed`, dibaca dari depan. Read yang kekurangan data
//! mengembalikan `BufferError::Incomplete` dan tidak mengonsumsi apa pun,
//! jadi caller cukup coba lagi setelah byte berikutnya datang.

use super::BufferError;

/// Compact once this many consumed bytes sit at the front.
const COMPACT_THRESHOLD: usize = 64 * 1024;

#[derive(Debug, Default, Clone)]
pub struct ReadBuffer {
    buffer: Vec<u8>,
    read_pos: usize,
}

macro_rules! read_be {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty, BufferError> {
            const N: usize = std::mem::size_of::<$ty>();
            let bytes = self.read_raw(N)?;
            let mut raw = [0u8; N];
            raw.copy_from_slice(bytes);
            Ok(<$ty>::from_be_bytes(raw))
        }
    };
}

impl ReadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer pre-filled with `data`, used to parse a complete packet.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            buffer: data.to_vec(),
            read_pos: 0,
        }
    }

    /// Append received bytes.
    pub fn feed(&mut self, data: &[u8]) {
        if self.read_pos >= COMPACT_THRESHOLD || self.read_pos == self.buffer.len() {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    pub fn can_read(&self, length: usize) -> bool {
        self.remaining() >= length
    }

    #[inline]
    pub fn readable(&self) -> &[u8] {
        &self.buffer[self.read_pos..]
    }

    fn ensure_can_read(&self, length: usize) -> Result<(), BufferError> {
        if self.can_read(length) {
            Ok(())
        } else {
            Err(BufferError::Incomplete {
                needed: length,
                available: self.remaining(),
            })
        }
    }

    /// Look at the next `length` bytes without consuming them.
    pub fn peek(&self, length: usize) -> Result<&[u8], BufferError> {
        self.ensure_can_read(length)?;
        Ok(&self.buffer[self.read_pos..self.read_pos + length])
    }

    pub fn skip(&mut self, length: usize) -> Result<(), BufferError> {
        self.ensure_can_read(length)?;
        self.read_pos += length;
        Ok(())
    }

    pub fn read_raw(&mut self, length: usize) -> Result<&[u8], BufferError> {
        self.ensure_can_read(length)?;
        let start = self.read_pos;
        self.read_pos += length;
        Ok(&self.buffer[start..self.read_pos])
    }

    /// Reads a u16 length prefix and the bytes it announces.
    ///
    /// Nothing is consumed unless the whole string is available.
    pub fn read_string(&mut self) -> Result<Vec<u8>, BufferError> {
        let prefix = self.peek(2)?;
        let length = u16::from_be_bytes([prefix[0], prefix[1]]) as usize;
        self.ensure_can_read(2 + length)?;
        self.read_pos += 2;
        Ok(self.read_raw(length)?.to_vec())
    }

    read_be!(read_int8, i8);
    read_be!(read_uint8, u8);
    read_be!(read_int16, i16);
    read_be!(read_uint16, u16);
    read_be!(read_int32, i32);
    read_be!(read_uint32, u32);
    read_be!(read_float32, f32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WriteBuffer;

    #[test]
    fn test_typed_reads_match_writes() {
        let mut out = WriteBuffer::new();
        out.write_int8(-5).unwrap();
        out.write_uint8(200).unwrap();
        out.write_int16(-300).unwrap();
        out.write_uint16(60_000).unwrap();
        out.write_int32(-70_000).unwrap();
        out.write_uint32(4_000_000_000).unwrap();
        out.write_float32(2.5).unwrap();
        out.write_string(b"hex").unwrap();

        let mut input = ReadBuffer::from_bytes(out.as_bytes());
        assert_eq!(input.read_int8().unwrap(), -5);
        assert_eq!(input.read_uint8().unwrap(), 200);
        assert_eq!(input.read_int16().unwrap(), -300);
        assert_eq!(input.read_uint16().unwrap(), 60_000);
        assert_eq!(input.read_int32().unwrap(), -70_000);
        assert_eq!(input.read_uint32().unwrap(), 4_000_000_000);
        assert_eq!(input.read_float32().unwrap(), 2.5);
        assert_eq!(input.read_string().unwrap(), b"hex");
        assert!(input.is_empty());
    }

    #[test]
    fn test_incomplete_string_consumes_nothing() {
        let mut input = ReadBuffer::new();
        input.feed(&[0x00, 0x05, b'a', b'b']);

        assert_eq!(
            input.read_string(),
            Err(BufferError::Incomplete {
                needed: 7,
                available: 4
            })
        );
        assert_eq!(input.remaining(), 4);

        input.feed(b"cde");
        assert_eq!(input.read_string().unwrap(), b"abcde");
        assert!(input.is_empty());
    }

    #[test]
    fn test_peek_and_skip() {
        let mut input = ReadBuffer::from_bytes(b"abcdef");
        assert_eq!(input.peek(3).unwrap(), b"abc");
        input.skip(2).unwrap();
        assert_eq!(input.peek(2).unwrap(), b"cd");
        assert!(input.skip(10).is_err());
        assert_eq!(input.remaining(), 4);
    }

    #[test]
    fn test_feed_after_full_consumption_compacts() {
        let mut input = ReadBuffer::new();
        input.feed(b"xy");
        input.skip(2).unwrap();
        input.feed(b"z");
        assert_eq!(input.readable(), b"z");
    }
}

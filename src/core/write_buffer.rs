//! Bounded append-only byte accumulator.
//!
//! Semua integer dan float ditulis big-endian (network order).
//! Setiap write atomic: berhasil penuh atau buffer tidak berubah.

use super::BufferError;

/// Growable output buffer with an optional size bound.
///
/// Channels use an unbounded instance as their socket output queue; the
/// packet codec uses a bounded one so that an oversized packet is rejected
/// instead of truncated.
#[derive(Debug, Default, Clone)]
pub struct WriteBuffer {
    buffer: Vec<u8>,
    max_size: Option<usize>,
}

impl WriteBuffer {
    /// Unbounded buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer that refuses to grow past `max_size` bytes.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(max_size),
            max_size: Some(max_size),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Remaining room before the bound is hit (`usize::MAX` when unbounded).
    #[inline]
    pub fn available(&self) -> usize {
        match self.max_size {
            Some(max) => max.saturating_sub(self.buffer.len()),
            None => usize::MAX,
        }
    }

    #[inline]
    pub fn can_write(&self, length: usize) -> bool {
        length <= self.available()
    }

    /// Bytes a `write_string` of `data` would take.
    #[inline]
    pub fn string_size(data: &[u8]) -> usize {
        2 + data.len()
    }

    #[inline]
    pub fn can_write_string(&self, data: &[u8]) -> bool {
        self.can_write(Self::string_size(data))
    }

    fn ensure_can_write(&self, length: usize) -> Result<(), BufferError> {
        if self.can_write(length) {
            Ok(())
        } else {
            Err(BufferError::Overflow {
                requested: length,
                available: self.available(),
            })
        }
    }

    pub fn write_raw(&mut self, data: &[u8]) -> Result<(), BufferError> {
        self.ensure_can_write(data.len())?;
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Writes a u16 length prefix followed by the bytes.
    pub fn write_string(&mut self, data: &[u8]) -> Result<(), BufferError> {
        let len = u16::try_from(data.len()).map_err(|_| BufferError::StringTooLong(data.len()))?;
        // Check the whole record up front so a failed write leaves no prefix behind
        self.ensure_can_write(Self::string_size(data))?;
        self.buffer.extend_from_slice(&len.to_be_bytes());
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    pub fn write_int8(&mut self, value: i8) -> Result<(), BufferError> {
        self.write_raw(&value.to_be_bytes())
    }

    pub fn write_uint8(&mut self, value: u8) -> Result<(), BufferError> {
        self.write_raw(&[value])
    }

    pub fn write_int16(&mut self, value: i16) -> Result<(), BufferError> {
        self.write_raw(&value.to_be_bytes())
    }

    pub fn write_uint16(&mut self, value: u16) -> Result<(), BufferError> {
        self.write_raw(&value.to_be_bytes())
    }

    pub fn write_int32(&mut self, value: i32) -> Result<(), BufferError> {
        self.write_raw(&value.to_be_bytes())
    }

    pub fn write_uint32(&mut self, value: u32) -> Result<(), BufferError> {
        self.write_raw(&value.to_be_bytes())
    }

    pub fn write_float32(&mut self, value: f32) -> Result<(), BufferError> {
        self.write_raw(&value.to_be_bytes())
    }

    /// Drop `n` bytes from the front, e.g. after a partial socket send.
    pub fn skip(&mut self, n: usize) {
        let n = n.min(self.buffer.len());
        self.buffer.drain(..n);
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_layout() {
        let mut buf = WriteBuffer::new();
        buf.write_uint16(0x0102).unwrap();
        buf.write_int32(-2).unwrap();
        buf.write_float32(1.0).unwrap();
        assert_eq!(
            buf.as_bytes(),
            &[0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFE, 0x3F, 0x80, 0x00, 0x00]
        );
    }

    #[test]
    fn test_overflow_is_atomic() {
        let mut buf = WriteBuffer::with_max_size(6);
        buf.write_uint16(7).unwrap();

        // 2-byte prefix would fit, the body would not
        let err = buf.write_string(b"abcde").unwrap_err();
        assert_eq!(
            err,
            BufferError::Overflow {
                requested: 7,
                available: 4
            }
        );
        assert_eq!(buf.len(), 2);

        buf.write_string(b"ab").unwrap();
        assert_eq!(buf.available(), 0);
        assert!(buf.write_uint8(1).is_err());
    }

    #[test]
    fn test_string_too_long() {
        let mut buf = WriteBuffer::new();
        let big = vec![0u8; 70_000];
        assert_eq!(
            buf.write_string(&big),
            Err(BufferError::StringTooLong(70_000))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_skip_drains_front() {
        let mut buf = WriteBuffer::new();
        buf.write_raw(b"hello").unwrap();
        buf.skip(2);
        assert_eq!(buf.as_bytes(), b"llo");
        buf.skip(10);
        assert!(buf.is_empty());
    }
}

//! Core module: byte buffers untuk wire encoding
//!
//! Prinsip desain:
//! - Network byte order: semua integer/float big-endian
//! - Atomic writes: overflow ditolak, bukan di-truncate
//! - Incomplete reads: "belum cukup data" beda dengan "data rusak"

mod read_buffer;
mod write_buffer;

pub use read_buffer::ReadBuffer;
pub use write_buffer::WriteBuffer;

/// Buffer-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// A write would exceed the buffer's size bound.
    #[error("buffer overflow: {requested} bytes requested, {available} available")]
    Overflow { requested: usize, available: usize },

    /// Not enough buffered bytes yet; retry once more data arrives.
    #[error("not enough data: {needed} bytes needed, {available} available")]
    Incomplete { needed: usize, available: usize },

    /// A length-prefixed string longer than the u16 prefix can express.
    #[error("string of {0} bytes does not fit a u16 length prefix")]
    StringTooLong(usize),
}

//! zlib payload compression.
//!
//! Payload besar dikompres sebelum dikirim; payload kecil dan payload yang
//! tidak menyusut tetap dikirim apa adanya.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::ProtocolError;
use crate::config::CompressionConfig;

/// Compress `data` if the config asks for it and it actually shrinks.
///
/// Returns `None` when the payload should go out uncompressed.
pub fn maybe_compress(data: &[u8], config: &CompressionConfig) -> Option<Vec<u8>> {
    if !config.enabled || data.len() < config.threshold {
        return None;
    }
    let compressed = compress(data, config.level).ok()?;
    if compressed.len() < data.len() {
        Some(compressed)
    } else {
        None
    }
}

pub fn compress(data: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(level));
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inflate a zlib stream, refusing output larger than `max_size`.
pub fn decompress(data: &[u8], max_size: usize) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::new();
    // One extra byte tells "exactly max_size" apart from "too big"
    let limit = max_size as u64 + 1;
    ZlibDecoder::new(data)
        .take(limit)
        .read_to_end(&mut out)
        .map_err(|e| ProtocolError::Decompress(e.to_string()))?;
    if out.len() > max_size {
        return Err(ProtocolError::DecompressedTooLarge { max: max_size });
    }
    Ok(out)
}

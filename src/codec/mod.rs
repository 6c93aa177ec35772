//! Block compression.
//!
//! The store treats compression as an opaque `compress`/`decompress` pair
//! fixed at build time — no codec identifier is ever written to disk, so a
//! store must always be read back with the same [`BlockCodec`] it was
//! written with. [`ZstdCodec`] is the production default; [`Lz4Codec`] and
//! [`NoneCodec`] exist for benchmarking and for deterministic small-block
//! tests.

use thiserror::Error;

/// Largest value a compressed block's length can take in an index entry
/// slot (signed 16-bit), and the point past which a payload can no longer
/// be recorded.
pub const MAX_BLOCK_PAYLOAD: usize = i16::MAX as usize;

/// Scratch-buffer size bound assumed for any single compressed payload.
pub const CHUNK: usize = 65536;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("compression failed: {0}")]
    Compression(String),
    #[error("decompression failed: {0}")]
    Decompression(String),
    #[error("decompressed length {actual} does not match expected block size {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("compressed payload length {0} exceeds the signed 16-bit index field")]
    PayloadTooLarge(usize),
}

/// A compress/decompress pair applied uniformly to every block in a store.
pub trait BlockCodec: Send + Sync {
    /// Compress `block` (exactly the store's block size) into a payload
    /// suitable for `.dat`. Must never return an empty payload — an empty
    /// payload would be indistinguishable from the "unused slot" sentinel.
    fn compress(&self, block: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decompress `payload` back into exactly `block_size` bytes.
    fn decompress(&self, payload: &[u8], block_size: usize) -> Result<Vec<u8>, CodecError>;
}

/// Verify a compressed length fits the index entry's signed 16-bit field.
pub fn checked_payload_len(len: usize) -> Result<i16, CodecError> {
    if len == 0 || len > MAX_BLOCK_PAYLOAD {
        return Err(CodecError::PayloadTooLarge(len));
    }
    Ok(len as i16)
}

/// Zstandard, the production default codec.
pub struct ZstdCodec {
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        ZstdCodec { level: 3 }
    }
}

impl BlockCodec for ZstdCodec {
    fn compress(&self, block: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::encode_all(block, self.level).map_err(|e| CodecError::Compression(e.to_string()))
    }

    fn decompress(&self, payload: &[u8], block_size: usize) -> Result<Vec<u8>, CodecError> {
        let out = zstd::decode_all(payload).map_err(|e| CodecError::Decompression(e.to_string()))?;
        if out.len() != block_size {
            return Err(CodecError::LengthMismatch {
                expected: block_size,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

/// LZ4, kept for throughput comparisons in the benchmark suite.
pub struct Lz4Codec;

impl BlockCodec for Lz4Codec {
    fn compress(&self, block: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::compress_prepend_size(block))
    }

    fn decompress(&self, payload: &[u8], block_size: usize) -> Result<Vec<u8>, CodecError> {
        let out = lz4_flex::decompress_size_prepended(payload)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        if out.len() != block_size {
            return Err(CodecError::LengthMismatch {
                expected: block_size,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

/// Identity "codec": stores blocks uncompressed. Useful in tests where `B`
/// is small enough that Zstd's frame overhead makes payload sizes harder to
/// reason about by hand.
pub struct NoneCodec;

impl BlockCodec for NoneCodec {
    fn compress(&self, block: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(block.to_vec())
    }

    fn decompress(&self, payload: &[u8], block_size: usize) -> Result<Vec<u8>, CodecError> {
        if payload.len() != block_size {
            return Err(CodecError::LengthMismatch {
                expected: block_size,
                actual: payload.len(),
            });
        }
        Ok(payload.to_vec())
    }
}

//! Block compression and decompression
//!
//! Unity stores LZMA1 data as the 5-byte properties header followed directly
//! by the compressed stream; the 8-byte size field of the `.lzma` container is
//! left out and supplied from the block table instead.

use std::io::{Cursor, Read, Write};

use xz2::read::XzDecoder;
use xz2::stream::{LzmaOptions, MatchFinder, Mode, Stream};
use xz2::write::XzEncoder;

use super::error::{BundleError, BundleResult};
use super::flags::CompressionType;

/// Size of the LZMA properties header
const LZMA_PROPERTIES_SIZE: usize = 5;

/// Most output one LZ4 input byte can produce (a 0xFF match-length byte)
const LZ4_MAX_RATIO: u64 = 255;

/// Generous bound on LZMA expansion; real data stays far below 10000:1
const LZMA_MAX_RATIO: u64 = 1 << 16;

/// Largest output `compressed_len` bytes can decompress to.
///
/// Sizes declared in the blocks info are untrusted; anything above this
/// bound is rejected before memory is reserved for it.
pub fn max_decompressed_size(compression: CompressionType, compressed_len: usize) -> u64 {
    let compressed_len = compressed_len as u64;
    match compression {
        CompressionType::None | CompressionType::Lzham => compressed_len,
        CompressionType::Lz4 | CompressionType::Lz4Hc => {
            compressed_len.saturating_mul(LZ4_MAX_RATIO).saturating_add(16)
        }
        CompressionType::Lzma => compressed_len.saturating_mul(LZMA_MAX_RATIO),
    }
}

/// Reserve `size` bytes, failing instead of aborting
fn reserve(size: usize) -> BundleResult<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(size).map_err(|e| {
        BundleError::InvalidBlocksInfo(format!("cannot allocate {size} bytes: {e}"))
    })?;
    Ok(buffer)
}

/// Decompress one block (or the blocks info) to exactly `uncompressed_size`
/// bytes
pub fn decompress_block(
    data: &[u8],
    compression: CompressionType,
    uncompressed_size: usize,
) -> BundleResult<Vec<u8>> {
    let limit = max_decompressed_size(compression, data.len());
    if uncompressed_size as u64 > limit {
        return Err(BundleError::InvalidBlocksInfo(format!(
            "{compression} block of {} bytes cannot expand to {uncompressed_size} bytes",
            data.len()
        )));
    }

    let decompressed = match compression {
        CompressionType::None => data.to_vec(),
        CompressionType::Lz4 | CompressionType::Lz4Hc => {
            let mut out = reserve(uncompressed_size)?;
            out.resize(uncompressed_size, 0);
            let written = lz4_flex::block::decompress_into(data, &mut out).map_err(|e| {
                BundleError::DecompressionFailed(format!("LZ4 decompression failed: {e}"))
            })?;
            out.truncate(written);
            out
        }
        CompressionType::Lzma => lzma_decompress(data, uncompressed_size)?,
        CompressionType::Lzham => return Err(BundleError::UnsupportedCompression("lzham")),
    };

    if decompressed.len() != uncompressed_size {
        return Err(BundleError::DecompressionFailed(format!(
            "{compression} size mismatch: expected {uncompressed_size}, got {}",
            decompressed.len()
        )));
    }
    Ok(decompressed)
}

fn lzma_decompress(data: &[u8], uncompressed_size: usize) -> BundleResult<Vec<u8>> {
    if data.len() < LZMA_PROPERTIES_SIZE {
        return Err(BundleError::DecompressionFailed(
            "LZMA data too short - missing properties header".to_string(),
        ));
    }

    let mut header = Vec::with_capacity(LZMA_PROPERTIES_SIZE + 8);
    header.extend_from_slice(&data[..LZMA_PROPERTIES_SIZE]);
    header.extend_from_slice(&(uncompressed_size as u64).to_le_bytes());
    let input = Cursor::new(header).chain(&data[LZMA_PROPERTIES_SIZE..]);

    let stream = Stream::new_lzma_decoder(u64::MAX).map_err(|e| {
        BundleError::DecompressionFailed(format!("LZMA decoder setup failed: {e}"))
    })?;
    let mut decoder = XzDecoder::new_stream(input, stream);

    let mut out = reserve(uncompressed_size)?;
    decoder
        .take(uncompressed_size as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| BundleError::DecompressionFailed(format!("LZMA decompression failed: {e}")))?;
    Ok(out)
}

/// Compress one block.
///
/// LZ4 and LZ4HC both produce a plain LZ4 block. LZMA uses the parameters
/// Unity's own encoder uses.
pub fn compress_block(data: &[u8], compression: CompressionType) -> BundleResult<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Lz4 | CompressionType::Lz4Hc => Ok(lz4_flex::block::compress(data)),
        CompressionType::Lzma => lzma_compress(data),
        CompressionType::Lzham => Err(BundleError::UnsupportedCompression("lzham")),
    }
}

fn lzma_failed(e: impl std::fmt::Display) -> BundleError {
    BundleError::CompressionFailed(format!("LZMA compression failed: {e}"))
}

fn lzma_compress(data: &[u8]) -> BundleResult<Vec<u8>> {
    let mut options = LzmaOptions::new_preset(6).map_err(lzma_failed)?;
    options
        .dict_size(0x0080_0000)
        .literal_context_bits(3)
        .literal_position_bits(0)
        .position_bits(2)
        .mode(Mode::Normal)
        .match_finder(MatchFinder::BinaryTree4)
        .nice_len(123);
    let stream = Stream::new_lzma_encoder(&options).map_err(lzma_failed)?;

    let mut encoder = XzEncoder::new_stream(Vec::new(), stream);
    encoder.write_all(data)?;
    let encoded = encoder.finish()?;
    if encoded.len() < LZMA_PROPERTIES_SIZE + 8 {
        return Err(lzma_failed("output too small"));
    }

    let mut out = Vec::with_capacity(encoded.len() - 8);
    out.extend_from_slice(&encoded[..LZMA_PROPERTIES_SIZE]);
    out.extend_from_slice(&encoded[LZMA_PROPERTIES_SIZE + 8..]);
    Ok(out)
}

use std::borrow::Cow;
use std::io::Read;
use std::sync::Arc;

use zarrs::array::codec::{Bz2Codec, Bz2CompressionLevel, GzipCodec};
use zarrs_codec::{BytesRepresentation, BytesToBytesCodecTraits, CodecOptions};

use crate::block::{BlockData, DataBlock};
use crate::chunk::{N5ChunkHeader, N5ChunkMode};
use crate::error::FormatError;
use crate::metadata::{DatasetAttributes, N5Compression};

fn n5compression_to_b2b(
    n5c: &N5Compression,
) -> Result<Option<Arc<dyn BytesToBytesCodecTraits>>, FormatError> {
    match n5c {
        N5Compression::Bzip2 { block_size } => Ok(Some(Arc::new(Bz2Codec::new(
            Bz2CompressionLevel::new(*block_size as u32)
                .map_err(|n| FormatError::new(format!("invalid bz2 block size {n}")))?,
        )))),
        N5Compression::Gzip {
            level,
            use_zlib: false,
        } => {
            // -1 is the zlib default level
            let level = u32::try_from(*level).unwrap_or(6);
            Ok(Some(Arc::new(GzipCodec::new(level).map_err(|e| {
                FormatError::new(format!("invalid gzip compression level: {e}"))
            })?)))
        }
        _ => Ok(None),
    }
}

fn read_all(mut decoder: impl Read, name: &str) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| FormatError::new(format!("{name} decompression failed: {e}")))?;
    Ok(out)
}

fn disabled(n5c: &N5Compression) -> FormatError {
    FormatError::new(format!(
        "{} compression is not enabled in this build",
        n5c.type_name()
    ))
}

impl N5Compression {
    /// Decompress a block payload.
    pub fn decompress<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, FormatError> {
        if let Some(codec) = n5compression_to_b2b(self)? {
            return codec
                .decode(
                    Cow::Borrowed(bytes),
                    &BytesRepresentation::UnboundedSize,
                    &CodecOptions::default(),
                )
                .map_err(|e| {
                    FormatError::new(format!("{} decompression failed: {e}", self.type_name()))
                });
        }

        match self {
            N5Compression::Raw => Ok(Cow::Borrowed(bytes)),
            N5Compression::Gzip { use_zlib: true, .. } => {
                read_all(flate2::read::ZlibDecoder::new(bytes), "zlib").map(Cow::Owned)
            }
            #[cfg(feature = "xz")]
            N5Compression::Xz { .. } => {
                read_all(xz2::read::XzDecoder::new(bytes), "xz").map(Cow::Owned)
            }
            #[cfg(feature = "lz4")]
            N5Compression::Lz4 { .. } => {
                let decoder = lz4::Decoder::new(bytes)
                    .map_err(|e| FormatError::new(format!("lz4 decompression failed: {e}")))?;
                read_all(decoder, "lz4").map(Cow::Owned)
            }
            #[cfg(feature = "zstd")]
            N5Compression::Zstd { .. } => zstd::stream::decode_all(bytes)
                .map(Cow::Owned)
                .map_err(|e| FormatError::new(format!("zstd decompression failed: {e}"))),
            c => Err(disabled(c)),
        }
    }
}

/// Decode the bytes of one stored block.
///
/// The header must agree with `attributes`, and the decompressed payload must hold
/// exactly the number of elements the header declares.
pub fn decode_block(
    bytes: &[u8],
    attributes: &DatasetAttributes,
    grid_position: Vec<i64>,
) -> Result<DataBlock, FormatError> {
    let header = N5ChunkHeader::from_bytes(bytes)?;

    if matches!(header.mode, N5ChunkMode::Object) {
        return Err(FormatError::new("unsupported N5 block mode: object"));
    }
    header.validate(attributes)?;

    let payload = &bytes[header.data_offset()..];
    let decompressed = attributes.compression().decompress(payload)?;

    let data_type = attributes.data_type();
    let expected = header
        .num_elements()
        .checked_mul(data_type.size() as u64)
        .ok_or_else(|| FormatError::new("block element count overflows"))?;
    if decompressed.len() as u64 != expected {
        return Err(FormatError::new(format!(
            "decompressed block has {} bytes, expected {expected} ({} x {data_type})",
            decompressed.len(),
            header.num_elements(),
        )));
    }

    let data = BlockData::from_be_bytes(data_type, &decompressed);
    Ok(DataBlock::new(header.shape, grid_position, data))
}

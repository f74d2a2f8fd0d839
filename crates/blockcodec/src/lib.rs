//! # BlockCodec
//!
//! Groups sorted cells into fixed-target-size blocks and writes/reads them
//! with an optional cell encoding ([`Encoding`]) and a checksum covering the
//! block payload.
//!
//! A block is `header || payload`. The header records the block's logical
//! type, its on-disk and uncompressed sizes, the offset of the previous
//! block of the same type (so a reader can walk a chain backwards without an
//! index), and — for the checksummed header variant — the checksum type and
//! chunking.

mod encoding;
mod header;

pub use encoding::Encoding;
pub use header::{BlockHeader, ChecksumFields, HeaderVersion, HEADER_LEN_V2, HEADER_LEN_V3};

use std::io::{self, Write};

use crc32fast::Hasher as Crc32;
use keycodec::Cell;
use thiserror::Error;

/// The nine block kinds named in the data model's SortedFile physical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Data,
    EncodedData,
    LeafIndex,
    IntermediateIndex,
    RootIndex,
    BloomChunk,
    BloomMeta,
    FileInfo,
    Trailer,
}

impl BlockType {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            BlockType::Data => 0,
            BlockType::EncodedData => 1,
            BlockType::LeafIndex => 2,
            BlockType::IntermediateIndex => 3,
            BlockType::RootIndex => 4,
            BlockType::BloomChunk => 5,
            BlockType::BloomMeta => 6,
            BlockType::FileInfo => 7,
            BlockType::Trailer => 8,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CorruptBlock> {
        Ok(match code {
            0 => BlockType::Data,
            1 => BlockType::EncodedData,
            2 => BlockType::LeafIndex,
            3 => BlockType::IntermediateIndex,
            4 => BlockType::RootIndex,
            5 => BlockType::BloomChunk,
            6 => BlockType::BloomMeta,
            7 => BlockType::FileInfo,
            8 => BlockType::Trailer,
            other => return Err(CorruptBlock::UnknownBlockType(other)),
        })
    }
}

/// Block-payload compression. Only `None` is implemented; the field is
/// threaded through the header so a real codec can be added later without a
/// format break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
}

/// Checksum algorithm covering a block's on-disk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumType {
    None,
    Crc32,
}

impl ChecksumType {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            ChecksumType::None => 0,
            ChecksumType::Crc32 => 1,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CorruptBlock> {
        match code {
            0 => Ok(ChecksumType::None),
            1 => Ok(ChecksumType::Crc32),
            other => Err(CorruptBlock::UnknownChecksumType(other)),
        }
    }
}

/// Errors surfaced while reading an encoded block.
#[derive(Debug, Error)]
pub enum CorruptBlock {
    #[error("truncated block")]
    Truncated,
    #[error("unknown block type code: {0}")]
    UnknownBlockType(u8),
    #[error("unknown encoding code: {0}")]
    UnknownEncoding(u8),
    #[error("unknown checksum type code: {0}")]
    UnknownChecksumType(u8),
    #[error("invalid varint delta width: {0}")]
    BadVarintWidth(u8),
    #[error("shared prefix longer than previous row")]
    BadSharedPrefix,
    #[error("invalid cell type byte")]
    BadCellType,
    #[error("block type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch { expected: BlockType, found: BlockType },
    #[error("checksum mismatch on block")]
    ChecksumMismatch,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A block ready to be appended to a [`SortedFile`](https://docs.rs/sortedfile):
/// the serialized header+payload bytes and the offset it will occupy.
pub struct EncodedBlock {
    pub bytes: Vec<u8>,
    pub header: BlockHeader,
}

/// Encodes `cells` as a single block of `block_type`, using `encoding` for
/// `Data`/`EncodedData` blocks (ignored for index/meta block types, which
/// always use [`Encoding::None`]).
///
/// `prev_offset` is the offset of the previous block of the same type
/// (`0` if this is the first), threaded into the header so the block chain
/// can be walked backwards.
pub fn write_block(
    block_type: BlockType,
    cells: &[Cell],
    encoding: Encoding,
    checksum_type: ChecksumType,
    prev_offset: u64,
) -> Result<EncodedBlock, CorruptBlock> {
    let mut payload = Vec::new();
    encoding::encode_cells(&mut payload, cells, encoding)?;
    let uncompressed_size = payload.len() as u32;
    // Compression::None: on-disk size equals uncompressed size.
    let on_disk_size = uncompressed_size;

    let mut bytes = Vec::new();
    let header = match checksum_type {
        ChecksumType::None => {
            let header = BlockHeader {
                block_type,
                on_disk_size_without_header: on_disk_size,
                uncompressed_size_without_header: uncompressed_size,
                prev_block_offset: prev_offset,
                checksum: None,
            };
            header.write(&mut bytes)?;
            bytes.write_all(&payload)?;
            header
        }
        ChecksumType::Crc32 => {
            let checksum = crc32(&payload);
            let on_disk_data_size_with_checksum = on_disk_size + 4;
            let header = BlockHeader {
                block_type,
                on_disk_size_without_header: on_disk_size,
                uncompressed_size_without_header: uncompressed_size,
                prev_block_offset: prev_offset,
                checksum: Some(ChecksumFields {
                    checksum_type: ChecksumType::Crc32,
                    bytes_per_checksum: on_disk_size.max(1),
                    on_disk_data_size_with_checksum,
                }),
            };
            header.write(&mut bytes)?;
            bytes.write_all(&payload)?;
            bytes.write_all(&checksum.to_le_bytes())?;
            header
        }
    };

    Ok(EncodedBlock { bytes, header })
}

/// Decodes a block previously produced by [`write_block`].
///
/// `bytes` must start exactly at the block header. If `expect_checksum` is
/// true the 33-byte header is read and the trailing checksum is verified
/// (`ChecksumMismatch` on failure); a v3 reader that finds no checksum
/// recorded in the trailer should pass `false` here, per the tolerate-absent-
/// checksum contract.
pub fn read_block(
    bytes: &[u8],
    expected_type: BlockType,
    encoding: Encoding,
    expect_checksum: bool,
) -> Result<(BlockHeader, Vec<Cell>), CorruptBlock> {
    let mut cursor = bytes;
    let header = BlockHeader::read(&mut cursor, expect_checksum)?;
    if header.block_type != expected_type {
        return Err(CorruptBlock::TypeMismatch {
            expected: expected_type,
            found: header.block_type,
        });
    }

    let payload_len = header.on_disk_size_without_header as usize;
    if cursor.len() < payload_len {
        return Err(CorruptBlock::Truncated);
    }
    let payload = &cursor[..payload_len];

    if let Some(c) = &header.checksum {
        let checksum_start = payload_len;
        let checksum_end = checksum_start + 4;
        if cursor.len() < checksum_end {
            return Err(CorruptBlock::Truncated);
        }
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&cursor[checksum_start..checksum_end]);
        let stored = u32::from_le_bytes(buf);
        if c.checksum_type == ChecksumType::Crc32 && crc32(payload) != stored {
            return Err(CorruptBlock::ChecksumMismatch);
        }
    }

    let cell_encoding = match expected_type {
        BlockType::Data | BlockType::EncodedData => encoding,
        _ => Encoding::None,
    };
    let cells = encoding::decode_cells(payload, cell_encoding)?;
    Ok((header, cells))
}

fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(data);
    hasher.finalize()
}

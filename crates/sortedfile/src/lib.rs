//! # SortedFile
//!
//! An immutable, on-disk table segment: a run of [`blockcodec`] DATA blocks
//! covering a sorted run of cells, a bottom-up multi-level index, an optional
//! bloom filter, a FILE_INFO map, and a fixed-size TRAILER that is the last
//! thing written — a file only becomes visible to readers once its TRAILER
//! is flushed and the temp file is renamed into place.
//!
//! Physical block order on disk: `DATA*  LEAF_INDEX*  [INTERMEDIATE_INDEX*]
//! ROOT_INDEX  [BLOOM_META]  FILE_INFO  TRAILER`.
//!
//! Index and data blocks carry a pointer cell whose row/family/qualifier/
//! timestamp/type mirror the first real cell of the block they point at, and
//! whose value is a serialized [`BlockPointer`]. That lets every index level
//! round-trip through the same [`blockcodec::write_block`]/[`blockcodec::read_block`]
//! machinery as data blocks, and keeps ordering consistent with
//! [`keycodec::compare`] instead of a second, ad-hoc key comparator.

mod reader;
mod trailer;
mod writer;

pub use reader::SortedFileHandle;
pub use trailer::Trailer;
pub use writer::SortedFileWriter;

use std::io;

use keycodec::CorruptEncoding;
use thiserror::Error;

/// Granularity at which the optional bloom filter records presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomGranularity {
    /// One bloom entry per distinct row.
    Row,
    /// One bloom entry per distinct (row, family, qualifier).
    RowColumn,
}

impl BloomGranularity {
    fn code(self) -> u8 {
        match self {
            BloomGranularity::Row => 0,
            BloomGranularity::RowColumn => 1,
        }
    }

    fn from_code(code: u8) -> Result<Self, SortedFileError> {
        match code {
            0 => Ok(BloomGranularity::Row),
            1 => Ok(BloomGranularity::RowColumn),
            other => Err(SortedFileError::CorruptFile(format!(
                "unknown bloom granularity code: {other}"
            ))),
        }
    }

    /// The bytes a cell contributes to the bloom filter at this granularity.
    fn key_bytes(self, cell: &keycodec::Cell) -> Vec<u8> {
        match self {
            BloomGranularity::Row => cell.row.clone(),
            BloomGranularity::RowColumn => {
                let mut buf = Vec::with_capacity(cell.row.len() + cell.family.len() + cell.qualifier.len() + 2);
                buf.extend_from_slice(&cell.row);
                buf.push(0);
                buf.extend_from_slice(&cell.family);
                buf.push(0);
                buf.extend_from_slice(&cell.qualifier);
                buf
            }
        }
    }
}

/// Well-known keys stored in the FILE_INFO map.
pub mod file_info_keys {
    pub const FIRST_KEY: &str = "FIRST_KEY";
    pub const LAST_KEY: &str = "LAST_KEY";
    pub const ENCODING: &str = "ENCODING";
    pub const BLOOM_GRANULARITY: &str = "BLOOM_GRANULARITY";
}

/// Offset and on-disk size of a block referenced by an index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPointer {
    pub offset: u64,
    pub on_disk_size: u32,
}

impl BlockPointer {
    fn encode(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12);
        buf.extend_from_slice(&self.offset.to_le_bytes());
        buf.extend_from_slice(&self.on_disk_size.to_le_bytes());
        buf
    }

    fn decode(bytes: &[u8]) -> Result<Self, SortedFileError> {
        if bytes.len() < 12 {
            return Err(SortedFileError::CorruptFile("truncated block pointer".into()));
        }
        let mut off = [0u8; 8];
        off.copy_from_slice(&bytes[0..8]);
        let mut size = [0u8; 4];
        size.copy_from_slice(&bytes[8..12]);
        Ok(Self {
            offset: u64::from_le_bytes(off),
            on_disk_size: u32::from_le_bytes(size),
        })
    }
}

/// The on-disk path for `file_id` inside a family directory, shared by the
/// writer (which creates it) and anyone reopening a store's existing files
/// on restart.
pub fn sorted_file_path(dir: &std::path::Path, file_id: u64) -> std::path::PathBuf {
    dir.join(format!("{file_id:020}.sf"))
}

/// Default number of entries per index block before a new chunk is started.
pub const DEFAULT_INDEX_CHUNK_ENTRIES: usize = 128;

/// Default uncompressed byte target before a data block is closed.
pub const DEFAULT_DATA_BLOCK_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum SortedFileError {
    #[error("cells appended out of order")]
    OutOfOrder,
    #[error("corrupt sorted file: {0}")]
    CorruptFile(String),
    #[error("file id {0} not found")]
    NotFound(u64),
    #[error("checksum mismatch in block at offset {0}")]
    ChecksumMismatch(u64),
    #[error("block codec error: {0}")]
    Block(#[from] blockcodec::CorruptBlock),
    #[error("key codec error: {0}")]
    Key(#[from] CorruptEncoding),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests;

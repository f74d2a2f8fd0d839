//! Block header read/write.
//!
//! Mirrors the two on-disk header shapes named in the format contract: a
//! 24-byte header with no per-block checksum, and a 33-byte header that adds
//! a checksum type, a `bytesPerChecksum` chunk size, and the on-disk data
//! size including the trailing checksum bytes.

use std::io::{self, Read, Write};

use crate::{BlockType, ChecksumType};

/// Header layout in use. `V2NoChecksum` is 24 bytes, `V3Checksummed` is 33.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderVersion {
    V2NoChecksum,
    V3Checksummed,
}

pub const HEADER_LEN_V2: usize = 24;
pub const HEADER_LEN_V3: usize = 33;

/// Parsed block header, common to both on-disk versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub block_type: BlockType,
    /// Size of the payload on disk (after compression), excluding this header.
    pub on_disk_size_without_header: u32,
    /// Size of the payload once decompressed.
    pub uncompressed_size_without_header: u32,
    /// Offset of the previous block of the same type; used to walk a file backwards.
    pub prev_block_offset: u64,
    /// `Some` only for `V3Checksummed` headers.
    pub checksum: Option<ChecksumFields>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumFields {
    pub checksum_type: ChecksumType,
    pub bytes_per_checksum: u32,
    /// On-disk payload size *including* the trailing checksum bytes.
    pub on_disk_data_size_with_checksum: u32,
}

impl BlockHeader {
    #[must_use]
    pub fn version(&self) -> HeaderVersion {
        if self.checksum.is_some() {
            HeaderVersion::V3Checksummed
        } else {
            HeaderVersion::V2NoChecksum
        }
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self.version() {
            HeaderVersion::V2NoChecksum => HEADER_LEN_V2,
            HeaderVersion::V3Checksummed => HEADER_LEN_V3,
        }
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut magic = [0u8; 8];
        magic[0] = self.block_type.code();
        magic[1..4].copy_from_slice(b"BLK");
        w.write_all(&magic)?;
        w.write_all(&self.on_disk_size_without_header.to_le_bytes())?;
        w.write_all(&self.uncompressed_size_without_header.to_le_bytes())?;
        w.write_all(&self.prev_block_offset.to_le_bytes())?;
        if let Some(c) = &self.checksum {
            w.write_all(&[c.checksum_type.code()])?;
            w.write_all(&c.bytes_per_checksum.to_le_bytes())?;
            w.write_all(&c.on_disk_data_size_with_checksum.to_le_bytes())?;
        }
        Ok(())
    }

    /// Reads a header: the 33-byte checksummed form when `expect_checksum`
    /// is set, otherwise the 24-byte form (the caller decides which based on
    /// the file's TRAILER flag, per the v3-tolerates-absent-checksum contract).
    pub fn read<R: Read>(r: &mut R, expect_checksum: bool) -> io::Result<Self> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        let block_type = BlockType::from_code(magic[0])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut buf4 = [0u8; 4];
        let mut buf8 = [0u8; 8];
        r.read_exact(&mut buf4)?;
        let on_disk_size_without_header = u32::from_le_bytes(buf4);
        r.read_exact(&mut buf4)?;
        let uncompressed_size_without_header = u32::from_le_bytes(buf4);
        r.read_exact(&mut buf8)?;
        let prev_block_offset = u64::from_le_bytes(buf8);

        let checksum = if expect_checksum {
            let mut ty = [0u8; 1];
            r.read_exact(&mut ty)?;
            let checksum_type = ChecksumType::from_code(ty[0])
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            r.read_exact(&mut buf4)?;
            let bytes_per_checksum = u32::from_le_bytes(buf4);
            r.read_exact(&mut buf4)?;
            let on_disk_data_size_with_checksum = u32::from_le_bytes(buf4);
            Some(ChecksumFields {
                checksum_type,
                bytes_per_checksum,
                on_disk_data_size_with_checksum,
            })
        } else {
            None
        };

        Ok(Self {
            block_type,
            on_disk_size_without_header,
            uncompressed_size_without_header,
            prev_block_offset,
            checksum,
        })
    }
}

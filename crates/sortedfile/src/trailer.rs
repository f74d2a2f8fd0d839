//! Fixed-size TRAILER: the last bytes in a SortedFile, always at a known
//! offset from the end so a reader can find it without scanning.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub const TRAILER_MAGIC: u32 = 0x5352_5446; // ASCII-ish "SRTF"

/// Fixed on-disk length of the trailer: magic(4) + index_levels(1) +
/// root_index_offset(8) + root_index_size(4) + checksummed(1) +
/// bloom_meta_offset(8) + bloom_meta_size(4) + file_info_offset(8) +
/// file_info_size(4) + max_sequence(8) + entry_count(8).
pub const TRAILER_LEN: u64 = 4 + 1 + 8 + 4 + 1 + 8 + 4 + 8 + 4 + 8 + 8;

/// Sentinel `bloom_meta_offset` meaning "no bloom filter in this file".
const NO_BLOOM: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub root_index_offset: u64,
    pub root_index_size: u32,
    /// `1`: root index entries point directly at LEAF_INDEX blocks.
    /// `2`: root index entries point at INTERMEDIATE_INDEX blocks, which
    /// point at LEAF_INDEX blocks.
    pub index_levels: u8,
    pub bloom_meta_offset: Option<u64>,
    pub bloom_meta_size: u32,
    pub file_info_offset: u64,
    pub file_info_size: u32,
    pub max_sequence: u64,
    pub entry_count: u64,
    /// Whether blocks in this file carry the 33-byte checksummed header.
    pub checksummed: bool,
}

impl Trailer {
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(TRAILER_MAGIC)?;
        w.write_u8(self.index_levels)?;
        w.write_u64::<LittleEndian>(self.root_index_offset)?;
        w.write_u32::<LittleEndian>(self.root_index_size)?;
        w.write_u8(u8::from(self.checksummed))?;
        w.write_u64::<LittleEndian>(self.bloom_meta_offset.unwrap_or(NO_BLOOM))?;
        w.write_u32::<LittleEndian>(self.bloom_meta_size)?;
        w.write_u64::<LittleEndian>(self.file_info_offset)?;
        w.write_u32::<LittleEndian>(self.file_info_size)?;
        w.write_u64::<LittleEndian>(self.max_sequence)?;
        w.write_u64::<LittleEndian>(self.entry_count)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
        let magic = r.read_u32::<LittleEndian>()?;
        if magic != TRAILER_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad trailer magic: {magic:#x}"),
            ));
        }
        let index_levels = r.read_u8()?;
        let root_index_offset = r.read_u64::<LittleEndian>()?;
        let root_index_size = r.read_u32::<LittleEndian>()?;
        let checksummed = r.read_u8()? != 0;
        let bloom_raw = r.read_u64::<LittleEndian>()?;
        let bloom_meta_offset = if bloom_raw == NO_BLOOM { None } else { Some(bloom_raw) };
        let bloom_meta_size = r.read_u32::<LittleEndian>()?;
        let file_info_offset = r.read_u64::<LittleEndian>()?;
        let file_info_size = r.read_u32::<LittleEndian>()?;
        let max_sequence = r.read_u64::<LittleEndian>()?;
        let entry_count = r.read_u64::<LittleEndian>()?;
        Ok(Self {
            root_index_offset,
            root_index_size,
            index_levels,
            bloom_meta_offset,
            bloom_meta_size,
            file_info_offset,
            file_info_size,
            max_sequence,
            entry_count,
            checksummed,
        })
    }
}

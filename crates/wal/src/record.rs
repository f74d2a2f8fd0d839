use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use keycodec::Cell;

use crate::WalError;

/// Largest allowed frame body, guarding against a corrupt length prefix
/// causing an unbounded read.
pub const MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

/// One batch of cells committed atomically for a region at a given
/// sequence. On disk: `[record_len: u32][crc32: u32][region_id: u64]
/// [sequence: u64][cell_count: u32][cell...]`, `record_len` covering
/// everything from `crc32` onward.
pub struct WalEntry {
    pub region_id: u64,
    pub sequence: u64,
    pub edits: Vec<Cell>,
}

impl WalEntry {
    pub(crate) fn write<W: Write>(&self, w: &mut W, scratch: &mut Vec<u8>) -> Result<(), WalError> {
        scratch.clear();
        scratch.write_u64::<LittleEndian>(self.region_id)?;
        scratch.write_u64::<LittleEndian>(self.sequence)?;
        scratch.write_u32::<LittleEndian>(self.edits.len() as u32)?;
        for cell in &self.edits {
            cell.encode(scratch)?;
        }

        let crc = crc32fast::hash(scratch);
        let record_len = (scratch.len() + 4) as u32;
        w.write_u32::<LittleEndian>(record_len)?;
        w.write_u32::<LittleEndian>(crc)?;
        w.write_all(scratch)?;
        Ok(())
    }

    /// Reads one frame, returning `Ok(None)` on a clean end of stream
    /// (including a truncated tail, which is treated as "nothing more was
    /// durably written" rather than corruption).
    pub(crate) fn read<R: Read>(r: &mut R) -> Result<Option<Self>, WalError> {
        let record_len = match r.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if record_len <= 4 || record_len > MAX_RECORD_LEN {
            return Err(WalError::Corrupt);
        }

        let expected_crc = match r.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let body_len = (record_len - 4) as usize;
        let mut body = vec![0u8; body_len];
        if let Err(e) = r.read_exact(&mut body) {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                return Ok(None);
            }
            return Err(e.into());
        }

        if crc32fast::hash(&body) != expected_crc {
            return Err(WalError::Corrupt);
        }

        let mut cursor: &[u8] = &body;
        let region_id = cursor.read_u64::<LittleEndian>()?;
        let sequence = cursor.read_u64::<LittleEndian>()?;
        let cell_count = cursor.read_u32::<LittleEndian>()?;
        let mut edits = Vec::with_capacity(cell_count as usize);
        for _ in 0..cell_count {
            edits.push(Cell::decode(&mut cursor)?);
        }

        Ok(Some(WalEntry { region_id, sequence, edits }))
    }
}

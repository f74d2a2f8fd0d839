//! Data-block cell encodings.
//!
//! `NONE` writes [`Cell::encode`] output back to back (self-delimiting, so no
//! extra framing is needed). The other three progressively exploit the fact
//! that cells inside one block are already key-sorted and usually share a
//! row (and often family/qualifier) with their predecessor.

use std::io::{self, Read, Write};

use keycodec::{Cell, CellType, Tag};

use crate::CorruptBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Cells are stored back to back via [`Cell::encode`].
    None,
    /// Row bytes are split into a shared prefix (vs. the previous cell) and a suffix.
    Prefix,
    /// `Prefix`, plus family/qualifier/type are omitted when unchanged from the previous cell.
    Diff,
    /// `Diff`, plus the timestamp is stored as a variable-length delta from the previous cell.
    FastDiff,
}

impl Encoding {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Encoding::None => 0,
            Encoding::Prefix => 1,
            Encoding::Diff => 2,
            Encoding::FastDiff => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CorruptBlock> {
        match code {
            0 => Ok(Encoding::None),
            1 => Ok(Encoding::Prefix),
            2 => Ok(Encoding::Diff),
            3 => Ok(Encoding::FastDiff),
            other => Err(CorruptBlock::UnknownEncoding(other)),
        }
    }
}

const FLAG_FAMILY_SAME: u8 = 0b0000_0001;
const FLAG_QUALIFIER_SAME: u8 = 0b0000_0010;
const FLAG_TYPE_SAME: u8 = 0b0000_0100;

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Writes a variable-length signed delta: 1/2/4/8 bytes chosen by magnitude,
/// tagged with a leading width byte. Deltas are rare enough in a single
/// block that branching on width is worth it for timestamp-heavy workloads.
fn write_varint_delta<W: Write>(w: &mut W, delta: i64) -> io::Result<()> {
    if let Ok(v) = i8::try_from(delta) {
        w.write_all(&[1u8, v as u8])
    } else if let Ok(v) = i16::try_from(delta) {
        w.write_all(&[2u8])?;
        w.write_all(&v.to_le_bytes())
    } else if let Ok(v) = i32::try_from(delta) {
        w.write_all(&[4u8])?;
        w.write_all(&v.to_le_bytes())
    } else {
        w.write_all(&[8u8])?;
        w.write_all(&delta.to_le_bytes())
    }
}

fn read_varint_delta<R: Read>(r: &mut R) -> Result<i64, CorruptBlock> {
    let mut width = [0u8; 1];
    r.read_exact(&mut width).map_err(|_| CorruptBlock::Truncated)?;
    match width[0] {
        1 => {
            let mut b = [0u8; 1];
            r.read_exact(&mut b).map_err(|_| CorruptBlock::Truncated)?;
            Ok(b[0] as i8 as i64)
        }
        2 => {
            let mut b = [0u8; 2];
            r.read_exact(&mut b).map_err(|_| CorruptBlock::Truncated)?;
            Ok(i16::from_le_bytes(b) as i64)
        }
        4 => {
            let mut b = [0u8; 4];
            r.read_exact(&mut b).map_err(|_| CorruptBlock::Truncated)?;
            Ok(i32::from_le_bytes(b) as i64)
        }
        8 => {
            let mut b = [0u8; 8];
            r.read_exact(&mut b).map_err(|_| CorruptBlock::Truncated)?;
            Ok(i64::from_le_bytes(b))
        }
        other => Err(CorruptBlock::BadVarintWidth(other)),
    }
}

fn write_tags<W: Write>(w: &mut W, tags: &[Tag]) -> io::Result<()> {
    let tags_len: usize = tags.iter().map(|t| t.value.len() + 3).sum();
    w.write_all(&(tags_len as u16).to_le_bytes())?;
    for tag in tags {
        w.write_all(&(tag.value.len() as u16).to_le_bytes())?;
        w.write_all(&[tag.tag_type])?;
        w.write_all(&tag.value)?;
    }
    Ok(())
}

fn read_tags<R: Read>(r: &mut R) -> Result<Vec<Tag>, CorruptBlock> {
    let mut buf2 = [0u8; 2];
    r.read_exact(&mut buf2).map_err(|_| CorruptBlock::Truncated)?;
    let tags_len = u16::from_le_bytes(buf2) as usize;
    let mut body = vec![0u8; tags_len];
    r.read_exact(&mut body).map_err(|_| CorruptBlock::Truncated)?;
    let mut cursor: &[u8] = &body;
    let mut tags = Vec::new();
    while !cursor.is_empty() {
        let mut lb = [0u8; 2];
        cursor.read_exact(&mut lb).map_err(|_| CorruptBlock::Truncated)?;
        let vlen = u16::from_le_bytes(lb) as usize;
        let mut tb = [0u8; 1];
        cursor.read_exact(&mut tb).map_err(|_| CorruptBlock::Truncated)?;
        let mut value = vec![0u8; vlen];
        cursor.read_exact(&mut value).map_err(|_| CorruptBlock::Truncated)?;
        tags.push(Tag::new(tb[0], value));
    }
    Ok(tags)
}

/// Encodes `cells` (already in key order) into `out` using `encoding`.
pub fn encode_cells(out: &mut Vec<u8>, cells: &[Cell], encoding: Encoding) -> io::Result<()> {
    match encoding {
        Encoding::None => {
            for c in cells {
                c.encode(out).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            }
            Ok(())
        }
        Encoding::Prefix => {
            let mut prev_row: &[u8] = &[];
            for c in cells {
                let shared = common_prefix_len(prev_row, &c.row);
                write_prefix_cell(out, c, shared)?;
                prev_row = &c.row;
            }
            Ok(())
        }
        Encoding::Diff | Encoding::FastDiff => {
            let mut prev: Option<&Cell> = None;
            for c in cells {
                write_diff_cell(out, c, prev, encoding == Encoding::FastDiff)?;
                prev = Some(c);
            }
            Ok(())
        }
    }
}

fn write_prefix_cell(out: &mut Vec<u8>, c: &Cell, shared_prefix: usize) -> io::Result<()> {
    let suffix = &c.row[shared_prefix..];
    out.write_all(&(shared_prefix as u16).to_le_bytes())?;
    out.write_all(&(suffix.len() as u16).to_le_bytes())?;
    out.write_all(suffix)?;
    out.write_all(&[c.family.len() as u8])?;
    out.write_all(&c.family)?;
    out.write_all(&(c.qualifier.len() as u32).to_le_bytes())?;
    out.write_all(&c.qualifier)?;
    out.write_all(&(!c.timestamp).to_be_bytes())?;
    out.write_all(&[c.cell_type.code()])?;
    write_tags(out, &c.tags)?;
    out.write_all(&(c.value.len() as u32).to_le_bytes())?;
    out.write_all(&c.value)
}

fn write_diff_cell(
    out: &mut Vec<u8>,
    c: &Cell,
    prev: Option<&Cell>,
    fast: bool,
) -> io::Result<()> {
    let prev_row: &[u8] = prev.map(|p| p.row.as_slice()).unwrap_or(&[]);
    let shared = common_prefix_len(prev_row, &c.row);
    let suffix = &c.row[shared..];

    let family_same = prev.is_some_and(|p| p.family == c.family);
    let qualifier_same = prev.is_some_and(|p| p.qualifier == c.qualifier);
    let type_same = prev.is_some_and(|p| p.cell_type == c.cell_type);

    let mut flags = 0u8;
    if family_same {
        flags |= FLAG_FAMILY_SAME;
    }
    if qualifier_same {
        flags |= FLAG_QUALIFIER_SAME;
    }
    if type_same {
        flags |= FLAG_TYPE_SAME;
    }

    out.write_all(&[flags])?;
    out.write_all(&(shared as u16).to_le_bytes())?;
    out.write_all(&(suffix.len() as u16).to_le_bytes())?;
    out.write_all(suffix)?;

    if !family_same {
        out.write_all(&[c.family.len() as u8])?;
        out.write_all(&c.family)?;
    }
    if !qualifier_same {
        out.write_all(&(c.qualifier.len() as u32).to_le_bytes())?;
        out.write_all(&c.qualifier)?;
    }

    if fast {
        let prev_ts = prev.map(|p| p.timestamp as i64).unwrap_or(0);
        write_varint_delta(out, c.timestamp as i64 - prev_ts)?;
    } else {
        out.write_all(&(!c.timestamp).to_be_bytes())?;
    }

    if !type_same {
        out.write_all(&[c.cell_type.code()])?;
    }

    write_tags(out, &c.tags)?;
    out.write_all(&(c.value.len() as u32).to_le_bytes())?;
    out.write_all(&c.value)
}

/// Decodes every cell out of an encoded block body.
pub fn decode_cells(mut body: &[u8], encoding: Encoding) -> Result<Vec<Cell>, CorruptBlock> {
    let mut cells = Vec::new();
    match encoding {
        Encoding::None => {
            while !body.is_empty() {
                let cell = Cell::decode(&mut body).map_err(|_| CorruptBlock::Truncated)?;
                cells.push(cell);
            }
        }
        Encoding::Prefix => {
            let mut prev_row: Vec<u8> = Vec::new();
            while !body.is_empty() {
                let cell = read_prefix_cell(&mut body, &prev_row)?;
                prev_row = cell.row.clone();
                cells.push(cell);
            }
        }
        Encoding::Diff | Encoding::FastDiff => {
            let mut prev: Option<Cell> = None;
            while !body.is_empty() {
                let cell = read_diff_cell(&mut body, prev.as_ref(), encoding == Encoding::FastDiff)?;
                prev = Some(cell.clone());
                cells.push(cell);
            }
        }
    }
    Ok(cells)
}

fn read_u16(cursor: &mut &[u8]) -> Result<u16, CorruptBlock> {
    let mut b = [0u8; 2];
    cursor.read_exact(&mut b).map_err(|_| CorruptBlock::Truncated)?;
    Ok(u16::from_le_bytes(b))
}

fn read_u32(cursor: &mut &[u8]) -> Result<u32, CorruptBlock> {
    let mut b = [0u8; 4];
    cursor.read_exact(&mut b).map_err(|_| CorruptBlock::Truncated)?;
    Ok(u32::from_le_bytes(b))
}

fn read_u8(cursor: &mut &[u8]) -> Result<u8, CorruptBlock> {
    let mut b = [0u8; 1];
    cursor.read_exact(&mut b).map_err(|_| CorruptBlock::Truncated)?;
    Ok(b[0])
}

fn read_vec(cursor: &mut &[u8], len: usize) -> Result<Vec<u8>, CorruptBlock> {
    let mut v = vec![0u8; len];
    cursor.read_exact(&mut v).map_err(|_| CorruptBlock::Truncated)?;
    Ok(v)
}

fn read_prefix_cell(cursor: &mut &[u8], prev_row: &[u8]) -> Result<Cell, CorruptBlock> {
    let shared = read_u16(cursor)? as usize;
    let suffix_len = read_u16(cursor)? as usize;
    let suffix = read_vec(cursor, suffix_len)?;
    if shared > prev_row.len() {
        return Err(CorruptBlock::BadSharedPrefix);
    }
    let mut row = prev_row[..shared].to_vec();
    row.extend_from_slice(&suffix);

    let fam_len = read_u8(cursor)? as usize;
    let family = read_vec(cursor, fam_len)?;
    let qual_len = read_u32(cursor)? as usize;
    let qualifier = read_vec(cursor, qual_len)?;

    let mut ts_buf = [0u8; 8];
    cursor.read_exact(&mut ts_buf).map_err(|_| CorruptBlock::Truncated)?;
    let timestamp = !u64::from_be_bytes(ts_buf);

    let cell_type = CellType::from_code(read_u8(cursor)?).map_err(|_| CorruptBlock::BadCellType)?;
    let tags = read_tags(cursor)?;
    let val_len = read_u32(cursor)? as usize;
    let value = read_vec(cursor, val_len)?;

    Ok(Cell {
        row,
        family,
        qualifier,
        timestamp,
        cell_type,
        value,
        tags,
    })
}

fn read_diff_cell(cursor: &mut &[u8], prev: Option<&Cell>, fast: bool) -> Result<Cell, CorruptBlock> {
    let flags = read_u8(cursor)?;
    let shared = read_u16(cursor)? as usize;
    let suffix_len = read_u16(cursor)? as usize;
    let suffix = read_vec(cursor, suffix_len)?;

    let prev_row: &[u8] = prev.map(|p| p.row.as_slice()).unwrap_or(&[]);
    if shared > prev_row.len() {
        return Err(CorruptBlock::BadSharedPrefix);
    }
    let mut row = prev_row[..shared].to_vec();
    row.extend_from_slice(&suffix);

    let family = if flags & FLAG_FAMILY_SAME != 0 {
        prev.ok_or(CorruptBlock::BadSharedPrefix)?.family.clone()
    } else {
        let len = read_u8(cursor)? as usize;
        read_vec(cursor, len)?
    };

    let qualifier = if flags & FLAG_QUALIFIER_SAME != 0 {
        prev.ok_or(CorruptBlock::BadSharedPrefix)?.qualifier.clone()
    } else {
        let len = read_u32(cursor)? as usize;
        read_vec(cursor, len)?
    };

    let timestamp = if fast {
        let prev_ts = prev.map(|p| p.timestamp as i64).unwrap_or(0);
        let delta = read_varint_delta(cursor)?;
        (prev_ts + delta) as u64
    } else {
        let mut ts_buf = [0u8; 8];
        cursor.read_exact(&mut ts_buf).map_err(|_| CorruptBlock::Truncated)?;
        !u64::from_be_bytes(ts_buf)
    };

    let cell_type = if flags & FLAG_TYPE_SAME != 0 {
        prev.ok_or(CorruptBlock::BadSharedPrefix)?.cell_type
    } else {
        CellType::from_code(read_u8(cursor)?).map_err(|_| CorruptBlock::BadCellType)?
    };

    let tags = read_tags(cursor)?;
    let val_len = read_u32(cursor)? as usize;
    let value = read_vec(cursor, val_len)?;

    Ok(Cell {
        row,
        family,
        qualifier,
        timestamp,
        cell_type,
        value,
        tags,
    })
}

//! # KeyCodec
//!
//! Canonical byte-level encoding and comparison for [`Cell`], the atomic
//! unit of the engine: `(row, family, qualifier, timestamp, type, value,
//! tags)`.
//!
//! ## Ordering
//!
//! Cells sort by row ascending, family ascending, qualifier ascending,
//! timestamp **descending** (newest first), and type ascending within an
//! equal timestamp. [`compare`] implements this total order directly on
//! decoded components; [`Cell::encode`] produces an on-disk byte form whose
//! key prefix preserves that order under [`compare_encoded`] (which parses
//! the length-prefixed fields rather than relying on raw `memcmp`, since a
//! variable-length-prefixed encoding is not in general `memcmp`-comparable).
//!
//! ## Example
//!
//! ```rust
//! use keycodec::{Cell, CellType};
//!
//! let a = Cell::new(b"row".to_vec(), b"cf".to_vec(), b"q".to_vec(), 10, CellType::Put, b"v1".to_vec());
//! let b = Cell::new(b"row".to_vec(), b"cf".to_vec(), b"q".to_vec(), 20, CellType::Put, b"v2".to_vec());
//! // higher timestamp sorts first (newest-first)
//! assert_eq!(keycodec::compare(&b, &a), std::cmp::Ordering::Less);
//! ```

use std::cmp::Ordering;
use std::io::{self, Read, Write};

use thiserror::Error;

/// Maximum row length in bytes (32 KiB), per the data model.
pub const MAX_ROW_LEN: usize = 32 * 1024;

/// A single TLV tag attached to a cell (visibility label, MVCC, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag type code. `TAG_TYPE_MVCC` is reserved for the engine's own use.
    pub tag_type: u8,
    /// Opaque tag payload.
    pub value: Vec<u8>,
}

/// Reserved tag type used to carry the MVCC sequence number on disk when a
/// family is configured with `cells.includes.mvcc`.
pub const TAG_TYPE_MVCC: u8 = 0x01;

impl Tag {
    pub fn new(tag_type: u8, value: Vec<u8>) -> Self {
        Self { tag_type, value }
    }

    /// Builds the reserved MVCC tag for `mvcc`.
    pub fn mvcc(mvcc: u64) -> Self {
        Self::new(TAG_TYPE_MVCC, mvcc.to_be_bytes().to_vec())
    }

    /// Reads back an MVCC value from a tag created by [`Tag::mvcc`].
    pub fn as_mvcc(&self) -> Option<u64> {
        if self.tag_type != TAG_TYPE_MVCC || self.value.len() != 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.value);
        Some(u64::from_be_bytes(buf))
    }
}

/// The mutation kind recorded by a [`Cell`].
///
/// Numeric codes follow the widely used HBase `KeyValue.Type` convention so
/// that `type ascending` sorts `Put` before the delete markers and
/// `DeleteFamily` last, which is the order a compaction wants to resolve
/// ties in (deletes shadow puts at an equal timestamp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CellType {
    /// A live value.
    Put = 4,
    /// Deletes a single (row, family, qualifier, timestamp) version.
    DeleteCell = 8,
    /// Deletes all versions of (row, family, qualifier) at or before the timestamp.
    DeleteColumn = 12,
    /// Deletes all versions of (row, family) at or before the timestamp.
    DeleteFamily = 14,
    /// Deletes a single version of every qualifier in (row, family) at the timestamp.
    DeleteFamilyVersion = 10,
}

impl CellType {
    /// Decodes a type byte, failing on unknown codes.
    pub fn from_code(code: u8) -> Result<Self, CorruptEncoding> {
        match code {
            4 => Ok(CellType::Put),
            8 => Ok(CellType::DeleteCell),
            10 => Ok(CellType::DeleteFamilyVersion),
            12 => Ok(CellType::DeleteColumn),
            14 => Ok(CellType::DeleteFamily),
            other => Err(CorruptEncoding::UnknownType(other)),
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// `true` for any delete marker (the four non-Put types).
    #[must_use]
    pub fn is_delete(self) -> bool {
        !matches!(self, CellType::Put)
    }

    #[must_use]
    pub fn is_delete_column(self) -> bool {
        matches!(self, CellType::DeleteColumn)
    }

    #[must_use]
    pub fn is_delete_family(self) -> bool {
        matches!(self, CellType::DeleteFamily)
    }

    #[must_use]
    pub fn is_delete_family_version(self) -> bool {
        matches!(self, CellType::DeleteFamilyVersion)
    }
}

/// Errors raised while decoding a cell or its type byte.
#[derive(Debug, Error)]
pub enum CorruptEncoding {
    #[error("truncated cell encoding: {0}")]
    Truncated(&'static str),
    #[error("unknown cell type code: {0}")]
    UnknownType(u8),
    #[error("row exceeds {MAX_ROW_LEN} bytes: {0}")]
    RowTooLong(usize),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// The atomic unit of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub timestamp: u64,
    pub cell_type: CellType,
    pub value: Vec<u8>,
    pub tags: Vec<Tag>,
}

/// Fixed per-cell bookkeeping overhead charged by [`Cell::estimated_heap_size`].
///
/// Approximates `Vec` headers plus the `CellType`/`timestamp` fields; callers
/// sizing a [`MemBuffer`](https://docs.rs/membuffer)-style buffer treat this
/// as a constant so size accounting stays O(1) per insert.
pub const CELL_OVERHEAD_BYTES: usize = 64;

impl Cell {
    pub fn new(
        row: Vec<u8>,
        family: Vec<u8>,
        qualifier: Vec<u8>,
        timestamp: u64,
        cell_type: CellType,
        value: Vec<u8>,
    ) -> Self {
        Self {
            row,
            family,
            qualifier,
            timestamp,
            cell_type,
            value,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Approximate resident size: row + family + qualifier + value + tag
    /// bytes, plus a fixed per-cell overhead. Used by the write buffer to
    /// decide when a flush threshold has been crossed; not required to be
    /// exact.
    #[must_use]
    pub fn estimated_heap_size(&self) -> usize {
        let tags_len: usize = self.tags.iter().map(|t| t.value.len() + 1).sum();
        CELL_OVERHEAD_BYTES
            + self.row.len()
            + self.family.len()
            + self.qualifier.len()
            + self.value.len()
            + tags_len
    }

    /// Encodes the cell to its canonical on-disk byte form.
    ///
    /// Layout (all integers little-endian unless noted):
    /// ```text
    /// [row_len: u16][row]
    /// [family_len: u8][family]
    /// [qualifier_len: u32][qualifier]
    /// [inverted_timestamp: u64 BE = !timestamp]
    /// [type: u8]
    /// [tags_len: u16][tags: repeated [value_len: u16][tag_type: u8][value]]
    /// [value_len: u32][value]
    /// ```
    ///
    /// The timestamp is bitwise-inverted and written big-endian so that,
    /// *for two cells sharing the same row/family/qualifier*, ascending byte
    /// order of this field corresponds to descending logical timestamp.
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<(), CorruptEncoding> {
        if self.row.len() > MAX_ROW_LEN {
            return Err(CorruptEncoding::RowTooLong(self.row.len()));
        }
        w.write_all(&(self.row.len() as u16).to_le_bytes())?;
        w.write_all(&self.row)?;
        w.write_all(&[self.family.len() as u8])?;
        w.write_all(&self.family)?;
        w.write_all(&(self.qualifier.len() as u32).to_le_bytes())?;
        w.write_all(&self.qualifier)?;
        w.write_all(&(!self.timestamp).to_be_bytes())?;
        w.write_all(&[self.cell_type.code()])?;

        let tags_len: usize = self.tags.iter().map(|t| t.value.len() + 3).sum();
        w.write_all(&(tags_len as u16).to_le_bytes())?;
        for tag in &self.tags {
            w.write_all(&(tag.value.len() as u16).to_le_bytes())?;
            w.write_all(&[tag.tag_type])?;
            w.write_all(&tag.value)?;
        }

        w.write_all(&(self.value.len() as u32).to_le_bytes())?;
        w.write_all(&self.value)?;
        Ok(())
    }

    /// Decodes a cell previously written by [`Cell::encode`].
    pub fn decode<R: Read>(r: &mut R) -> Result<Self, CorruptEncoding> {
        let row_len = read_u16(r)? as usize;
        if row_len > MAX_ROW_LEN {
            return Err(CorruptEncoding::RowTooLong(row_len));
        }
        let row = read_exact_vec(r, row_len)?;

        let fam_len = read_u8(r)? as usize;
        let family = read_exact_vec(r, fam_len)?;

        let qual_len = read_u32(r)? as usize;
        let qualifier = read_exact_vec(r, qual_len)?;

        let mut ts_buf = [0u8; 8];
        r.read_exact(&mut ts_buf)
            .map_err(|_| CorruptEncoding::Truncated("timestamp"))?;
        let timestamp = !u64::from_be_bytes(ts_buf);

        let cell_type = CellType::from_code(read_u8(r)?)?;

        let tags_len = read_u16(r)? as usize;
        let mut tag_bytes = read_exact_vec(r, tags_len)?;
        let mut tags = Vec::new();
        {
            let mut cursor: &[u8] = &mut tag_bytes;
            while !cursor.is_empty() {
                let vlen = read_u16(&mut cursor)? as usize;
                let tag_type = read_u8(&mut cursor)?;
                let value = read_exact_vec(&mut cursor, vlen)?;
                tags.push(Tag::new(tag_type, value));
            }
        }
        tag_bytes.clear();

        let value_len = read_u32(r)? as usize;
        let value = read_exact_vec(r, value_len)?;

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
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8, CorruptEncoding> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)
        .map_err(|_| CorruptEncoding::Truncated("u8"))?;
    Ok(buf[0])
}

fn read_u16<R: Read>(r: &mut R) -> Result<u16, CorruptEncoding> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)
        .map_err(|_| CorruptEncoding::Truncated("u16"))?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32, CorruptEncoding> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)
        .map_err(|_| CorruptEncoding::Truncated("u32"))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_exact_vec<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>, CorruptEncoding> {
    let mut v = vec![0u8; len];
    r.read_exact(&mut v)
        .map_err(|_| CorruptEncoding::Truncated("bytes"))?;
    Ok(v)
}

/// Total order over cells: row asc, family asc, qualifier asc, timestamp
/// desc, type asc.
#[must_use]
pub fn compare(a: &Cell, b: &Cell) -> Ordering {
    a.row
        .cmp(&b.row)
        .then_with(|| a.family.cmp(&b.family))
        .then_with(|| a.qualifier.cmp(&b.qualifier))
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| a.cell_type.code().cmp(&b.cell_type.code()))
}

/// Same order as [`compare`], computed from two [`Cell::encode`] byte
/// strings by parsing their headers rather than `memcmp`-ing the raw bytes
/// (a variable-length-prefixed key is not generally memcmp-comparable).
pub fn compare_encoded(a: &[u8], b: &[u8]) -> Result<Ordering, CorruptEncoding> {
    let ca = Cell::decode(&mut &a[..])?;
    let cb = Cell::decode(&mut &b[..])?;
    Ok(compare(&ca, &cb))
}

/// Newtype giving [`Cell`] an `Ord` impl via [`compare`], for use as a
/// `BTreeMap`/`BTreeSet` key in [`MemBuffer`](https://docs.rs/membuffer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellKey(pub Cell);

impl PartialOrd for CellKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests;

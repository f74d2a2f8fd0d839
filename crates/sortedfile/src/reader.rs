use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

use blockcodec::{BlockHeader, BlockType, Encoding, HEADER_LEN_V2};
use bloom::BloomFilter;
use blockcache::{BlockCache, CacheKey};
use keycodec::{Cell, CellKey, CellType};

use crate::trailer::Trailer;
use crate::writer::IndexEntry;
use crate::{file_info_keys, BlockPointer, BloomGranularity, SortedFileError};

/// An open handle onto an immutable SortedFile.
///
/// The full index (every level) is read once at [`open`](SortedFileHandle::open)
/// and flattened into an in-memory `BTreeMap<CellKey, BlockPointer>` mapping
/// each data block's first cell to its location — the same "index fully
/// resident" tradeoff a point-lookup-oriented reader makes generally, just
/// built here from a genuinely multi-level on-disk index rather than a
/// single index section.
pub struct SortedFileHandle {
    file_id: u64,
    file: Mutex<BufReader<File>>,
    trailer: Trailer,
    flat_index: BTreeMap<CellKey, BlockPointer>,
    bloom: Option<BloomFilter>,
    bloom_granularity: BloomGranularity,
    cache: Arc<BlockCache>,
    encoding: Encoding,
    /// Whether DATA/ENCODED_DATA blocks are eligible for caching. `false`
    /// only ever affects this category — index and bloom blocks are always
    /// pinned regardless.
    cache_data_blocks: bool,
    first_key: Option<Cell>,
    last_key: Option<Cell>,
}

impl SortedFileHandle {
    /// Opens `path`, pinning the root (and intermediate, if present) index
    /// blocks and the bloom meta block into `cache` as "important" —
    /// they stay cached even if the caller's family has data-block caching
    /// disabled.
    pub fn open(
        path: &Path,
        file_id: u64,
        cache: Arc<BlockCache>,
        encoding: Encoding,
        cache_data_blocks: bool,
    ) -> Result<Self, SortedFileError> {
        let mut file = BufReader::new(File::open(path)?);
        let trailer = Self::read_trailer(&mut file)?;

        let checksummed = trailer.checksummed;
        let mut flat_index = BTreeMap::new();

        let root_bytes = Self::read_raw(&mut file, trailer.root_index_offset, trailer.root_index_size)?;
        cache.insert(CacheKey::new(file_id, trailer.root_index_offset), Arc::new(root_bytes.clone()), true);
        let (_, root_cells) = blockcodec::read_block(&root_bytes, BlockType::RootIndex, Encoding::None, checksummed)?;
        let root_entries: Vec<IndexEntry> = root_cells.into_iter().map(IndexEntry::from_cell).collect::<Result<_, _>>()?;

        match trailer.index_levels {
            1 => {
                for entry in &root_entries {
                    Self::read_leaf_block(&mut file, &cache, file_id, entry.pointer, checksummed, &mut flat_index)?;
                }
            }
            2 => {
                for entry in &root_entries {
                    let inter_bytes = Self::read_raw(&mut file, entry.pointer.offset, entry.pointer.on_disk_size)?;
                    cache.insert(CacheKey::new(file_id, entry.pointer.offset), Arc::new(inter_bytes.clone()), true);
                    let (_, inter_cells) = blockcodec::read_block(&inter_bytes, BlockType::IntermediateIndex, Encoding::None, checksummed)?;
                    let leaf_pointers: Vec<IndexEntry> = inter_cells.into_iter().map(IndexEntry::from_cell).collect::<Result<_, _>>()?;
                    for leaf_entry in &leaf_pointers {
                        Self::read_leaf_block(&mut file, &cache, file_id, leaf_entry.pointer, checksummed, &mut flat_index)?;
                    }
                }
            }
            other => return Err(SortedFileError::CorruptFile(format!("unsupported index_levels: {other}"))),
        }

        let bloom = if let Some(offset) = trailer.bloom_meta_offset {
            let header_bytes = Self::read_raw(&mut file, offset, trailer.bloom_meta_size)?;
            cache.insert(CacheKey::new(file_id, offset), Arc::new(header_bytes.clone()), true);
            let mut cursor = &header_bytes[..];
            let header = BlockHeader::read(&mut cursor, false)?;
            if header.block_type != BlockType::BloomMeta {
                return Err(SortedFileError::CorruptFile("bloom meta block type mismatch".into()));
            }
            let payload = &header_bytes[HEADER_LEN_V2..HEADER_LEN_V2 + header.on_disk_size_without_header as usize];
            Some(BloomFilter::read_from(&mut &payload[..])?)
        } else {
            None
        };

        let file_info_bytes = Self::read_raw(&mut file, trailer.file_info_offset, trailer.file_info_size)?;
        let (_, file_info_cells) = blockcodec::read_block(&file_info_bytes, BlockType::FileInfo, Encoding::None, checksummed)?;
        let mut first_key = None;
        let mut last_key = None;
        let mut bloom_granularity = BloomGranularity::Row;
        for cell in &file_info_cells {
            let key = String::from_utf8_lossy(&cell.row);
            match key.as_ref() {
                file_info_keys::FIRST_KEY => first_key = Some(Cell::decode(&mut &cell.value[..])?),
                file_info_keys::LAST_KEY => last_key = Some(Cell::decode(&mut &cell.value[..])?),
                file_info_keys::BLOOM_GRANULARITY => {
                    if let Some(&code) = cell.value.first() {
                        bloom_granularity = BloomGranularity::from_code(code)?;
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            file_id,
            file: Mutex::new(file),
            trailer,
            flat_index,
            bloom,
            bloom_granularity,
            cache,
            encoding,
            cache_data_blocks,
            first_key,
            last_key,
        })
    }

    fn read_leaf_block(
        file: &mut BufReader<File>,
        cache: &Arc<BlockCache>,
        file_id: u64,
        pointer: BlockPointer,
        checksummed: bool,
        flat_index: &mut BTreeMap<CellKey, BlockPointer>,
    ) -> Result<(), SortedFileError> {
        let bytes = Self::read_raw(file, pointer.offset, pointer.on_disk_size)?;
        cache.insert(CacheKey::new(file_id, pointer.offset), Arc::new(bytes.clone()), false);
        let (_, cells) = blockcodec::read_block(&bytes, BlockType::LeafIndex, Encoding::None, checksummed)?;
        for cell in cells {
            let entry = IndexEntry::from_cell(cell)?;
            flat_index.insert(CellKey(entry.key_cell), entry.pointer);
        }
        Ok(())
    }

    fn read_trailer(file: &mut BufReader<File>) -> Result<Trailer, SortedFileError> {
        let len = file.seek(SeekFrom::End(0))?;
        if len < crate::trailer::TRAILER_LEN {
            return Err(SortedFileError::CorruptFile("file too small for trailer".into()));
        }
        file.seek(SeekFrom::Start(len - crate::trailer::TRAILER_LEN))?;
        Ok(Trailer::read(file)?)
    }

    fn read_raw(file: &mut BufReader<File>, offset: u64, size: u32) -> Result<Vec<u8>, SortedFileError> {
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_data_block(&self, pointer: BlockPointer, caching: bool) -> Result<Vec<Cell>, SortedFileError> {
        let key = CacheKey::new(self.file_id, pointer.offset);
        if let Some(cached) = self.cache.get(&key, caching) {
            let block_type = match self.encoding {
                Encoding::None => BlockType::Data,
                _ => BlockType::EncodedData,
            };
            let (_, cells) = blockcodec::read_block(&cached, block_type, self.encoding, self.trailer.checksummed)?;
            return Ok(cells);
        }

        let bytes = {
            let mut file = self.file.lock().expect("sortedfile mutex poisoned");
            Self::read_raw(&mut file, pointer.offset, pointer.on_disk_size)?
        };
        let block_type = match self.encoding {
            Encoding::None => BlockType::Data,
            _ => BlockType::EncodedData,
        };
        let (_, cells) = blockcodec::read_block(&bytes, block_type, self.encoding, self.trailer.checksummed)?;
        if caching && self.cache_data_blocks {
            self.cache.insert(key, Arc::new(bytes), false);
        }
        Ok(cells)
    }

    #[must_use]
    pub fn file_id(&self) -> u64 {
        self.file_id
    }

    #[must_use]
    pub fn first_key(&self) -> Option<&Cell> {
        self.first_key.as_ref()
    }

    #[must_use]
    pub fn last_key(&self) -> Option<&Cell> {
        self.last_key.as_ref()
    }

    #[must_use]
    pub fn max_sequence(&self) -> u64 {
        self.trailer.max_sequence
    }

    /// Point lookup: consults the bloom filter first, descends the flattened
    /// index to find the data block that would hold `target`, then binary
    /// searches inside the block for the first cell at or below `read_version`.
    /// Tombstones are filtered out; callers merging this file against other
    /// sources that need to see a tombstone (to shadow an older file) should
    /// use [`SortedFileHandle::get_raw`] instead.
    pub fn get(&self, target: &Cell, read_version: u64) -> Result<Option<Cell>, SortedFileError> {
        Ok(self.get_raw(target, read_version)?.filter(|c| !c.cell_type.is_delete()))
    }

    /// Like [`SortedFileHandle::get`] but returns the floor cell even if it
    /// is a tombstone, so a caller merging multiple sources (MemBuffer, other
    /// files) can tell "no value" apart from "shadowed by a delete here".
    pub fn get_raw(&self, target: &Cell, read_version: u64) -> Result<Option<Cell>, SortedFileError> {
        if let Some(bloom) = &self.bloom {
            if !bloom.may_contain(&self.bloom_granularity.key_bytes(target)) {
                return Ok(None);
            }
        }

        let probe = Cell::new(target.row.clone(), target.family.clone(), target.qualifier.clone(), u64::MAX, CellType::Put, Vec::new());
        let Some((_, pointer)) = self.flat_index.range(..=CellKey(probe)).next_back() else {
            return Ok(None);
        };
        let cells = self.read_data_block(*pointer, true)?;
        Ok(find_candidate(&cells, target, read_version))
    }

    /// Returns a lazy iterator over cells in `[start, end)` (unbounded on
    /// either side when `None`) visible at `read_version`.
    #[must_use]
    pub fn scan(&self, start: Option<&Cell>, end: Option<&Cell>, read_version: u64) -> ScanIter<'_> {
        let start_key = match start {
            Some(s) => {
                let probe = Cell::new(s.row.clone(), s.family.clone(), s.qualifier.clone(), u64::MAX, CellType::Put, Vec::new());
                self.flat_index.range(..=CellKey(probe)).next_back().map(|(k, _)| k.clone())
                    .or_else(|| self.flat_index.keys().next().cloned())
            }
            None => self.flat_index.keys().next().cloned(),
        };

        let blocks: Vec<BlockPointer> = match start_key {
            Some(k) => self.flat_index.range(k..).map(|(_, v)| *v).collect(),
            None => Vec::new(),
        };

        ScanIter {
            handle: self,
            blocks: blocks.into_iter(),
            current: Vec::new().into_iter(),
            start: start.cloned(),
            end: end.cloned(),
            read_version,
        }
    }
}

/// Binary searches `cells` (sorted by [`keycodec::compare`]) for the first
/// cell at or below `read_version` for `target`'s (row, family, qualifier),
/// returning it whether it's a live value or a tombstone.
fn find_candidate(cells: &[Cell], target: &Cell, read_version: u64) -> Option<Cell> {
    let probe = Cell::new(target.row.clone(), target.family.clone(), target.qualifier.clone(), read_version, CellType::Put, Vec::new());
    let idx = match cells.binary_search_by(|c| keycodec::compare(c, &probe)) {
        Ok(i) | Err(i) => i,
    };
    let candidate = cells.get(idx)?;
    if candidate.row != target.row || candidate.family != target.family || candidate.qualifier != target.qualifier {
        return None;
    }
    Some(candidate.clone())
}

/// Lazily walks data blocks in key order, decoding one block at a time.
pub struct ScanIter<'a> {
    handle: &'a SortedFileHandle,
    blocks: std::vec::IntoIter<BlockPointer>,
    current: std::vec::IntoIter<Cell>,
    start: Option<Cell>,
    end: Option<Cell>,
    read_version: u64,
}

impl<'a> Iterator for ScanIter<'a> {
    type Item = Result<Cell, SortedFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cell) = self.current.next() {
                if let Some(end) = &self.end {
                    if keycodec::compare(&cell, end) != Ordering::Less {
                        return None;
                    }
                }
                if let Some(start) = &self.start {
                    if keycodec::compare(&cell, start) == Ordering::Less {
                        continue;
                    }
                }
                if cell.timestamp > self.read_version {
                    continue;
                }
                return Some(Ok(cell));
            }
            let pointer = self.blocks.next()?;
            match self.handle.read_data_block(pointer, true) {
                Ok(cells) => self.current = cells.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

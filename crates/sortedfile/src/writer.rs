use std::cmp::Ordering;
use std::fs::{rename, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use blockcodec::{BlockType, ChecksumType, Encoding};
use bloom::BloomFilter;
use keycodec::{Cell, CellType};

use crate::trailer::Trailer;
use crate::{file_info_keys, BlockPointer, BloomGranularity, SortedFileError};

const BLOOM_FPR: f64 = 0.01;

/// A pointer cell accumulated for one index level: the key fields of the
/// first cell in the block it targets, plus that block's location.
pub(crate) struct IndexEntry {
    pub(crate) key_cell: Cell,
    pub(crate) pointer: BlockPointer,
}

impl IndexEntry {
    pub(crate) fn to_cell(&self) -> Cell {
        let mut c = self.key_cell.clone();
        c.value = self.pointer.encode();
        c
    }

    pub(crate) fn from_cell(c: Cell) -> Result<Self, SortedFileError> {
        let pointer = BlockPointer::decode(&c.value)?;
        let mut key_cell = c;
        key_cell.value = Vec::new();
        Ok(Self { key_cell, pointer })
    }
}

/// Builds a single immutable SortedFile. Cells must be appended in
/// non-decreasing [`keycodec::compare`] order; the file becomes visible to
/// readers only once [`finish`](SortedFileWriter::finish) renames the temp
/// file into place.
pub struct SortedFileWriter {
    file_id: u64,
    tmp_path: PathBuf,
    final_path: PathBuf,
    file: BufWriter<File>,
    offset: u64,
    data_block_bytes_target: usize,
    index_chunk_entries: usize,
    encoding: Encoding,
    checksum_type: ChecksumType,

    pending_cells: Vec<Cell>,
    pending_bytes: usize,
    prev_data_offset: u64,
    last_appended: Option<Cell>,

    leaf_entries: Vec<IndexEntry>,

    bloom: Option<BloomFilter>,
    bloom_granularity: BloomGranularity,

    first_key: Option<Cell>,
    last_key: Option<Cell>,
    max_sequence: u64,
    entry_count: u64,
}

/// Metadata returned once a file has been durably written and published.
#[derive(Debug, Clone)]
pub struct FinishedFile {
    pub file_id: u64,
    pub path: PathBuf,
    pub first_key: Option<Cell>,
    pub last_key: Option<Cell>,
    pub entry_count: u64,
    pub max_sequence: u64,
}

impl SortedFileWriter {
    /// Opens a new writer at `dir/<file_id>.sf.tmp`; the final path is
    /// `dir/<file_id>.sf` and only exists after a successful `finish`.
    pub fn create(
        dir: &Path,
        file_id: u64,
        encoding: Encoding,
        checksum_type: ChecksumType,
        expected_cells: usize,
        bloom_granularity: BloomGranularity,
    ) -> Result<Self, SortedFileError> {
        let final_path = crate::sorted_file_path(dir, file_id);
        let tmp_path = dir.join(format!("{file_id:020}.sf.tmp"));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let bloom = if expected_cells > 0 {
            Some(BloomFilter::new(expected_cells, BLOOM_FPR))
        } else {
            None
        };

        Ok(Self {
            file_id,
            tmp_path,
            final_path,
            file: BufWriter::new(file),
            offset: 0,
            data_block_bytes_target: crate::DEFAULT_DATA_BLOCK_BYTES,
            index_chunk_entries: crate::DEFAULT_INDEX_CHUNK_ENTRIES,
            encoding,
            checksum_type,
            pending_cells: Vec::new(),
            pending_bytes: 0,
            prev_data_offset: 0,
            last_appended: None,
            leaf_entries: Vec::new(),
            bloom,
            bloom_granularity,
            first_key: None,
            last_key: None,
            max_sequence: 0,
            entry_count: 0,
        })
    }

    #[cfg(test)]
    pub(crate) fn index_chunk_entries_for_test(&mut self, n: usize) {
        self.index_chunk_entries = n;
    }

    #[cfg(test)]
    pub(crate) fn data_block_bytes_target_for_test(&mut self, n: usize) {
        self.data_block_bytes_target = n;
    }

    /// Appends a cell. Cells must arrive in non-decreasing comparator order.
    pub fn append(&mut self, cell: Cell, sequence: u64) -> Result<(), SortedFileError> {
        if let Some(prev) = &self.last_appended {
            if keycodec::compare(prev, &cell) == Ordering::Greater {
                return Err(SortedFileError::OutOfOrder);
            }
        }

        if self.first_key.is_none() {
            self.first_key = Some(cell.clone());
        }
        self.last_key = Some(cell.clone());
        self.max_sequence = self.max_sequence.max(sequence);
        self.entry_count += 1;

        if let Some(bloom) = &mut self.bloom {
            bloom.insert(&self.bloom_granularity.key_bytes(&cell));
        }

        self.pending_bytes += cell.estimated_heap_size();
        self.last_appended = Some(cell.clone());
        self.pending_cells.push(cell);

        if self.pending_bytes >= self.data_block_bytes_target {
            self.flush_data_block()?;
        }
        Ok(())
    }

    fn flush_data_block(&mut self) -> Result<(), SortedFileError> {
        if self.pending_cells.is_empty() {
            return Ok(());
        }
        let first_of_block = self.pending_cells[0].clone();
        let block_type = match self.encoding {
            Encoding::None => BlockType::Data,
            _ => BlockType::EncodedData,
        };
        let encoded = blockcodec::write_block(
            block_type,
            &self.pending_cells,
            self.encoding,
            self.checksum_type,
            self.prev_data_offset,
        )?;
        let block_offset = self.offset;
        self.file.write_all(&encoded.bytes)?;
        self.offset += encoded.bytes.len() as u64;
        self.prev_data_offset = block_offset;

        self.leaf_entries.push(IndexEntry {
            key_cell: first_of_block,
            pointer: BlockPointer {
                offset: block_offset,
                on_disk_size: encoded.bytes.len() as u32,
            },
        });

        self.pending_cells.clear();
        self.pending_bytes = 0;
        Ok(())
    }

    /// Writes `entries` as a chain of `block_type` blocks, each holding at
    /// most `index_chunk_entries` pointer cells, returning one pointer entry
    /// per block written (pointing at that block itself).
    fn write_index_level(&mut self, entries: &[IndexEntry], block_type: BlockType) -> Result<Vec<IndexEntry>, SortedFileError> {
        let mut out = Vec::new();
        let mut prev_offset = 0u64;
        for chunk in entries.chunks(self.index_chunk_entries.max(1)) {
            let cells: Vec<Cell> = chunk.iter().map(IndexEntry::to_cell).collect();
            let encoded = blockcodec::write_block(block_type, &cells, Encoding::None, self.checksum_type, prev_offset)?;
            let block_offset = self.offset;
            self.file.write_all(&encoded.bytes)?;
            self.offset += encoded.bytes.len() as u64;
            prev_offset = block_offset;
            out.push(IndexEntry {
                key_cell: chunk[0].key_cell.clone(),
                pointer: BlockPointer {
                    offset: block_offset,
                    on_disk_size: encoded.bytes.len() as u32,
                },
            });
        }
        Ok(out)
    }

    fn write_file_info(&mut self) -> Result<BlockPointer, SortedFileError> {
        let mut cells = Vec::new();
        let mut put = |key: &str, value: Vec<u8>| {
            cells.push(Cell::new(key.as_bytes().to_vec(), Vec::new(), Vec::new(), 0, CellType::Put, value));
        };
        if let Some(first) = &self.first_key {
            let mut buf = Vec::new();
            first.encode(&mut buf)?;
            put(file_info_keys::FIRST_KEY, buf);
        }
        if let Some(last) = &self.last_key {
            let mut buf = Vec::new();
            last.encode(&mut buf)?;
            put(file_info_keys::LAST_KEY, buf);
        }
        put(file_info_keys::ENCODING, vec![self.encoding.code()]);
        put(file_info_keys::BLOOM_GRANULARITY, vec![self.bloom_granularity.code()]);

        let encoded = blockcodec::write_block(BlockType::FileInfo, &cells, Encoding::None, self.checksum_type, 0)?;
        let offset = self.offset;
        self.file.write_all(&encoded.bytes)?;
        self.offset += encoded.bytes.len() as u64;
        Ok(BlockPointer { offset, on_disk_size: encoded.bytes.len() as u32 })
    }

    fn write_bloom(&mut self) -> Result<Option<BlockPointer>, SortedFileError> {
        let Some(bloom) = &self.bloom else { return Ok(None) };
        let mut buf = Vec::new();
        bloom.write_to(&mut buf)?;
        let offset = self.offset;
        blockcodec::BlockHeader {
            block_type: BlockType::BloomMeta,
            on_disk_size_without_header: buf.len() as u32,
            uncompressed_size_without_header: buf.len() as u32,
            prev_block_offset: 0,
            checksum: None,
        }
        .write(&mut self.file)?;
        self.file.write_all(&buf)?;
        self.offset += blockcodec::HEADER_LEN_V2 as u64 + buf.len() as u64;
        Ok(Some(BlockPointer {
            offset,
            on_disk_size: (blockcodec::HEADER_LEN_V2 + buf.len()) as u32,
        }))
    }

    /// Flushes any pending data, builds the index bottom-up, writes the
    /// bloom filter (if any), FILE_INFO and TRAILER, fsyncs, then atomically
    /// renames the temp file into place.
    pub fn finish(mut self) -> Result<FinishedFile, SortedFileError> {
        self.flush_data_block()?;

        let leaf_source: Vec<IndexEntry> = self.leaf_entries.drain(..).collect();
        let leaf_blocks = self.write_index_level(&leaf_source, BlockType::LeafIndex)?;
        let (root_source, index_levels) = if leaf_blocks.len() > 1 {
            let intermediate_blocks = self.write_index_level(&leaf_blocks, BlockType::IntermediateIndex)?;
            (intermediate_blocks, 2u8)
        } else {
            (leaf_blocks, 1u8)
        };

        let root_cells: Vec<Cell> = root_source.iter().map(IndexEntry::to_cell).collect();
        let root_encoded = blockcodec::write_block(BlockType::RootIndex, &root_cells, Encoding::None, self.checksum_type, 0)?;
        let root_offset = self.offset;
        self.file.write_all(&root_encoded.bytes)?;
        self.offset += root_encoded.bytes.len() as u64;

        let bloom_ptr = self.write_bloom()?;
        let file_info_ptr = self.write_file_info()?;

        let trailer = Trailer {
            root_index_offset: root_offset,
            root_index_size: root_encoded.bytes.len() as u32,
            index_levels,
            bloom_meta_offset: bloom_ptr.map(|p| p.offset),
            bloom_meta_size: bloom_ptr.map(|p| p.on_disk_size).unwrap_or(0),
            file_info_offset: file_info_ptr.offset,
            file_info_size: file_info_ptr.on_disk_size,
            max_sequence: self.max_sequence,
            entry_count: self.entry_count,
            checksummed: self.checksum_type != ChecksumType::None,
        };
        trailer.write(&mut self.file)?;

        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        drop(self.file);
        rename(&self.tmp_path, &self.final_path)?;

        Ok(FinishedFile {
            file_id: self.file_id,
            path: self.final_path,
            first_key: self.first_key,
            last_key: self.last_key,
            entry_count: self.entry_count,
            max_sequence: self.max_sequence,
        })
    }
}

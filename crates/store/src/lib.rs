//! # Store
//!
//! The per-column-family unit: a [`membuffer::MemBuffer`] in front of an
//! ordered set of immutable [`sortedfile::SortedFileHandle`]s, newest first.
//! Owns flush, compaction selection/execution, and the reference-file
//! bookkeeping a region split leaves behind until the next compaction
//! folds them into a real file.

mod compaction;
mod resolve;

pub use compaction::select_minor_compaction;
pub use resolve::resolve;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use blockcache::BlockCache;
use blockcodec::{ChecksumType, Encoding};
use keycodec::Cell;
use membuffer::MemBuffer;
use parking_lot::RwLock;
use sortedfile::{BloomGranularity, SortedFileHandle, SortedFileWriter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sorted file error: {0}")]
    SortedFile(#[from] sortedfile::SortedFileError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-family tuning, set once at store open time.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub family: String,
    pub encoding: Encoding,
    pub checksum_type: ChecksumType,
    pub bloom_granularity: BloomGranularity,
    /// `false` disables caching of DATA/ENCODED_DATA blocks for files this
    /// store opens; index and bloom blocks are always cached regardless.
    pub cache_data_blocks: bool,
    pub max_versions: u32,
    pub ttl_seconds: Option<u64>,
    pub minor_compaction_ratio: f64,
    pub minor_compaction_min_files: usize,
    pub minor_compaction_max_files: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            family: "default".to_string(),
            encoding: Encoding::None,
            checksum_type: ChecksumType::Crc32,
            bloom_granularity: BloomGranularity::Row,
            cache_data_blocks: true,
            max_versions: 1,
            ttl_seconds: None,
            minor_compaction_ratio: 1.2,
            minor_compaction_min_files: 3,
            minor_compaction_max_files: 10,
        }
    }
}

/// Outcome of a successful [`Store::flush`].
#[derive(Debug, Clone)]
pub struct FlushResult {
    pub file_id: u64,
    pub max_sequence: u64,
    pub entry_count: u64,
}

/// Outcome of a successful [`Store::compact`].
#[derive(Debug, Clone)]
pub struct CompactResult {
    pub output_file_id: u64,
    pub files_removed: usize,
    pub entry_count: u64,
}

/// A reference file created by a region split: a view of `parent` narrowed
/// to the rows on one side of `boundary`. Becomes a true file the next time
/// this store compacts.
pub struct ReferenceFile {
    pub parent: Arc<SortedFileHandle>,
    pub boundary: Cell,
    pub top: bool,
}

impl ReferenceFile {
    fn includes(&self, row: &[u8]) -> bool {
        if self.top {
            row >= self.boundary.row.as_slice()
        } else {
            row < self.boundary.row.as_slice()
        }
    }
}

struct FileEntry {
    handle: Arc<SortedFileHandle>,
    size_bytes: u64,
}

pub struct Store {
    dir: PathBuf,
    config: StoreConfig,
    cache: Arc<BlockCache>,
    membuffer: MemBuffer,
    files: RwLock<Vec<FileEntry>>,
    references: RwLock<Vec<ReferenceFile>>,
    next_file_id: AtomicU64,
}

impl Store {
    /// Opens a store rooted at `dir`, adopting any `<id>.sf` files already
    /// present (e.g. after a node restart) in descending file-id order.
    pub fn open(dir: &Path, config: StoreConfig, cache: Arc<BlockCache>) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let mut ids: Vec<u64> = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".sf") {
                if let Ok(id) = stem.parse::<u64>() {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut files = Vec::with_capacity(ids.len());
        let mut max_id = 0u64;
        for id in &ids {
            max_id = max_id.max(*id);
            let path = sortedfile::sorted_file_path(dir, *id);
            let handle = Arc::new(SortedFileHandle::open(&path, *id, cache.clone(), config.encoding, config.cache_data_blocks)?);
            let size_bytes = std::fs::metadata(&path)?.len();
            files.push(FileEntry { handle, size_bytes });
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            cache,
            membuffer: MemBuffer::new(),
            files: RwLock::new(files),
            references: RwLock::new(Vec::new()),
            next_file_id: AtomicU64::new(max_id + 1),
        })
    }

    pub fn membuffer(&self) -> &MemBuffer {
        &self.membuffer
    }

    pub fn family(&self) -> &str {
        &self.config.family
    }

    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    /// The largest WAL sequence already durable in one of this store's
    /// files, or `0` if it has never been flushed. A region uses this to
    /// compute how far back WAL replay needs to go on reopen.
    pub fn max_flushed_sequence(&self) -> u64 {
        self.files.read().iter().map(|f| f.handle.max_sequence()).max().unwrap_or(0)
    }

    pub fn has_references(&self) -> bool {
        !self.references.read().is_empty()
    }

    /// Every currently-live on-disk file handle, newest first — what a
    /// region split/merge needs in order to build [`ReferenceFile`]s for a
    /// daughter or merged store without re-opening files from scratch.
    pub fn file_handles(&self) -> Vec<Arc<SortedFileHandle>> {
        self.files.read().iter().map(|f| f.handle.clone()).collect()
    }

    pub fn add_reference(&self, reference: ReferenceFile) {
        self.references.write().push(reference);
    }

    /// Single-version point lookup: the membuffer, then each on-disk file
    /// newest-to-oldest, returning the first candidate found (the first
    /// source that resolves anything is, by construction, the newest
    /// write for this column — see `get_raw`'s ordering guarantee).
    pub fn get(&self, target: &Cell, read_version: u64) -> Result<Option<Cell>, StoreError> {
        if let Some(raw) = self.membuffer.get_raw(target, read_version) {
            return Ok(if raw.cell_type.is_delete() { None } else { Some(raw) });
        }
        for file in self.files.read().iter() {
            if let Some(raw) = file.handle.get_raw(target, read_version)? {
                return Ok(if raw.cell_type.is_delete() { None } else { Some(raw) });
            }
        }
        Ok(None)
    }

    /// Range scan merging the membuffer and every on-disk file, resolving
    /// version horizon/TTL/tombstones via [`resolve`].
    pub fn scan(&self, start: Option<&Cell>, end: Option<&Cell>, read_version: u64, now_ts: u64) -> Result<Vec<Cell>, StoreError> {
        let mut all = self.membuffer.scan(start, end, read_version);
        for file in self.files.read().iter() {
            for cell in file.handle.scan(start, end, read_version) {
                all.push(cell?);
            }
        }
        Ok(resolve(all, self.config.max_versions, self.config.ttl_seconds, now_ts, true))
    }

    /// Snapshots the membuffer and writes it as a new, newest SortedFile.
    /// Returns `Ok(None)` if there was nothing to flush.
    pub fn flush(&self) -> Result<Option<FlushResult>, StoreError> {
        if self.membuffer.is_empty() {
            return Ok(None);
        }
        let snapshot = self.membuffer.snapshot_for_flush();
        let file_id = self.next_file_id.fetch_add(1, Ordering::SeqCst);

        let mut writer = SortedFileWriter::create(
            &self.dir,
            file_id,
            self.config.encoding,
            self.config.checksum_type,
            snapshot.entry_count,
            self.config.bloom_granularity,
        )?;
        for entry in snapshot.entries.values() {
            writer.append(entry.cell.clone(), entry.sequence)?;
        }
        let finished = writer.finish()?;
        let size_bytes = std::fs::metadata(&finished.path)?.len();
        let handle = Arc::new(SortedFileHandle::open(
            &finished.path,
            finished.file_id,
            self.cache.clone(),
            self.config.encoding,
            self.config.cache_data_blocks,
        )?);

        self.files.write().insert(0, FileEntry { handle, size_bytes });

        Ok(Some(FlushResult {
            file_id: finished.file_id,
            max_sequence: finished.max_sequence,
            entry_count: finished.entry_count,
        }))
    }

    /// Runs minor compaction if a ratio-eligible run of files exists.
    pub fn compact_minor(&self, now_ts: u64) -> Result<Option<CompactResult>, StoreError> {
        let selection = {
            let files = self.files.read();
            let sizes: Vec<u64> = files.iter().map(|f| f.size_bytes).collect();
            select_minor_compaction(
                &sizes,
                self.config.minor_compaction_ratio,
                self.config.minor_compaction_min_files,
                self.config.minor_compaction_max_files,
            )
        };
        let Some(range) = selection else { return Ok(None) };
        self.compact_range(range, false, now_ts).map(Some)
    }

    /// Merges every file (and every pending reference) into one output
    /// file, dropping shadowed tombstones since nothing older survives.
    pub fn compact_major(&self, now_ts: u64) -> Result<Option<CompactResult>, StoreError> {
        let len = self.files.read().len();
        if len == 0 && !self.has_references() {
            return Ok(None);
        }
        self.compact_range(0..len, true, now_ts).map(Some)
    }

    fn compact_range(&self, range: std::ops::Range<usize>, is_major: bool, now_ts: u64) -> Result<CompactResult, StoreError> {
        let (selected, remaining): (Vec<FileEntry>, Vec<FileEntry>) = {
            let mut files = self.files.write();
            let drained: Vec<FileEntry> = files.drain(range.clone()).collect();
            (drained, std::mem::take(&mut *files))
        };

        let mut all: Vec<Cell> = Vec::new();
        for file in &selected {
            for cell in file.handle.scan(None, None, u64::MAX) {
                all.push(cell?);
            }
        }

        let references: Vec<ReferenceFile> = self.references.write().drain(..).collect();
        for reference in &references {
            for cell in reference.parent.scan(None, None, u64::MAX) {
                let cell = cell?;
                if reference.includes(&cell.row) {
                    all.push(cell);
                }
            }
        }

        let merged = resolve(all, self.config.max_versions, self.config.ttl_seconds, now_ts, is_major);
        let entry_count = merged.len() as u64;

        // The compacted file must still carry the true durable high-water
        // mark forward: max_flushed_sequence() (and the region's WAL replay
        // floor derived from it) reads this value, so it can't collapse to a
        // synthetic per-cell index just because compaction reorders cells.
        let input_max_sequence = selected
            .iter()
            .map(|f| f.handle.max_sequence())
            .chain(references.iter().map(|r| r.parent.max_sequence()))
            .max()
            .unwrap_or(0);

        let file_id = self.next_file_id.fetch_add(1, Ordering::SeqCst);
        let mut writer = SortedFileWriter::create(
            &self.dir,
            file_id,
            self.config.encoding,
            self.config.checksum_type,
            merged.len(),
            self.config.bloom_granularity,
        )?;
        for cell in merged {
            writer.append(cell, input_max_sequence)?;
        }
        let finished = writer.finish()?;
        let size_bytes = std::fs::metadata(&finished.path)?.len();
        let handle = Arc::new(SortedFileHandle::open(
            &finished.path,
            finished.file_id,
            self.cache.clone(),
            self.config.encoding,
            self.config.cache_data_blocks,
        )?);

        let files_removed = selected.len();
        {
            let mut files = self.files.write();
            *files = remaining;
            files.insert(0, FileEntry { handle, size_bytes });
        }

        // The old files' blocks are gone from the working set; drop them
        // from the cache so a reused file_id never returns stale bytes.
        for file in &selected {
            self.cache.invalidate_file(file.handle.file_id());
        }

        Ok(CompactResult { output_file_id: file_id, files_removed, entry_count })
    }
}

#[cfg(test)]
mod tests;

use std::sync::Arc;

use blockcache::{BlockCache, CacheConfig};
use blockcodec::{ChecksumType, Encoding};
use keycodec::{Cell, CellType};
use tempfile::tempdir;

use super::writer::SortedFileWriter;
use super::{BloomGranularity, SortedFileHandle};

fn cell(row: &str, qualifier: &str, ts: u64, ty: CellType, value: &str) -> Cell {
    Cell::new(row.as_bytes().to_vec(), b"cf".to_vec(), qualifier.as_bytes().to_vec(), ts, ty, value.as_bytes().to_vec())
}

#[test]
fn write_then_point_lookup_round_trips() {
    let dir = tempdir().unwrap();
    let mut writer = SortedFileWriter::create(dir.path(), 1, Encoding::None, ChecksumType::Crc32, 10, BloomGranularity::Row).unwrap();
    for i in 0..20u64 {
        let row = format!("row{i:04}");
        writer.append(cell(&row, "a", 100, CellType::Put, "value"), 100 + i).unwrap();
    }
    let finished = writer.finish().unwrap();
    assert_eq!(finished.entry_count, 20);

    let cache = Arc::new(BlockCache::new(CacheConfig::default()));
    let handle = SortedFileHandle::open(&finished.path, finished.file_id, cache, Encoding::None, true).unwrap();

    let found = handle.get(&cell("row0010", "a", 100, CellType::Put, ""), u64::MAX).unwrap();
    assert_eq!(found.unwrap().value, b"value");

    let missing = handle.get(&cell("row9999", "a", 100, CellType::Put, ""), u64::MAX).unwrap();
    assert!(missing.is_none());
}

#[test]
fn bloom_rejects_absent_row_without_touching_disk() {
    let dir = tempdir().unwrap();
    let mut writer = SortedFileWriter::create(dir.path(), 2, Encoding::None, ChecksumType::None, 5, BloomGranularity::Row).unwrap();
    writer.append(cell("alpha", "a", 1, CellType::Put, "x"), 1).unwrap();
    let finished = writer.finish().unwrap();

    let cache = Arc::new(BlockCache::new(CacheConfig::default()));
    let handle = SortedFileHandle::open(&finished.path, finished.file_id, cache, Encoding::None, true).unwrap();

    assert!(handle.get(&cell("zzz-not-present", "a", 1, CellType::Put, ""), u64::MAX).unwrap().is_none());
}

#[test]
fn scan_respects_range_and_read_version() {
    let dir = tempdir().unwrap();
    let mut writer = SortedFileWriter::create(dir.path(), 3, Encoding::None, ChecksumType::None, 50, BloomGranularity::Row).unwrap();
    for i in 0..50u64 {
        let row = format!("row{i:04}");
        writer.append(cell(&row, "a", 10, CellType::Put, "old"), i).unwrap();
    }
    let finished = writer.finish().unwrap();

    let cache = Arc::new(BlockCache::new(CacheConfig::default()));
    let handle = SortedFileHandle::open(&finished.path, finished.file_id, cache, Encoding::None, true).unwrap();

    let start = cell("row0010", "a", 10, CellType::Put, "");
    let end = cell("row0020", "a", 10, CellType::Put, "");
    let results: Vec<Cell> = handle.scan(Some(&start), Some(&end), u64::MAX).map(Result::unwrap).collect();
    assert_eq!(results.len(), 10);
    assert_eq!(results.first().unwrap().row, b"row0010");
    assert_eq!(results.last().unwrap().row, b"row0019");
}

#[test]
fn multi_leaf_index_file_still_finds_every_row() {
    let dir = tempdir().unwrap();
    // Small index chunk forces multiple LEAF_INDEX blocks and an
    // INTERMEDIATE_INDEX level.
    let mut writer = SortedFileWriter::create(dir.path(), 4, Encoding::None, ChecksumType::Crc32, 2000, BloomGranularity::Row).unwrap();
    writer.index_chunk_entries_for_test(4);
    writer.data_block_bytes_target_for_test(64);
    for i in 0..2000u64 {
        let row = format!("row{i:06}");
        writer.append(cell(&row, "a", 1, CellType::Put, "v"), i).unwrap();
    }
    let finished = writer.finish().unwrap();

    let cache = Arc::new(BlockCache::new(CacheConfig::default()));
    let handle = SortedFileHandle::open(&finished.path, finished.file_id, cache, Encoding::None, true).unwrap();

    for i in (0..2000u64).step_by(137) {
        let row = format!("row{i:06}");
        let found = handle.get(&cell(&row, "a", 1, CellType::Put, ""), u64::MAX).unwrap();
        assert!(found.is_some(), "missing row {row}");
    }
}

#[test]
fn delete_cell_is_reported_as_tombstone_not_value() {
    let dir = tempdir().unwrap();
    let mut writer = SortedFileWriter::create(dir.path(), 5, Encoding::None, ChecksumType::None, 4, BloomGranularity::Row).unwrap();
    writer.append(cell("row", "a", 5, CellType::DeleteCell, ""), 5).unwrap();
    let finished = writer.finish().unwrap();

    let cache = Arc::new(BlockCache::new(CacheConfig::default()));
    let handle = SortedFileHandle::open(&finished.path, finished.file_id, cache, Encoding::None, true).unwrap();

    assert!(handle.get(&cell("row", "a", 5, CellType::Put, ""), u64::MAX).unwrap().is_none());

    let raw = handle.get_raw(&cell("row", "a", 5, CellType::Put, ""), u64::MAX).unwrap().unwrap();
    assert!(raw.cell_type.is_delete());
}

#[test]
fn out_of_order_append_is_rejected() {
    let dir = tempdir().unwrap();
    let mut writer = SortedFileWriter::create(dir.path(), 6, Encoding::None, ChecksumType::None, 4, BloomGranularity::Row).unwrap();
    writer.append(cell("b", "a", 1, CellType::Put, "x"), 1).unwrap();
    let err = writer.append(cell("a", "a", 1, CellType::Put, "y"), 2).unwrap_err();
    assert!(matches!(err, crate::SortedFileError::OutOfOrder));
}

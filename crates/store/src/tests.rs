use std::sync::Arc;

use blockcache::{BlockCache, CacheConfig};
use keycodec::{Cell, CellType};
use tempfile::tempdir;

use super::*;

fn cell(row: &str, qualifier: &str, ts: u64, ty: CellType, value: &str) -> Cell {
    Cell::new(row.as_bytes().to_vec(), b"cf".to_vec(), qualifier.as_bytes().to_vec(), ts, ty, value.as_bytes().to_vec())
}

fn open_store(dir: &std::path::Path) -> Store {
    let cache = Arc::new(BlockCache::new(CacheConfig::default()));
    Store::open(dir, StoreConfig::default(), cache).unwrap()
}

#[test]
fn get_reads_from_membuffer_before_flushing() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());
    store.membuffer().insert(cell("a", "q", 10, CellType::Put, "v1"), 1, false);

    let found = store.get(&cell("a", "q", 10, CellType::Put, ""), u64::MAX).unwrap();
    assert_eq!(found.unwrap().value, b"v1");
}

#[test]
fn flush_moves_membuffer_contents_to_a_sorted_file() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());
    for i in 0..20u64 {
        let row = format!("row{i:04}");
        store.membuffer().insert(cell(&row, "q", 1, CellType::Put, "v"), i + 1, false);
    }

    let result = store.flush().unwrap().unwrap();
    assert_eq!(result.entry_count, 20);
    assert!(store.membuffer().is_empty());
    assert_eq!(store.file_count(), 1);

    let found = store.get(&cell("row0010", "q", 1, CellType::Put, ""), u64::MAX).unwrap();
    assert!(found.is_some());
}

#[test]
fn flush_with_empty_membuffer_is_a_no_op() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());
    assert!(store.flush().unwrap().is_none());
    assert_eq!(store.file_count(), 0);
}

#[test]
fn newer_file_shadows_older_file_for_the_same_column() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.membuffer().insert(cell("a", "q", 10, CellType::Put, "old"), 1, false);
    store.flush().unwrap();

    store.membuffer().insert(cell("a", "q", 10, CellType::Put, "new"), 2, false);
    store.flush().unwrap();

    let found = store.get(&cell("a", "q", 10, CellType::Put, ""), u64::MAX).unwrap().unwrap();
    assert_eq!(found.value, b"new");
}

#[test]
fn delete_in_membuffer_shadows_a_put_in_an_older_file() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.membuffer().insert(cell("a", "q", 10, CellType::Put, "v"), 1, false);
    store.flush().unwrap();

    store.membuffer().insert(cell("a", "q", 10, CellType::DeleteCell, ""), 2, false);

    assert!(store.get(&cell("a", "q", 10, CellType::Put, ""), u64::MAX).unwrap().is_none());
}

#[test]
fn scan_merges_membuffer_and_files_and_drops_tombstones() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.membuffer().insert(cell("a", "q", 10, CellType::Put, "v"), 1, false);
    store.flush().unwrap();
    store.membuffer().insert(cell("b", "q", 10, CellType::Put, "v"), 2, false);
    store.membuffer().insert(cell("c", "q", 10, CellType::DeleteCell, ""), 3, false);
    store.membuffer().insert(cell("c", "q", 5, CellType::Put, "shadowed"), 4, false);

    let results = store.scan(None, None, u64::MAX, 0).unwrap();
    let rows: Vec<Vec<u8>> = results.iter().map(|c| c.row.clone()).collect();
    assert_eq!(rows, vec![b"a".to_vec(), b"b".to_vec()]);
}

#[test]
fn file_handles_exposes_every_live_file_newest_first() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());
    assert!(store.file_handles().is_empty());

    store.membuffer().insert(cell("a", "q", 1, CellType::Put, "v1"), 1, false);
    let first = store.flush().unwrap().unwrap();
    store.membuffer().insert(cell("b", "q", 1, CellType::Put, "v2"), 2, false);
    let second = store.flush().unwrap().unwrap();

    let handles = store.file_handles();
    assert_eq!(handles.len(), 2);
    assert_eq!(handles[0].file_id(), second.file_id);
    assert_eq!(handles[1].file_id(), first.file_id);
}

#[test]
fn max_flushed_sequence_tracks_the_highest_sequence_across_files() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());
    assert_eq!(store.max_flushed_sequence(), 0);

    store.membuffer().insert(cell("a", "q", 1, CellType::Put, "v1"), 5, false);
    store.flush().unwrap();
    assert_eq!(store.max_flushed_sequence(), 5);

    store.membuffer().insert(cell("b", "q", 1, CellType::Put, "v2"), 9, false);
    store.flush().unwrap();
    assert_eq!(store.max_flushed_sequence(), 9);
}

#[test]
fn reopening_a_store_directory_loads_existing_files() {
    let dir = tempdir().unwrap();
    {
        let store = open_store(dir.path());
        store.membuffer().insert(cell("a", "q", 1, CellType::Put, "v"), 1, false);
        store.flush().unwrap();
    }

    let reopened = open_store(dir.path());
    assert_eq!(reopened.file_count(), 1);
    let found = reopened.get(&cell("a", "q", 1, CellType::Put, ""), u64::MAX).unwrap();
    assert!(found.is_some());
}

#[test]
fn minor_compaction_merges_a_ratio_eligible_run_and_keeps_newest_write() {
    let dir = tempdir().unwrap();
    let mut config = StoreConfig::default();
    config.minor_compaction_min_files = 2;
    config.minor_compaction_max_files = 10;
    config.minor_compaction_ratio = 10.0;
    let cache = Arc::new(BlockCache::new(CacheConfig::default()));
    let store = Store::open(dir.path(), config, cache).unwrap();

    for i in 0..3u64 {
        store.membuffer().insert(cell("a", "q", 1, CellType::Put, &format!("v{i}")), i + 1, false);
        store.flush().unwrap();
    }
    assert_eq!(store.file_count(), 3);

    let result = store.compact_minor(0).unwrap().unwrap();
    assert_eq!(result.files_removed, 3);
    assert_eq!(store.file_count(), 1);

    let found = store.get(&cell("a", "q", 1, CellType::Put, ""), u64::MAX).unwrap().unwrap();
    assert_eq!(found.value, b"v2");
}

#[test]
fn major_compaction_drops_a_fully_shadowed_tombstone() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.membuffer().insert(cell("a", "q", 10, CellType::Put, "v"), 1, false);
    store.flush().unwrap();
    store.membuffer().insert(cell("a", "q", 20, CellType::DeleteCell, ""), 2, false);
    store.flush().unwrap();
    assert_eq!(store.file_count(), 2);

    let result = store.compact_major(0).unwrap().unwrap();
    assert_eq!(result.files_removed, 2);
    assert_eq!(store.file_count(), 1);
    assert_eq!(result.entry_count, 0);

    assert!(store.get(&cell("a", "q", 10, CellType::Put, ""), u64::MAX).unwrap().is_none());
}

#[test]
fn compaction_preserves_the_true_max_flushed_sequence() {
    let dir = tempdir().unwrap();
    let mut config = StoreConfig::default();
    config.minor_compaction_min_files = 2;
    config.minor_compaction_max_files = 10;
    config.minor_compaction_ratio = 10.0;
    let cache = Arc::new(BlockCache::new(CacheConfig::default()));
    let store = Store::open(dir.path(), config, cache).unwrap();

    store.membuffer().insert(cell("a", "q", 1, CellType::Put, "v1"), 7, false);
    store.flush().unwrap();
    store.membuffer().insert(cell("b", "q", 1, CellType::Put, "v2"), 42, false);
    store.flush().unwrap();
    assert_eq!(store.max_flushed_sequence(), 42);

    store.compact_minor(0).unwrap().unwrap();
    assert_eq!(store.file_count(), 1);
    // The compacted file's entry count (2) must not leak into max_sequence
    // as a synthetic per-cell index — it must still read 42.
    assert_eq!(store.max_flushed_sequence(), 42);
}

#[test]
fn reference_file_is_folded_into_the_next_compaction() {
    let dir = tempdir().unwrap();
    let parent_dir = tempdir().unwrap();
    let parent_store = open_store(parent_dir.path());
    for row in ["a", "m", "z"] {
        parent_store.membuffer().insert(cell(row, "q", 1, CellType::Put, "v"), 1, false);
    }
    parent_store.flush().unwrap();
    let parent_handle = {
        let cache = Arc::new(BlockCache::new(CacheConfig::default()));
        let path = sortedfile::sorted_file_path(parent_dir.path(), 1);
        Arc::new(SortedFileHandle::open(&path, 1, cache, Encoding::None, true).unwrap())
    };

    let daughter = open_store(dir.path());
    daughter.add_reference(ReferenceFile {
        parent: parent_handle,
        boundary: cell("m", "q", 0, CellType::Put, ""),
        top: true,
    });
    assert!(daughter.has_references());

    let result = daughter.compact_major(0).unwrap().unwrap();
    assert_eq!(result.entry_count, 2); // "m" and "z", not "a"
    assert!(!daughter.has_references());

    let found = daughter.get(&cell("m", "q", 1, CellType::Put, ""), u64::MAX).unwrap();
    assert!(found.is_some());
    let missing = daughter.get(&cell("a", "q", 1, CellType::Put, ""), u64::MAX).unwrap();
    assert!(missing.is_none());
}

#[test]
fn select_minor_compaction_stops_at_a_disproportionately_large_older_file() {
    let sizes = [10u64, 12, 1000];
    let selection = select_minor_compaction(&sizes, 1.5, 2, 10);
    assert_eq!(selection, Some(0..2));
}

#[test]
fn select_minor_compaction_requires_the_minimum_file_count() {
    let sizes = [10u64, 1000];
    assert_eq!(select_minor_compaction(&sizes, 1.5, 2, 10), None);
}

use std::sync::Arc;

use blockcache::{BlockCache, CacheConfig};
use keycodec::{Cell, CellType};
use observer::AbortPolicy;
use parking_lot::Mutex;
use regionfs::{RegionFileSystem, RegionInfo};
use tempfile::tempdir;
use wal::WalWriter;

use super::*;

fn cell(row: &str, qualifier: &str, ts: u64, ty: CellType, value: &str) -> Cell {
    Cell::new(row.as_bytes().to_vec(), b"cf".to_vec(), qualifier.as_bytes().to_vec(), ts, ty, value.as_bytes().to_vec())
}

struct Harness {
    _root: tempfile::TempDir,
    region: Region,
}

fn open_region(root: &std::path::Path, region_id: u64, encoded_name: &str, start: &[u8], end: &[u8]) -> Region {
    let fs = RegionFileSystem::new(root, "default", "orders", encoded_name);
    let info = RegionInfo {
        namespace: "default".into(),
        table: "orders".into(),
        region_encoded_name: encoded_name.into(),
        region_id,
        start_key: start.to_vec(),
        end_key: end.to_vec(),
    };
    let cache = Arc::new(BlockCache::new(CacheConfig::default()));
    let wal = Arc::new(Mutex::new(WalWriter::create(&root.join("wal"), 0).unwrap()));
    let observers = Arc::new(ObserverRegistry::new(AbortPolicy::AbortOnError));
    let families = vec![FamilyConfig::new("cf")];
    Region::open(region_id, info, fs, families, cache, wal, observers, None, Durability::SyncWal).unwrap()
}

fn harness() -> Harness {
    let root = tempdir().unwrap();
    let region = open_region(root.path(), 1, "0000000000000001", b"", b"");
    Harness { _root: root, region }
}

#[test]
fn put_then_get_round_trips_a_cell() {
    let h = harness();
    h.region.put(b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::UseDefault).unwrap();

    let found = h.region.get(&cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value, b"v1");
}

#[test]
fn delete_shadows_an_earlier_put() {
    let h = harness();
    h.region.put(b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::UseDefault).unwrap();
    h.region.delete(b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::DeleteColumn, "")], Durability::UseDefault).unwrap();

    let found = h.region.get(&cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
    assert!(found.is_empty());
}

#[test]
fn write_stamps_latest_timestamp_and_attaches_an_mvcc_tag() {
    let h = harness();
    let sequence = h.region.put(b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::UseDefault).unwrap();

    let found = h.region.get(&cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
    assert_eq!(found[0].timestamp, sequence);
    assert_eq!(found[0].tags.iter().find_map(keycodec::Tag::as_mvcc), Some(sequence));
}

#[test]
fn put_rejects_a_cell_whose_row_does_not_match() {
    let h = harness();
    let err = h.region.put(b"row1".to_vec(), vec![cell("row2", "q", LATEST_TIMESTAMP, CellType::Put, "v")], Durability::UseDefault);
    assert!(matches!(err, Err(RegionError::RowMismatch { .. })));
}

#[test]
fn batch_commits_every_row() {
    let h = harness();
    let outcomes = h.region.batch(vec![
        RowMutation { row: b"a".to_vec(), cells: vec![cell("a", "q", LATEST_TIMESTAMP, CellType::Put, "1")], durability: Durability::UseDefault },
        RowMutation { row: b"b".to_vec(), cells: vec![cell("b", "q", LATEST_TIMESTAMP, CellType::Put, "2")], durability: Durability::UseDefault },
    ]);
    assert!(outcomes.iter().all(Result::is_ok));
    assert!(h.region.get(&cell("a", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap().len() == 1);
    assert!(h.region.get(&cell("b", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap().len() == 1);
}

#[test]
fn batch_shares_one_sequence_across_rows() {
    let h = harness();
    let outcomes = h.region.batch(vec![
        RowMutation { row: b"a".to_vec(), cells: vec![cell("a", "q", LATEST_TIMESTAMP, CellType::Put, "1")], durability: Durability::UseDefault },
        RowMutation { row: b"b".to_vec(), cells: vec![cell("b", "q", LATEST_TIMESTAMP, CellType::Put, "2")], durability: Durability::UseDefault },
    ]);
    let sequences: Vec<u64> = outcomes.into_iter().map(Result::unwrap).collect();
    assert_eq!(sequences[0], sequences[1]);
}

#[test]
fn batch_fails_only_the_row_mismatched_entry() {
    let h = harness();
    let outcomes = h.region.batch(vec![
        RowMutation { row: b"a".to_vec(), cells: vec![cell("a", "q", LATEST_TIMESTAMP, CellType::Put, "1")], durability: Durability::UseDefault },
        RowMutation { row: b"b".to_vec(), cells: vec![cell("other", "q", LATEST_TIMESTAMP, CellType::Put, "2")], durability: Durability::UseDefault },
    ]);
    assert!(outcomes[0].is_ok());
    assert!(matches!(outcomes[1], Err(RegionError::RowMismatch { .. })));
    assert_eq!(h.region.get(&cell("a", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap().len(), 1);
}

#[test]
fn check_and_mutate_only_applies_when_the_comparator_holds() {
    let h = harness();
    h.region.put(b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "old")], Durability::UseDefault).unwrap();

    let applied = h
        .region
        .check_and_mutate(
            cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""),
            Comparator::Equal,
            Some(b"wrong".to_vec()),
            cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "new"),
            Durability::UseDefault,
        )
        .unwrap();
    assert!(!applied);
    assert_eq!(h.region.get(&cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap()[0].value, b"old");

    let applied = h
        .region
        .check_and_mutate(
            cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""),
            Comparator::Equal,
            Some(b"old".to_vec()),
            cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "new"),
            Durability::UseDefault,
        )
        .unwrap();
    assert!(applied);
    assert_eq!(h.region.get(&cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap()[0].value, b"new");
}

#[test]
fn increment_adds_to_the_current_value_treating_absent_as_zero() {
    let h = harness();
    let first = h.region.increment(cell("counter", "q", LATEST_TIMESTAMP, CellType::Put, ""), 5).unwrap();
    assert_eq!(i64::from_be_bytes(first.value.as_slice().try_into().unwrap()), 5);

    let second = h.region.increment(cell("counter", "q", LATEST_TIMESTAMP, CellType::Put, ""), -2).unwrap();
    assert_eq!(i64::from_be_bytes(second.value.as_slice().try_into().unwrap()), 3);
}

#[test]
fn append_concatenates_onto_the_current_value() {
    let h = harness();
    h.region.append(cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), b"foo".to_vec()).unwrap();
    let result = h.region.append(cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), b"bar".to_vec()).unwrap();
    assert_eq!(result.value, b"foobar");
}

#[test]
fn scan_returns_rows_in_order_and_respects_the_batch_cell_budget() {
    let h = harness();
    for row in ["a", "b", "c"] {
        h.region.put(row.as_bytes().to_vec(), vec![cell(row, "q", LATEST_TIMESTAMP, CellType::Put, "v")], Durability::UseDefault).unwrap();
    }

    let mut scanner = h.region.scan(ScanRequest::default(), 0).unwrap();
    let first = scanner.next(2);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0][0].row, b"a");
    let second = scanner.next(2);
    assert_eq!(second.len(), 1);
    assert!(scanner.is_exhausted());
}

#[test]
fn flush_moves_membuffer_content_into_a_file_without_losing_it() {
    let h = harness();
    h.region.put(b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::UseDefault).unwrap();
    h.region.flush().unwrap();

    let found = h.region.get(&cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
    assert_eq!(found[0].value, b"v1");
}

#[test]
fn get_on_a_region_that_is_not_open_fails() {
    let root = tempdir().unwrap();
    let region = open_region(root.path(), 1, "0000000000000001", b"", b"");
    *region.state.write() = RegionState::Closing;

    let err = region.get(&cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1);
    assert!(matches!(err, Err(RegionError::RegionNotOnline(_))));
}

#[test]
fn reopening_a_region_replays_the_wal_into_an_empty_membuffer() {
    let root = tempdir().unwrap();
    {
        let region = open_region(root.path(), 1, "0000000000000001", b"", b"");
        region.put(b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::SyncWal).unwrap();
        // deliberately not flushed: only the WAL has this write durable
    }

    let reopened = open_region(root.path(), 1, "0000000000000001", b"", b"");
    let found = reopened.get(&cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
    assert_eq!(found[0].value, b"v1");
}

#[test]
fn split_produces_two_adjacent_daughter_region_infos() {
    let root = tempdir().unwrap();
    let region = open_region(root.path(), 1, "0000000000000001", b"a", b"z");
    region.put(b"m".to_vec(), vec![cell("m", "q", LATEST_TIMESTAMP, CellType::Put, "v")], Durability::UseDefault).unwrap();
    region.flush().unwrap();

    let outcome = region
        .split(b"m".to_vec(), 2, "0000000000000002".to_string(), 3, "0000000000000003".to_string())
        .unwrap();

    assert_eq!(outcome.bottom.start_key, b"a");
    assert_eq!(outcome.bottom.end_key, b"m");
    assert_eq!(outcome.top.start_key, b"m");
    assert_eq!(outcome.top.end_key, b"z");
    assert_eq!(region.state(), RegionState::Split);
}

#[test]
fn split_rejects_a_key_outside_the_region_range() {
    let root = tempdir().unwrap();
    let region = open_region(root.path(), 1, "0000000000000001", b"a", b"m");

    let err = region.split(b"zzz".to_vec(), 2, "0000000000000002".to_string(), 3, "0000000000000003".to_string());
    assert!(matches!(err, Err(RegionError::InvalidSplitKey(_))));
    assert_eq!(region.state(), RegionState::Open, "a rejected split must roll back to Open");
}

#[test]
fn merge_combines_two_adjacent_regions() {
    let root = tempdir().unwrap();
    let left = open_region(root.path(), 1, "0000000000000001", b"a", b"m");
    let right = open_region(root.path(), 2, "0000000000000002", b"m", b"z");

    let outcome = left.merge(&right, 3, "0000000000000003".to_string()).unwrap();
    assert_eq!(outcome.merged.start_key, b"a");
    assert_eq!(outcome.merged.end_key, b"z");
    assert_eq!(left.state(), RegionState::Merged);
    assert_eq!(right.state(), RegionState::Merged);
}

#[test]
fn merge_labels_reference_sides_by_adjacency_not_argument_order() {
    let root = tempdir().unwrap();
    let left = open_region(root.path(), 1, "0000000000000001", b"a", b"m");
    let right = open_region(root.path(), 2, "0000000000000002", b"m", b"z");

    left.put(b"a".to_vec(), vec![cell("a", "q", LATEST_TIMESTAMP, CellType::Put, "v")], Durability::UseDefault).unwrap();
    left.flush().unwrap();
    right.put(b"m".to_vec(), vec![cell("m", "q", LATEST_TIMESTAMP, CellType::Put, "v")], Durability::UseDefault).unwrap();
    right.flush().unwrap();

    let left_file_id = left.file_handles("cf").unwrap()[0].file_id();
    let right_file_id = right.file_handles("cf").unwrap()[0].file_id();

    // `self` is the upper region here; the reference markers must still
    // follow row-range adjacency, not which side called `merge`.
    right.merge(&left, 3, "0000000000000003".to_string()).unwrap();

    let merged_fs = RegionFileSystem::new(root.path(), "default", "orders", "0000000000000003");
    let family_dir = merged_fs.family_dir("cf");
    assert!(family_dir.join(format!("{left_file_id:020}.bottom.ref")).exists(), "left region's file must be marked bottom");
    assert!(family_dir.join(format!("{right_file_id:020}.top.ref")).exists(), "right region's file must be marked top");
}

#[test]
fn merge_rejects_non_adjacent_regions() {
    let root = tempdir().unwrap();
    let left = open_region(root.path(), 1, "0000000000000001", b"a", b"c");
    let right = open_region(root.path(), 2, "0000000000000002", b"m", b"z");

    let err = left.merge(&right, 3, "0000000000000003".to_string());
    assert!(matches!(err, Err(RegionError::MergeRegion(_))));
    assert_eq!(left.state(), RegionState::Open);
    assert_eq!(right.state(), RegionState::Open);
}

mod mvcc_clock {
    use crate::mvcc::MvccClock;

    #[test]
    fn read_point_stalls_behind_an_incomplete_earlier_write() {
        let clock = MvccClock::new();
        let a = clock.begin();
        let b = clock.begin();
        clock.complete(b);
        assert_eq!(clock.read_point(), 0, "write a hasn't completed yet, so the read point can't pass it");
        clock.complete(a);
        assert_eq!(clock.read_point(), b);
    }

    #[test]
    fn read_point_advances_one_at_a_time_in_order() {
        let clock = MvccClock::new();
        let seqs: Vec<u64> = (0..5).map(|_| clock.begin()).collect();
        for (i, seq) in seqs.iter().enumerate() {
            clock.complete(*seq);
            assert_eq!(clock.read_point(), (i as u64) + 1);
        }
    }
}

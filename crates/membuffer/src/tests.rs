use keycodec::{Cell, CellType};

use super::MemBuffer;

fn cell(row: &str, ts: u64, ty: CellType, value: &str) -> Cell {
    Cell::new(row.as_bytes().to_vec(), b"cf".to_vec(), b"q".to_vec(), ts, ty, value.as_bytes().to_vec())
}

#[test]
fn put_then_get_round_trips() {
    let buf = MemBuffer::new();
    buf.insert(cell("a", 10, CellType::Put, "v1"), 1, false);
    let found = buf.get(&cell("a", 10, CellType::Put, ""), u64::MAX).unwrap();
    assert_eq!(found.value, b"v1");
}

#[test]
fn stale_sequence_is_dropped() {
    let buf = MemBuffer::new();
    buf.insert(cell("a", 10, CellType::Put, "new"), 5, false);
    buf.insert(cell("a", 10, CellType::Put, "old"), 3, false);
    let found = buf.get(&cell("a", 10, CellType::Put, ""), u64::MAX).unwrap();
    assert_eq!(found.value, b"new");
}

#[test]
fn equal_sequence_is_also_dropped() {
    let buf = MemBuffer::new();
    buf.insert(cell("a", 10, CellType::Put, "first"), 5, false);
    buf.insert(cell("a", 10, CellType::Put, "second"), 5, false);
    let found = buf.get(&cell("a", 10, CellType::Put, ""), u64::MAX).unwrap();
    assert_eq!(found.value, b"first");
}

#[test]
fn delete_shadows_older_put_at_lower_read_version_boundary() {
    let buf = MemBuffer::new();
    buf.insert(cell("a", 10, CellType::Put, "v"), 1, false);
    buf.insert(cell("a", 20, CellType::DeleteCell, ""), 2, false);

    // A read version that only sees the older put should still find it.
    let found = buf.get(&cell("a", 10, CellType::Put, ""), 15).unwrap();
    assert_eq!(found.value, b"v");

    // A read version that reaches the tombstone's timestamp sees nothing.
    assert!(buf.get(&cell("a", 10, CellType::Put, ""), 20).is_none());
}

#[test]
fn get_raw_exposes_a_shadowing_tombstone() {
    let buf = MemBuffer::new();
    buf.insert(cell("a", 20, CellType::DeleteCell, ""), 1, false);
    assert!(buf.get(&cell("a", 20, CellType::Put, ""), u64::MAX).is_none());
    let raw = buf.get_raw(&cell("a", 20, CellType::Put, ""), u64::MAX).unwrap();
    assert!(raw.cell_type.is_delete());
}

#[test]
fn approx_size_tracks_inserts_and_replacements() {
    let buf = MemBuffer::new();
    assert_eq!(buf.approx_size(), 0);
    buf.insert(cell("a", 1, CellType::Put, "1234"), 1, false);
    let after_first = buf.approx_size();
    assert!(after_first > 0);

    buf.insert(cell("a", 1, CellType::Put, "12"), 2, false);
    let after_shrink = buf.approx_size();
    assert!(after_shrink < after_first);
}

#[test]
fn skip_wal_inserts_count_toward_mutations_without_wal_bytes_only() {
    let buf = MemBuffer::new();
    buf.insert(cell("a", 1, CellType::Put, "value"), 1, true);
    assert!(buf.mutations_without_wal_bytes() > 0);
    assert_eq!(buf.approx_size(), buf.mutations_without_wal_bytes());
}

#[test]
fn scan_respects_range_and_read_version() {
    let buf = MemBuffer::new();
    for i in 0..10u64 {
        let row = format!("row{i:02}");
        buf.insert(cell(&row, 5, CellType::Put, "v"), i + 1, false);
    }
    let start = cell("row02", 5, CellType::Put, "");
    let end = cell("row05", 5, CellType::Put, "");
    let results = buf.scan(Some(&start), Some(&end), u64::MAX);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].row, b"row02");
    assert_eq!(results.last().unwrap().row, b"row04");
}

#[test]
fn scan_filters_by_read_version() {
    let buf = MemBuffer::new();
    buf.insert(cell("a", 10, CellType::Put, "old"), 1, false);
    buf.insert(cell("a", 20, CellType::Put, "new"), 2, false);

    let all = buf.scan(None, None, u64::MAX);
    assert_eq!(all.len(), 2);

    let old_only = buf.scan(None, None, 15);
    assert_eq!(old_only.len(), 1);
    assert_eq!(old_only[0].value, b"old");
}

#[test]
fn snapshot_for_flush_drains_and_resets() {
    let buf = MemBuffer::new();
    buf.insert(cell("a", 1, CellType::Put, "v"), 7, false);
    buf.insert(cell("b", 1, CellType::Put, "v"), 9, false);

    let snap = buf.snapshot_for_flush();
    assert_eq!(snap.entry_count, 2);
    assert_eq!(snap.max_sequence, 9);

    assert_eq!(buf.len(), 0);
    assert!(buf.is_empty());
    assert_eq!(buf.approx_size(), 0);

    // Writes after the snapshot land in the fresh successor map.
    buf.insert(cell("c", 1, CellType::Put, "v"), 10, false);
    assert_eq!(buf.len(), 1);
    assert_eq!(snap.entries.len(), 2);
}

use keycodec::CellType;
use region::ScanRequest;
use wal::Durability;

use super::helpers::{cell, harness};
use crate::LATEST_TIMESTAMP;

#[test]
fn get_on_an_absent_row_returns_empty() {
    let h = harness();
    let found = h.node.get(1, &cell("missing", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
    assert!(found.is_empty());
}

#[test]
fn exists_reflects_a_committed_put() {
    let h = harness();
    assert!(!h.node.exists(1, &cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "")).unwrap());

    h.node.put(1, b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::UseDefault).unwrap();
    assert!(h.node.exists(1, &cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "")).unwrap());
}

#[test]
fn scan_returns_rows_in_order() {
    let h = harness();
    for row in ["a", "b", "c"] {
        h.node.put(1, row.as_bytes().to_vec(), vec![cell(row, "q", LATEST_TIMESTAMP, CellType::Put, "v")], Durability::UseDefault).unwrap();
    }

    let mut scanner = h.node.scan(1, ScanRequest::default(), 0).unwrap();
    let rows = scanner.next(10);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0].row, b"a");
    assert_eq!(rows[2][0].row, b"c");
}

#[test]
fn scan_against_an_unknown_region_fails() {
    let h = harness();
    let err = h.node.scan(999, ScanRequest::default(), 0);
    assert!(matches!(err, Err(crate::EngineError::UnknownRegion(999))));
}

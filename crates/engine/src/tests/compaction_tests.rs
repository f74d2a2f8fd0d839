use keycodec::CellType;
use wal::Durability;

use super::helpers::{cell, harness};
use crate::LATEST_TIMESTAMP;

#[test]
fn flush_region_moves_memstore_content_into_a_file_without_losing_it() {
    let h = harness();
    h.node.put(1, b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::UseDefault).unwrap();
    h.node.flush_region(1).unwrap();

    let found = h.node.get(1, &cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
    assert_eq!(found[0].value, b"v1");
}

#[test]
fn compact_region_after_several_flushes_keeps_the_latest_version() {
    let h = harness();
    for v in ["v1", "v2", "v3"] {
        h.node.put(1, b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, v)], Durability::UseDefault).unwrap();
        h.node.flush_region(1).unwrap();
    }
    h.node.compact_region(1, true).unwrap();

    let found = h.node.get(1, &cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
    assert_eq!(found[0].value, b"v3");
}

#[test]
fn flush_against_an_unknown_region_fails() {
    let h = harness();
    let err = h.node.flush_region(999);
    assert!(matches!(err, Err(crate::EngineError::UnknownRegion(999))));
}

#[test]
fn submit_flush_runs_on_the_scheduler_without_blocking_the_caller() {
    let h = harness();
    h.node.put(1, b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::UseDefault).unwrap();
    h.node.submit_flush(1).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(50));
    let found = h.node.get(1, &cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
    assert_eq!(found[0].value, b"v1");
}

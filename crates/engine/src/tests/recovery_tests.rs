use keycodec::CellType;
use wal::Durability;

use super::helpers::{cell, open_node};
use crate::LATEST_TIMESTAMP;

#[test]
fn reopening_a_node_replays_the_wal_into_an_empty_memstore() {
    let root = tempfile::tempdir().unwrap();
    {
        let node = open_node(root.path(), config::RegionServerConfig::default());
        node.create_region(1, "0000000000000001".to_string(), b"".to_vec(), b"".to_vec(), &["cf".to_string()]).unwrap();
        node.put(1, b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::SyncWal).unwrap();
        // deliberately not flushed: only the WAL has this write durable
    }

    let reopened = open_node(root.path(), config::RegionServerConfig::default());
    let found = reopened.get(1, &cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
    assert_eq!(found[0].value, b"v1");
}

#[test]
fn reopening_a_node_with_no_regions_created_yet_starts_empty() {
    let root = tempfile::tempdir().unwrap();
    {
        let _node = open_node(root.path(), config::RegionServerConfig::default());
    }
    let reopened = open_node(root.path(), config::RegionServerConfig::default());
    assert!(reopened.region_ids().is_empty());
}

#[test]
fn reopening_a_node_picks_up_the_latest_wal_segment() {
    let root = tempfile::tempdir().unwrap();
    {
        let node = open_node(root.path(), config::RegionServerConfig::default());
        node.create_region(1, "0000000000000001".to_string(), b"".to_vec(), b"".to_vec(), &["cf".to_string()]).unwrap();
        node.put(1, b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::SyncWal).unwrap();
    }

    // A second open must not reuse file_id 0 from scratch — it should pick
    // up the highest existing segment so a third open still finds row1.
    {
        let node = open_node(root.path(), config::RegionServerConfig::default());
        let found = node.get(1, &cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap();
        assert_eq!(found[0].value, b"v1");
        node.put(1, b"row2".to_vec(), vec![cell("row2", "q", LATEST_TIMESTAMP, CellType::Put, "v2")], Durability::SyncWal).unwrap();
    }

    let node = open_node(root.path(), config::RegionServerConfig::default());
    assert_eq!(node.get(1, &cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap()[0].value, b"v1");
    assert_eq!(node.get(1, &cell("row2", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap()[0].value, b"v2");
}

#[test]
fn a_region_opened_with_two_families_survives_a_restart_with_both() {
    let root = tempfile::tempdir().unwrap();
    {
        let node = open_node(root.path(), config::RegionServerConfig::default());
        node.create_region(1, "0000000000000001".to_string(), b"".to_vec(), b"".to_vec(), &["cf".to_string(), "other".to_string()]).unwrap();
        node.put(1, b"row1".to_vec(), vec![cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v1")], Durability::SyncWal).unwrap();

        let mut other_cell = cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "v2");
        other_cell.family = b"other".to_vec();
        node.put(1, b"row1".to_vec(), vec![other_cell], Durability::SyncWal).unwrap();
    }

    // Neither family ever flushed, so neither has a directory on disk —
    // only the node manifest's family list tells a restart they exist.
    let reopened = open_node(root.path(), config::RegionServerConfig::default());
    assert_eq!(reopened.get(1, &cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, ""), 1).unwrap()[0].value, b"v1");

    let mut other_target = cell("row1", "q", LATEST_TIMESTAMP, CellType::Put, "");
    other_target.family = b"other".to_vec();
    assert_eq!(reopened.get(1, &other_target, 1).unwrap()[0].value, b"v2");
}

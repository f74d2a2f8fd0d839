use std::sync::Arc;

use config::RegionServerConfig;
use keycodec::{Cell, CellType};
use observer::{AbortPolicy, ObserverRegistry};

use crate::Node;

pub fn cell(row: &str, qualifier: &str, ts: u64, ty: CellType, value: &str) -> Cell {
    Cell::new(row.as_bytes().to_vec(), b"cf".to_vec(), qualifier.as_bytes().to_vec(), ts, ty, value.as_bytes().to_vec())
}

pub fn open_node(root: &std::path::Path, config: RegionServerConfig) -> Node {
    let observers = Arc::new(ObserverRegistry::new(AbortPolicy::AbortOnError));
    Node::open(root, "default", "orders", config, 4 * 1024 * 1024, observers, None).unwrap()
}

pub struct Harness {
    pub _root: tempfile::TempDir,
    pub node: Node,
}

/// A node with one already-created region (id `1`, spanning the whole
/// keyspace) holding a single `cf` family.
pub fn harness() -> Harness {
    let root = tempfile::tempdir().unwrap();
    let node = open_node(root.path(), RegionServerConfig::default());
    node.create_region(1, "0000000000000001".to_string(), b"".to_vec(), b"".to_vec(), &["cf".to_string()]).unwrap();
    Harness { _root: root, node }
}

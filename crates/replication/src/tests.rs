use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use keycodec::{Cell, CellType};

use super::*;

fn cell(family: &str) -> Cell {
    Cell::new(b"row".to_vec(), family.as_bytes().to_vec(), b"q".to_vec(), 1, CellType::Put, b"v".to_vec())
}

fn edit(region_id: u64, sequence: u64, is_control: bool, cells: Vec<Cell>) -> ReplicatedEdit {
    ReplicatedEdit { region_id, sequence, is_control, cells }
}

struct RecordingSink {
    name: String,
    received: Mutex<Vec<usize>>,
    fail: bool,
}

impl ReplicationSink for RecordingSink {
    fn ship(&self, batch: &[ReplicatedEdit]) -> Result<(), String> {
        if self.fail {
            return Err(format!("{} is down", self.name));
        }
        self.received.lock().unwrap().push(batch.len());
        Ok(())
    }
}

struct FixedCatalog {
    sinks: Mutex<Vec<(SinkId, Arc<dyn ReplicationSink>)>>,
    query_count: AtomicUsize,
}

impl PeerCatalog for FixedCatalog {
    fn list_sinks(&self) -> Vec<(SinkId, Arc<dyn ReplicationSink>)> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().clone()
    }
}

fn sink(name: &str, fail: bool) -> (SinkId, Arc<dyn ReplicationSink>) {
    (SinkId(name.to_string()), Arc::new(RecordingSink { name: name.to_string(), received: Mutex::new(Vec::new()), fail }))
}

#[test]
fn filter_drops_control_edits() {
    let tap = ReplicationTap::new(Arc::new(FixedCatalog { sinks: Mutex::new(vec![]), query_count: AtomicUsize::new(0) }), 1.0, 3, 1024);
    let e = edit(1, 1, true, vec![cell("cf")]);
    assert!(tap.filter(e, |_| ReplicationScope::Global).is_none());
}

#[test]
fn filter_drops_non_global_families_and_keeps_global_ones() {
    let tap = ReplicationTap::new(Arc::new(FixedCatalog { sinks: Mutex::new(vec![]), query_count: AtomicUsize::new(0) }), 1.0, 3, 1024);
    let e = edit(1, 1, false, vec![cell("local_cf"), cell("global_cf")]);

    let filtered = tap
        .filter(e, |family| if family == b"global_cf" { ReplicationScope::Global } else { ReplicationScope::Local })
        .unwrap();

    assert_eq!(filtered.cells.len(), 1);
    assert_eq!(filtered.cells[0].family, b"global_cf");
}

#[test]
fn filter_drops_an_edit_with_no_surviving_global_cells() {
    let tap = ReplicationTap::new(Arc::new(FixedCatalog { sinks: Mutex::new(vec![]), query_count: AtomicUsize::new(0) }), 1.0, 3, 1024);
    let e = edit(1, 1, false, vec![cell("local_cf")]);
    assert!(tap.filter(e, |_| ReplicationScope::Local).is_none());
}

#[test]
fn batch_respects_the_byte_budget() {
    let tap = ReplicationTap::new(Arc::new(FixedCatalog { sinks: Mutex::new(vec![]), query_count: AtomicUsize::new(0) }), 1.0, 3, 1);
    let edits = vec![edit(1, 1, false, vec![cell("cf")]), edit(1, 2, false, vec![cell("cf")])];
    let batches = tap.batch(edits);
    assert_eq!(batches.len(), 2);
}

#[test]
fn ship_selects_ratio_based_sink_count() {
    let catalog = Arc::new(FixedCatalog {
        sinks: Mutex::new(vec![sink("a", false), sink("b", false), sink("c", false), sink("d", false)]),
        query_count: AtomicUsize::new(0),
    });
    let tap = ReplicationTap::new(catalog, 0.5, 3, 1024);
    assert_eq!(tap.live_sink_count(), 4);

    let batch = vec![edit(1, 1, false, vec![cell("cf")])];
    tap.ship(&batch).unwrap();
}

#[test]
fn a_sink_is_evicted_after_the_bad_sink_threshold_and_refreshes_when_empty() {
    let catalog = Arc::new(FixedCatalog {
        sinks: Mutex::new(vec![sink("only", true)]),
        query_count: AtomicUsize::new(0),
    });
    let tap = ReplicationTap::new(catalog.clone(), 1.0, 2, 1024);

    let batch = vec![edit(1, 1, false, vec![cell("cf")])];
    assert!(tap.ship(&batch).is_err());
    assert_eq!(tap.live_sink_count(), 1, "below threshold, sink stays");

    assert!(tap.ship(&batch).is_err());
    assert_eq!(tap.live_sink_count(), 1, "refreshed from the same failing catalog entry");
    assert_eq!(catalog.query_count.load(Ordering::SeqCst), 2, "initial construction + one refresh");
}

#[test]
fn ship_with_no_live_sinks_errors() {
    let tap = ReplicationTap::new(Arc::new(FixedCatalog { sinks: Mutex::new(vec![]), query_count: AtomicUsize::new(0) }), 1.0, 3, 1024);
    let batch = vec![edit(1, 1, false, vec![cell("cf")])];
    assert!(matches!(tap.ship(&batch), Err(ReplicationError::NoLiveSinks)));
}

use keycodec::Cell;

/// A column family's replication scope. Only `Global`-scoped cells leave
/// the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationScope {
    Local,
    Global,
}

/// One WAL-sourced edit as seen by the replication tap: the region and
/// sequence it came from (so the receiver can de-duplicate), whether it's a
/// control marker (e.g. a compaction marker, never shipped), and its cells.
#[derive(Debug, Clone)]
pub struct ReplicatedEdit {
    pub region_id: u64,
    pub sequence: u64,
    pub is_control: bool,
    pub cells: Vec<Cell>,
}

impl ReplicatedEdit {
    #[must_use]
    pub fn estimated_bytes(&self) -> usize {
        self.cells.iter().map(Cell::estimated_heap_size).sum()
    }
}

//! # MemBuffer
//!
//! The sorted, in-memory write buffer a `store` keeps in front of its
//! `SortedFile` set: every `put`/`delete` lands here first, ordered by
//! [`keycodec::compare`], before an eventual flush turns a snapshot of it
//! into an immutable file.
//!
//! Concurrent readers and a single writer share one [`MemBuffer`] through a
//! `parking_lot::RwLock` guarding the sorted map — a lock-based
//! simplification of a lock-free skiplist, adequate at single-writer-per-
//! region scale and consistent with the rest of this workspace's locking
//! choices.
//!
//! Stale-write protection: a cell inserted with a sequence number no
//! greater than the one already resident under the same [`keycodec::CellKey`]
//! is silently dropped, so replaying a WAL segment twice (or racing flush
//! with replay) can't regress a newer write.

use std::collections::BTreeMap;
use std::sync::Arc;

use keycodec::{Cell, CellKey};
use parking_lot::RwLock;

/// A resident cell paired with the WAL sequence it was written under.
#[derive(Debug, Clone)]
pub struct Entry {
    pub cell: Cell,
    pub sequence: u64,
}

#[derive(Default)]
struct Inner {
    map: BTreeMap<CellKey, Entry>,
    approx_size: usize,
    mutations_without_wal_bytes: usize,
}

/// An immutable view handed to a flush, paired with the sequence/byte
/// accounting the [`MemBuffer`] had at the moment of the snapshot.
pub struct FlushSnapshot {
    pub entries: Arc<BTreeMap<CellKey, Entry>>,
    pub max_sequence: u64,
    pub entry_count: usize,
}

pub struct MemBuffer {
    inner: RwLock<Inner>,
}

impl MemBuffer {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    /// Inserts `cell` under `sequence`, accounting its size. `skip_wal`
    /// charges the insert to `mutations_without_wal_bytes` instead of the
    /// durable byte count, so operators can see how much resident data
    /// would be lost on crash.
    pub fn insert(&self, cell: Cell, sequence: u64, skip_wal: bool) {
        let key = CellKey(cell.clone());
        let cell_size = cell.estimated_heap_size();
        let mut inner = self.inner.write();

        if let Some(existing) = inner.map.get(&key) {
            if existing.sequence >= sequence {
                return;
            }
            let old_size = existing.cell.estimated_heap_size();
            inner.approx_size = inner.approx_size.saturating_sub(old_size);
        }

        inner.approx_size = inner.approx_size.saturating_add(cell_size);
        if skip_wal {
            inner.mutations_without_wal_bytes = inner.mutations_without_wal_bytes.saturating_add(cell_size);
        }
        inner.map.insert(key, Entry { cell, sequence });
    }

    /// Finds the visible cell for `target`'s (row, family, qualifier) at or
    /// below `read_version`, skipping tombstones. Use
    /// [`MemBuffer::get_raw`] when merging against other sources that need
    /// to see a tombstone in order to shadow an older one.
    pub fn get(&self, target: &Cell, read_version: u64) -> Option<Cell> {
        self.get_raw(target, read_version).filter(|c| !c.cell_type.is_delete())
    }

    /// Like [`MemBuffer::get`] but returns the floor entry even if it is a
    /// tombstone.
    pub fn get_raw(&self, target: &Cell, read_version: u64) -> Option<Cell> {
        let mut probe = target.clone();
        probe.timestamp = read_version;
        probe.cell_type = keycodec::CellType::Put;

        let inner = self.inner.read();
        let (key, entry) = inner.map.range(..=CellKey(probe)).next_back()?;
        if key.0.row != target.row || key.0.family != target.family || key.0.qualifier != target.qualifier {
            return None;
        }
        Some(entry.cell.clone())
    }

    /// Returns every resident version in `[start, end)` with
    /// `timestamp <= read_version`, in comparator order. Collapsing
    /// multiple versions of the same column to the visible one is the
    /// merging scanner's job (it sees `store`'s other files too), not this
    /// buffer's.
    pub fn scan(&self, start: Option<&Cell>, end: Option<&Cell>, read_version: u64) -> Vec<Cell> {
        let inner = self.inner.read();
        let lower = start.map(|c| {
            let mut probe = c.clone();
            probe.timestamp = u64::MAX;
            probe.cell_type = keycodec::CellType::Put;
            CellKey(probe)
        });
        let range: Box<dyn Iterator<Item = (&CellKey, &Entry)>> = match (&lower, end) {
            (Some(lo), Some(hi)) => Box::new(inner.map.range(lo.clone()..CellKey(hi.clone()))),
            (Some(lo), None) => Box::new(inner.map.range(lo.clone()..)),
            (None, Some(hi)) => Box::new(inner.map.range(..CellKey(hi.clone()))),
            (None, None) => Box::new(inner.map.iter()),
        };
        range
            .filter(|(_, e)| e.cell.timestamp <= read_version)
            .map(|(_, e)| e.cell.clone())
            .collect()
    }

    /// Atomically returns an immutable snapshot of every resident entry and
    /// installs an empty successor map, so concurrent writers never block
    /// on a flush draining the buffer.
    pub fn snapshot_for_flush(&self) -> FlushSnapshot {
        let mut inner = self.inner.write();
        let map = std::mem::take(&mut inner.map);
        let max_sequence = map.values().map(|e| e.sequence).max().unwrap_or(0);
        let entry_count = map.len();
        inner.approx_size = 0;
        inner.mutations_without_wal_bytes = 0;
        FlushSnapshot { entries: Arc::new(map), max_sequence, entry_count }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().map.is_empty()
    }

    pub fn approx_size(&self) -> usize {
        self.inner.read().approx_size
    }

    pub fn mutations_without_wal_bytes(&self) -> usize {
        self.inner.read().mutations_without_wal_bytes
    }
}

impl Default for MemBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;

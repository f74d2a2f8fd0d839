use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

/// Per-row mutual exclusion, keyed by row bytes. A hashed concurrent map
/// standing in for the latch table; hot rows degrade to serial execution,
/// so concurrent writers to different rows never block each other.
pub struct RowLatches {
    table: DashMap<Vec<u8>, Arc<Mutex<()>>>,
}

/// Holds one or more row latches until dropped. For a multi-row batch the
/// guards are acquired with locks sorted by row bytes ascending (see
/// [`RowLatches::lock_many`]) so two batches touching overlapping rows in
/// different orders can never deadlock.
pub struct RowLatchGuard {
    _guards: Vec<ArcMutexGuard<RawMutex, ()>>,
}

impl RowLatches {
    #[must_use]
    pub fn new() -> Self {
        Self { table: DashMap::new() }
    }

    fn handle(&self, row: &[u8]) -> Arc<Mutex<()>> {
        self.table.entry(row.to_vec()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Acquires the latch for a single row.
    #[must_use]
    pub fn lock_one(&self, row: &[u8]) -> RowLatchGuard {
        let guard = self.handle(row).lock_arc();
        RowLatchGuard { _guards: vec![guard] }
    }

    /// Acquires latches for every distinct row in `rows`, always in row-byte
    /// ascending order, so concurrent multi-row batches can't deadlock on
    /// each other regardless of the order their rows were supplied in.
    #[must_use]
    pub fn lock_many(&self, rows: &[Vec<u8>]) -> RowLatchGuard {
        let mut unique: Vec<Vec<u8>> = rows.to_vec();
        unique.sort();
        unique.dedup();

        let guards = unique.iter().map(|r| self.handle(r).lock_arc()).collect();
        RowLatchGuard { _guards: guards }
    }
}

impl Default for RowLatches {
    fn default() -> Self {
        Self::new()
    }
}

use std::path::PathBuf;

use keycodec::Cell;

use crate::{ObserverContext, ObserverError};

/// A single replayed WAL entry, as seen by `pre_wal_restore`/`post_wal_restore`.
#[derive(Debug, Clone)]
pub struct WalRestoreEntry {
    pub region_id: u64,
    pub sequence: u64,
    pub edits: Vec<Cell>,
}

/// A conditional mutation: apply `mutation` only if `target`'s current
/// value equals `expected_value` (`None` means "column must be absent").
#[derive(Debug, Clone)]
pub struct CheckAndMutate {
    pub target: Cell,
    pub expected_value: Option<Vec<u8>>,
    pub mutation: Cell,
}

/// The fixed hook taxonomy invoked at defined points in a region's
/// lifecycle. Every method defaults to a no-op so an observer only
/// implements the hooks it cares about. Hooks receive an
/// [`ObserverContext`] they can use to bypass the caller's default
/// processing or short-circuit the rest of the observer chain for this
/// invocation; they must not retain it past the call.
pub trait RegionObserver: Send + Sync {
    fn pre_open(&self, _ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_open(&self, _ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        Ok(())
    }
    fn pre_close(&self, _ctx: &mut ObserverContext, _abort: bool) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_close(&self, _ctx: &mut ObserverContext, _abort: bool) -> Result<(), ObserverError> {
        Ok(())
    }

    fn pre_wal_restore(&self, _ctx: &mut ObserverContext, _entry: &WalRestoreEntry) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_wal_restore(&self, _ctx: &mut ObserverContext, _entry: &WalRestoreEntry) -> Result<(), ObserverError> {
        Ok(())
    }

    fn pre_flush(&self, _ctx: &mut ObserverContext, _family: &str) -> Result<(), ObserverError> {
        Ok(())
    }
    fn pre_flush_scanner_open(&self, _ctx: &mut ObserverContext, _family: &str) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_flush(&self, _ctx: &mut ObserverContext, _family: &str, _file_id: u64) -> Result<(), ObserverError> {
        Ok(())
    }

    fn pre_compact_selection(&self, _ctx: &mut ObserverContext, _family: &str, _candidates: &[u64]) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_compact_selection(&self, _ctx: &mut ObserverContext, _family: &str, _selected: &[u64]) -> Result<(), ObserverError> {
        Ok(())
    }
    fn pre_compact_scanner_open(&self, _ctx: &mut ObserverContext, _family: &str) -> Result<(), ObserverError> {
        Ok(())
    }
    fn pre_compact(&self, _ctx: &mut ObserverContext, _family: &str) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_compact(&self, _ctx: &mut ObserverContext, _family: &str, _output_file_id: u64) -> Result<(), ObserverError> {
        Ok(())
    }

    fn pre_split_before_ponr(&self, _ctx: &mut ObserverContext, _region_id: u64, _split_key: &[u8]) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_split_after_ponr(&self, _ctx: &mut ObserverContext, _region_id: u64) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_split_rollback(&self, _ctx: &mut ObserverContext, _region_id: u64) -> Result<(), ObserverError> {
        Ok(())
    }

    fn pre_merge_before_ponr(&self, _ctx: &mut ObserverContext, _region_a: u64, _region_b: u64) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_merge_after_ponr(&self, _ctx: &mut ObserverContext, _merged_region: u64) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_merge_rollback(&self, _ctx: &mut ObserverContext, _region_a: u64, _region_b: u64) -> Result<(), ObserverError> {
        Ok(())
    }

    fn pre_get(&self, _ctx: &mut ObserverContext, _target: &Cell) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_get(&self, _ctx: &mut ObserverContext, _target: &Cell, _result: &[Cell]) -> Result<(), ObserverError> {
        Ok(())
    }
    fn pre_exists(&self, _ctx: &mut ObserverContext, _target: &Cell) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_exists(&self, _ctx: &mut ObserverContext, _target: &Cell, _exists: bool) -> Result<(), ObserverError> {
        Ok(())
    }

    fn pre_put(&self, _ctx: &mut ObserverContext, _edits: &[Cell]) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_put(&self, _ctx: &mut ObserverContext, _edits: &[Cell]) -> Result<(), ObserverError> {
        Ok(())
    }
    fn pre_delete(&self, _ctx: &mut ObserverContext, _edits: &[Cell]) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_delete(&self, _ctx: &mut ObserverContext, _edits: &[Cell]) -> Result<(), ObserverError> {
        Ok(())
    }
    fn pre_batch_mutate(&self, _ctx: &mut ObserverContext, _edits: &[Cell]) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_batch_mutate(&self, _ctx: &mut ObserverContext, _edits: &[Cell]) -> Result<(), ObserverError> {
        Ok(())
    }
    /// Runs whether or not the batch ultimately succeeded — the one hook a
    /// coprocessor depending on every attempted mutation being observed
    /// (e.g. a secondary index) can rely on unconditionally.
    fn post_batch_mutate_indispensably(
        &self,
        _ctx: &mut ObserverContext,
        _edits: &[Cell],
        _succeeded: bool,
    ) -> Result<(), ObserverError> {
        Ok(())
    }

    fn pre_check_and_mutate(&self, _ctx: &mut ObserverContext, _op: &CheckAndMutate) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_check_and_mutate(&self, _ctx: &mut ObserverContext, _op: &CheckAndMutate, _applied: bool) -> Result<(), ObserverError> {
        Ok(())
    }

    fn pre_append(&self, _ctx: &mut ObserverContext, _target: &Cell) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_append(&self, _ctx: &mut ObserverContext, _result: &Cell) -> Result<(), ObserverError> {
        Ok(())
    }
    fn pre_increment(&self, _ctx: &mut ObserverContext, _target: &Cell, _delta: i64) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_increment(&self, _ctx: &mut ObserverContext, _result: &Cell) -> Result<(), ObserverError> {
        Ok(())
    }

    fn pre_scanner_open(&self, _ctx: &mut ObserverContext, _scanner_id: u64) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_scanner_open(&self, _ctx: &mut ObserverContext, _scanner_id: u64) -> Result<(), ObserverError> {
        Ok(())
    }
    fn pre_scanner_next(&self, _ctx: &mut ObserverContext, _scanner_id: u64) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_scanner_next(&self, _ctx: &mut ObserverContext, _scanner_id: u64, _returned: usize) -> Result<(), ObserverError> {
        Ok(())
    }
    fn pre_scanner_close(&self, _ctx: &mut ObserverContext, _scanner_id: u64) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_scanner_close(&self, _ctx: &mut ObserverContext, _scanner_id: u64) -> Result<(), ObserverError> {
        Ok(())
    }
    /// Returning `Ok(false)` drops `row` from the scan's result set.
    fn pre_scanner_filter_row(&self, _ctx: &mut ObserverContext, _scanner_id: u64, _row: &[u8]) -> Result<bool, ObserverError> {
        Ok(true)
    }

    fn pre_bulk_load(&self, _ctx: &mut ObserverContext, _family: &str, _paths: &[PathBuf]) -> Result<(), ObserverError> {
        Ok(())
    }
    fn post_bulk_load(&self, _ctx: &mut ObserverContext, _family: &str, _paths: &[PathBuf]) -> Result<(), ObserverError> {
        Ok(())
    }
}

//! # ReplicationTap
//!
//! Ships committed WAL edits whose column family is replication-scoped
//! `GLOBAL` to a ratio-sized subset of peer sink servers. The peer catalog
//! and the sinks themselves are external collaborators, approximated here
//! by narrow traits ([`PeerCatalog`], [`ReplicationSink`]) the same way
//! [`wal::RollListener`](../wal/trait.RollListener.html) stands in for the
//! scheduler's ticker rather than pulling that dependency in directly.

mod edit;
mod sink;

pub use edit::{ReplicatedEdit, ReplicationScope};
pub use sink::{PeerCatalog, ReplicationSink, SinkId};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

/// Default number of consecutive failures a sink tolerates before it's
/// evicted from the live set, named after HBase's `ReplicationSink`
/// bookkeeping of the same shape.
pub const DEFAULT_BAD_SINK_THRESHOLD: u32 = 3;

#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("no live sinks available")]
    NoLiveSinks,
    #[error("sink {0:?} failed: {1}")]
    SinkFailed(SinkId, String),
}

struct LiveSink {
    id: SinkId,
    sink: Arc<dyn ReplicationSink>,
    consecutive_failures: AtomicU32,
}

/// Tails committed WAL edits and ships the GLOBAL-scoped ones to a subset
/// of peer sinks.
pub struct ReplicationTap {
    catalog: Arc<dyn PeerCatalog>,
    sinks: RwLock<Vec<LiveSink>>,
    ratio: f64,
    bad_sink_threshold: u32,
    batch_bytes: usize,
}

impl ReplicationTap {
    #[must_use]
    pub fn new(catalog: Arc<dyn PeerCatalog>, ratio: f64, bad_sink_threshold: u32, batch_bytes: usize) -> Self {
        let sinks = catalog
            .list_sinks()
            .into_iter()
            .map(|(id, sink)| LiveSink { id, sink, consecutive_failures: AtomicU32::new(0) })
            .collect();
        Self { catalog, sinks: RwLock::new(sinks), ratio, bad_sink_threshold, batch_bytes }
    }

    #[must_use]
    pub fn live_sink_count(&self) -> usize {
        self.sinks.read().len()
    }

    /// Drops control edits (compaction markers, ...) and cells whose family
    /// is not replication-scoped `GLOBAL`. Returns `None` if nothing in the
    /// entry survives filtering.
    #[must_use]
    pub fn filter(
        &self,
        edit: ReplicatedEdit,
        family_scope: impl Fn(&[u8]) -> ReplicationScope,
    ) -> Option<ReplicatedEdit> {
        if edit.is_control {
            return None;
        }
        let cells: Vec<_> = edit
            .cells
            .into_iter()
            .filter(|c| family_scope(&c.family) == ReplicationScope::Global)
            .collect();
        if cells.is_empty() {
            return None;
        }
        Some(ReplicatedEdit { cells, ..edit })
    }

    /// Splits `edits` into batches of at most `batch_bytes`
    /// (`estimated_heap_size` summed across each edit's cells); a single
    /// oversized edit still gets its own one-item batch rather than being
    /// dropped or split mid-edit.
    #[must_use]
    pub fn batch(&self, edits: Vec<ReplicatedEdit>) -> Vec<Vec<ReplicatedEdit>> {
        let mut batches = Vec::new();
        let mut current = Vec::new();
        let mut current_bytes = 0usize;

        for edit in edits {
            let size = edit.estimated_bytes();
            if !current.is_empty() && current_bytes + size > self.batch_bytes {
                batches.push(std::mem::take(&mut current));
                current_bytes = 0;
            }
            current_bytes += size;
            current.push(edit);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    /// Picks `k = max(1, floor(ratio * liveSinks))` sinks, in registration
    /// order, and ships `batch` to each. A sink failure is reported via
    /// [`ReplicationTap::report_bad_sink`] and does not stop delivery to
    /// the remaining selected sinks; the call only errors if every
    /// selected sink failed (or there were none to select).
    pub fn ship(&self, batch: &[ReplicatedEdit]) -> Result<(), ReplicationError> {
        let selected = self.select_sinks();
        if selected.is_empty() {
            return Err(ReplicationError::NoLiveSinks);
        }

        let mut last_error = None;
        let mut any_succeeded = false;
        for (id, sink) in selected {
            match sink.ship(batch) {
                Ok(()) => any_succeeded = true,
                Err(e) => {
                    tracing::warn!(sink = ?id, error = %e, "replication sink failed");
                    self.report_bad_sink(&id);
                    last_error = Some(ReplicationError::SinkFailed(id, e));
                }
            }
        }

        if any_succeeded {
            Ok(())
        } else {
            Err(last_error.unwrap_or(ReplicationError::NoLiveSinks))
        }
    }

    fn select_sinks(&self) -> Vec<(SinkId, Arc<dyn ReplicationSink>)> {
        let sinks = self.sinks.read();
        let k = ((self.ratio * sinks.len() as f64).floor() as usize).max(1).min(sinks.len());
        sinks.iter().take(k).map(|s| (s.id.clone(), s.sink.clone())).collect()
    }

    /// Records a failure against `id`; once `bad_sink_threshold` consecutive
    /// failures accumulate the sink is evicted from the live set. If that
    /// empties the set, the peer catalog is re-queried immediately so the
    /// next `ship` has somewhere to send.
    pub fn report_bad_sink(&self, id: &SinkId) {
        let mut evict = false;
        {
            let sinks = self.sinks.read();
            if let Some(live) = sinks.iter().find(|s| &s.id == id) {
                let failures = live.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                evict = failures >= self.bad_sink_threshold;
            }
        }
        if evict {
            self.sinks.write().retain(|s| &s.id != id);
            if self.sinks.read().is_empty() {
                self.refresh_from_catalog();
            }
        }
    }

    fn refresh_from_catalog(&self) {
        let fresh = self
            .catalog
            .list_sinks()
            .into_iter()
            .map(|(id, sink)| LiveSink { id, sink, consecutive_failures: AtomicU32::new(0) })
            .collect();
        *self.sinks.write() = fresh;
    }
}

#[cfg(test)]
mod tests;

//! # Scheduler
//!
//! Background flush/compaction/WAL-roll workers plus the memory watermarks
//! that trigger them. Deliberately depends on nothing above it in the
//! workspace (no `region`, no `store`): work arrives as a boxed
//! [`ScheduledWork`] closure and store identity arrives as a bare `u64`, so
//! this crate never needs to know what a `Store` or `Region` is.

mod memory;
mod pool;
mod roll_ticker;

pub use memory::{MemoryWatermarks, WatermarkConfig};
pub use pool::{ScheduledWork, WorkerPool};
pub use roll_ticker::{RollDriver, WalRollTicker};

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Which compaction queue a piece of work belongs to. Large-queue work is
/// expected to be long-running (major compactions); the small queue
/// handles quick minor compactions so they aren't stuck behind one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionPriority {
    Small,
    Large,
}

/// A snapshot of each pool's backlog, for observability.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerQueueLengths {
    pub flush: usize,
    pub small_compaction: usize,
    pub large_compaction: usize,
}

/// Per-pool thread counts.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub flush_threads: usize,
    pub small_compaction_threads: usize,
    pub large_compaction_threads: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { flush_threads: 2, small_compaction_threads: 2, large_compaction_threads: 1 }
    }
}

/// Owns the flush and compaction worker pools. Flushes and compactions on
/// different stores run in parallel; flushes and compactions on the *same*
/// store are serialized through a per-store lock, which is a simplification
/// of "large-queue work yields to flushes" — this serializes rather than
/// preempting an in-flight compaction, since this crate has no handle to
/// interrupt work it didn't author.
pub struct Scheduler {
    flush_pool: WorkerPool,
    small_compaction_pool: WorkerPool,
    large_compaction_pool: WorkerPool,
    store_locks: DashMap<u64, Arc<Mutex<()>>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            flush_pool: WorkerPool::new("flush", config.flush_threads),
            small_compaction_pool: WorkerPool::new("compact-small", config.small_compaction_threads),
            large_compaction_pool: WorkerPool::new("compact-large", config.large_compaction_threads),
            store_locks: DashMap::new(),
        }
    }

    fn store_lock(&self, store_id: u64) -> Arc<Mutex<()>> {
        self.store_locks.entry(store_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Enqueues `work` on the flush pool, serialized against any other
    /// flush or compaction already running for `store_id`.
    pub fn submit_flush(&self, store_id: u64, work: impl FnOnce() + Send + 'static) {
        let lock = self.store_lock(store_id);
        self.flush_pool.submit(Box::new(move || {
            let _guard = lock.lock();
            work();
        }));
    }

    /// Enqueues `work` on the small or large compaction pool, serialized
    /// against any other flush or compaction already running for
    /// `store_id` (at most one compaction runs per store at a time).
    pub fn submit_compaction(&self, store_id: u64, priority: CompactionPriority, work: impl FnOnce() + Send + 'static) {
        let lock = self.store_lock(store_id);
        let pool = match priority {
            CompactionPriority::Small => &self.small_compaction_pool,
            CompactionPriority::Large => &self.large_compaction_pool,
        };
        pool.submit(Box::new(move || {
            let _guard = lock.lock();
            work();
        }));
    }

    #[must_use]
    pub fn queue_lengths(&self) -> SchedulerQueueLengths {
        SchedulerQueueLengths {
            flush: self.flush_pool.queue_len(),
            small_compaction: self.small_compaction_pool.queue_len(),
            large_compaction: self.large_compaction_pool.queue_len(),
        }
    }

    /// Drains and joins every pool. Consumes the scheduler.
    pub fn shutdown(self) {
        self.flush_pool.shutdown();
        self.small_compaction_pool.shutdown();
        self.large_compaction_pool.shutdown();
    }
}

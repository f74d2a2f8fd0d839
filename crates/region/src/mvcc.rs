use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Assigns the monotonically increasing write number every mutation commits
/// under, and advances the read point only past *contiguous* completions —
/// so a reader's snapshot never includes a write that started earlier but
/// is still in flight, even if a later-numbered write already finished.
///
/// This crate folds the mvcc sequence and the cell's on-disk `timestamp`
/// into the same monotonic clock (see the `region` module doc) rather than
/// threading a second counter through `store`/`membuffer`, which only ever
/// compare a single `read_version` against `Cell::timestamp`.
pub struct MvccClock {
    next: AtomicU64,
    read_point: AtomicU64,
    pending: Mutex<BTreeSet<u64>>,
}

impl MvccClock {
    #[must_use]
    pub fn new() -> Self {
        Self { next: AtomicU64::new(0), read_point: AtomicU64::new(0), pending: Mutex::new(BTreeSet::new()) }
    }

    /// Reserves the next write number. The caller must eventually call
    /// [`MvccClock::complete`] with the same number, including on error
    /// paths, or the read point stalls forever behind it.
    pub fn begin(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Marks `write_number` done and advances the read point past any run
    /// of now-contiguous completions starting right after it.
    pub fn complete(&self, write_number: u64) {
        let mut pending = self.pending.lock();
        pending.insert(write_number);
        let mut rp = self.read_point.load(Ordering::SeqCst);
        while pending.remove(&(rp + 1)) {
            rp += 1;
        }
        self.read_point.store(rp, Ordering::SeqCst);
    }

    #[must_use]
    pub fn read_point(&self) -> u64 {
        self.read_point.load(Ordering::SeqCst)
    }

    /// Advances both the read point and the next-write counter to at least
    /// `to`, if they're currently behind it. Used once at region open, after
    /// WAL replay has brought the membuffers forward to a known sequence,
    /// so a reader right after open already sees everything replay put back.
    pub fn fast_forward(&self, to: u64) {
        self.read_point.fetch_max(to, Ordering::SeqCst);
        self.next.fetch_max(to, Ordering::SeqCst);
    }
}

impl Default for MvccClock {
    fn default() -> Self {
        Self::new()
    }
}

//! Manual flush/compaction triggers, plus submission onto the shared
//! [`scheduler::Scheduler`] for callers that want the work off their own
//! thread. `region::Region::flush`/`compact` already iterate every family's
//! store; this module only adds the region lookup and scheduling.

use scheduler::CompactionPriority;

use crate::{EngineError, Node};

impl Node {
    /// Flushes `region_id` synchronously, on the calling thread.
    pub fn flush_region(&self, region_id: u64) -> Result<(), EngineError> {
        let region = self.region(region_id)?;
        Ok(region.flush()?)
    }

    /// Compacts `region_id` synchronously, on the calling thread.
    pub fn compact_region(&self, region_id: u64, major: bool) -> Result<(), EngineError> {
        let region = self.region(region_id)?;
        Ok(region.compact(major)?)
    }

    /// Submits a flush for `region_id` to the scheduler's flush pool,
    /// returning immediately.
    pub fn submit_flush(&self, region_id: u64) -> Result<(), EngineError> {
        let region = self.region(region_id)?;
        self.scheduler().submit_flush(region_id, move || {
            if let Err(e) = region.flush() {
                tracing::warn!(region_id, error = %e, "scheduled flush failed");
            }
        });
        Ok(())
    }

    /// Submits a compaction for `region_id` to the scheduler's small or
    /// large compaction pool, returning immediately. `major` selects the
    /// large pool, matching the assumption (noted on
    /// [`scheduler::CompactionPriority`]) that major compactions run long.
    pub fn submit_compaction(&self, region_id: u64, major: bool) -> Result<(), EngineError> {
        let region = self.region(region_id)?;
        let priority = if major { CompactionPriority::Large } else { CompactionPriority::Small };
        self.scheduler().submit_compaction(region_id, priority, move || {
            if let Err(e) = region.compact(major) {
                tracing::warn!(region_id, major, error = %e, "scheduled compaction failed");
            }
        });
        Ok(())
    }
}

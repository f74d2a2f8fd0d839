use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Global and per-region memory watermarks, named after
/// `regionserver.global.memstore.size.upper/lower.limit`: crossing the high
/// watermark should trigger a flush, crossing the hard cap should block
/// writers until usage falls back under it.
#[derive(Debug, Clone, Copy)]
pub struct WatermarkConfig {
    pub low_watermark_bytes: u64,
    pub high_watermark_bytes: u64,
    pub hard_cap_bytes: u64,
}

/// Tracks live global MemBuffer usage against [`WatermarkConfig`] and
/// accumulates `updatesBlockedTime` — the total duration writers have spent
/// waiting for usage to fall back under the hard cap.
pub struct MemoryWatermarks {
    config: WatermarkConfig,
    usage_bytes: AtomicU64,
    updates_blocked_nanos: AtomicU64,
}

impl MemoryWatermarks {
    #[must_use]
    pub fn new(config: WatermarkConfig) -> Self {
        Self { config, usage_bytes: AtomicU64::new(0), updates_blocked_nanos: AtomicU64::new(0) }
    }

    pub fn record_usage(&self, bytes: u64) {
        self.usage_bytes.store(bytes, Ordering::SeqCst);
    }

    #[must_use]
    pub fn usage_bytes(&self) -> u64 {
        self.usage_bytes.load(Ordering::SeqCst)
    }

    /// `true` once usage has crossed the high watermark — the scheduler
    /// should enqueue a flush.
    #[must_use]
    pub fn should_flush(&self) -> bool {
        self.usage_bytes() >= self.config.high_watermark_bytes
    }

    /// `true` once usage is back under the low watermark — flushing can
    /// stop being urgent.
    #[must_use]
    pub fn below_low_watermark(&self) -> bool {
        self.usage_bytes() < self.config.low_watermark_bytes
    }

    /// `true` once usage has crossed the hard cap — writers must block.
    #[must_use]
    pub fn is_write_blocked(&self) -> bool {
        self.usage_bytes() >= self.config.hard_cap_bytes
    }

    /// Adds `duration` to the running `updatesBlockedTime` total. The
    /// caller (the region's write path) is responsible for measuring the
    /// actual wait; this only accumulates it.
    pub fn record_blocked(&self, duration: Duration) {
        self.updates_blocked_nanos.fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    #[must_use]
    pub fn updates_blocked_time(&self) -> Duration {
        Duration::from_nanos(self.updates_blocked_nanos.load(Ordering::SeqCst))
    }
}

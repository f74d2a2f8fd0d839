/// Observer hook points around a WAL roll, mirroring
/// `ObserverHooks.preLogRoll`/`postLogRoll`. `wal` depends on this trait
/// rather than on the `observer` crate directly, so the two crates don't
/// form a cycle; `engine` wires a real observer registry into it.
pub trait RollListener: Send + Sync {
    fn pre_log_roll(&self, _old_file_id: u64) {}
    fn post_log_roll(&self, _old_file_id: u64, _new_file_id: u64) {}
}

/// A listener that does nothing; the default when no hooks are registered.
pub struct NoopRollListener;

impl RollListener for NoopRollListener {}

/// The roll policy a background ticker (driven by the `scheduler` crate)
/// evaluates against a [`crate::WalWriter`] on every tick.
#[derive(Debug, Clone, Copy)]
pub struct RollPolicy {
    /// Roll once the current segment reaches this many bytes.
    pub max_bytes: u64,
    /// Roll once this much time has elapsed since the last roll, even with
    /// zero write traffic.
    pub period: std::time::Duration,
}

impl Default for RollPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024 * 1024,
            period: std::time::Duration::from_secs(3600),
        }
    }
}

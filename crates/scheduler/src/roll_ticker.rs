use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};

/// The narrow seam between this crate and whatever owns the actual WAL
/// writer. `wal` deliberately keeps its roll policy a pure predicate
/// (`should_roll`) and its roll an explicit action (`roll`) rather than
/// spawning its own ticker thread — this trait is what drives that
/// predicate/action pair periodically, the same way
/// `wal::RollListener` stands in for the engine's real observer hookup.
pub trait RollDriver: Send + Sync + 'static {
    fn should_roll(&self) -> bool;
    fn roll(&self);
}

/// A background thread that calls `should_roll`/`roll` on a fixed tick,
/// so the size-or-period roll policy fires even under zero write traffic
/// (a write-triggered check alone would never notice a stale, idle WAL).
pub struct WalRollTicker {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl WalRollTicker {
    #[must_use]
    pub fn spawn(driver: impl RollDriver, tick: Duration) -> Self {
        let (stop, stop_rx) = bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("wal-roll-ticker".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(tick) {
                    Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        if driver.should_roll() {
                            driver.roll();
                        }
                    }
                }
            })
            .expect("failed to spawn wal-roll-ticker thread");
        Self { stop, handle: Some(handle) }
    }
}

impl Drop for WalRollTicker {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

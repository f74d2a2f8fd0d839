//! # Observer
//!
//! A fixed taxonomy of lifecycle hooks (open/close, flush, compact,
//! split/merge transaction phases, get/mutate, scanner, bulk-load,
//! WAL-restore) plus the registry that invokes them. Hooks are in-process
//! trait objects — no reflection, no dynamic loading — matching the
//! "external collaborators approximated by narrow traits" shape the rest
//! of this workspace uses for things it doesn't own (e.g. `wal::RollListener`).

mod hooks;

pub use hooks::{CheckAndMutate, RegionObserver, WalRestoreEntry};

use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("observer hook failed: {0}")]
    HookFailed(String),
}

/// Per-invocation state an observer hook can use to change what happens
/// after it returns. Must not be retained past the call that received it.
#[derive(Debug, Default)]
pub struct ObserverContext {
    bypass: bool,
    complete: bool,
}

impl ObserverContext {
    /// Skip the caller's default processing for this invocation (e.g. a
    /// `pre_put` observer that wants to fully replace the write).
    pub fn bypass(&mut self) {
        self.bypass = true;
    }

    #[must_use]
    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    /// Stop invoking further observers in the chain for this hook.
    pub fn complete(&mut self) {
        self.complete = true;
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// How the registry reacts to a hook returning an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortPolicy {
    /// Propagate the error immediately, running no further observers.
    AbortOnError,
    /// Log the error via `tracing` and continue with the next observer.
    LogAndContinue,
}

/// An ordered set of [`RegionObserver`]s, invoked in registration order for
/// every hook. Registration order matters: an earlier observer's
/// `ctx.complete()` call prevents later observers from seeing the hook at
/// all for that invocation.
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn RegionObserver>>,
    abort_policy: AbortPolicy,
}

impl ObserverRegistry {
    #[must_use]
    pub fn new(abort_policy: AbortPolicy) -> Self {
        Self { observers: Vec::new(), abort_policy }
    }

    pub fn register(&mut self, observer: Arc<dyn RegionObserver>) {
        self.observers.push(observer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Runs `invoke` once per registered observer, in order, threading a
    /// single [`ObserverContext`] through the chain. Stops early once an
    /// observer calls `ctx.complete()`. An observer error either aborts the
    /// whole chain or is logged and skipped, per `abort_policy`.
    pub fn run<F>(&self, mut invoke: F) -> Result<ObserverContext, ObserverError>
    where
        F: FnMut(&dyn RegionObserver, &mut ObserverContext) -> Result<(), ObserverError>,
    {
        let mut ctx = ObserverContext::default();
        for observer in &self.observers {
            if let Err(e) = invoke(observer.as_ref(), &mut ctx) {
                match self.abort_policy {
                    AbortPolicy::AbortOnError => return Err(e),
                    AbortPolicy::LogAndContinue => {
                        tracing::warn!(error = %e, "observer hook failed, continuing");
                    }
                }
            }
            if ctx.is_complete() {
                break;
            }
        }
        Ok(ctx)
    }

    /// Like [`ObserverRegistry::run`], for the one hook
    /// (`pre_scanner_filter_row`) that returns a `bool` instead of `()`:
    /// stops and returns `Ok(false)` as soon as any observer vetoes the
    /// row, so a later observer never even sees an already-filtered row.
    pub fn run_filter<F>(&self, mut invoke: F) -> Result<bool, ObserverError>
    where
        F: FnMut(&dyn RegionObserver, &mut ObserverContext) -> Result<bool, ObserverError>,
    {
        let mut ctx = ObserverContext::default();
        for observer in &self.observers {
            match invoke(observer.as_ref(), &mut ctx) {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(e) => match self.abort_policy {
                    AbortPolicy::AbortOnError => return Err(e),
                    AbortPolicy::LogAndContinue => {
                        tracing::warn!(error = %e, "observer filter hook failed, continuing");
                    }
                },
            }
            if ctx.is_complete() {
                break;
            }
        }
        Ok(true)
    }
}

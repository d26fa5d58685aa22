//! Pause rendezvous between the update executor and the application task.
//!
//! Two flags, each with exactly one writer:
//!
//! | Flag                 | Writer            | Reader            |
//! |----------------------|-------------------|-------------------|
//! | `update_pending`     | UpdateExecutor    | ApplicationTask   |
//! | `pause_acknowledged` | ApplicationTask   | UpdateExecutor    |
//!
//! This coordinates *phases* of work rather than guarding a critical
//! section, so no lock is taken on either side.  Stores use `Release` and
//! loads use `Acquire`: once the executor observes the acknowledgement,
//! every write the application task made before acknowledging is visible.
//!
//! ```text
//!  executor: request_pause ─▶ await_acknowledgement ─▶ (flash) ─▶ release_pause ─▶ await_resumed
//!  app task:         sees pending ─▶ acknowledge_pause ...... sees clear ─▶ clear_acknowledgement
//! ```

use core::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::PauseTimeout;

/// Shared rendezvous state.  Share it as `Arc<PauseCoordinator>`.
#[derive(Debug, Default)]
pub struct PauseCoordinator {
    update_pending: AtomicBool,
    pause_acknowledged: AtomicBool,
}

impl PauseCoordinator {
    pub const fn new() -> Self {
        Self {
            update_pending: AtomicBool::new(false),
            pause_acknowledged: AtomicBool::new(false),
        }
    }

    // ── Executor side ─────────────────────────────────────────

    /// Ask the application task to park.  Non-blocking.
    pub fn request_pause(&self) {
        self.update_pending.store(true, Ordering::Release);
    }

    /// Block until the application task acknowledges, sleeping `poll`
    /// between checks.
    ///
    /// With `timeout == None` this waits forever: an application task that
    /// never acknowledges stalls the caller.
    pub fn await_acknowledgement(
        &self,
        poll: Duration,
        timeout: Option<Duration>,
    ) -> Result<(), PauseTimeout> {
        wait_until(poll, timeout, || self.is_acknowledged())
    }

    /// Let the application task resume.  Non-blocking.
    pub fn release_pause(&self) {
        self.update_pending.store(false, Ordering::Release);
    }

    /// Block until the application task has cleared its acknowledgement,
    /// returning the rendezvous to its initial state.
    pub fn await_resumed(
        &self,
        poll: Duration,
        timeout: Option<Duration>,
    ) -> Result<(), PauseTimeout> {
        wait_until(poll, timeout, || !self.is_acknowledged())
    }

    pub fn is_acknowledged(&self) -> bool {
        self.pause_acknowledged.load(Ordering::Acquire)
    }

    // ── Application side ──────────────────────────────────────

    pub fn is_update_pending(&self) -> bool {
        self.update_pending.load(Ordering::Acquire)
    }

    /// Confirm the application task has stopped touching shared resources.
    pub fn acknowledge_pause(&self) {
        self.pause_acknowledged.store(true, Ordering::Release);
    }

    pub fn clear_acknowledgement(&self) {
        self.pause_acknowledged.store(false, Ordering::Release);
    }

    /// Both flags down: no transaction in progress.
    pub fn is_idle(&self) -> bool {
        !self.is_update_pending() && !self.is_acknowledged()
    }
}

fn wait_until(
    poll: Duration,
    timeout: Option<Duration>,
    mut done: impl FnMut() -> bool,
) -> Result<(), PauseTimeout> {
    let started = Instant::now();
    loop {
        if done() {
            return Ok(());
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                return Err(PauseTimeout);
            }
        }
        std::thread::sleep(poll);
    }
}

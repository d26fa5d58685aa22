//! Application task: the device's ordinary workload, pausable by the
//! update executor.
//!
//! Each quantum checks `update_pending` before doing any work.  While it is
//! set the task acknowledges once and then only sleeps and feeds the task
//! watchdog; when it clears, the acknowledgement is dropped and work
//! resumes on the same quantum.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::config::AgentConfig;
use crate::drivers::watchdog::Watchdog;
use crate::update::pause::PauseCoordinator;

use super::ports::Workload;

/// What a single quantum did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantum {
    /// The workload ran.
    Worked,
    /// An update is pending; the workload was not touched.
    Parked,
}

pub struct ApplicationTask<W: Workload> {
    workload: W,
    pause: Arc<PauseCoordinator>,
    park_poll: Duration,
    watchdog_timeout_ms: u32,
    parked: bool,
}

impl<W: Workload> ApplicationTask<W> {
    pub fn new(workload: W, pause: Arc<PauseCoordinator>, park_poll: Duration) -> Self {
        Self {
            workload,
            pause,
            park_poll,
            watchdog_timeout_ms: AgentConfig::default().watchdog_timeout_ms,
            parked: false,
        }
    }

    /// Park poll and watchdog budget taken from `config`.
    pub fn from_config(workload: W, pause: Arc<PauseCoordinator>, config: &AgentConfig) -> Self {
        Self {
            watchdog_timeout_ms: config.watchdog_timeout_ms,
            ..Self::new(
                workload,
                pause,
                Duration::from_millis(u64::from(config.park_poll_ms)),
            )
        }
    }

    pub fn workload(&self) -> &W {
        &self.workload
    }

    /// Run one scheduling quantum.
    pub fn step(&mut self) -> Quantum {
        if self.pause.is_update_pending() {
            if !self.parked {
                self.parked = true;
                info!("App: update pending, parking");
            }
            if !self.pause.is_acknowledged() {
                self.pause.acknowledge_pause();
            }
            return Quantum::Parked;
        }

        if self.pause.is_acknowledged() {
            self.pause.clear_acknowledgement();
        }
        if self.parked {
            self.parked = false;
            info!("App: pause released, resuming");
        }

        self.workload.run_once();
        Quantum::Worked
    }

    /// Run quanta forever.  Call from the thread that owns the workload;
    /// that thread is the one subscribed to the task watchdog.
    pub fn run(mut self) -> ! {
        let mut watchdog = Watchdog::new(self.watchdog_timeout_ms);
        loop {
            let quantum = self.step();
            watchdog.feed();
            match quantum {
                Quantum::Parked => std::thread::sleep(self.park_poll),
                Quantum::Worked => std::thread::yield_now(),
            }
        }
    }
}

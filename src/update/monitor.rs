//! Update monitor: decides once per interval whether an update is needed.
//!
//! Runs forever on its own thread.  Each cycle fetches the remote version,
//! compares it with the running build, and on a mismatch runs the executor
//! synchronously before sleeping again.

use std::time::Duration;

use log::warn;

use crate::app::events::UpdateEvent;
use crate::app::ports::{EventSink, FlashWriter, HttpPort, RebootPort};
use crate::config::{AgentConfig, MAX_URL_LEN};

use super::executor::{UpdateExecutor, UpdateTransaction};
use super::{RemoteVersion, versions_match};

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Version endpoint unreadable; nothing else happened.
    FetchFailed,
    /// Remote version matches the running build.
    UpToDate,
    /// A transaction ran.
    Updated(UpdateTransaction),
}

pub struct UpdateMonitor {
    local_version: &'static str,
    version_url: heapless::String<MAX_URL_LEN>,
    interval: Duration,
    executor: UpdateExecutor,
    cycles: u64,
}

impl UpdateMonitor {
    pub fn new(local_version: &'static str, config: &AgentConfig, executor: UpdateExecutor) -> Self {
        Self {
            local_version,
            version_url: config.version_url.clone(),
            interval: Duration::from_millis(config.poll_interval_ms as u64),
            executor,
            cycles: 0,
        }
    }

    pub fn executor(&self) -> &UpdateExecutor {
        &self.executor
    }

    /// Poll cycles completed since boot.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Fetch the remote version; empty on any failure.  No retry.
    pub fn fetch_remote_version(&self, http: &mut impl HttpPort) -> RemoteVersion {
        match http.fetch_version(&self.version_url) {
            Ok(v) => v,
            Err(e) => {
                warn!("OTA: version fetch failed: {}", e);
                RemoteVersion::empty()
            }
        }
    }

    /// One fetch-compare-maybe-update cycle.
    pub fn poll_cycle(
        &mut self,
        http: &mut impl HttpPort,
        device: &mut (impl FlashWriter + RebootPort),
        sink: &mut impl EventSink,
    ) -> PollOutcome {
        self.cycles += 1;
        let remote = self.fetch_remote_version(http);

        if remote.is_empty() {
            sink.emit(&UpdateEvent::FetchFailed);
            return PollOutcome::FetchFailed;
        }

        if versions_match(self.local_version, &remote) {
            sink.emit(&UpdateEvent::UpToDate { remote });
            return PollOutcome::UpToDate;
        }

        sink.emit(&UpdateEvent::UpdateAvailable {
            local: self.local_version,
            remote,
        });
        PollOutcome::Updated(self.executor.check_for_update(http, device, sink))
    }

    /// Poll forever, sleeping the configured interval after every cycle.
    pub fn run(
        mut self,
        http: &mut impl HttpPort,
        device: &mut (impl FlashWriter + RebootPort),
        sink: &mut impl EventSink,
    ) -> ! {
        log::info!(
            "OTA monitor started (local={}, interval={}ms)",
            self.local_version,
            self.interval.as_millis()
        );
        loop {
            let _ = self.poll_cycle(http, device, sink);
            std::thread::sleep(self.interval);
        }
    }
}

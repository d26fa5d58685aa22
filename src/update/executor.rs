//! Update executor: one complete firmware replacement per call.
//!
//! ```text
//! Idle ─▶ PauseRequested ─▶ Writing ─▶ Finalizing ─▶ Restarting ─▶ (reboot)
//!              │               │            │
//!              └───────────────┴────────────┴──▶ Failed ─▶ Idle
//! ```
//!
//! Every exit path releases the pause and waits for the application task
//! to drop its acknowledgement, so the rendezvous is back at rest before
//! the monitor polls again.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::app::events::UpdateEvent;
use crate::app::ports::{EventSink, FlashWriter, HttpPort, ImageStream, RebootPort};
use crate::config::{AgentConfig, MAX_URL_LEN};
use crate::error::UpdateFailure;

use super::pause::PauseCoordinator;

// ── State machine ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    PauseRequested,
    Writing,
    Finalizing,
    Restarting,
    Failed,
}

/// How a transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// The reboot capability was invoked.  Only observable with test
    /// doubles; on hardware the device is already restarting.
    Restarted,
    Failed(UpdateFailure),
}

/// Record of one `check_for_update` call.  Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateTransaction {
    /// Content length advertised by the firmware response (0 if never opened).
    pub expected_len: u32,
    /// Bytes the flash writer accepted.
    pub bytes_written: u32,
    pub outcome: TransactionOutcome,
}

impl UpdateTransaction {
    /// Streamed byte count differs from the advertised length.
    pub fn length_mismatch(&self) -> bool {
        self.expected_len != 0 && self.bytes_written != self.expected_len
    }

    pub fn restarted(&self) -> bool {
        self.outcome == TransactionOutcome::Restarted
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    expected_len: u32,
    bytes_written: u32,
}

impl Progress {
    fn finish(self, outcome: TransactionOutcome) -> UpdateTransaction {
        UpdateTransaction {
            expected_len: self.expected_len,
            bytes_written: self.bytes_written,
            outcome,
        }
    }
}

// ── Executor ──────────────────────────────────────────────────

/// Performs firmware replacement transactions.
///
/// `check_for_update` takes `&mut self`, so at most one transaction can be
/// in flight per executor.
pub struct UpdateExecutor {
    pause: Arc<PauseCoordinator>,
    firmware_url: heapless::String<MAX_URL_LEN>,
    ack_poll: Duration,
    ack_timeout: Option<Duration>,
    state: ExecutorState,
    transactions: u32,
}

impl UpdateExecutor {
    pub fn new(pause: Arc<PauseCoordinator>, config: &AgentConfig) -> Self {
        Self {
            pause,
            firmware_url: config.firmware_url.clone(),
            ack_poll: Duration::from_millis(config.ack_poll_ms as u64),
            ack_timeout: config.ack_timeout_ms.map(|ms| Duration::from_millis(ms as u64)),
            state: ExecutorState::Idle,
            transactions: 0,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Number of transactions started since boot.
    pub fn transactions_started(&self) -> u32 {
        self.transactions
    }

    /// Run one update transaction to completion.
    ///
    /// `device` provides both the flash writer and the reboot capability;
    /// taking them as one value avoids a second mutable borrow of the
    /// same adapter.
    pub fn check_for_update(
        &mut self,
        http: &mut impl HttpPort,
        device: &mut (impl FlashWriter + RebootPort),
        sink: &mut impl EventSink,
    ) -> UpdateTransaction {
        self.transactions = self.transactions.wrapping_add(1);
        let mut progress = Progress::default();

        // 1. Park the application task
        self.transition(ExecutorState::PauseRequested);
        self.pause.request_pause();
        sink.emit(&UpdateEvent::PauseRequested);
        if let Err(e) = self.pause.await_acknowledgement(self.ack_poll, self.ack_timeout) {
            return self.fail(e.into(), progress, sink);
        }
        sink.emit(&UpdateEvent::PauseAcknowledged);

        // 2. Open the download and the flash transaction
        self.transition(ExecutorState::Writing);
        let mut image = match http.open_image(&self.firmware_url) {
            Ok(image) => image,
            Err(e) => {
                sink.emit(&UpdateEvent::DownloadFailed(e));
                return self.fail(e.into(), progress, sink);
            }
        };
        progress.expected_len = image.content_length();

        if !device.begin(progress.expected_len) {
            let cause = device.last_error();
            sink.emit(&UpdateEvent::BeginRefused(cause));
            return self.fail(UpdateFailure::BeginFailed(cause), progress, sink);
        }
        sink.emit(&UpdateEvent::WriteStarted {
            expected: progress.expected_len,
        });

        // 3. Stream.  A short stream is reported but does not abort.
        let written = device.write_stream(&mut image);
        drop(image);
        progress.bytes_written = u32::try_from(written).unwrap_or(u32::MAX);
        if progress.bytes_written == progress.expected_len {
            sink.emit(&UpdateEvent::WriteComplete {
                written: progress.bytes_written,
            });
        } else {
            sink.emit(&UpdateEvent::LengthMismatch {
                written: progress.bytes_written,
                expected: progress.expected_len,
            });
        }

        // 4. Commit
        self.transition(ExecutorState::Finalizing);
        if !device.end() {
            let cause = device.last_error();
            return self.fail(UpdateFailure::FinalizeFailed(cause), progress, sink);
        }
        if !device.is_finished() {
            return self.fail(UpdateFailure::IncompleteCommit, progress, sink);
        }
        sink.emit(&UpdateEvent::Finalized);

        // 5. Point of no return
        self.transition(ExecutorState::Restarting);
        self.release(sink);
        sink.emit(&UpdateEvent::Restarting);
        device.restart();

        // Reachable only when `restart` is a test double.
        self.transition(ExecutorState::Idle);
        progress.finish(TransactionOutcome::Restarted)
    }

    // ── Internal ──────────────────────────────────────────────

    fn fail(
        &mut self,
        failure: UpdateFailure,
        progress: Progress,
        sink: &mut impl EventSink,
    ) -> UpdateTransaction {
        self.transition(ExecutorState::Failed);
        sink.emit(&UpdateEvent::Failed(failure));
        self.release(sink);
        self.transition(ExecutorState::Idle);
        progress.finish(TransactionOutcome::Failed(failure))
    }

    fn release(&mut self, sink: &mut impl EventSink) {
        self.pause.release_pause();
        sink.emit(&UpdateEvent::PauseReleased);
        if self.pause.await_resumed(self.ack_poll, self.ack_timeout).is_err() {
            warn!("OTA: application task still holds its acknowledgement");
        }
    }

    fn transition(&mut self, next: ExecutorState) {
        if self.state != next {
            info!("OTA: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

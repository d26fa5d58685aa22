//! Outbound update events.
//!
//! The monitor and executor emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: the firmware logs them to serial,
//! tests record them.

use crate::error::{FlashError, TransportError, UpdateFailure};
use crate::update::RemoteVersion;

/// Structured events emitted by the update core.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    /// The version endpoint could not be read this cycle.
    FetchFailed,

    /// Remote version matches the running build.
    UpToDate { remote: RemoteVersion },

    /// Remote version differs; a transaction is about to start.
    UpdateAvailable {
        local: &'static str,
        remote: RemoteVersion,
    },

    /// `update_pending` raised; waiting on the application task.
    PauseRequested,

    /// The application task confirmed it is parked.
    PauseAcknowledged,

    /// The firmware download could not be opened.
    DownloadFailed(TransportError),

    /// Flash write transaction opened.
    WriteStarted { expected: u32 },

    /// Flash `begin` refused.
    BeginRefused(Option<FlashError>),

    /// Streaming finished with exactly the advertised byte count.
    WriteComplete { written: u32 },

    /// Streaming finished short of (or past) the advertised length.
    LengthMismatch { written: u32, expected: u32 },

    /// Commit accepted and marked complete.
    Finalized,

    /// Transaction ended without a restart.
    Failed(UpdateFailure),

    /// About to hand control to the new image.
    Restarting,

    /// `update_pending` cleared.
    PauseReleased,
}
